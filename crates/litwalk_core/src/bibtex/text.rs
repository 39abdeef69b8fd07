//! Field-level text cleanup for BibTeX values.
//!
//! # Responsibility
//! - Split author lists on the BibTeX ` and ` separator.
//! - Normalize keywords, years and free text.
//! - Decode common LaTeX escapes when text normalization is enabled.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static LATEX_ACCENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\{?\\(?:([`'^"~=.])\s*\{?([A-Za-z])|([uvHc])(?:\s+|\{)([A-Za-z]))\}?\}?"#)
        .expect("valid accent regex")
});
static LATEX_SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{?\\(ss|ae|AE|oe|OE|aa|AA|o|O|l|L)\b\}?").expect("valid symbol regex"));
static LATEX_COMMAND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\(?:emph|textit|textbf|textrm|mathrm|text)\s*").expect("valid command regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Replaces line breaks with spaces, as every stored text field requires.
pub fn flatten_lines(value: &str) -> String {
    value.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// Decodes LaTeX escapes, strips grouping braces and collapses whitespace.
pub fn normalize_text(value: &str) -> String {
    let decoded = decode_latex(value);
    let without_braces: String = decoded.chars().filter(|c| *c != '{' && *c != '}').collect();
    WHITESPACE_RE
        .replace_all(&without_braces, " ")
        .trim()
        .to_string()
}

/// Decodes the LaTeX escapes that commonly appear in exported bibliographies.
pub fn decode_latex(value: &str) -> String {
    let accents = LATEX_ACCENT_RE.replace_all(value, |caps: &Captures<'_>| {
        let (accent, letter) = match (caps.get(1), caps.get(2)) {
            (Some(accent), Some(letter)) => (accent.as_str(), letter.as_str()),
            _ => (
                caps.get(3).map_or("", |m| m.as_str()),
                caps.get(4).map_or("", |m| m.as_str()),
            ),
        };
        let letter = letter.chars().next().unwrap_or_default();
        accented(accent, letter).to_string()
    });
    let symbols = LATEX_SYMBOL_RE.replace_all(&accents, |caps: &Captures<'_>| {
        match &caps[1] {
            "ss" => "ß",
            "ae" => "æ",
            "AE" => "Æ",
            "oe" => "œ",
            "OE" => "Œ",
            "aa" => "å",
            "AA" => "Å",
            "o" => "ø",
            "O" => "Ø",
            "l" => "ł",
            _ => "Ł",
        }
        .to_string()
    });
    let commands = LATEX_COMMAND_RE.replace_all(&symbols, "");

    commands
        .replace("\\&", "&")
        .replace("\\%", "%")
        .replace("\\$", "$")
        .replace("\\_", "_")
        .replace("\\#", "#")
        .replace("---", "\u{2014}")
        .replace("--", "\u{2013}")
        .replace('~', " ")
}

fn accented(accent: &str, letter: char) -> char {
    let table: &[(char, &str, &str)] = match accent {
        "'" => &[('a', "á", "Á"), ('e', "é", "É"), ('i', "í", "Í"), ('o', "ó", "Ó"), ('u', "ú", "Ú"), ('y', "ý", "Ý"), ('c', "ć", "Ć"), ('n', "ń", "Ń"), ('s', "ś", "Ś"), ('z', "ź", "Ź")],
        "`" => &[('a', "à", "À"), ('e', "è", "È"), ('i', "ì", "Ì"), ('o', "ò", "Ò"), ('u', "ù", "Ù")],
        "^" => &[('a', "â", "Â"), ('e', "ê", "Ê"), ('i', "î", "Î"), ('o', "ô", "Ô"), ('u', "û", "Û")],
        "\"" => &[('a', "ä", "Ä"), ('e', "ë", "Ë"), ('i', "ï", "Ï"), ('o', "ö", "Ö"), ('u', "ü", "Ü"), ('y', "ÿ", "Ÿ")],
        "~" => &[('a', "ã", "Ã"), ('n', "ñ", "Ñ"), ('o', "õ", "Õ")],
        "c" => &[('c', "ç", "Ç"), ('s', "ş", "Ş")],
        "v" => &[('c', "č", "Č"), ('s', "š", "Š"), ('z', "ž", "Ž"), ('r', "ř", "Ř"), ('e', "ě", "Ě")],
        _ => &[],
    };

    let lower = letter.to_ascii_lowercase();
    table
        .iter()
        .find(|(base, _, _)| *base == lower)
        .and_then(|(_, small, capital)| {
            let form = if letter.is_ascii_uppercase() { capital } else { small };
            form.chars().next()
        })
        .unwrap_or(letter)
}

/// Splits an author field on ` and ` at brace depth zero.
///
/// Braced groups such as `{Barnes and Noble}` stay one author.
pub fn split_authors(value: &str) -> Vec<String> {
    let mut authors = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for word in words_outside_braces(value) {
        if word.eq_ignore_ascii_case("and") {
            push_author(&mut authors, &mut current);
        } else {
            current.push(word);
        }
    }
    push_author(&mut authors, &mut current);

    authors
}

fn push_author(authors: &mut Vec<String>, current: &mut Vec<String>) {
    if !current.is_empty() {
        authors.push(current.join(" "));
        current.clear();
    }
}

fn words_outside_braces(value: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut depth = 0usize;

    for c in value.chars() {
        match c {
            '{' => {
                depth += 1;
                word.push(c);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                word.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !word.is_empty() {
                    words.push(std::mem::take(&mut word));
                }
            }
            c => word.push(c),
        }
    }
    if !word.is_empty() {
        words.push(word);
    }

    words
}

/// Splits `;`-separated keywords, lowercased and trimmed.
///
/// Entries containing `/` are reference-manager folder paths and are dropped.
pub fn normalize_keywords(value: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for keyword in value.split(';') {
        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() || keyword.contains('/') || keywords.contains(&keyword) {
            continue;
        }
        keywords.push(keyword);
    }
    keywords
}

/// Parses the leading digits of a year field (`2020`, `{2020}`, `2020a`).
pub fn parse_year(value: &str) -> Option<i32> {
    let digits: String = value
        .trim()
        .trim_start_matches('{')
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Trims a value and maps blank results to `None`.
pub fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
