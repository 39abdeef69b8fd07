//! Lexical BibTeX parser built on nom.
//!
//! Handles `@string` macros with `#` concatenation, `@preamble`, `@comment`,
//! braced and quoted values with nested braces, bare numbers and macro
//! references. Entries may be delimited by `{}` or `()`.
//!
//! # Invariants
//! - A block starts at an `@` preceded on its line only by whitespace, or
//!   only by whitespace since the end of the previous block; anything else
//!   between blocks is treated as commentary.
//! - A malformed block is reported with its line number and parsing resumes
//!   at the next block start.

use nom::branch::alt;
use nom::bytes::complete::{take_while, take_while1};
use nom::character::complete::{char, multispace0};
use nom::combinator::map;
use nom::IResult;
use std::collections::HashMap;

/// One syntactically valid entry, before any domain conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    /// Lowercased entry type, e.g. `article`.
    pub entry_type: String,
    /// Cite key as written; may be empty.
    pub cite_key: String,
    /// Field names are lowercased; values have macros expanded.
    pub fields: Vec<(String, String)>,
    /// Verbatim source text of the entry.
    pub raw: String,
    /// 1-based line where the entry starts.
    pub line: u32,
}

impl RawEntry {
    /// Returns the first value for `name` (case-insensitive).
    pub fn field(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.fields
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Block that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: u32,
    pub message: String,
}

/// Output of the lexical pass over one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawBibliography {
    pub entries: Vec<RawEntry>,
    pub errors: Vec<SyntaxError>,
}

enum AtBlock {
    Entry(RawEntry),
    String(String, String),
    Preamble,
    Comment,
}

/// Parses BibTeX source text into raw entries, collecting per-block errors.
pub fn parse_bibtex(input: &str) -> RawBibliography {
    let mut result = RawBibliography::default();
    let mut strings = month_macros();
    let mut offset = 0;
    let mut block_end = 0;
    let mut line = 1;
    let mut line_counted_to = 0;

    while let Some(start) = next_block_start(input, offset, block_end) {
        let block = &input[start..];
        line += input[line_counted_to..start].matches('\n').count() as u32;
        line_counted_to = start;

        match parse_at_block(block, &strings) {
            Ok((rest, parsed)) => {
                let consumed = block.len() - rest.len();
                match parsed {
                    AtBlock::Entry(mut entry) => {
                        entry.raw = block[..consumed].trim().to_string();
                        entry.line = line;
                        result.entries.push(entry);
                    }
                    AtBlock::String(key, value) => {
                        strings.insert(key.to_ascii_lowercase(), value);
                    }
                    AtBlock::Preamble | AtBlock::Comment => {}
                }
                offset = start + consumed;
                block_end = offset;
            }
            Err(_) => {
                result.errors.push(SyntaxError {
                    line,
                    message: format!("malformed block starting with `{}`", block_head(block)),
                });
                offset = start + 1;
            }
        }
    }

    result
}

/// Finds the next `@` at or after `from` that opens a block: only
/// whitespace lies between it and the line start or `block_end`.
fn next_block_start(input: &str, from: usize, block_end: usize) -> Option<usize> {
    let mut search_from = from;
    while let Some(relative) = input[search_from..].find('@') {
        let at = search_from + relative;
        let floor = block_end.min(at);
        let opens_block = input[floor..at]
            .chars()
            .rev()
            .find(|c| *c == '\n' || !c.is_whitespace())
            .map_or(true, |c| c == '\n');
        if opens_block {
            return Some(at);
        }
        search_from = at + 1;
    }
    None
}

fn block_head(block: &str) -> String {
    block
        .lines()
        .next()
        .unwrap_or_default()
        .chars()
        .take(40)
        .collect()
}

fn month_macros() -> HashMap<String, String> {
    [
        ("jan", "January"),
        ("feb", "February"),
        ("mar", "March"),
        ("apr", "April"),
        ("may", "May"),
        ("jun", "June"),
        ("jul", "July"),
        ("aug", "August"),
        ("sep", "September"),
        ("oct", "October"),
        ("nov", "November"),
        ("dec", "December"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect()
}

fn parse_at_block<'a>(
    input: &'a str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, AtBlock> {
    let (rest, _) = char('@')(input)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, block_type) = take_while1(|c: char| c.is_ascii_alphanumeric())(rest)?;

    match block_type.to_ascii_lowercase().as_str() {
        "string" => {
            let (rest, (key, value)) = parse_string_definition(rest, strings)?;
            Ok((rest, AtBlock::String(key, value)))
        }
        "preamble" => {
            let (rest, _) = parse_preamble(rest, strings)?;
            Ok((rest, AtBlock::Preamble))
        }
        "comment" => {
            let (rest, _) = parse_comment_body(rest)?;
            Ok((rest, AtBlock::Comment))
        }
        other => {
            let (rest, entry) = parse_entry_body(rest, other, strings)?;
            Ok((rest, AtBlock::Entry(entry)))
        }
    }
}

fn open_delimiter(input: &str) -> IResult<&str, char> {
    alt((char('{'), char('(')))(input)
}

fn close_for(open: char) -> char {
    if open == '(' {
        ')'
    } else {
        '}'
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_-:.+/".contains(c)
}

fn is_cite_key_char(c: char) -> bool {
    !c.is_whitespace() && !"{}()\",=#%".contains(c)
}

fn parse_string_definition<'a>(
    input: &'a str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, (String, String)> {
    let (rest, _) = multispace0(input)?;
    let (rest, open) = open_delimiter(rest)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, key) = take_while1(is_name_char)(rest)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, _) = char('=')(rest)?;
    let (rest, value) = parse_field_value(rest, strings)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, _) = char(close_for(open))(rest)?;

    Ok((rest, (key.to_string(), value)))
}

fn parse_preamble<'a>(
    input: &'a str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, String> {
    let (rest, _) = multispace0(input)?;
    let (rest, open) = open_delimiter(rest)?;
    let (rest, value) = parse_field_value(rest, strings)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, _) = char(close_for(open))(rest)?;

    Ok((rest, value))
}

fn parse_comment_body(input: &str) -> IResult<&str, ()> {
    let (rest, _) = multispace0(input)?;
    if rest.starts_with('{') {
        let (rest, _) = parse_braced_content(rest)?;
        return Ok((rest, ()));
    }
    let end = rest.find('\n').unwrap_or(rest.len());
    Ok((&rest[end..], ()))
}

fn parse_entry_body<'a>(
    input: &'a str,
    entry_type: &str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, RawEntry> {
    let (rest, _) = multispace0(input)?;
    let (rest, open) = open_delimiter(rest)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, cite_key) = take_while(is_cite_key_char)(rest)?;
    let (rest, _) = multispace0(rest)?;

    let close = close_for(open);
    let (rest, fields) = match rest.strip_prefix(',') {
        Some(after_comma) => parse_fields(after_comma, close, strings)?,
        None => (rest, Vec::new()),
    };

    let (rest, _) = multispace0(rest)?;
    let (rest, _) = char(close)(rest)?;

    Ok((
        rest,
        RawEntry {
            entry_type: entry_type.to_string(),
            cite_key: cite_key.to_string(),
            fields,
            raw: String::new(),
            line: 0,
        },
    ))
}

fn parse_fields<'a>(
    input: &'a str,
    close: char,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, Vec<(String, String)>> {
    let mut fields = Vec::new();
    let mut remaining = input;

    loop {
        let (rest, _) = multispace0(remaining)?;
        if rest.starts_with(close) {
            return Ok((rest, fields));
        }

        match parse_single_field(rest, strings) {
            Ok((rest, field)) => {
                fields.push(field);
                let (rest, _) = multispace0(rest)?;
                remaining = rest.strip_prefix(',').unwrap_or(rest);
            }
            Err(_) => return Ok((remaining, fields)),
        }
    }
}

fn parse_single_field<'a>(
    input: &'a str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, (String, String)> {
    let (rest, _) = multispace0(input)?;
    let (rest, key) = take_while1(is_name_char)(rest)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, _) = char('=')(rest)?;
    let (rest, value) = parse_field_value(rest, strings)?;

    Ok((rest, (key.to_ascii_lowercase(), value)))
}

fn parse_field_value<'a>(
    input: &'a str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, String> {
    let mut value = String::new();
    let mut remaining = input;

    loop {
        let (rest, _) = multispace0(remaining)?;
        let (rest, part) = alt((
            parse_braced_value,
            parse_quoted_value,
            map(take_while1(|c: char| c.is_ascii_digit()), str::to_string),
            map(take_while1(is_name_char), |name: &str| {
                strings
                    .get(&name.to_ascii_lowercase())
                    .cloned()
                    .unwrap_or_else(|| name.to_string())
            }),
        ))(rest)?;
        value.push_str(&part);

        let (rest, _) = multispace0(rest)?;
        match rest.strip_prefix('#') {
            Some(next) => remaining = next,
            None => return Ok((rest, value)),
        }
    }
}

fn parse_braced_value(input: &str) -> IResult<&str, String> {
    let (rest, content) = parse_braced_content(input)?;
    Ok((rest, content[1..content.len() - 1].to_string()))
}

/// Matches `{...}` including nested braces; returns the span with braces.
fn parse_braced_content(input: &str) -> IResult<&str, &str> {
    if !input.starts_with('{') {
        return Err(char_error(input));
    }

    let bytes = input.as_bytes();
    let mut depth = 0usize;
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&input[pos + 1..], &input[..pos + 1]));
                }
            }
            b'\\' => pos += 1,
            _ => {}
        }
        pos += 1;
    }

    Err(char_error(input))
}

fn parse_quoted_value(input: &str) -> IResult<&str, String> {
    if !input.starts_with('"') {
        return Err(char_error(input));
    }

    let mut depth = 0usize;
    let mut escaped = false;
    for (pos, c) in input.char_indices().skip(1) {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '"' if depth == 0 => return Ok((&input[pos + 1..], input[1..pos].to_string())),
            _ => {}
        }
    }

    Err(char_error(input))
}

fn char_error(input: &str) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Char))
}
