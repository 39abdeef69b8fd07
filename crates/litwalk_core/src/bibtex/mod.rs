//! BibTeX ingestion front-end.
//!
//! # Responsibility
//! - Read a bibliography export and convert its entries into `Article`s.
//! - Report malformed entries per entry instead of failing the whole file.
//!
//! # Invariants
//! - Every returned article passes `Article::validate()`.
//! - An entry without a cite key falls back to `doi:<DOI>` as identifier.
//! - Entries without a usable identifier or title are skipped with a warning.

pub mod parser;
pub mod text;

use crate::model::article::Article;
use log::{info, warn};
use parser::{parse_bibtex, RawEntry};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// File-level parse failure.
#[derive(Debug)]
pub enum ParseError {
    /// The bibliography file cannot be read.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The file was read but yielded no usable entry.
    NoEntries { path: PathBuf, skipped: usize },
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read bibliography `{}`: {source}", path.display())
            }
            Self::NoEntries { path, skipped } => write!(
                f,
                "no usable entries found in `{}` ({skipped} skipped)",
                path.display()
            ),
        }
    }
}

impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::NoEntries { .. } => None,
        }
    }
}

/// Conversion options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Decode LaTeX, strip grouping braces and collapse whitespace.
    pub normalize_text: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            normalize_text: true,
        }
    }
}

/// Why an entry did not become an article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Syntax(String),
    MissingIdentifier,
    MissingTitle,
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax(message) => write!(f, "syntax error: {message}"),
            Self::MissingIdentifier => write!(f, "missing cite key and DOI"),
            Self::MissingTitle => write!(f, "missing title"),
        }
    }
}

/// Entry that was dropped during conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub line: u32,
    pub key: Option<String>,
    pub reason: SkipReason,
}

/// Articles converted from one bibliography, plus what was skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedBibliography {
    pub articles: Vec<Article>,
    pub skipped: Vec<SkippedEntry>,
}

/// Reads and converts a bibliography file.
///
/// # Errors
/// - `ParseError::Io` when the file cannot be read.
/// - `ParseError::NoEntries` when no entry converts into an article.
pub fn parse_file(
    path: impl AsRef<Path>,
    options: &ParseOptions,
) -> Result<ParsedBibliography, ParseError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let input = String::from_utf8_lossy(&bytes);

    let parsed = parse_str(&input, options);
    info!(
        "event=bibtex_parse module=bibtex status=ok path={} articles={} skipped={}",
        path.display(),
        parsed.articles.len(),
        parsed.skipped.len()
    );

    if parsed.articles.is_empty() {
        return Err(ParseError::NoEntries {
            path: path.to_path_buf(),
            skipped: parsed.skipped.len(),
        });
    }

    Ok(parsed)
}

/// Converts BibTeX source text into articles.
pub fn parse_str(input: &str, options: &ParseOptions) -> ParsedBibliography {
    let raw = parse_bibtex(input);
    let mut result = ParsedBibliography::default();

    for error in raw.errors {
        result.skipped.push(SkippedEntry {
            line: error.line,
            key: None,
            reason: SkipReason::Syntax(error.message),
        });
    }

    for entry in &raw.entries {
        match entry_to_article(entry, options) {
            Ok(article) => result.articles.push(article),
            Err(reason) => result.skipped.push(SkippedEntry {
                line: entry.line,
                key: Some(entry.cite_key.clone()).filter(|key| !key.is_empty()),
                reason,
            }),
        }
    }

    result.skipped.sort_by_key(|skipped| skipped.line);
    for skipped in &result.skipped {
        warn!(
            "event=bibtex_entry_skipped module=bibtex line={} key={} reason={}",
            skipped.line,
            skipped.key.as_deref().unwrap_or("-"),
            skipped.reason
        );
    }

    result
}

fn entry_to_article(entry: &RawEntry, options: &ParseOptions) -> Result<Article, SkipReason> {
    let clean = |value: &str| -> Option<String> {
        let flattened = text::flatten_lines(value);
        if options.normalize_text {
            text::non_blank(&text::normalize_text(&flattened))
        } else {
            text::non_blank(&flattened)
        }
    };

    let doi = entry.field("doi").and_then(text::non_blank);
    let id = match text::non_blank(&entry.cite_key) {
        Some(key) => key,
        None => match &doi {
            Some(doi) => format!("doi:{doi}"),
            None => return Err(SkipReason::MissingIdentifier),
        },
    };

    let title = entry
        .field("title")
        .and_then(clean)
        .ok_or(SkipReason::MissingTitle)?;

    let authors = entry
        .field("author")
        .map(|value| {
            text::split_authors(&text::flatten_lines(value))
                .iter()
                .filter_map(|author| clean(author.as_str()))
                .collect()
        })
        .unwrap_or_default();

    let keywords = entry
        .field("keywords")
        .map(|value| text::normalize_keywords(&text::flatten_lines(value)))
        .unwrap_or_default();

    let article = Article {
        id,
        entry_type: entry.entry_type.clone(),
        title,
        authors,
        abstract_text: entry.field("abstract").and_then(clean),
        year: entry.field("year").and_then(text::parse_year),
        doi,
        url: entry.field("url").and_then(text::non_blank),
        journal: entry
            .field("journal")
            .or_else(|| entry.field("booktitle"))
            .and_then(clean),
        keywords,
        raw_entry: Some(entry.raw.clone()),
    };

    match article.validate() {
        Ok(()) => Ok(article),
        Err(_) => Err(SkipReason::MissingTitle),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_str, ParseOptions, SkipReason};

    #[test]
    fn converts_entries_into_articles() {
        let input = r#"
@article{smith2020,
  title = {Cell {Atlas} of the
           Mouse},
  author = {Smith, Jane and Doe, John},
  year = {2020},
  doi = {10.1000/atlas},
  keywords = {Single Cell; Atlas},
}
"#;
        let parsed = parse_str(input, &ParseOptions::default());
        assert!(parsed.skipped.is_empty());
        let article = &parsed.articles[0];
        assert_eq!(article.id, "smith2020");
        assert_eq!(article.title, "Cell Atlas of the Mouse");
        assert_eq!(article.authors, vec!["Smith, Jane", "Doe, John"]);
        assert_eq!(article.year, Some(2020));
        assert_eq!(article.doi.as_deref(), Some("10.1000/atlas"));
        assert_eq!(article.keywords, vec!["single cell", "atlas"]);
    }

    #[test]
    fn raw_mode_only_flattens_lines() {
        let input = "@article{k,\n title = {A {DNA}\n study},\n}";
        let options = ParseOptions {
            normalize_text: false,
        };
        let parsed = parse_str(input, &options);
        assert_eq!(parsed.articles[0].title, "A {DNA}  study");
    }

    #[test]
    fn falls_back_to_doi_and_skips_incomplete_entries() {
        let input = r#"
@article{,
  title = {Keyless},
  doi = {10.1/abc},
}
@article{notitle,
  year = 2001,
}
@article{,
  title = {Nothing to identify me},
}
"#;
        let parsed = parse_str(input, &ParseOptions::default());
        assert_eq!(parsed.articles.len(), 1);
        assert_eq!(parsed.articles[0].id, "doi:10.1/abc");

        let reasons: Vec<_> = parsed.skipped.iter().map(|s| s.reason.clone()).collect();
        assert_eq!(
            reasons,
            vec![SkipReason::MissingTitle, SkipReason::MissingIdentifier]
        );
        assert_eq!(parsed.skipped[0].key.as_deref(), Some("notitle"));
        assert_eq!(parsed.skipped[1].key, None);
    }
}
