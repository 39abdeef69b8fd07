//! Article domain model.
//!
//! # Responsibility
//! - Define the canonical bibliographic record stored in the collection.
//! - Provide validation and case-insensitive matching helpers.
//!
//! # Invariants
//! - `id` is unique within the store and never blank.
//! - `title` is never blank.
//! - `authors` keeps the order of the source entry.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable identifier for an article (cite key, or `doi:<DOI>` fallback).
pub type ArticleId = String;

/// Canonical bibliographic record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub id: ArticleId,
    /// Lowercase BibTeX entry type such as `article` or `inproceedings`.
    pub entry_type: String,
    pub title: String,
    pub authors: Vec<String>,
    pub abstract_text: Option<String>,
    pub year: Option<i32>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub journal: Option<String>,
    /// Normalized lowercase keywords.
    pub keywords: Vec<String>,
    /// Verbatim source entry, kept for fields that are not modeled.
    pub raw_entry: Option<String>,
}

/// Validation failures for article records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleValidationError {
    BlankId,
    BlankTitle { id: ArticleId },
}

impl Display for ArticleValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankId => write!(f, "article identifier cannot be blank"),
            Self::BlankTitle { id } => write!(f, "article `{id}` has a blank title"),
        }
    }
}

impl Error for ArticleValidationError {}

impl Article {
    /// Creates an article with only the required fields set.
    pub fn new(id: impl Into<ArticleId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entry_type: "article".to_string(),
            title: title.into(),
            authors: Vec::new(),
            abstract_text: None,
            year: None,
            doi: None,
            url: None,
            journal: None,
            keywords: Vec::new(),
            raw_entry: None,
        }
    }

    /// Validates required fields before persistence.
    pub fn validate(&self) -> Result<(), ArticleValidationError> {
        if self.id.trim().is_empty() {
            return Err(ArticleValidationError::BlankId);
        }
        if self.title.trim().is_empty() {
            return Err(ArticleValidationError::BlankTitle {
                id: self.id.clone(),
            });
        }
        Ok(())
    }

    /// Authors joined for display, e.g. `Smith, J. and Doe, A.`.
    pub fn author_line(&self) -> String {
        self.authors.join(" and ")
    }

    /// Returns whether title or any author contains `needle`.
    ///
    /// `needle` must already be lowercased.
    pub fn matches_title_or_author(&self, needle: &str) -> bool {
        contains_folded(&self.title, needle)
            || self
                .authors
                .iter()
                .any(|author| contains_folded(author, needle))
    }

    /// Returns whether title, authors, abstract or keywords contain `needle`.
    ///
    /// `needle` must already be lowercased.
    pub fn mentions(&self, needle: &str) -> bool {
        self.matches_title_or_author(needle)
            || self
                .abstract_text
                .as_deref()
                .is_some_and(|text| contains_folded(text, needle))
            || self
                .keywords
                .iter()
                .any(|keyword| contains_folded(keyword, needle))
    }
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::{Article, ArticleValidationError};

    #[test]
    fn validate_rejects_blank_fields() {
        let article = Article::new("  ", "Title");
        assert_eq!(article.validate(), Err(ArticleValidationError::BlankId));

        let article = Article::new("key", "\t");
        assert!(matches!(
            article.validate(),
            Err(ArticleValidationError::BlankTitle { .. })
        ));
    }

    #[test]
    fn title_or_author_match_is_case_insensitive() {
        let mut article = Article::new("key", "Gene Regulatory Networks");
        article.authors = vec!["Ødegård, Ingrid".to_string()];

        assert!(article.matches_title_or_author("regulatory"));
        assert!(article.matches_title_or_author("ødegård"));
        assert!(!article.matches_title_or_author("protein"));
    }

    #[test]
    fn mentions_includes_abstract_and_keywords() {
        let mut article = Article::new("key", "Untitled");
        article.abstract_text = Some("We study Single-Cell data.".to_string());
        article.keywords = vec!["transcriptomics".to_string()];

        assert!(article.mentions("single-cell"));
        assert!(article.mentions("transcript"));
        assert!(!article.matches_title_or_author("single-cell"));
    }
}
