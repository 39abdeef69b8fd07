//! Bibliography ingestion use-case.
//!
//! # Responsibility
//! - Parse a bibliography file and upsert its articles keyed by identifier.
//! - Report how many records were added, updated, unchanged or skipped.
//!
//! # Invariants
//! - One ingestion run is one SQLite transaction: all records commit or none.
//! - Re-ingesting an unchanged file leaves the store untouched.
//! - Within one file, the last entry for a duplicated identifier wins.

use crate::bibtex::{self, ParseError, ParseOptions};
use crate::model::article::Article;
use crate::repo::article_repo::{
    ArticleRepository, RepoError, SqliteArticleRepository, UpsertOutcome,
};
use log::{error, info, warn};
use rusqlite::{Connection, TransactionBehavior};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Instant;

/// Ingestion failure.
#[derive(Debug)]
pub enum IngestError {
    Parse(ParseError),
    Store(RepoError),
}

impl Display for IngestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "store write failed, nothing was imported: {err}"),
        }
    }
}

impl Error for IngestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<ParseError> for IngestError {
    fn from(value: ParseError) -> Self {
        Self::Parse(value)
    }
}

impl From<RepoError> for IngestError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

impl From<rusqlite::Error> for IngestError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(RepoError::from(value))
    }
}

/// Counters printed after an `add` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Entries the parser could not turn into articles.
    pub skipped: usize,
    /// Earlier entries superseded by a later one with the same identifier.
    pub duplicates: usize,
}

impl IngestSummary {
    /// Number of articles written or confirmed by this run.
    pub fn total(&self) -> usize {
        self.added + self.updated + self.unchanged
    }
}

/// Ingestion service over one store connection.
pub struct IngestService<'conn> {
    conn: &'conn mut Connection,
    options: ParseOptions,
}

impl<'conn> IngestService<'conn> {
    pub fn new(conn: &'conn mut Connection, options: ParseOptions) -> Self {
        Self { conn, options }
    }

    /// Parses `path` and upserts every article in one transaction.
    ///
    /// # Errors
    /// - `IngestError::Parse` when the file is unreadable or has no usable entry.
    /// - `IngestError::Store` when any write fails; the batch is rolled back.
    pub fn add(&mut self, path: impl AsRef<Path>) -> Result<IngestSummary, IngestError> {
        let path = path.as_ref();
        info!(
            "event=ingest module=service status=start path={}",
            path.display()
        );

        let parsed = bibtex::parse_file(path, &self.options)?;
        let mut summary = self.ingest_articles(parsed.articles)?;
        summary.skipped = parsed.skipped.len();

        info!(
            "event=ingest module=service status=ok path={} added={} updated={} unchanged={} skipped={}",
            path.display(),
            summary.added,
            summary.updated,
            summary.unchanged,
            summary.skipped
        );
        Ok(summary)
    }

    /// Upserts already-parsed articles in one transaction.
    pub fn ingest_articles(&mut self, articles: Vec<Article>) -> Result<IngestSummary, IngestError> {
        let started_at = Instant::now();
        let (articles, duplicates) = dedupe_last_wins(articles);
        let mut summary = IngestSummary {
            duplicates,
            ..IngestSummary::default()
        };

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let repo = SqliteArticleRepository::new(&tx);
            for article in &articles {
                let outcome = repo.upsert(article).map_err(|err| {
                    error!(
                        "event=ingest_batch module=service status=error id={} duration_ms={} error={}",
                        article.id,
                        started_at.elapsed().as_millis(),
                        err
                    );
                    err
                })?;
                match outcome {
                    UpsertOutcome::Inserted => summary.added += 1,
                    UpsertOutcome::Updated => summary.updated += 1,
                    UpsertOutcome::Unchanged => summary.unchanged += 1,
                }
            }
        }
        tx.commit()?;

        info!(
            "event=ingest_batch module=service status=ok records={} duration_ms={}",
            articles.len(),
            started_at.elapsed().as_millis()
        );
        Ok(summary)
    }
}

/// Keeps the last article per identifier, in order of first appearance.
fn dedupe_last_wins(articles: Vec<Article>) -> (Vec<Article>, usize) {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<Article> = Vec::with_capacity(articles.len());
    let mut duplicates = 0;

    for article in articles {
        match positions.get(&article.id) {
            Some(&index) => {
                warn!(
                    "event=ingest_duplicate module=service id={} status=superseded",
                    article.id
                );
                duplicates += 1;
                unique[index] = article;
            }
            None => {
                positions.insert(article.id.clone(), unique.len());
                unique.push(article);
            }
        }
    }

    (unique, duplicates)
}

#[cfg(test)]
mod tests {
    use super::dedupe_last_wins;
    use crate::model::article::Article;

    #[test]
    fn dedupe_keeps_last_version_at_first_position() {
        let articles = vec![
            Article::new("a", "First A"),
            Article::new("b", "Only B"),
            Article::new("a", "Second A"),
        ];

        let (unique, duplicates) = dedupe_last_wins(articles);
        assert_eq!(duplicates, 1);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].title, "Second A");
        assert_eq!(unique[1].id, "b");
    }
}
