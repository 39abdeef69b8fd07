//! Article repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide upsert/get/count/sample/search APIs over `articles` storage.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Article::validate()` before SQL mutations.
//! - Upsert keeps the row (and its position in store order) of an existing id.
//! - Store order is insertion order (`rowid`).

use crate::db::DbError;
use crate::model::article::{Article, ArticleId, ArticleValidationError};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ARTICLE_SELECT_SQL: &str = "SELECT
    id,
    entry_type,
    title,
    authors,
    abstract,
    year,
    doi,
    url,
    journal,
    keywords,
    raw_entry
FROM articles";

pub type RepoResult<T> = Result<T, RepoError>;

/// Store error for article and event persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(ArticleValidationError),
    Db(DbError),
    NotFound(ArticleId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "article not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted article data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<ArticleValidationError> for RepoError {
    fn from(value: ArticleValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// What an upsert did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// Metadata completeness counters shown by `info`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionStats {
    pub articles: u64,
    pub missing_doi: u64,
    pub missing_abstract: u64,
    pub missing_keywords: u64,
}

/// Repository interface for the article collection.
pub trait ArticleRepository {
    fn upsert(&self, article: &Article) -> RepoResult<UpsertOutcome>;
    fn get(&self, id: &str) -> RepoResult<Option<Article>>;
    fn count(&self) -> RepoResult<u64>;
    /// Uniformly samples one article; `None` for an empty store.
    fn sample_random(&self) -> RepoResult<Option<Article>>;
    /// Articles whose title or an author contains `query`, case-insensitively.
    fn search(&self, query: &str) -> RepoResult<Vec<Article>>;
    fn list(&self) -> RepoResult<Vec<Article>>;
    fn stats(&self) -> RepoResult<CollectionStats>;
}

/// SQLite-backed article repository.
pub struct SqliteArticleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteArticleRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn insert(&self, article: &Article) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO articles (
                id,
                entry_type,
                title,
                authors,
                abstract,
                year,
                doi,
                url,
                journal,
                keywords,
                raw_entry
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                article.id.as_str(),
                article.entry_type.as_str(),
                article.title.as_str(),
                encode_list(&article.authors)?,
                article.abstract_text.as_deref(),
                article.year,
                article.doi.as_deref(),
                article.url.as_deref(),
                article.journal.as_deref(),
                encode_list(&article.keywords)?,
                article.raw_entry.as_deref(),
            ],
        )?;
        Ok(())
    }

    fn update(&self, article: &Article) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE articles
             SET
                entry_type = ?1,
                title = ?2,
                authors = ?3,
                abstract = ?4,
                year = ?5,
                doi = ?6,
                url = ?7,
                journal = ?8,
                keywords = ?9,
                raw_entry = ?10,
                updated_at = CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER)
             WHERE id = ?11;",
            params![
                article.entry_type.as_str(),
                article.title.as_str(),
                encode_list(&article.authors)?,
                article.abstract_text.as_deref(),
                article.year,
                article.doi.as_deref(),
                article.url.as_deref(),
                article.journal.as_deref(),
                encode_list(&article.keywords)?,
                article.raw_entry.as_deref(),
                article.id.as_str(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(article.id.clone()));
        }
        Ok(())
    }

    fn query_all(&self) -> RepoResult<Vec<Article>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ARTICLE_SELECT_SQL} ORDER BY rowid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut articles = Vec::new();
        while let Some(row) = rows.next()? {
            articles.push(parse_article_row(row)?);
        }
        Ok(articles)
    }
}

impl ArticleRepository for SqliteArticleRepository<'_> {
    fn upsert(&self, article: &Article) -> RepoResult<UpsertOutcome> {
        article.validate()?;

        match self.get(&article.id)? {
            None => {
                self.insert(article)?;
                Ok(UpsertOutcome::Inserted)
            }
            Some(existing) if existing == *article => Ok(UpsertOutcome::Unchanged),
            Some(_) => {
                self.update(article)?;
                Ok(UpsertOutcome::Updated)
            }
        }
    }

    fn get(&self, id: &str) -> RepoResult<Option<Article>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ARTICLE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_article_row(row)?));
        }
        Ok(None)
    }

    fn count(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM articles;", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn sample_random(&self) -> RepoResult<Option<Article>> {
        let id: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM articles ORDER BY RANDOM() LIMIT 1;",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match id {
            Some(id) => self.get(&id),
            None => Ok(None),
        }
    }

    fn search(&self, query: &str) -> RepoResult<Vec<Article>> {
        let needle = query.to_lowercase();
        let mut matches = self.query_all()?;
        matches.retain(|article| article.matches_title_or_author(&needle));
        Ok(matches)
    }

    fn list(&self) -> RepoResult<Vec<Article>> {
        self.query_all()
    }

    fn stats(&self) -> RepoResult<CollectionStats> {
        let stats = self.conn.query_row(
            "SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN doi IS NULL THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN abstract IS NULL THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN keywords = '[]' THEN 1 ELSE 0 END), 0)
             FROM articles;",
            [],
            |row| {
                Ok(CollectionStats {
                    articles: row.get::<_, i64>(0)?.max(0) as u64,
                    missing_doi: row.get::<_, i64>(1)?.max(0) as u64,
                    missing_abstract: row.get::<_, i64>(2)?.max(0) as u64,
                    missing_keywords: row.get::<_, i64>(3)?.max(0) as u64,
                })
            },
        )?;
        Ok(stats)
    }
}

fn parse_article_row(row: &Row<'_>) -> RepoResult<Article> {
    let id: String = row.get("id")?;
    let authors_json: String = row.get("authors")?;
    let keywords_json: String = row.get("keywords")?;

    let article = Article {
        authors: decode_list(&authors_json, &id, "authors")?,
        keywords: decode_list(&keywords_json, &id, "keywords")?,
        entry_type: row.get("entry_type")?,
        title: row.get("title")?,
        abstract_text: row.get("abstract")?,
        year: row.get("year")?,
        doi: row.get("doi")?,
        url: row.get("url")?,
        journal: row.get("journal")?,
        raw_entry: row.get("raw_entry")?,
        id,
    };
    article.validate()?;
    Ok(article)
}

fn encode_list(values: &[String]) -> RepoResult<String> {
    serde_json::to_string(values)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode list: {err}")))
}

fn decode_list(json: &str, id: &str, column: &str) -> RepoResult<Vec<String>> {
    serde_json::from_str(json).map_err(|err| {
        RepoError::InvalidData(format!("articles.{column} of `{id}` is not a JSON list: {err}"))
    })
}
