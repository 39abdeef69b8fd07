//! Case-insensitive title/author search.
//!
//! # Invariants
//! - Results keep store order; `ranked` only lifts title-prefix matches.
//! - A blank query matches every article.
//! - Searching never writes to the store.

use crate::model::article::Article;
use crate::notes::NoteSession;
use crate::repo::article_repo::{ArticleRepository, RepoError};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type for search APIs.
pub type SearchResult<T> = Result<T, SearchError>;

/// Search-layer error.
#[derive(Debug)]
pub enum SearchError {
    Repo(RepoError),
    /// Interactive input could not be read or written.
    Prompt(std::io::Error),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Prompt(err) => write!(f, "prompt failed: {err}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Prompt(err) => Some(err),
        }
    }
}

impl From<RepoError> for SearchError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<std::io::Error> for SearchError {
    fn from(value: std::io::Error) -> Self {
        Self::Prompt(value)
    }
}

/// Query facade over an article repository and the note directory.
pub struct QueryService<'n, R: ArticleRepository> {
    repo: R,
    notes: &'n NoteSession,
}

impl<'n, R: ArticleRepository> QueryService<'n, R> {
    pub fn new(repo: R, notes: &'n NoteSession) -> Self {
        Self { repo, notes }
    }

    /// Articles whose title or any author contains `query`, ignoring case.
    ///
    /// With `existing_only`, articles without a note file are dropped.
    pub fn search(&self, query: &str, existing_only: bool) -> SearchResult<Vec<Article>> {
        let mut matches = self.repo.search(query)?;
        if existing_only {
            matches.retain(|article| self.notes.has_note(article));
        }
        debug!(
            "event=search module=search status=ok existing_only={} hits={}",
            existing_only,
            matches.len()
        );
        Ok(matches)
    }

    /// Looks up one article by identifier.
    pub fn article(&self, id: &str) -> SearchResult<Option<Article>> {
        Ok(self.repo.get(id)?)
    }

    /// Same result set as [`QueryService::search`] with title-prefix matches first.
    pub fn ranked(&self, query: &str, existing_only: bool) -> SearchResult<Vec<Article>> {
        let matches = self.search(query, existing_only)?;
        Ok(rank_title_prefix(matches, query))
    }
}

/// Stable partition: titles starting with `query` come first.
pub fn rank_title_prefix(articles: Vec<Article>, query: &str) -> Vec<Article> {
    let needle = query.to_lowercase();
    let (mut prefixed, rest): (Vec<Article>, Vec<Article>) = articles
        .into_iter()
        .partition(|article| article.title.to_lowercase().starts_with(&needle));
    prefixed.extend(rest);
    prefixed
}

#[cfg(test)]
mod tests {
    use super::rank_title_prefix;
    use crate::model::article::Article;

    #[test]
    fn prefix_matches_move_up_in_stable_order() {
        let articles = vec![
            Article::new("a", "Deep learning for graphs"),
            Article::new("b", "Graph theory"),
            Article::new("c", "Spectral graph methods"),
            Article::new("d", "graphs in practice"),
        ];

        let ids: Vec<String> = rank_title_prefix(articles, "Graph")
            .into_iter()
            .map(|article| article.id)
            .collect();
        assert_eq!(ids, ["b", "d", "a", "c"]);
    }
}
