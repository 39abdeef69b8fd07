//! Random article selection ("walk").
//!
//! # Responsibility
//! - Pick one article uniformly at random and log a `walked` event.
//!
//! # Invariants
//! - Exactly one event is appended per successful walk.
//! - Failed walks (empty store, no match) append nothing.
//! - Selection is unweighted.

use crate::model::article::Article;
use crate::model::event::EventKind;
use crate::repo::article_repo::{ArticleRepository, RepoError};
use crate::repo::event_repo::EventRepository;
use log::info;
use rand::seq::SliceRandom;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Selection failure.
#[derive(Debug)]
pub enum WalkError {
    /// The store holds no article at all.
    EmptyCollection,
    /// No article matches the walk filter.
    NoMatches { query: String },
    Repo(RepoError),
}

impl Display for WalkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCollection => {
                write!(f, "no articles found; add a bibliography with `add <file.bib>` first")
            }
            Self::NoMatches { query } => write!(f, "no articles match `{query}`"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for WalkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for WalkError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Selected article plus the size of the pool it was drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkResult {
    pub article: Article,
    pub num_included: u64,
    pub num_total: u64,
}

/// Selector facade over article and event repositories.
pub struct WalkService<A: ArticleRepository, E: EventRepository> {
    articles: A,
    events: E,
}

impl<A: ArticleRepository, E: EventRepository> WalkService<A, E> {
    pub fn new(articles: A, events: E) -> Self {
        Self { articles, events }
    }

    /// Picks any stored article.
    pub fn walk(&self) -> Result<WalkResult, WalkError> {
        let num_total = self.articles.count()?;
        let article = self
            .articles
            .sample_random()?
            .ok_or(WalkError::EmptyCollection)?;

        self.record(article, num_total, num_total)
    }

    /// Picks among articles whose title, authors, abstract or keywords
    /// contain `query`. A blank query behaves like [`WalkService::walk`].
    pub fn walk_filtered(&self, query: &str) -> Result<WalkResult, WalkError> {
        if query.trim().is_empty() {
            return self.walk();
        }

        let all = self.articles.list()?;
        if all.is_empty() {
            return Err(WalkError::EmptyCollection);
        }

        let needle = query.trim().to_lowercase();
        let pool: Vec<&Article> = all.iter().filter(|a| a.mentions(&needle)).collect();
        let article = pool
            .choose(&mut rand::thread_rng())
            .map(|article| (*article).clone())
            .ok_or_else(|| WalkError::NoMatches {
                query: query.to_string(),
            })?;

        self.record(article, pool.len() as u64, all.len() as u64)
    }

    fn record(
        &self,
        article: Article,
        num_included: u64,
        num_total: u64,
    ) -> Result<WalkResult, WalkError> {
        self.events.record_event(&article.id, EventKind::Walked)?;
        info!(
            "event=walk module=service status=ok id={} included={} total={}",
            article.id, num_included, num_total
        );
        Ok(WalkResult {
            article,
            num_included,
            num_total,
        })
    }
}
