//! Seam between match sources and interactive pickers.
//!
//! A picker drives one selection dialogue. It asks a [`MatchSource`] for
//! candidates as the user refines the query and returns the chosen id.

use crate::model::article::{Article, ArticleId};
use crate::repo::article_repo::ArticleRepository;
use crate::search::query::{QueryService, SearchResult};

/// Ranked candidates for a query string.
pub trait MatchSource {
    fn matches(&self, query: &str) -> SearchResult<Vec<Article>>;
}

/// Interactive selection UI.
pub trait ArticlePicker {
    /// Returns `Ok(None)` when the user cancels.
    fn pick(&mut self, source: &dyn MatchSource) -> SearchResult<Option<ArticleId>>;
}

/// [`QueryService::ranked`] bound to one `existing_only` setting.
pub struct RankedMatches<'q, 'n, R: ArticleRepository> {
    service: &'q QueryService<'n, R>,
    existing_only: bool,
}

impl<'q, 'n, R: ArticleRepository> RankedMatches<'q, 'n, R> {
    pub fn new(service: &'q QueryService<'n, R>, existing_only: bool) -> Self {
        Self {
            service,
            existing_only,
        }
    }
}

impl<R: ArticleRepository> MatchSource for RankedMatches<'_, '_, R> {
    fn matches(&self, query: &str) -> SearchResult<Vec<Article>> {
        self.service.ranked(query, self.existing_only)
    }
}

/// Runs `picker` over ranked matches and resolves the chosen article.
pub fn pick_article<R: ArticleRepository>(
    service: &QueryService<'_, R>,
    picker: &mut dyn ArticlePicker,
    existing_only: bool,
) -> SearchResult<Option<Article>> {
    let source = RankedMatches::new(service, existing_only);
    match picker.pick(&source)? {
        Some(id) => service.article(&id),
        None => Ok(None),
    }
}
