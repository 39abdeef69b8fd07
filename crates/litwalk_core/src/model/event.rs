//! Usage event model.
//!
//! # Invariants
//! - Events are append-only; nothing in core mutates or deletes them.

use super::article::ArticleId;

/// Kind of usage event recorded against an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Article was surfaced by `walk`.
    Walked,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Walked => "walked",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "walked" => Some(Self::Walked),
            _ => None,
        }
    }
}

/// Durable log entry for one surfaced article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageEvent {
    pub id: i64,
    pub article_id: ArticleId,
    pub kind: EventKind,
    /// Unix epoch milliseconds assigned by the store.
    pub occurred_at: i64,
}
