//! Domain model for the article collection.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//!
//! # Invariants
//! - Every article is identified by a stable `ArticleId`.
//! - Usage events are append-only.

pub mod article;
pub mod event;
