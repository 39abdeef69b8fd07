//! Article lookup for interactive note selection.
//!
//! # Responsibility
//! - Filter the collection by a case-insensitive title/author query.
//! - Optionally restrict results to articles that already have a note.
//! - Define the seam between match sources and interactive pickers.

pub mod picker;
pub mod query;
