//! Core library for lit-walk.
//! Owns the bibliography parser, the article store and the note sessions;
//! the CLI only wires these together.

pub mod bibtex;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notes;
pub mod repo;
pub mod search;
pub mod service;

pub use bibtex::{parse_file, parse_str, ParseError, ParseOptions, ParsedBibliography};
pub use config::{default_config_path, Config, ConfigError, LoadedConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::init_logging;
pub use model::article::{Article, ArticleId, ArticleValidationError};
pub use model::event::{EventKind, UsageEvent};
pub use notes::{CommandEditor, Editor, NoteError, NoteFile, NoteSession};
pub use repo::article_repo::{
    ArticleRepository, CollectionStats, RepoError, RepoResult, SqliteArticleRepository,
    UpsertOutcome,
};
pub use repo::event_repo::{EventRepository, SqliteEventRepository};
pub use search::picker::{pick_article, ArticlePicker, MatchSource, RankedMatches};
pub use search::query::{QueryService, SearchError, SearchResult};
pub use service::ingest_service::{IngestError, IngestService, IngestSummary};
pub use service::walk_service::{WalkError, WalkResult, WalkService};
