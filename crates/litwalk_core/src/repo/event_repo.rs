//! Usage event repository.
//!
//! # Invariants
//! - Events are only ever inserted; there is no update or delete path.
//! - An event always references an existing article.

use super::article_repo::{RepoError, RepoResult};
use crate::model::event::{EventKind, UsageEvent};
use rusqlite::{params, Connection, Row};

/// Repository interface for the append-only usage log.
pub trait EventRepository {
    /// Appends one event and returns its row id.
    fn record_event(&self, article_id: &str, kind: EventKind) -> RepoResult<i64>;
    fn count_events(&self, kind: Option<EventKind>) -> RepoResult<u64>;
    /// Events for one article, oldest first.
    fn events_for(&self, article_id: &str) -> RepoResult<Vec<UsageEvent>>;
}

/// SQLite-backed event repository.
pub struct SqliteEventRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEventRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl EventRepository for SqliteEventRepository<'_> {
    fn record_event(&self, article_id: &str, kind: EventKind) -> RepoResult<i64> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM articles WHERE id = ?1);",
            [article_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(RepoError::NotFound(article_id.to_string()));
        }

        self.conn.execute(
            "INSERT INTO usage_events (article_id, kind) VALUES (?1, ?2);",
            params![article_id, kind.as_str()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn count_events(&self, kind: Option<EventKind>) -> RepoResult<u64> {
        let count: i64 = match kind {
            Some(kind) => self.conn.query_row(
                "SELECT COUNT(*) FROM usage_events WHERE kind = ?1;",
                [kind.as_str()],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM usage_events;", [], |row| row.get(0))?,
        };
        Ok(count.max(0) as u64)
    }

    fn events_for(&self, article_id: &str) -> RepoResult<Vec<UsageEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, article_id, kind, occurred_at
             FROM usage_events
             WHERE article_id = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([article_id])?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(parse_event_row(row)?);
        }
        Ok(events)
    }
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<UsageEvent> {
    let kind_text: String = row.get("kind")?;
    let kind = EventKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid event kind `{kind_text}` in usage_events.kind"))
    })?;

    Ok(UsageEvent {
        id: row.get("id")?,
        article_id: row.get("article_id")?,
        kind,
        occurred_at: row.get("occurred_at")?,
    })
}
