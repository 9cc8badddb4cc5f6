//! Session Store for Darkelf Shell.
//!
//! Persists browsing sessions and their tabs in SQLite. A session is always
//! written and removed as a unit: every mutation runs inside one explicit
//! transaction on the [`Database`].

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::database::connection::Database;
use crate::types::errors::SessionError;
use crate::types::session::{BrowsingSession, SessionMetadata, SessionSummary, TabSession};

/// Trait defining session persistence operations.
pub trait SessionStoreTrait {
    fn save(&self, session: &BrowsingSession) -> Result<(), SessionError>;
    fn load(&self, id: &str) -> Result<Option<BrowsingSession>, SessionError>;
    fn list(&self) -> Result<Vec<SessionSummary>, SessionError>;
    fn delete(&self, id: &str) -> Result<bool, SessionError>;
    fn cleanup_older_than(&self, days: u32) -> Result<usize, SessionError>;
}

/// Session store backed by the `sessions` and `tabs` tables.
pub struct SessionStore {
    db: Database,
}

impl SessionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Number of stored sessions.
    pub fn count(&self) -> Result<usize, SessionError> {
        let count: i64 = self
            .db
            .connection()
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

/// Fixed-width so that lexical order in SQLite matches chronological order.
fn encode_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_time(raw: &str) -> Result<DateTime<Utc>, SessionError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SessionError::SerializationError(format!("bad timestamp '{}': {}", raw, e)))
}

fn delete_session_rows(conn: &Connection, id: &str) -> Result<usize, SessionError> {
    conn.execute("DELETE FROM tabs WHERE session_id = ?1", params![id])?;
    let removed = conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
    Ok(removed)
}

fn insert_tab(conn: &Connection, session_id: &str, tab: &TabSession) -> Result<(), SessionError> {
    let history = serde_json::to_string(&tab.history)
        .map_err(|e| SessionError::SerializationError(e.to_string()))?;
    conn.execute(
        "INSERT INTO tabs (id, session_id, url, title, persona_id, created_at, last_accessed, history, scroll_position, zoom_factor)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            tab.id,
            session_id,
            tab.url,
            tab.title,
            tab.persona_id,
            encode_time(&tab.created_at),
            encode_time(&tab.last_accessed),
            history,
            tab.scroll_position,
            tab.zoom_factor,
        ],
    )?;
    Ok(())
}

/// Raw `tabs` row before the text columns are decoded.
struct TabRow {
    id: String,
    url: String,
    title: String,
    persona_id: String,
    created_at: String,
    last_accessed: String,
    history: String,
    scroll_position: i64,
    zoom_factor: f64,
}

impl TabRow {
    fn decode(self) -> Result<TabSession, SessionError> {
        let history: Vec<String> = serde_json::from_str(&self.history).map_err(|e| {
            SessionError::SerializationError(format!("bad history for tab {}: {}", self.id, e))
        })?;
        Ok(TabSession {
            created_at: decode_time(&self.created_at)?,
            last_accessed: decode_time(&self.last_accessed)?,
            id: self.id,
            url: self.url,
            title: self.title,
            persona_id: self.persona_id,
            history,
            scroll_position: self.scroll_position,
            zoom_factor: self.zoom_factor,
        })
    }
}

impl SessionStoreTrait for SessionStore {
    /// Upserts the session row, then replaces all of its tab rows.
    ///
    /// Runs as one transaction: a failure anywhere leaves the previously
    /// stored graph untouched.
    fn save(&self, session: &BrowsingSession) -> Result<(), SessionError> {
        session.validate()?;

        let metadata = serde_json::to_string(&SessionMetadata {
            active_tab: session.active_tab.clone(),
        })
        .map_err(|e| SessionError::SerializationError(e.to_string()))?;

        self.db.transaction(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, name, persona_id, created_at, last_accessed, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                     name = excluded.name,
                     persona_id = excluded.persona_id,
                     created_at = excluded.created_at,
                     last_accessed = excluded.last_accessed,
                     metadata = excluded.metadata",
                params![
                    session.id,
                    session.name,
                    session.persona_id,
                    encode_time(&session.created_at),
                    encode_time(&session.last_accessed),
                    metadata,
                ],
            )?;

            conn.execute("DELETE FROM tabs WHERE session_id = ?1", params![session.id])?;
            for tab in &session.tabs {
                insert_tab(conn, &session.id, tab)?;
            }
            Ok::<(), SessionError>(())
        })?;

        tracing::info!(
            session_id = %session.id,
            session_name = %session.name,
            tab_count = session.tabs.len(),
            "Saved session"
        );
        Ok(())
    }

    /// Rebuilds a session and its tabs, tabs in creation order.
    fn load(&self, id: &str) -> Result<Option<BrowsingSession>, SessionError> {
        let conn = self.db.connection();

        let row = conn
            .query_row(
                "SELECT name, persona_id, created_at, last_accessed, metadata FROM sessions WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((name, persona_id, created_at, last_accessed, metadata)) = row else {
            return Ok(None);
        };

        let metadata: SessionMetadata = serde_json::from_str(&metadata).map_err(|e| {
            SessionError::SerializationError(format!("bad metadata for session {}: {}", id, e))
        })?;

        // rowid breaks ties between tabs created within the same instant.
        let mut stmt = conn.prepare(
            "SELECT id, url, title, persona_id, created_at, last_accessed, history, scroll_position, zoom_factor
             FROM tabs WHERE session_id = ?1
             ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(params![id], |row| {
            Ok(TabRow {
                id: row.get(0)?,
                url: row.get(1)?,
                title: row.get(2)?,
                persona_id: row.get(3)?,
                created_at: row.get(4)?,
                last_accessed: row.get(5)?,
                history: row.get(6)?,
                scroll_position: row.get(7)?,
                zoom_factor: row.get(8)?,
            })
        })?;

        let mut tabs = Vec::new();
        for row in rows {
            tabs.push(row?.decode()?);
        }

        Ok(Some(BrowsingSession {
            id: id.to_string(),
            name,
            persona_id,
            created_at: decode_time(&created_at)?,
            last_accessed: decode_time(&last_accessed)?,
            tabs,
            active_tab: metadata.active_tab,
        }))
    }

    /// Lists stored sessions, most recently accessed first.
    fn list(&self) -> Result<Vec<SessionSummary>, SessionError> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(
            "SELECT id, name, persona_id, created_at, last_accessed,
                    (SELECT COUNT(*) FROM tabs WHERE tabs.session_id = sessions.id) AS tab_count
             FROM sessions
             ORDER BY last_accessed DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (id, name, persona_id, created_at, last_accessed, tab_count) = row?;
            result.push(SessionSummary {
                id,
                name,
                persona_id,
                created_at: decode_time(&created_at)?,
                last_accessed: decode_time(&last_accessed)?,
                tab_count: tab_count as usize,
            });
        }
        Ok(result)
    }

    /// Removes a session's tabs, then the session row. Returns whether the
    /// session existed.
    fn delete(&self, id: &str) -> Result<bool, SessionError> {
        let removed = self.db.transaction(|conn| delete_session_rows(conn, id))?;
        if removed > 0 {
            tracing::info!(session_id = %id, "Deleted session");
        }
        Ok(removed > 0)
    }

    /// Deletes every session last accessed before `now - days`.
    ///
    /// A cutoff before the earliest representable instant matches nothing.
    fn cleanup_older_than(&self, days: u32) -> Result<usize, SessionError> {
        let cutoff = TimeDelta::try_days(i64::from(days))
            .and_then(|age| Utc::now().checked_sub_signed(age));
        let Some(cutoff) = cutoff else {
            tracing::debug!(days, "Cleanup cutoff out of range, nothing to remove");
            return Ok(0);
        };
        let cutoff = encode_time(&cutoff);

        let removed = self.db.transaction(|conn| {
            let ids: Vec<String> = {
                let mut stmt = conn.prepare("SELECT id FROM sessions WHERE last_accessed < ?1")?;
                let rows = stmt.query_map(params![cutoff], |row| row.get::<_, String>(0))?;
                rows.collect::<Result<Vec<_>, _>>()?
            };
            for id in &ids {
                delete_session_rows(conn, id)?;
            }
            Ok::<usize, SessionError>(ids.len())
        })?;

        tracing::info!(days, removed, "Cleaned up old sessions");
        Ok(removed)
    }
}
