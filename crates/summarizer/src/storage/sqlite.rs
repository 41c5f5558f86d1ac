//! SQLite-backed durable state: dedup ledger and user preferences
//!
//! Both durable scopes share one database file so that logout can clear
//! them together. The session scope is deliberately not persisted.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use rusqlite_migration::{M, Migrations};

use super::traits::{DedupLedger, PreferenceStore};
use crate::models::{MessageId, Preferences};

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(
        r#"
        -- Message IDs that have already been summarised
        CREATE TABLE seen_messages (
            id TEXT PRIMARY KEY,
            recorded_at TEXT NOT NULL
        );

        -- User preferences as a key-value table
        CREATE TABLE preferences (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )])
}

const PREF_MAX_EMAILS: &str = "max_emails";

/// Durable state store backed by SQLite
pub struct SqliteStateStore {
    conn: Mutex<Connection>,
}

impl SqliteStateStore {
    /// Open (or create) the state database at the given path
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;
        Self::prepare(conn)
    }

    /// Open an in-memory database (tests)
    pub fn in_memory() -> Result<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(mut conn: Connection) -> Result<Self> {
        // WAL keeps readers (popup queries) from blocking the writer
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Default database path (~/.config/briefbox/state.db)
    pub fn default_path() -> Result<std::path::PathBuf> {
        let dir = config::ensure_config_dir()?;
        Ok(dir.join("state.db"))
    }
}

impl DedupLedger for SqliteStateStore {
    fn filter_new(&self, ids: &[MessageId]) -> Result<Vec<MessageId>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT 1 FROM seen_messages WHERE id = ?1")?;

        let mut fresh = Vec::new();
        for id in ids {
            let known: Option<i64> = stmt
                .query_row(params![id.as_str()], |row| row.get(0))
                .optional()?;
            if known.is_none() {
                fresh.push(id.clone());
            }
        }
        Ok(fresh)
    }

    fn record(&self, ids: &[MessageId]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO seen_messages (id, recorded_at) VALUES (?1, ?2)",
            )?;
            let now = chrono::Utc::now().to_rfc3339();
            for id in ids {
                stmt.execute(params![id.as_str(), now])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM seen_messages", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn reset(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM seen_messages", [])?;
        Ok(())
    }
}

impl PreferenceStore for SqliteStateStore {
    fn preferences(&self) -> Result<Preferences> {
        let conn = self.conn.lock().unwrap();
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![PREF_MAX_EMAILS],
                |row| row.get(0),
            )
            .optional()?;

        match value {
            Some(raw) => {
                let max_emails = raw
                    .parse::<u32>()
                    .with_context(|| format!("Corrupt {PREF_MAX_EMAILS} preference: {raw:?}"))?;
                Ok(Preferences { max_emails })
            }
            None => Ok(Preferences::default()),
        }
    }

    fn set_preferences(&self, prefs: Preferences) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)",
            params![PREF_MAX_EMAILS, prefs.max_emails.to_string()],
        )?;
        Ok(())
    }
}
