//! SQLite-backed ledger implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{ItemState, LedgerError, LedgerFilter, LibraryItem, MediaKind, StateLedger};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed state ledger.
pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    /// Open (or create) the ledger database at `path`.
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        let conn = Connection::open(path)?;
        // The ledger and the cache share one database file.
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory ledger (useful for testing).
    pub fn in_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), LedgerError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS library_items (
                external_id INTEGER NOT NULL,
                media_kind TEXT NOT NULL,
                show_id INTEGER NOT NULL DEFAULT 0,
                season INTEGER NOT NULL DEFAULT 0,
                episode INTEGER NOT NULL DEFAULT 0,
                state INTEGER NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (external_id, media_kind)
            );

            CREATE INDEX IF NOT EXISTS idx_library_items_state ON library_items(state);
            CREATE INDEX IF NOT EXISTS idx_library_items_show ON library_items(show_id);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, LedgerError> {
        self.conn
            .lock()
            .map_err(|_| LedgerError::Database("ledger connection lock poisoned".to_string()))
    }

    fn upsert(conn: &Connection, item: &LibraryItem) -> Result<(), LedgerError> {
        if item.external_id == 0 {
            return Err(LedgerError::InvalidRecord(format!(
                "{} record is missing its external id",
                item.media_kind
            )));
        }

        conn.execute(
            "INSERT INTO library_items
                (external_id, media_kind, show_id, season, episode, state, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(external_id, media_kind) DO UPDATE SET
                show_id = excluded.show_id,
                season = excluded.season,
                episode = excluded.episode,
                state = excluded.state,
                updated_at = excluded.updated_at",
            params![
                item.external_id,
                item.media_kind.as_str(),
                item.show_id,
                item.season,
                item.episode,
                item.state.as_i64(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn row_to_item(row: &Row<'_>) -> rusqlite::Result<LibraryItem> {
        let kind_str: String = row.get(1)?;
        let media_kind = kind_str.parse::<MediaKind>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let updated_at_str: String = row.get(6)?;
        let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(LibraryItem {
            external_id: row.get(0)?,
            media_kind,
            show_id: row.get(2)?,
            season: row.get(3)?,
            episode: row.get(4)?,
            state: ItemState::from_i64(row.get(5)?),
            updated_at,
        })
    }
}

impl StateLedger for SqliteLedger {
    fn save(&self, item: &LibraryItem) -> Result<(), LedgerError> {
        let conn = self.lock()?;
        Self::upsert(&conn, item)
    }

    fn save_batch(&self, items: &[LibraryItem]) -> Result<(), LedgerError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for item in items {
            // Dropping the transaction on error rolls back everything written so far.
            Self::upsert(&tx, item)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get(&self, id: u32, kind: MediaKind) -> Result<LibraryItem, LedgerError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT external_id, media_kind, show_id, season, episode, state, updated_at
             FROM library_items WHERE external_id = ?1 AND media_kind = ?2",
            params![id, kind.as_str()],
            Self::row_to_item,
        )
        .optional()?
        .ok_or(LedgerError::NotFound { id, kind })
    }

    fn find(&self, filter: &LedgerFilter) -> Result<Vec<LibraryItem>, LedgerError> {
        let conn = self.lock()?;

        let mut sql = String::from(
            "SELECT external_id, media_kind, show_id, season, episode, state, updated_at
             FROM library_items WHERE 1=1",
        );
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(kind) = filter.media_kind {
            sql.push_str(" AND media_kind = ?");
            args.push(Box::new(kind.as_str()));
        }
        if let Some(state) = filter.state {
            sql.push_str(" AND state = ?");
            args.push(Box::new(state.as_i64()));
        }
        if let Some(show_id) = filter.show_id {
            sql.push_str(" AND show_id = ?");
            args.push(Box::new(show_id));
        }
        sql.push_str(" ORDER BY media_kind, external_id");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
            Self::row_to_item,
        )?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    fn delete(&self, id: u32, kind: MediaKind) -> Result<(), LedgerError> {
        let conn = self.lock()?;
        let affected = conn.execute(
            "DELETE FROM library_items WHERE external_id = ?1 AND media_kind = ?2",
            params![id, kind.as_str()],
        )?;
        if affected == 0 {
            return Err(LedgerError::NotFound { id, kind });
        }
        Ok(())
    }
}
