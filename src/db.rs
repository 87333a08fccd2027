//! Warehouse connection ownership.
//!
//! [`Database`] holds the single SQLite connection for a run, creates the
//! star schema from the bundled script and reports per-table row counts.

use std::fs;
use std::path::Path;

use rusqlite::{params, Connection};
use tracing::info;

use crate::error::Result;
use crate::schema::{artists, songplays, songs, time, users};

/// Idempotent create-tables script for an empty warehouse.
pub const CREATE_TABLES_SQL: &str = include_str!("../sql/create_tables.sql");

/// Owner of the warehouse connection
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the SQLite file at `path`.
    ///
    /// The tables are expected to exist already; see [`Database::create_tables`].
    pub fn open(path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "Opened warehouse");
        Ok(Self { conn })
    }

    /// Private in-memory warehouse, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Create any missing warehouse table. Existing tables are left untouched.
    pub fn create_tables(&self) -> Result<()> {
        self.conn.execute_batch(CREATE_TABLES_SQL)?;
        Ok(())
    }

    /// Shared access to the connection.
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Exclusive access, needed to open per-file transactions.
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Row counts of every warehouse table.
    pub fn stats(&self) -> Result<WarehouseStats> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), params![], |row| row.get(0))?;
            Ok(usize::try_from(n).unwrap_or_default())
        };

        let matched: i64 = self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE {} IS NOT NULL",
                songplays::TABLE,
                songplays::SONG_ID
            ),
            params![],
            |row| row.get(0),
        )?;

        Ok(WarehouseStats {
            songs: count(songs::TABLE)?,
            artists: count(artists::TABLE)?,
            users: count(users::TABLE)?,
            time: count(time::TABLE)?,
            songplays: count(songplays::TABLE)?,
            matched_songplays: usize::try_from(matched).unwrap_or_default(),
        })
    }
}

/// Row counts of the warehouse tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarehouseStats {
    /// Rows in the song dimension
    pub songs: usize,
    /// Rows in the artist dimension
    pub artists: usize,
    /// Rows in the user dimension
    pub users: usize,
    /// Distinct start times in the time dimension
    pub time: usize,
    /// Songplay facts, matched or not
    pub songplays: usize,
    /// Songplays with a resolved song key
    pub matched_songplays: usize,
}
