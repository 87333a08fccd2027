//! Warehouse writes and lookups
//!
//! [`WarehouseSink`] is everything the loaders need from persistent storage.
//! [`SqliteWarehouse`] implements it over a borrowed rusqlite connection; the
//! batch driver hands it an open transaction so every write for one file
//! commits or rolls back together.
//!
//! Write semantics per table:
//! - songs, artists: insert, or overwrite every attribute of an existing key;
//! - users: insert, or overwrite only `level` of an existing key. This is
//!   last-write-wins in processing order, not event time, so replaying
//!   events out of `ts` order can leave a stale level;
//! - time: insert if absent, never updated;
//! - songplays: append.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::trace;

use crate::error::Result;
use crate::models::{ArtistRow, SongMatch, SongPlayFact, SongRow, TimeRow, UserRow};
use crate::schema::{artists, songplays, songs, time, users};

/// Persistence operations used by the loaders.
#[cfg_attr(test, mockall::automock)]
pub trait WarehouseSink {
    /// Insert or overwrite a song.
    fn upsert_song(&self, song: &SongRow) -> Result<()>;

    /// Insert or overwrite an artist.
    fn upsert_artist(&self, artist: &ArtistRow) -> Result<()>;

    /// Insert a user or overwrite its level.
    fn upsert_user(&self, user: &UserRow) -> Result<()>;

    /// Insert a time row unless its key already exists.
    fn insert_time(&self, row: &TimeRow) -> Result<()>;

    /// Find the song whose title, artist name and duration match.
    ///
    /// Among several matches the lowest `song_id` wins.
    fn find_song(&self, title: &str, artist_name: &str, duration: f64) -> Result<Option<SongMatch>>;

    /// Append one fact row.
    fn append_songplay(&self, fact: &SongPlayFact) -> Result<()>;
}

/// SQLite-backed [`WarehouseSink`].
pub struct SqliteWarehouse<'c> {
    conn: &'c Connection,
    duration_tolerance: f64,
}

impl<'c> SqliteWarehouse<'c> {
    /// Exact duration matching over `conn`.
    #[must_use]
    pub const fn new(conn: &'c Connection) -> Self {
        Self::with_tolerance(conn, 0.0)
    }

    /// Duration matching within `duration_tolerance` seconds.
    #[must_use]
    pub const fn with_tolerance(conn: &'c Connection, duration_tolerance: f64) -> Self {
        Self {
            conn,
            duration_tolerance,
        }
    }
}

impl WarehouseSink for SqliteWarehouse<'_> {
    fn upsert_song(&self, song: &SongRow) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "INSERT INTO {table} ({id}, {title}, {artist}, {year}, {duration}) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT({id}) DO UPDATE SET
                {title} = excluded.{title},
                {artist} = excluded.{artist},
                {year} = excluded.{year},
                {duration} = excluded.{duration}",
            table = songs::TABLE,
            id = songs::SONG_ID,
            title = songs::TITLE,
            artist = songs::ARTIST_ID,
            year = songs::YEAR,
            duration = songs::DURATION,
        ))?;
        stmt.execute(params![song.song_id, song.title, song.artist_id, song.year, song.duration])?;
        trace!(song_id = %song.song_id, "Upserted song");
        Ok(())
    }

    fn upsert_artist(&self, artist: &ArtistRow) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "INSERT INTO {table} ({id}, {name}, {location}, {lat}, {lon}) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT({id}) DO UPDATE SET
                {name} = excluded.{name},
                {location} = excluded.{location},
                {lat} = excluded.{lat},
                {lon} = excluded.{lon}",
            table = artists::TABLE,
            id = artists::ARTIST_ID,
            name = artists::NAME,
            location = artists::LOCATION,
            lat = artists::LATITUDE,
            lon = artists::LONGITUDE,
        ))?;
        stmt.execute(params![
            artist.artist_id,
            artist.name,
            artist.location,
            artist.latitude,
            artist.longitude
        ])?;
        trace!(artist_id = %artist.artist_id, "Upserted artist");
        Ok(())
    }

    fn upsert_user(&self, user: &UserRow) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "INSERT INTO {table} ({id}, {first}, {last}, {gender}, {level}) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT({id}) DO UPDATE SET {level} = excluded.{level}",
            table = users::TABLE,
            id = users::USER_ID,
            first = users::FIRST_NAME,
            last = users::LAST_NAME,
            gender = users::GENDER,
            level = users::LEVEL,
        ))?;
        stmt.execute(params![
            user.user_id,
            user.first_name,
            user.last_name,
            user.gender,
            user.level
        ])?;
        Ok(())
    }

    fn insert_time(&self, row: &TimeRow) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "INSERT INTO {} ({}, {}, {}, {}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT({}) DO NOTHING",
            time::TABLE,
            time::START_TIME,
            time::HOUR,
            time::DAY,
            time::WEEK,
            time::MONTH,
            time::YEAR,
            time::WEEKDAY,
            time::START_TIME,
        ))?;
        stmt.execute(params![
            row.start_time_key(),
            row.hour,
            row.day,
            row.week,
            row.month,
            row.year,
            row.weekday
        ])?;
        Ok(())
    }

    fn find_song(&self, title: &str, artist_name: &str, duration: f64) -> Result<Option<SongMatch>> {
        let mut stmt = self.conn.prepare_cached(&find_song_sql())?;
        let (low, high) = (duration - self.duration_tolerance, duration + self.duration_tolerance);
        let found = stmt
            .query_row(params![title, artist_name, low, high], |row| {
                Ok(SongMatch {
                    song_id: row.get(0)?,
                    artist_id: row.get(1)?,
                })
            })
            .optional()?;
        Ok(found)
    }

    fn append_songplay(&self, fact: &SongPlayFact) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "INSERT INTO {} ({}, {}, {}, {}, {}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            songplays::TABLE,
            songplays::START_TIME,
            songplays::USER_ID,
            songplays::LEVEL,
            songplays::SONG_ID,
            songplays::ARTIST_ID,
            songplays::SESSION_ID,
            songplays::LOCATION,
            songplays::USER_AGENT,
        ))?;
        stmt.execute(params![
            fact.start_time,
            fact.user_id,
            fact.level,
            fact.song_id,
            fact.artist_id,
            fact.session_id,
            fact.location,
            fact.user_agent
        ])?;
        Ok(())
    }
}

// Duration is a range over a bare column so (title, duration) stays usable
// as an index search.
fn find_song_sql() -> String {
    format!(
        "SELECT s.{song_id}, s.{artist_id} FROM {songs} s
         JOIN {artists} a ON a.{a_id} = s.{artist_id}
         WHERE s.{title} = ?1 AND a.{name} = ?2 AND s.{duration} BETWEEN ?3 AND ?4
         ORDER BY s.{song_id}, s.{artist_id}
         LIMIT 1",
        songs = songs::TABLE,
        artists = artists::TABLE,
        song_id = songs::SONG_ID,
        artist_id = songs::ARTIST_ID,
        a_id = artists::ARTIST_ID,
        title = songs::TITLE,
        name = artists::NAME,
        duration = songs::DURATION,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[test]
    fn test_find_song_searches_title_duration_index() {
        let db = Database::open_in_memory().unwrap();
        db.create_tables().unwrap();

        let mut stmt = db
            .connection()
            .prepare(&format!("EXPLAIN QUERY PLAN {}", find_song_sql()))
            .unwrap();
        let plan: Vec<String> = stmt
            .query_map(params!["X", "Y", 180.0, 181.0], |row| row.get(3))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();

        assert!(
            plan.iter()
                .any(|detail| detail.contains("idx_songs_title_duration") && detail.contains("duration>")),
            "{plan:?}"
        );
    }
}
