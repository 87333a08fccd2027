//! Data models for source records and warehouse rows
//!
//! Source records carry every field as `Option` because the normalizer maps
//! anything absent or untypeable to null. Warehouse rows carry only the
//! options their columns allow.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{EtlError, Result};

/// The `page` value of an event that represents an actual play.
pub const NEXT_SONG_PAGE: &str = "NextSong";

/// Text format of `start_time` keys in the warehouse.
pub const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One song and its artist, as found in a catalog file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Song key
    pub song_id: Option<String>,
    /// Song title
    pub title: Option<String>,
    /// Artist key
    pub artist_id: Option<String>,
    /// Artist display name
    pub artist_name: Option<String>,
    /// Free-form artist location
    pub artist_location: Option<String>,
    /// Artist latitude
    pub artist_latitude: Option<f64>,
    /// Artist longitude
    pub artist_longitude: Option<f64>,
    /// Song duration in seconds
    pub duration: Option<f64>,
    /// Release year; 0 in the source means unknown and is kept as-is
    pub year: Option<i64>,
    /// Number of songs in the source file
    pub num_songs: Option<i64>,
}

impl CatalogRecord {
    /// Song dimension row for this record, which starts on `line`.
    pub fn song_row(&self, line: usize) -> Result<SongRow> {
        Ok(SongRow {
            song_id: required(self.song_id.clone(), "song_id", line)?,
            title: self.title.clone(),
            artist_id: required(self.artist_id.clone(), "artist_id", line)?,
            year: self.year,
            duration: self.duration,
        })
    }

    /// Artist dimension row for this record.
    pub fn artist_row(&self, line: usize) -> Result<ArtistRow> {
        Ok(ArtistRow {
            artist_id: required(self.artist_id.clone(), "artist_id", line)?,
            name: self.artist_name.clone(),
            location: self.artist_location.clone(),
            latitude: self.artist_latitude,
            longitude: self.artist_longitude,
        })
    }
}

/// One user-interaction log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    /// Epoch milliseconds
    pub ts: Option<i64>,
    /// User key
    pub user_id: Option<i64>,
    /// User first name
    pub first_name: Option<String>,
    /// User last name
    pub last_name: Option<String>,
    /// User gender
    pub gender: Option<String>,
    /// Subscription level (free/paid)
    pub level: Option<String>,
    /// Song title as reported by the player
    pub song: Option<String>,
    /// Artist name as reported by the player
    pub artist: Option<String>,
    /// Played song duration in seconds
    pub length: Option<f64>,
    /// Session key
    pub session_id: Option<i64>,
    /// User location
    pub location: Option<String>,
    /// Browser user agent
    pub user_agent: Option<String>,
    /// Page that produced the event
    pub page: Option<String>,
    /// Authentication state
    pub auth: Option<String>,
    /// Position of the event within its session
    pub item_in_session: Option<i64>,
    /// HTTP method
    pub method: Option<String>,
    /// Registration epoch milliseconds
    pub registration: Option<f64>,
    /// HTTP status
    pub status: Option<i64>,
}

impl ActivityEvent {
    /// Whether this event is a play that belongs in the fact table.
    #[must_use]
    pub fn is_song_play(&self) -> bool {
        self.page.as_deref() == Some(NEXT_SONG_PAGE)
    }

    /// User dimension row for this event.
    ///
    /// `line` only feeds the error message.
    pub fn user_row(&self, line: usize) -> Result<UserRow> {
        Ok(UserRow {
            user_id: required(self.user_id, "userId", line)?,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            gender: self.gender.clone(),
            level: required(self.level.clone(), "level", line)?,
        })
    }
}

/// Song dimension row
#[derive(Debug, Clone, PartialEq)]
pub struct SongRow {
    /// Primary key
    pub song_id: String,
    /// Title
    pub title: Option<String>,
    /// Artist key
    pub artist_id: String,
    /// Release year
    pub year: Option<i64>,
    /// Duration in seconds
    pub duration: Option<f64>,
}

/// Artist dimension row
#[derive(Debug, Clone, PartialEq)]
pub struct ArtistRow {
    /// Primary key
    pub artist_id: String,
    /// Display name
    pub name: Option<String>,
    /// Free-form location
    pub location: Option<String>,
    /// Latitude
    pub latitude: Option<f64>,
    /// Longitude
    pub longitude: Option<f64>,
}

/// User dimension row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    /// Primary key
    pub user_id: i64,
    /// First name
    pub first_name: Option<String>,
    /// Last name
    pub last_name: Option<String>,
    /// Gender
    pub gender: Option<String>,
    /// Latest known subscription level
    pub level: String,
}

/// Time dimension row, keyed by second-precision UTC start time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRow {
    /// Civil UTC instant, sub-second part truncated
    pub start_time: NaiveDateTime,
    /// Hour of day, 0..=23
    pub hour: u32,
    /// Day of month, 1..=31
    pub day: u32,
    /// ISO-8601 week number, 1..=53
    pub week: u32,
    /// Month, 1..=12
    pub month: u32,
    /// Civil year
    pub year: i32,
    /// Day of week, Monday = 0 through Sunday = 6
    pub weekday: u32,
}

impl TimeRow {
    /// Warehouse key text for this row.
    #[must_use]
    pub fn start_time_key(&self) -> String {
        self.start_time.format(START_TIME_FORMAT).to_string()
    }
}

/// Dimension keys a play event resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongMatch {
    /// Matched song key
    pub song_id: String,
    /// Matched artist key
    pub artist_id: String,
}

/// Songplay fact row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongPlayFact {
    /// Time dimension key
    pub start_time: String,
    /// User key
    pub user_id: i64,
    /// Subscription level at play time
    pub level: String,
    /// Song key, `None` when no catalog match exists
    pub song_id: Option<String>,
    /// Artist key, `None` when no catalog match exists
    pub artist_id: Option<String>,
    /// Session key
    pub session_id: i64,
    /// User location
    pub location: Option<String>,
    /// Browser user agent
    pub user_agent: Option<String>,
}

/// Kind of source file a tree holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// One catalog record per file
    Catalog,
    /// Line-delimited activity events
    ActivityLog,
}

impl SourceKind {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::ActivityLog => "activity_log",
        }
    }
}

pub(crate) fn required<T>(value: Option<T>, field: &'static str, line: usize) -> Result<T> {
    value.ok_or(EtlError::MissingField { field, line })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> CatalogRecord {
        CatalogRecord {
            song_id: Some("SOAAA1".to_string()),
            title: Some("X".to_string()),
            artist_id: Some("ARAAA1".to_string()),
            artist_name: Some("Y".to_string()),
            artist_location: None,
            artist_latitude: None,
            artist_longitude: None,
            duration: Some(180.5),
            year: Some(0),
            num_songs: Some(1),
        }
    }

    #[test]
    fn test_catalog_rows_share_artist_key() {
        let record = catalog();
        let song = record.song_row(1).unwrap();
        let artist = record.artist_row(1).unwrap();
        assert_eq!(song.artist_id, artist.artist_id);
        assert_eq!(artist.name.as_deref(), Some("Y"));
    }

    #[test]
    fn test_catalog_without_song_id_is_rejected() {
        let mut record = catalog();
        record.song_id = None;
        assert!(matches!(
            record.song_row(4),
            Err(EtlError::MissingField { field: "song_id", line: 4 })
        ));
        assert!(record.artist_row(4).is_ok());
    }

    #[test]
    fn test_page_filter() {
        let mut event: ActivityEvent = serde_json::from_str(r#"{"page":"NextSong"}"#).unwrap();
        assert!(event.is_song_play());
        event.page = Some("Home".to_string());
        assert!(!event.is_song_play());
        event.page = None;
        assert!(!event.is_song_play());
    }
}
