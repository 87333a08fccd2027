//! Database schema definitions and source record layouts
//!
//! Table and column names used with rusqlite, plus the field layouts of the
//! two JSON source kinds. The layouts are plain values handed to the
//! normalizer, so a caller can load a variant feed by passing its own.

/// Songs dimension table schema
pub mod songs {
    /// Table name
    pub const TABLE: &str = "songs";
    /// Primary key column
    pub const SONG_ID: &str = "song_id";
    /// Song title column
    pub const TITLE: &str = "title";
    /// Foreign key to artists table
    pub const ARTIST_ID: &str = "artist_id";
    /// Release year column
    pub const YEAR: &str = "year";
    /// Duration in seconds column
    pub const DURATION: &str = "duration";
}

/// Artists dimension table schema
pub mod artists {
    /// Table name
    pub const TABLE: &str = "artists";
    /// Primary key column
    pub const ARTIST_ID: &str = "artist_id";
    /// Artist name column
    pub const NAME: &str = "name";
    /// Free-form location column
    pub const LOCATION: &str = "location";
    /// Latitude column
    pub const LATITUDE: &str = "latitude";
    /// Longitude column
    pub const LONGITUDE: &str = "longitude";
}

/// Users dimension table schema
pub mod users {
    /// Table name
    pub const TABLE: &str = "users";
    /// Primary key column
    pub const USER_ID: &str = "user_id";
    /// First name column
    pub const FIRST_NAME: &str = "first_name";
    /// Last name column
    pub const LAST_NAME: &str = "last_name";
    /// Gender column
    pub const GENDER: &str = "gender";
    /// Subscription level column (free/paid)
    pub const LEVEL: &str = "level";
}

/// Time dimension table schema
pub mod time {
    /// Table name
    pub const TABLE: &str = "time";
    /// Primary key column, `YYYY-MM-DD HH:MM:SS`
    pub const START_TIME: &str = "start_time";
    /// Hour of day column
    pub const HOUR: &str = "hour";
    /// Day of month column
    pub const DAY: &str = "day";
    /// ISO week number column
    pub const WEEK: &str = "week";
    /// Month column
    pub const MONTH: &str = "month";
    /// Year column
    pub const YEAR: &str = "year";
    /// Weekday column, Monday = 0
    pub const WEEKDAY: &str = "weekday";
}

/// Songplays fact table schema
pub mod songplays {
    /// Table name
    pub const TABLE: &str = "songplays";
    /// Surrogate key column
    pub const SONGPLAY_ID: &str = "songplay_id";
    /// Foreign key to time table
    pub const START_TIME: &str = "start_time";
    /// Foreign key to users table
    pub const USER_ID: &str = "user_id";
    /// Subscription level at play time
    pub const LEVEL: &str = "level";
    /// Foreign key to songs table, nullable
    pub const SONG_ID: &str = "song_id";
    /// Foreign key to artists table, nullable
    pub const ARTIST_ID: &str = "artist_id";
    /// Session identifier column
    pub const SESSION_ID: &str = "session_id";
    /// User location column
    pub const LOCATION: &str = "location";
    /// User agent column
    pub const USER_AGENT: &str = "user_agent";
}

/// Semantic type of a source field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text
    Text,
    /// 64-bit float
    Float,
    /// 64-bit signed integer
    Integer,
}

/// One field of a source record layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// JSON key
    pub name: &'static str,
    /// Declared type
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Shorthand constructor for const tables.
    #[must_use]
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// The declared field layout of one source kind.
#[derive(Debug, Clone, Copy)]
pub struct RecordSchema {
    /// Fields in declaration order
    pub fields: &'static [FieldSpec],
}

impl RecordSchema {
    /// Look up the declared kind of a field.
    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<FieldKind> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.kind)
    }
}

/// Layout of a Million Song Dataset catalog record.
pub const CATALOG_SCHEMA: RecordSchema = RecordSchema {
    fields: &[
        FieldSpec::new("song_id", FieldKind::Text),
        FieldSpec::new("title", FieldKind::Text),
        FieldSpec::new("artist_id", FieldKind::Text),
        FieldSpec::new("artist_name", FieldKind::Text),
        FieldSpec::new("artist_location", FieldKind::Text),
        FieldSpec::new("artist_latitude", FieldKind::Float),
        FieldSpec::new("artist_longitude", FieldKind::Float),
        FieldSpec::new("duration", FieldKind::Float),
        FieldSpec::new("year", FieldKind::Integer),
        FieldSpec::new("num_songs", FieldKind::Integer),
    ],
};

/// Layout of a user-session activity log line.
pub const ACTIVITY_SCHEMA: RecordSchema = RecordSchema {
    fields: &[
        FieldSpec::new("artist", FieldKind::Text),
        FieldSpec::new("auth", FieldKind::Text),
        FieldSpec::new("firstName", FieldKind::Text),
        FieldSpec::new("gender", FieldKind::Text),
        FieldSpec::new("itemInSession", FieldKind::Integer),
        FieldSpec::new("lastName", FieldKind::Text),
        FieldSpec::new("length", FieldKind::Float),
        FieldSpec::new("level", FieldKind::Text),
        FieldSpec::new("location", FieldKind::Text),
        FieldSpec::new("method", FieldKind::Text),
        FieldSpec::new("page", FieldKind::Text),
        FieldSpec::new("registration", FieldKind::Float),
        FieldSpec::new("sessionId", FieldKind::Integer),
        FieldSpec::new("song", FieldKind::Text),
        FieldSpec::new("status", FieldKind::Integer),
        FieldSpec::new("ts", FieldKind::Integer),
        FieldSpec::new("userAgent", FieldKind::Text),
        FieldSpec::new("userId", FieldKind::Integer),
    ],
};
