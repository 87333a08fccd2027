//! Songplay fact resolution
//!
//! Play events carry no song or artist key, only the title, artist name and
//! duration the player reported. Those attributes are looked up in the
//! warehouse on every event; a play with no catalog match is still recorded,
//! with null keys.

use tracing::debug;

use crate::error::Result;
use crate::models::{required, ActivityEvent, SongMatch, SongPlayFact, TimeRow};
use crate::warehouse::WarehouseSink;

/// Resolve the song and artist keys for a play event.
///
/// Returns `None` when any lookup attribute is null or nothing matches.
pub fn resolve_song<S: WarehouseSink + ?Sized>(sink: &S, event: &ActivityEvent) -> Result<Option<SongMatch>> {
    let (Some(title), Some(artist), Some(length)) = (event.song.as_deref(), event.artist.as_deref(), event.length)
    else {
        return Ok(None);
    };
    let found = sink.find_song(title, artist, length)?;
    if found.is_none() {
        debug!(title, artist, length, "No catalog match for play");
    }
    Ok(found)
}

/// Assemble the fact row for a play event whose time row is already derived.
///
/// `line` only feeds error messages.
pub fn build_songplay<S: WarehouseSink + ?Sized>(
    sink: &S,
    event: &ActivityEvent,
    time_row: &TimeRow,
    line: usize,
) -> Result<SongPlayFact> {
    let user_id = required(event.user_id, "userId", line)?;
    let level = required(event.level.clone(), "level", line)?;
    let session_id = required(event.session_id, "sessionId", line)?;
    let found = resolve_song(sink, event)?;
    let (song_id, artist_id) = found.map_or((None, None), |m| (Some(m.song_id), Some(m.artist_id)));

    Ok(SongPlayFact {
        start_time: time_row.start_time_key(),
        user_id,
        level,
        song_id,
        artist_id,
        session_id,
        location: event.location.clone(),
        user_agent: event.user_agent.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;
    use crate::time_dim::derive_time;
    use crate::warehouse::MockWarehouseSink;
    use mockall::predicate::eq;

    fn play() -> ActivityEvent {
        serde_json::from_value(serde_json::json!({
            "ts": 1_541_121_934_796_i64,
            "userId": 8,
            "level": "free",
            "song": "X",
            "artist": "Y",
            "length": 180.5,
            "sessionId": 139,
            "location": "Phoenix-Mesa-Scottsdale, AZ",
            "userAgent": "Mozilla/5.0",
            "page": "NextSong"
        }))
        .unwrap()
    }

    #[test]
    fn test_matched_play_carries_keys() {
        let mut sink = MockWarehouseSink::new();
        sink.expect_find_song()
            .with(eq("X"), eq("Y"), eq(180.5))
            .times(1)
            .returning(|_, _, _| {
                Ok(Some(SongMatch {
                    song_id: "SOAAA1".to_string(),
                    artist_id: "ARAAA1".to_string(),
                }))
            });

        let event = play();
        let time_row = derive_time(event.ts.unwrap()).unwrap();
        let fact = build_songplay(&sink, &event, &time_row, 1).unwrap();

        assert_eq!(fact.song_id.as_deref(), Some("SOAAA1"));
        assert_eq!(fact.artist_id.as_deref(), Some("ARAAA1"));
        assert_eq!(fact.start_time, "2018-11-02 01:25:34");
        assert_eq!(fact.user_id, 8);
        assert_eq!(fact.session_id, 139);
        assert_eq!(fact.user_agent.as_deref(), Some("Mozilla/5.0"));
    }

    #[test]
    fn test_unmatched_play_is_kept_with_null_keys() {
        let mut sink = MockWarehouseSink::new();
        sink.expect_find_song().returning(|_, _, _| Ok(None));

        let event = play();
        let time_row = derive_time(event.ts.unwrap()).unwrap();
        let fact = build_songplay(&sink, &event, &time_row, 1).unwrap();

        assert_eq!(fact.song_id, None);
        assert_eq!(fact.artist_id, None);
        assert_eq!(fact.level, "free");
    }

    #[test]
    fn test_null_lookup_attribute_skips_query() {
        let mut sink = MockWarehouseSink::new();
        sink.expect_find_song().never();

        let mut event = play();
        event.length = None;
        assert_eq!(resolve_song(&sink, &event).unwrap(), None);
    }

    #[test]
    fn test_missing_session_is_an_error() {
        let sink = MockWarehouseSink::new();
        let mut event = play();
        event.session_id = None;
        let time_row = derive_time(event.ts.unwrap()).unwrap();
        assert!(matches!(
            build_songplay(&sink, &event, &time_row, 4),
            Err(EtlError::MissingField { field: "sessionId", line: 4 })
        ));
    }
}
