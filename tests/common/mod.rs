#![allow(dead_code)]

use std::fs;
use std::path::Path;

use sparkify_etl::Database;

/// Fresh in-memory warehouse with every table created.
pub fn warehouse() -> Database {
    let db = Database::open_in_memory().expect("Failed to open in-memory database");
    db.create_tables().expect("Failed to create tables");
    db
}

/// Write `contents` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("Relative path has a parent")).expect("Failed to create directories");
    fs::write(&path, contents).expect("Failed to write fixture");
}

/// Catalog record JSON for a song.
pub fn catalog_json(song_id: &str, artist_id: &str, title: &str, artist_name: &str, duration: f64) -> String {
    format!(
        r#"{{"num_songs": 1, "artist_id": "{artist_id}", "artist_latitude": null, "artist_longitude": null, "artist_location": "", "artist_name": "{artist_name}", "song_id": "{song_id}", "title": "{title}", "duration": {duration}, "year": 0}}"#
    )
}

/// Activity log line for a play.
pub fn play_json(ts: i64, user_id: &str, level: &str, song: &str, artist: &str, length: f64) -> String {
    format!(
        r#"{{"artist":"{artist}","auth":"Logged In","firstName":"Kaylee","gender":"F","itemInSession":0,"lastName":"Summers","length":{length},"level":"{level}","location":"Phoenix-Mesa-Scottsdale, AZ","method":"PUT","page":"NextSong","registration":1540344794796.0,"sessionId":139,"song":"{song}","status":200,"ts":{ts},"userAgent":"Mozilla/5.0","userId":"{user_id}"}}"#
    )
}

/// Activity log line for a non-play page view.
pub fn page_view_json(ts: i64, page: &str) -> String {
    format!(
        r#"{{"artist":null,"auth":"Logged In","firstName":"Kaylee","gender":"F","itemInSession":1,"lastName":"Summers","length":null,"level":"free","location":"Phoenix-Mesa-Scottsdale, AZ","method":"GET","page":"{page}","registration":1540344794796.0,"sessionId":139,"song":null,"status":200,"ts":{ts},"userAgent":"Mozilla/5.0","userId":"8"}}"#
    )
}
