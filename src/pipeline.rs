//! Batch loading of source trees.
//!
//! Each input file is one transaction: every row derived from it commits
//! together, or the transaction is dropped (rolled back) and the failure is
//! recorded before moving on to the next file. Files run in discovery order
//! and records in line order; nothing runs concurrently.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{EtlError, Result};
use crate::logging::OperationTimer;
use crate::metrics;
use crate::models::{required, SourceKind};
use crate::normalize::{read_activity_log, read_catalog};
use crate::resolver::build_songplay;
use crate::schema::{RecordSchema, ACTIVITY_SCHEMA, CATALOG_SCHEMA};
use crate::time_dim::derive_time;
use crate::warehouse::{SqliteWarehouse, WarehouseSink};

/// Settings for one load run
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// File extension to pick up, without the dot
    pub extension: String,
    /// Allowed absolute difference when matching song durations, in seconds
    pub duration_tolerance: f64,
    /// Layout of catalog records
    pub catalog_schema: RecordSchema,
    /// Layout of activity log lines
    pub activity_schema: RecordSchema,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            extension: "json".to_string(),
            duration_tolerance: 0.0,
            catalog_schema: CATALOG_SCHEMA,
            activity_schema: ACTIVITY_SCHEMA,
        }
    }
}

/// Counters for one loaded file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStats {
    /// Source records read
    pub records: usize,
    /// Events dropped by the page filter
    pub skipped: usize,
    /// Songplay facts written
    pub songplays: usize,
    /// Songplay facts with resolved song and artist keys
    pub matched: usize,
}

impl FileStats {
    fn add(&mut self, other: Self) {
        self.records += other.records;
        self.skipped += other.skipped;
        self.songplays += other.songplays;
        self.matched += other.matched;
    }
}

/// A file whose transaction was rolled back
#[derive(Debug, Clone)]
pub struct FileFailure {
    /// Offending file
    pub path: PathBuf,
    /// Rendered error
    pub error: String,
    /// Whether the input data, rather than storage or I/O, was at fault
    pub parse_error: bool,
}

/// Outcome of loading one source tree
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Files discovered under the root
    pub files_found: usize,
    /// Files committed
    pub files_processed: usize,
    /// Files rolled back
    pub failures: Vec<FileFailure>,
    /// Counters summed over committed files
    pub totals: FileStats,
}

/// List every file under `root` with the given extension, sorted by path.
///
/// Symbolic links are not followed. Entries that cannot be read are logged
/// and skipped; only a missing or non-directory `root` is an error.
pub fn discover_files(root: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    ensure_root(root)?;
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Load one catalog record into the song and artist dimensions.
pub fn load_catalog<S, R>(sink: &S, reader: R, schema: RecordSchema) -> Result<FileStats>
where
    S: WarehouseSink + ?Sized,
    R: Read,
{
    let (line, record) = read_catalog(reader, schema)?;
    sink.upsert_song(&record.song_row(line)?)?;
    sink.upsert_artist(&record.artist_row(line)?)?;
    Ok(FileStats {
        records: 1,
        ..FileStats::default()
    })
}

/// Load every play event of one activity log into time, users and songplays.
pub fn load_activity_log<S, R>(sink: &S, reader: R, schema: RecordSchema) -> Result<FileStats>
where
    S: WarehouseSink + ?Sized,
    R: BufRead,
{
    let mut stats = FileStats::default();
    for item in read_activity_log(reader, schema) {
        let (line, event) = item?;
        stats.records += 1;
        if !event.is_song_play() {
            stats.skipped += 1;
            continue;
        }

        let time_row = derive_time(required(event.ts, "ts", line)?)?;
        sink.insert_time(&time_row)?;
        sink.upsert_user(&event.user_row(line)?)?;

        let fact = build_songplay(sink, &event, &time_row, line)?;
        if fact.song_id.is_some() {
            stats.matched += 1;
        }
        sink.append_songplay(&fact)?;
        stats.songplays += 1;
    }
    Ok(stats)
}

/// Open and load one file of the given kind.
pub fn process_file<S: WarehouseSink + ?Sized>(
    sink: &S,
    path: &Path,
    kind: SourceKind,
    options: &LoadOptions,
) -> Result<FileStats> {
    let reader = BufReader::new(File::open(path)?);
    match kind {
        SourceKind::Catalog => load_catalog(sink, reader, options.catalog_schema),
        SourceKind::ActivityLog => load_activity_log(sink, reader, options.activity_schema),
    }
}

fn process_in_transaction(
    conn: &mut Connection,
    path: &Path,
    kind: SourceKind,
    options: &LoadOptions,
) -> Result<FileStats> {
    let tx = conn.transaction()?;
    let stats = {
        let sink = SqliteWarehouse::with_tolerance(&tx, options.duration_tolerance);
        process_file(&sink, path, kind, options)?
    };
    tx.commit()?;
    Ok(stats)
}

/// Load every file under `root`, one transaction per file.
///
/// Only a failure to walk `root` is returned as an error; per-file failures
/// are logged and collected in the summary.
pub fn process_data(conn: &mut Connection, root: &Path, kind: SourceKind, options: &LoadOptions) -> Result<RunSummary> {
    let files = discover_files(root, &options.extension)?;
    let total = files.len();
    info!(kind = kind.as_str(), "{} files found in {}", total, root.display());

    let mut summary = RunSummary {
        files_found: total,
        ..RunSummary::default()
    };

    for (i, path) in files.iter().enumerate() {
        let timer = OperationTimer::new(kind.as_str());
        match process_in_transaction(conn, path, kind, options) {
            Ok(stats) => {
                metrics::record_file_processed(kind, &stats, timer.elapsed());
                debug!(path = %path.display(), ?stats, "File committed");
                summary.totals.add(stats);
                summary.files_processed += 1;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "File rolled back");
                metrics::record_file_failed(kind, e.is_parse_error());
                summary.failures.push(FileFailure {
                    path: path.clone(),
                    error: e.to_string(),
                    parse_error: e.is_parse_error(),
                });
            }
        }
        timer.finish();
        info!("{}/{} files processed.", i + 1, total);
    }

    Ok(summary)
}

/// Fail fast when a source root is not a readable directory.
pub fn ensure_root(root: &Path) -> Result<()> {
    if root.is_dir() {
        Ok(())
    } else {
        Err(EtlError::Config(format!("Input root is not a directory: {}", root.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::MockWarehouseSink;

    const LOG: &str = concat!(
        r#"{"ts":1541121934796,"userId":"8","firstName":"Kaylee","lastName":"Summers","gender":"F","level":"free","song":"X","artist":"Y","length":180.5,"sessionId":139,"location":"Phoenix","userAgent":"UA","page":"NextSong"}"#,
        "\n",
        r#"{"ts":1541121935000,"userId":"","level":"free","sessionId":139,"page":"Home"}"#,
        "\n",
    );

    #[test]
    fn test_non_play_events_write_nothing() {
        let mut sink = MockWarehouseSink::new();
        sink.expect_insert_time().times(1).returning(|_| Ok(()));
        sink.expect_upsert_user().times(1).returning(|_| Ok(()));
        sink.expect_find_song().times(1).returning(|_, _, _| Ok(None));
        sink.expect_append_songplay().times(1).returning(|_| Ok(()));

        let stats = load_activity_log(&sink, LOG.as_bytes(), ACTIVITY_SCHEMA).unwrap();
        assert_eq!(
            stats,
            FileStats {
                records: 2,
                skipped: 1,
                songplays: 1,
                matched: 0,
            }
        );
    }

    #[test]
    fn test_sink_error_stops_the_file() {
        let mut sink = MockWarehouseSink::new();
        sink.expect_insert_time()
            .returning(|_| Err(EtlError::Sink(rusqlite::Error::InvalidQuery)));
        sink.expect_append_songplay().never();

        let err = load_activity_log(&sink, LOG.as_bytes(), ACTIVITY_SCHEMA).unwrap_err();
        assert!(!err.is_parse_error());
    }

    #[test]
    fn test_play_without_ts_is_rejected() {
        let sink = MockWarehouseSink::new();
        let log = r#"{"userId":"8","level":"free","sessionId":1,"page":"NextSong"}"#;
        assert!(matches!(
            load_activity_log(&sink, log.as_bytes(), ACTIVITY_SCHEMA),
            Err(EtlError::MissingField { field: "ts", line: 1 })
        ));
    }

    #[test]
    fn test_catalog_writes_song_and_artist() {
        let mut sink = MockWarehouseSink::new();
        sink.expect_upsert_song()
            .withf(|song| song.song_id == "SOAAA1" && song.duration == Some(180.5))
            .times(1)
            .returning(|_| Ok(()));
        sink.expect_upsert_artist()
            .withf(|artist| artist.artist_id == "ARAAA1")
            .times(1)
            .returning(|_| Ok(()));

        let record = r#"{"song_id":"SOAAA1","title":"X","artist_id":"ARAAA1","artist_name":"Y","duration":180.5,"year":0,"num_songs":1}"#;
        let stats = load_catalog(&sink, record.as_bytes(), CATALOG_SCHEMA).unwrap();
        assert_eq!(stats.records, 1);
    }

    #[test]
    fn test_catalog_missing_key_names_its_line() {
        let mut sink = MockWarehouseSink::new();
        sink.expect_upsert_song().never();
        sink.expect_upsert_artist().never();

        let record = "\n\n{\"title\":\"X\",\"artist_id\":\"ARAAA1\"}\n";
        assert!(matches!(
            load_catalog(&sink, record.as_bytes(), CATALOG_SCHEMA),
            Err(EtlError::MissingField { field: "song_id", line: 3 })
        ));
    }
}
