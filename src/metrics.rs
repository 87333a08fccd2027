//! Metrics emitted through the `metrics` facade.
//!
//! Nothing is recorded unless the host process installs a recorder.

use std::time::Duration;

use metrics::{counter, histogram};

use crate::models::SourceKind;
use crate::pipeline::FileStats;

/// Metric names
pub mod names {
    /// Files committed, labelled by source kind
    pub const FILES_PROCESSED: &str = "sparkify_etl_files_processed_total";
    /// Files rolled back, labelled by source kind and error class
    pub const FILES_FAILED: &str = "sparkify_etl_files_failed_total";
    /// Per-file load duration, labelled by source kind
    pub const FILE_DURATION: &str = "sparkify_etl_file_duration_seconds";
    /// Source records read
    pub const RECORDS_READ: &str = "sparkify_etl_records_read_total";
    /// Events dropped by the page filter
    pub const EVENTS_SKIPPED: &str = "sparkify_etl_events_skipped_total";
    /// Songplay facts written, labelled by match outcome
    pub const SONGPLAYS: &str = "sparkify_etl_songplays_total";
}

/// Record a committed file.
pub fn record_file_processed(kind: SourceKind, stats: &FileStats, duration: Duration) {
    let kind = kind.as_str();
    counter!(names::FILES_PROCESSED, "kind" => kind).increment(1);
    histogram!(names::FILE_DURATION, "kind" => kind).record(duration.as_secs_f64());
    counter!(names::RECORDS_READ, "kind" => kind).increment(stats.records as u64);
    counter!(names::EVENTS_SKIPPED).increment(stats.skipped as u64);
    counter!(names::SONGPLAYS, "outcome" => "matched").increment(stats.matched as u64);
    counter!(names::SONGPLAYS, "outcome" => "unmatched").increment((stats.songplays - stats.matched) as u64);
}

/// Record a rolled-back file.
pub fn record_file_failed(kind: SourceKind, parse_error: bool) {
    let class = if parse_error { "parse" } else { "storage" };
    counter!(names::FILES_FAILED, "kind" => kind.as_str(), "class" => class).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        let stats = FileStats {
            records: 3,
            skipped: 1,
            songplays: 2,
            matched: 1,
        };
        record_file_processed(SourceKind::ActivityLog, &stats, Duration::from_millis(5));
        record_file_failed(SourceKind::Catalog, true);
    }
}
