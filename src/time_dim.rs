//! Time dimension derivation.
//!
//! Calendar convention, fixed for the whole warehouse:
//! - all values are UTC;
//! - sub-second milliseconds are truncated toward negative infinity;
//! - `week` is the ISO-8601 week number (1..=53);
//! - `year` is the civil year, not the ISO week-year, so 2018-12-31 is
//!   week 1 of year 2018;
//! - `weekday` counts from Monday = 0 to Sunday = 6.

use chrono::{DateTime, Datelike, Timelike};

use crate::error::{EtlError, Result};
use crate::models::TimeRow;

/// Expand epoch milliseconds into a time dimension row.
pub fn derive_time(ts_millis: i64) -> Result<TimeRow> {
    let seconds = ts_millis.div_euclid(1000);
    let start_time = DateTime::from_timestamp(seconds, 0)
        .ok_or(EtlError::InvalidTimestamp(ts_millis))?
        .naive_utc();

    Ok(TimeRow {
        start_time,
        hour: start_time.hour(),
        day: start_time.day(),
        week: start_time.iso_week().week(),
        month: start_time.month(),
        year: start_time.year(),
        weekday: start_time.weekday().num_days_from_monday(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_second_part_is_dropped() {
        let a = derive_time(1_541_121_934_000).unwrap();
        let b = derive_time(1_541_121_934_999).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_pre_epoch_truncates_downward() {
        let row = derive_time(-1).unwrap();
        assert_eq!(row.start_time_key(), "1969-12-31 23:59:59");
        assert_eq!(row.weekday, 2);
    }

    #[test]
    fn test_out_of_range() {
        assert!(matches!(derive_time(i64::MAX), Err(EtlError::InvalidTimestamp(i64::MAX))));
    }
}
