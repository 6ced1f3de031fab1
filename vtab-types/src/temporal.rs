//! Date-time text parsing for the coercion layer.
//!
//! Column text is parsed with a small, locale-independent grammar and turned
//! into a single UTC epoch-millisecond value. The requested temporal kind
//! decides only how that value is presented.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

const ISO_DATE_TIME_SPACE: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]");
const ISO_DATE_TIME_T: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]");
const MEDIUM_DATE_TIME: &[BorrowedFormatItem<'static>] = format_description!(
    "[month repr:short] [day padding:none], [year] [hour repr:12 padding:none]:[minute]:[second] [period]"
);
const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const MEDIUM_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[month repr:short] [day padding:none], [year]");
const ISO_TIME: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second][optional [.[subsecond]]]");

/// Parse date-time text into UTC milliseconds since the Unix epoch.
///
/// Accepted shapes, tried in order:
/// - `2024-01-31 13:45:00[.123]` and `2024-01-31T13:45:00[.123]`
/// - `Jan 31, 2024 1:45:00 PM`
/// - `2024-01-31` and `Jan 31, 2024` (midnight)
/// - `13:45:00[.123]` (on 1970-01-01)
///
/// Surrounding whitespace is ignored. Returns `None` when nothing matches.
pub fn parse_epoch_millis(text: &str) -> Option<i64> {
    let text = text.trim();

    for format in [ISO_DATE_TIME_SPACE, ISO_DATE_TIME_T, MEDIUM_DATE_TIME] {
        if let Ok(dt) = PrimitiveDateTime::parse(text, format) {
            return datetime_millis(dt);
        }
    }
    for format in [ISO_DATE, MEDIUM_DATE] {
        if let Ok(date) = Date::parse(text, format) {
            return datetime_millis(date.midnight());
        }
    }
    if let Ok(time) = Time::parse(text, ISO_TIME) {
        return datetime_millis(PrimitiveDateTime::new(
            OffsetDateTime::UNIX_EPOCH.date(),
            time,
        ));
    }
    None
}

fn datetime_millis(dt: PrimitiveDateTime) -> Option<i64> {
    i64::try_from(dt.assume_utc().unix_timestamp_nanos() / 1_000_000).ok()
}
