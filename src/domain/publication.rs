//! Visibility rules for records in published and preview modes.

use time::OffsetDateTime;

use crate::domain::entities::RawRecord;
use crate::domain::types::PublishState;

/// Returns true when `record` belongs in an index built for the given mode.
pub fn is_visible(record: &RawRecord, preview: bool) -> bool {
    is_visible_at(record, preview, OffsetDateTime::now_utc())
}

/// [`is_visible`] evaluated against an explicit clock reading.
pub fn is_visible_at(record: &RawRecord, preview: bool, now: OffsetDateTime) -> bool {
    preview || is_published_at(record, now)
}

/// A record is live when its flag says published and its date, if any, has passed.
///
/// A missing flag reads as unpublished and an unreadable date keeps the record hidden.
pub fn is_published_at(record: &RawRecord, now: OffsetDateTime) -> bool {
    let flagged = record
        .published
        .is_some_and(PublishState::is_published);
    if !flagged {
        return false;
    }

    match &record.date {
        None => true,
        Some(date) => date.instant().is_some_and(|at| at <= now),
    }
}
