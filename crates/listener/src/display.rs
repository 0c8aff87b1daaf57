//! Wire representation of event records for polling clients.

use chrono::Datelike;
use feed::{EventRecord, Timestamp};
use serde::Serialize;

/// One element of the `GET /api/events` response.
///
/// The record's own fields, plus a human-readable rendering of `occurred_at`.
#[derive(Debug, Serialize)]
pub struct EventView {
    #[serde(flatten)]
    record: EventRecord,
    occurred_at_display: String,
}

impl From<EventRecord> for EventView {
    fn from(record: EventRecord) -> Self {
        Self {
            occurred_at_display: display_timestamp(record.occurred_at()),
            record,
        }
    }
}

/// Formats a timestamp as e.g. `1st April 2021 - 9:30 PM UTC`.
pub fn display_timestamp(ts: Timestamp) -> String {
    let dt = ts.as_datetime();
    let day = dt.day();
    format!(
        "{day}{} {} - {} UTC",
        ordinal_suffix(day),
        dt.format("%B %Y"),
        dt.format("%-I:%M %p"),
    )
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}
