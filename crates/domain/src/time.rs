//! Time and timestamp helpers.

use std::time::Duration;

use chrono::{DateTime, Local, Utc};

/// UTC timestamp used for `last_changed` and event times.
pub type Timestamp = DateTime<Utc>;

/// Format of the published `expiry` attribute, local wall-clock time.
pub const EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Local wall-clock label for an occupancy window closing `timeout` from now,
/// formatted with [`EXPIRY_FORMAT`].
#[must_use]
pub fn expiry_label(timeout: Duration) -> String {
    expiry_label_at(Local::now(), timeout)
}

fn expiry_label_at(from: DateTime<Local>, timeout: Duration) -> String {
    let expiry = chrono::Duration::from_std(timeout).map_or(from, |d| from + d);
    expiry.format(EXPIRY_FORMAT).to_string()
}
