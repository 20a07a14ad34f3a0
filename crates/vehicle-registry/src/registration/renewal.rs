//! Reduces the loosely shaped renewal history of a record to one instant.

use super::domain::{RenewalEntry, RenewalHistory, TimestampValue, VehicleRecord};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_local());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

impl TimestampValue {
    /// Readable instant, or `None` (logged at debug) for values that carry none.
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        let parsed = match self {
            TimestampValue::EpochMillis(millis) => from_epoch_millis(*millis),
            TimestampValue::FractionalMillis(millis) if millis.is_finite() => {
                from_epoch_millis(millis.trunc() as i64)
            }
            TimestampValue::FractionalMillis(_) => None,
            TimestampValue::Text(raw) => parse_timestamp(raw),
            TimestampValue::Extended(extended) => return extended.date.to_datetime(),
            TimestampValue::Unrecognized(_) => None,
        };
        if parsed.is_none() {
            tracing::debug!(value = ?self, "discarding unreadable timestamp");
        }
        parsed
    }
}

fn from_epoch_millis(millis: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

impl RenewalEntry {
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            RenewalEntry::Value(value) => value.to_datetime(),
            RenewalEntry::Wrapped(stamp) => stamp.timestamp.to_datetime(),
        }
    }
}

impl RenewalHistory {
    pub fn entries(&self) -> &[RenewalEntry] {
        match self {
            RenewalHistory::Many(entries) => entries,
            RenewalHistory::One(entry) => std::slice::from_ref(entry),
        }
    }

    /// Most recent valid timestamp; invalid entries are skipped.
    pub fn latest(&self) -> Option<NaiveDateTime> {
        self.entries()
            .iter()
            .filter_map(RenewalEntry::timestamp)
            .max()
    }
}

pub fn latest_renewal(history: Option<&RenewalHistory>) -> Option<NaiveDateTime> {
    history.and_then(RenewalHistory::latest)
}

impl VehicleRecord {
    pub fn latest_renewal(&self) -> Option<NaiveDateTime> {
        latest_renewal(self.renewal_history.as_ref())
    }

    /// Latest renewal, falling back to the creation timestamp.
    pub fn activity_at(&self) -> Option<NaiveDateTime> {
        self.latest_renewal().or_else(|| {
            self.created_at
                .as_ref()
                .and_then(TimestampValue::to_datetime)
        })
    }
}
