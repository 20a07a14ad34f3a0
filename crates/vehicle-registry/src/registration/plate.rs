//! Plate-number driven expiration schedule.
//!
//! The last two digits of a plate fix the registration window: the second to
//! last digit selects the week of the month, the last digit the month itself.

use super::clock::Clock;
use super::domain::VehicleStatusType;
use chrono::{Datelike, Months, NaiveDate, NaiveDateTime};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlateError {
    #[error("plate '{plate}' does not contain two digits")]
    InvalidPlateFormat { plate: String },
    #[error("expiration for plate '{plate}' falls outside the supported calendar")]
    DateOutOfRange { plate: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekBucket {
    First,
    Second,
    Third,
    Last,
}

impl WeekBucket {
    pub const fn from_digit(digit: char) -> Option<Self> {
        match digit {
            '1' | '2' | '3' => Some(Self::First),
            '4' | '5' | '6' => Some(Self::Second),
            '7' | '8' => Some(Self::Third),
            '9' | '0' => Some(Self::Last),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::First => "First Week",
            Self::Second => "Second Week",
            Self::Third => "Third Week",
            Self::Last => "Last Week",
        }
    }

    /// Calendar day on which the bucket closes within the given month.
    pub fn end_day(self, year: i32, month: u32) -> Option<u32> {
        match self {
            Self::First => Some(7),
            Self::Second => Some(14),
            Self::Third => Some(21),
            Self::Last => last_day_of_month(year, month),
        }
    }
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|index| MONTH_NAMES.get(index as usize))
        .copied()
        .unwrap_or("Unknown")
}

/// Digits 1-9 map to January-September and 0 to October. November and
/// December are never produced.
pub const fn month_for_digit(digit: char) -> Option<u32> {
    match digit {
        '1'..='9' => Some(digit as u32 - '0' as u32),
        '0' => Some(10),
        _ => None,
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    NaiveDate::from_ymd_opt(year, month, 1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
        .map(|date| date.day())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Active,
    Expired,
}

impl RegistrationStatus {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Active => "1",
            Self::Expired => "0",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Expired => "Expired",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpirationInfo {
    pub last_two_digits: String,
    pub week_bucket: WeekBucket,
    pub week_label: &'static str,
    pub month: u32,
    pub month_label: &'static str,
    pub expires_at: NaiveDateTime,
    pub expired: bool,
    pub status: RegistrationStatus,
    pub status_code: &'static str,
}

/// Outcome of the "assume active" boundary policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlateStatus {
    Resolved(ExpirationInfo),
    AssumedActive,
}

impl PlateStatus {
    pub fn status(&self) -> RegistrationStatus {
        match self {
            PlateStatus::Resolved(info) => info.status,
            PlateStatus::AssumedActive => RegistrationStatus::Active,
        }
    }

    pub fn expiration(&self) -> Option<&ExpirationInfo> {
        match self {
            PlateStatus::Resolved(info) => Some(info),
            PlateStatus::AssumedActive => None,
        }
    }
}

/// Resolves expiration for plates against a pinned "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlateStatusResolver {
    now: NaiveDateTime,
}

impl PlateStatusResolver {
    pub const fn at(now: NaiveDateTime) -> Self {
        Self { now }
    }

    pub fn from_clock(clock: &dyn Clock) -> Self {
        Self::at(clock.now())
    }

    pub const fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn resolve(
        &self,
        plate: &str,
        latest_renewal: Option<NaiveDateTime>,
        status_type: VehicleStatusType,
    ) -> Result<ExpirationInfo, PlateError> {
        let invalid = || PlateError::InvalidPlateFormat {
            plate: plate.to_string(),
        };

        let digits: Vec<char> = plate.chars().filter(char::is_ascii_digit).collect();
        let [.., week_digit, month_digit] = digits.as_slice() else {
            return Err(invalid());
        };

        let week_bucket = WeekBucket::from_digit(*week_digit).ok_or_else(invalid)?;
        let month = month_for_digit(*month_digit).ok_or_else(invalid)?;
        let year = self.expiration_year(latest_renewal, status_type);

        let out_of_range = || PlateError::DateOutOfRange {
            plate: plate.to_string(),
        };
        let end_day = week_bucket.end_day(year, month).ok_or_else(out_of_range)?;
        let expires_at = NaiveDate::from_ymd_opt(year, month, end_day)
            .and_then(|date| date.succ_opt())
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .ok_or_else(out_of_range)?;

        let expired = self.now >= expires_at;
        let status = if expired {
            RegistrationStatus::Expired
        } else {
            RegistrationStatus::Active
        };

        Ok(ExpirationInfo {
            last_two_digits: [*week_digit, *month_digit].iter().collect(),
            week_bucket,
            week_label: week_bucket.label(),
            month,
            month_label: month_name(month),
            expires_at,
            expired,
            status,
            status_code: status.code(),
        })
    }

    /// Unreadable plates are reported as active rather than failing the report.
    pub fn resolve_or_assume_active(
        &self,
        plate: &str,
        latest_renewal: Option<NaiveDateTime>,
        status_type: VehicleStatusType,
    ) -> PlateStatus {
        match self.resolve(plate, latest_renewal, status_type) {
            Ok(info) => PlateStatus::Resolved(info),
            Err(error) => {
                tracing::warn!(%plate, %error, "unable to resolve plate expiration, assuming active");
                PlateStatus::AssumedActive
            }
        }
    }

    fn expiration_year(
        &self,
        latest_renewal: Option<NaiveDateTime>,
        status_type: VehicleStatusType,
    ) -> i32 {
        let current_year = self.now.year();
        match (status_type, latest_renewal) {
            (VehicleStatusType::New, Some(renewed)) => renewed.year() + 3,
            (VehicleStatusType::New, None) => current_year + 3,
            (VehicleStatusType::Old, Some(renewed)) if renewed.year() == current_year => {
                current_year + 1
            }
            // Renewals older than this year (or future-dated) fall back to the current year.
            (VehicleStatusType::Old, _) => current_year,
        }
    }
}
