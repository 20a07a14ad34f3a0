use super::domain::{normalize_municipality, VehicleRecord};
use super::renewal::parse_timestamp;
use chrono::{Datelike, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const ALL_MUNICIPALITIES: &str = "ALL";
pub const ALL_VEHICLE_TYPES: &str = "all";

/// Deserializes through `FromStr`, so any casing is accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum ReportScope {
    Daily,
    #[default]
    Monthly,
    Yearly,
}

impl ReportScope {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl FromStr for ReportScope {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(format!("unknown report scope '{other}'")),
        }
    }
}

impl TryFrom<String> for ReportScope {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum LicenseStatusFilter {
    WithLicense,
    WithoutLicense,
    #[default]
    All,
}

impl LicenseStatusFilter {
    pub const fn label(self) -> &'static str {
        match self {
            Self::WithLicense => "with_license",
            Self::WithoutLicense => "without_license",
            Self::All => "all",
        }
    }
}

impl FromStr for LicenseStatusFilter {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "with_license" => Ok(Self::WithLicense),
            "without_license" => Ok(Self::WithoutLicense),
            "all" => Ok(Self::All),
            other => Err(format!("unknown license status '{other}'")),
        }
    }
}

impl TryFrom<String> for LicenseStatusFilter {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

/// Request filters shared by report generation and dashboard analytics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportFilters {
    pub scope: ReportScope,
    pub period: Option<String>,
    pub municipality: String,
    pub vehicle_type: String,
    pub license_status: LicenseStatusFilter,
}

impl Default for ReportFilters {
    fn default() -> Self {
        Self {
            scope: ReportScope::Monthly,
            period: None,
            municipality: ALL_MUNICIPALITIES.to_string(),
            vehicle_type: ALL_VEHICLE_TYPES.to_string(),
            license_status: LicenseStatusFilter::All,
        }
    }
}

impl ReportFilters {
    /// Upper-cased municipality when a specific one was requested.
    pub fn municipality_filter(&self) -> Option<String> {
        let normalized = normalize_municipality(&self.municipality);
        if normalized.is_empty() || normalized == ALL_MUNICIPALITIES {
            None
        } else {
            Some(normalized)
        }
    }

    pub fn vehicle_type_filter(&self) -> Option<&str> {
        let trimmed = self.vehicle_type.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL_VEHICLE_TYPES) {
            None
        } else {
            Some(trimmed)
        }
    }

    /// Municipality, vehicle type and license status checks; ignores the period.
    pub fn matches_dimensions(&self, record: &VehicleRecord) -> bool {
        if let Some(municipality) = self.municipality_filter() {
            if record.municipality() != municipality {
                return false;
            }
        }

        if let Some(vehicle_type) = self.vehicle_type_filter() {
            if !record.classification().matches(vehicle_type) {
                return false;
            }
        }

        let licensed = record.owner.as_ref().map(|owner| owner.has_drivers_license);
        match self.license_status {
            LicenseStatusFilter::All => true,
            LicenseStatusFilter::WithLicense => licensed == Some(true),
            LicenseStatusFilter::WithoutLicense => licensed == Some(false),
        }
    }

    /// Interprets `period` at the granularity of the scope; unreadable values
    /// fall back to the day containing `now`.
    pub fn resolve_period(&self, now: NaiveDateTime) -> ReportPeriod {
        let anchor = self
            .period
            .as_deref()
            .and_then(|raw| {
                let parsed = parse_period_anchor(raw);
                if parsed.is_none() {
                    tracing::debug!(period = raw, "unreadable report period, using today");
                }
                parsed
            })
            .unwrap_or_else(|| now.date());
        ReportPeriod::containing(self.scope, anchor)
    }
}

fn parse_period_anchor(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Some(datetime) = parse_timestamp(trimmed) {
        return Some(datetime.date());
    }
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d") {
        return Some(date);
    }
    if trimmed.len() == 4 {
        return trimmed
            .parse::<i32>()
            .ok()
            .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1));
    }
    None
}

/// Half-open `[start, end)` window covered by a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportPeriod {
    pub scope: ReportScope,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportPeriod {
    pub fn containing(scope: ReportScope, anchor: NaiveDate) -> Self {
        let (start, end) = match scope {
            ReportScope::Daily => (anchor, anchor.succ_opt()),
            ReportScope::Monthly => {
                let start = anchor.with_day(1).unwrap_or(anchor);
                (start, start.checked_add_months(Months::new(1)))
            }
            ReportScope::Yearly => {
                let start = NaiveDate::from_ymd_opt(anchor.year(), 1, 1).unwrap_or(anchor);
                (start, start.checked_add_months(Months::new(12)))
            }
        };

        Self {
            scope,
            start,
            end: end.unwrap_or(NaiveDate::MAX),
        }
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        let date = instant.date();
        date >= self.start && date < self.end
    }

    pub fn label(&self) -> String {
        match self.scope {
            ReportScope::Daily => self.start.format("%B %d, %Y").to_string(),
            ReportScope::Monthly => self.start.format("%B %Y").to_string(),
            ReportScope::Yearly => self.start.format("%Y").to_string(),
        }
    }

    /// Month number when the period sits inside a single month.
    pub fn month(&self) -> Option<(i32, u32)> {
        match self.scope {
            ReportScope::Daily | ReportScope::Monthly => {
                Some((self.start.year(), self.start.month()))
            }
            ReportScope::Yearly => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn now() -> NaiveDateTime {
        date(2025, 10, 18).and_hms_opt(9, 0, 0).expect("valid time")
    }

    fn record(value: serde_json::Value) -> VehicleRecord {
        serde_json::from_value(value).expect("record parses")
    }

    #[test]
    fn filters_default_to_monthly_all() {
        let filters: ReportFilters = serde_json::from_value(json!({})).expect("defaults");
        assert_eq!(filters, ReportFilters::default());
        assert!(filters.municipality_filter().is_none());
        assert!(filters.vehicle_type_filter().is_none());
    }

    #[test]
    fn monthly_period_resolves_calendar_month() {
        let filters = ReportFilters {
            period: Some("2025-02".to_string()),
            ..ReportFilters::default()
        };
        let period = filters.resolve_period(now());
        assert_eq!(period.start, date(2025, 2, 1));
        assert_eq!(period.end, date(2025, 3, 1));
        assert_eq!(period.label(), "February 2025");
    }

    #[test]
    fn daily_and_yearly_labels() {
        let daily = ReportFilters {
            scope: ReportScope::Daily,
            period: Some("2025-10-03".to_string()),
            ..ReportFilters::default()
        }
        .resolve_period(now());
        assert_eq!(daily.label(), "October 03, 2025");
        assert!(daily.contains(date(2025, 10, 3).and_hms_opt(23, 59, 0).expect("time")));
        assert!(!daily.contains(date(2025, 10, 4).and_hms_opt(0, 0, 0).expect("time")));

        let yearly = ReportFilters {
            scope: ReportScope::Yearly,
            period: Some("2024".to_string()),
            ..ReportFilters::default()
        }
        .resolve_period(now());
        assert_eq!(yearly.label(), "2024");
        assert_eq!(yearly.end, date(2025, 1, 1));
        assert!(yearly.month().is_none());
    }

    #[test]
    fn unreadable_period_falls_back_to_today() {
        let filters = ReportFilters {
            period: Some("last quarter".to_string()),
            ..ReportFilters::default()
        };
        assert_eq!(filters.resolve_period(now()).label(), "October 2025");
    }

    #[test]
    fn dimension_filters_are_case_insensitive() {
        let licensed_private = record(json!({
            "plateNumber": "AAA1111",
            "classification": "Private",
            "owner": { "id": "o-1", "hasDriversLicense": true, "address": { "municipality": "Virac" } }
        }));

        let filters = ReportFilters {
            municipality: "virac".to_string(),
            vehicle_type: "PRIVATE".to_string(),
            license_status: LicenseStatusFilter::WithLicense,
            ..ReportFilters::default()
        };
        assert!(filters.matches_dimensions(&licensed_private));

        let other_town = ReportFilters {
            municipality: "Bato".to_string(),
            ..ReportFilters::default()
        };
        assert!(!other_town.matches_dimensions(&licensed_private));

        let unlicensed_only = ReportFilters {
            license_status: LicenseStatusFilter::WithoutLicense,
            ..ReportFilters::default()
        };
        assert!(!unlicensed_only.matches_dimensions(&licensed_private));
    }

    #[test]
    fn scope_and_license_status_parse_case_insensitively() {
        assert_eq!("Yearly".parse::<ReportScope>(), Ok(ReportScope::Yearly));
        assert_eq!(
            "with-license".parse::<LicenseStatusFilter>(),
            Ok(LicenseStatusFilter::WithLicense)
        );
        assert!("weekly".parse::<ReportScope>().is_err());
    }

    #[test]
    fn deserialized_filters_accept_any_casing() {
        let filters: ReportFilters = serde_json::from_value(json!({
            "scope": "Monthly",
            "license_status": "WITH_LICENSE"
        }))
        .expect("filters parse");
        assert_eq!(filters.scope, ReportScope::Monthly);
        assert_eq!(filters.license_status, LicenseStatusFilter::WithLicense);

        let rejected = serde_json::from_value::<ReportFilters>(json!({ "scope": "weekly" }));
        assert!(rejected.is_err_and(|error| error.to_string().contains("weekly")));

        let serialized = serde_json::to_value(&filters).expect("filters serialize");
        assert_eq!(serialized["scope"], "monthly");
        assert_eq!(serialized["license_status"], "with_license");
    }
}
