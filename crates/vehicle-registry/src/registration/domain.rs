use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub const UNSPECIFIED_MUNICIPALITY: &str = "UNSPECIFIED";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub String);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Joined vehicle row as returned by the records query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRecord {
    pub plate_number: String,
    #[serde(default)]
    pub classification: Option<VehicleClassification>,
    #[serde(default)]
    pub renewal_history: Option<RenewalHistory>,
    #[serde(default)]
    pub created_at: Option<TimestampValue>,
    #[serde(default)]
    pub vehicle_status_type: Option<VehicleStatusType>,
    #[serde(default)]
    pub owner: Option<OwnerRecord>,
}

impl VehicleRecord {
    pub fn status_type(&self) -> VehicleStatusType {
        self.vehicle_status_type.unwrap_or_default()
    }

    pub fn classification(&self) -> VehicleClassification {
        self.classification
            .clone()
            .unwrap_or_else(|| VehicleClassification::Other("UNCLASSIFIED".to_string()))
    }

    pub fn plate_type(&self) -> PlateType {
        PlateType::of(&self.plate_number)
    }

    /// Upper-cased municipality of the embedded owner, or `UNSPECIFIED`.
    pub fn municipality(&self) -> String {
        self.owner
            .as_ref()
            .and_then(OwnerRecord::municipality)
            .unwrap_or_else(|| UNSPECIFIED_MUNICIPALITY.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerRecord {
    #[serde(alias = "_id")]
    pub id: OwnerId,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub has_drivers_license: bool,
    #[serde(default)]
    pub address: Option<OwnerAddress>,
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<bool>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl OwnerRecord {
    pub fn municipality(&self) -> Option<String> {
        self.address
            .as_ref()
            .and_then(|address| address.municipality.as_deref())
            .map(normalize_municipality)
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerAddress {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub barangay: Option<String>,
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
}

pub fn normalize_municipality(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Vehicle use classification. Unknown labels are kept verbatim (upper-cased)
/// so per-bucket totals always reconcile with the vehicle total.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VehicleClassification {
    Private,
    ForHire,
    Government,
    Other(String),
}

impl VehicleClassification {
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_uppercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "PRIVATE" => Self::Private,
            "FOR_HIRE" | "FORHIRE" => Self::ForHire,
            "GOVERNMENT" => Self::Government,
            _ => Self::Other(raw.trim().to_uppercase()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Private => "PRIVATE",
            Self::ForHire => "FOR_HIRE",
            Self::Government => "GOVERNMENT",
            Self::Other(raw) => raw,
        }
    }

    /// Case-insensitive match against a vehicle type filter value.
    pub fn matches(&self, filter: &str) -> bool {
        VehicleClassification::parse(filter) == *self
    }
}

impl From<String> for VehicleClassification {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<VehicleClassification> for String {
    fn from(value: VehicleClassification) -> Self {
        value.label().to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum VehicleStatusType {
    New,
    #[default]
    Old,
}

impl VehicleStatusType {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("new") {
            Self::New
        } else {
            Self::Old
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Old => "OLD",
        }
    }
}

impl From<String> for VehicleStatusType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<VehicleStatusType> for &'static str {
    fn from(value: VehicleStatusType) -> Self {
        value.label()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlateType {
    Permanent,
    Temporary,
}

impl PlateType {
    /// Issued plates carry letters; temporary conduction numbers are digits only.
    pub fn of(plate: &str) -> Self {
        if plate.chars().any(char::is_alphabetic) {
            Self::Permanent
        } else {
            Self::Temporary
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Permanent => "Permanent",
            Self::Temporary => "Temporary",
        }
    }
}

/// A timestamp as it appears in upstream rows. Shapes that carry no usable
/// instant land in `Unrecognized` so a single odd value never rejects a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimestampValue {
    EpochMillis(i64),
    FractionalMillis(f64),
    Text(String),
    Extended(ExtendedDate),
    Unrecognized(serde_json::Value),
}

/// Extended JSON date, e.g. `{ "$date": "2025-01-01T00:00:00Z" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedDate {
    #[serde(rename = "$date")]
    pub date: Box<TimestampValue>,
}

/// Wrapper object form of a renewal entry, e.g. `{ "date": "2025-10-03" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalStamp {
    #[serde(alias = "date", alias = "renewedAt", alias = "renewalDate")]
    pub timestamp: TimestampValue,
}

/// Wrapped stamps are tried first; anything else is a bare timestamp value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RenewalEntry {
    Wrapped(RenewalStamp),
    Value(TimestampValue),
}

/// Renewal history as stored upstream: a single entry or a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RenewalHistory {
    Many(Vec<RenewalEntry>),
    One(RenewalEntry),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classification_parses_known_and_dynamic_buckets() {
        assert_eq!(
            VehicleClassification::parse("for hire"),
            VehicleClassification::ForHire
        );
        assert_eq!(
            VehicleClassification::parse(" Private "),
            VehicleClassification::Private
        );
        assert_eq!(
            VehicleClassification::parse("diplomatic"),
            VehicleClassification::Other("DIPLOMATIC".to_string())
        );
        assert!(VehicleClassification::Government.matches("government"));
    }

    #[test]
    fn status_type_defaults_to_old() {
        assert_eq!(VehicleStatusType::parse("New"), VehicleStatusType::New);
        assert_eq!(VehicleStatusType::parse("Old"), VehicleStatusType::Old);
        assert_eq!(VehicleStatusType::parse("refurbished"), VehicleStatusType::Old);
    }

    #[test]
    fn plate_type_depends_on_letters() {
        assert_eq!(PlateType::of("AL3127"), PlateType::Permanent);
        assert_eq!(PlateType::of("1301-0000123"), PlateType::Temporary);
    }

    #[test]
    fn record_deserializes_heterogeneous_renewal_history() {
        let value = json!({
            "plateNumber": "AL3127",
            "classification": "Private",
            "renewalHistory": [
                "2024-10-01",
                { "date": "2025-10-03" },
                1_700_000_000_000_i64,
                { "note": "manual entry" }
            ],
            "vehicleStatusType": "Old",
            "owner": {
                "_id": "owner-1",
                "hasDriversLicense": true,
                "address": { "municipality": " virac " }
            }
        });

        let record: VehicleRecord = serde_json::from_value(value).expect("record parses");
        let Some(RenewalHistory::Many(entries)) = &record.renewal_history else {
            panic!("expected a renewal collection");
        };
        assert_eq!(entries.len(), 4);
        assert!(matches!(entries[1], RenewalEntry::Wrapped(_)));
        assert!(matches!(entries[2], RenewalEntry::Value(TimestampValue::EpochMillis(_))));
        assert!(matches!(
            entries[3],
            RenewalEntry::Value(TimestampValue::Unrecognized(_))
        ));
        assert_eq!(record.municipality(), "VIRAC");
        assert_eq!(record.status_type(), VehicleStatusType::Old);
    }

    #[test]
    fn loosely_shaped_values_do_not_reject_the_record() {
        let value = json!({
            "plateNumber": "EAB4521",
            "createdAt": { "$date": "2025-01-01T00:00:00Z" },
            "renewalHistory": [1_735_689_600_000.0, { "date": null }],
            "owner": { "_id": "owner-2", "hasDriversLicense": null }
        });

        let record: VehicleRecord = serde_json::from_value(value).expect("record parses");
        assert!(matches!(record.created_at, Some(TimestampValue::Extended(_))));
        let Some(RenewalHistory::Many(entries)) = &record.renewal_history else {
            panic!("expected a renewal collection");
        };
        assert!(matches!(
            entries[0],
            RenewalEntry::Value(TimestampValue::FractionalMillis(_))
        ));
        assert!(matches!(
            &entries[1],
            RenewalEntry::Wrapped(RenewalStamp {
                timestamp: TimestampValue::Unrecognized(serde_json::Value::Null)
            })
        ));
        assert_eq!(record.owner.map(|owner| owner.has_drivers_license), Some(false));
    }

    #[test]
    fn record_without_owner_lands_in_unspecified_municipality() {
        let value = json!({ "plateNumber": "250LNV", "renewalHistory": null });
        let record: VehicleRecord = serde_json::from_value(value).expect("record parses");
        assert!(record.renewal_history.is_none());
        assert_eq!(record.municipality(), UNSPECIFIED_MUNICIPALITY);
        assert_eq!(
            record.classification(),
            VehicleClassification::Other("UNCLASSIFIED".to_string())
        );
    }
}
