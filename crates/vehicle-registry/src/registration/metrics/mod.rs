//! Per-record status resolution folded into municipality, owner, plate and
//! classification totals.

mod ledger;

pub use ledger::{ClassificationCounts, OwnerLedger, PlateTypeCounts, VehicleCounts};

use super::domain::VehicleRecord;
use super::filters::ReportFilters;
use super::plate::{PlateStatus, PlateStatusResolver};
use chrono::NaiveDateTime;
use ledger::MunicipalityAccumulator;
use serde::Serialize;
use std::collections::HashMap;

/// Municipalities under this compliance rate are flagged in exports.
pub const COMPLIANCE_THRESHOLD: f64 = 50.0;
pub const BELOW_COMPLIANCE_NOTE: &str = "Below 50% compliance";

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub(crate) fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round2(part as f64 / whole as f64 * 100.0)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OwnerSummary {
    pub total_owners: usize,
    pub with_license: usize,
    pub without_license: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MunicipalityStat {
    pub name: String,
    pub total_vehicles: usize,
    pub active_vehicles: usize,
    pub expired_vehicles: usize,
    pub total_owners: usize,
    pub owners_with_license: usize,
    pub owners_without_license: usize,
    pub compliance_rate: f64,
    pub classifications: ClassificationCounts,
    pub plate_types: PlateTypeCounts,
}

impl MunicipalityStat {
    fn from_accumulator(acc: MunicipalityAccumulator) -> Self {
        let total_owners = acc.owners.total();
        let owners_with_license = acc.owners.with_license();
        Self {
            name: acc.name,
            total_vehicles: acc.vehicles.total,
            active_vehicles: acc.vehicles.active,
            expired_vehicles: acc.vehicles.expired,
            total_owners,
            owners_with_license,
            owners_without_license: acc.owners.without_license(),
            compliance_rate: percentage(owners_with_license, total_owners),
            classifications: acc.classifications,
            plate_types: acc.plate_types,
        }
    }

    pub fn below_compliance_threshold(&self) -> bool {
        self.total_owners > 0 && self.compliance_rate < COMPLIANCE_THRESHOLD
    }
}

/// Flat per-municipality export row, before report-level columns are added.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MunicipalityRow {
    pub municipality_name: String,
    pub total_registrations: usize,
    pub active_registrations: usize,
    pub expired_registrations: usize,
    pub owners_with_license: usize,
    pub owners_without_license: usize,
    pub private_vehicles: usize,
    pub for_hire_vehicles: usize,
    pub government_vehicles: usize,
    pub plate_permanent: usize,
    pub plate_temporary: usize,
    pub compliance_rate: f64,
    pub notes: Vec<String>,
}

impl MunicipalityRow {
    fn from_stat(stat: &MunicipalityStat) -> Self {
        let mut notes = Vec::new();
        if stat.below_compliance_threshold() {
            notes.push(BELOW_COMPLIANCE_NOTE.to_string());
        }

        Self {
            municipality_name: stat.name.clone(),
            total_registrations: stat.total_vehicles,
            active_registrations: stat.active_vehicles,
            expired_registrations: stat.expired_vehicles,
            owners_with_license: stat.owners_with_license,
            owners_without_license: stat.owners_without_license,
            private_vehicles: stat.classifications.private,
            for_hire_vehicles: stat.classifications.for_hire,
            government_vehicles: stat.classifications.government,
            plate_permanent: stat.plate_types.permanent,
            plate_temporary: stat.plate_types.temporary,
            compliance_rate: stat.compliance_rate,
            notes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub at: NaiveDateTime,
    pub plate_number: String,
    pub municipality: String,
}

/// One entry per record with a readable activity instant, oldest first.
pub fn renewal_timeline<'a, I>(records: I) -> Vec<TimelineEntry>
where
    I: IntoIterator<Item = &'a VehicleRecord>,
{
    let mut timeline: Vec<TimelineEntry> = records
        .into_iter()
        .filter_map(|record| {
            record.activity_at().map(|at| TimelineEntry {
                at,
                plate_number: record.plate_number.clone(),
                municipality: record.municipality(),
            })
        })
        .collect();
    timeline.sort_by_key(|entry| entry.at);
    timeline
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub vehicle_counts: VehicleCounts,
    pub owner_summary: OwnerSummary,
    pub plate_type_counts: PlateTypeCounts,
    pub classification_counts: ClassificationCounts,
    pub municipality_stats: Vec<MunicipalityStat>,
    pub csv_rows: Vec<MunicipalityRow>,
    pub renewal_timeline: Vec<TimelineEntry>,
    /// Plates that could not be read and were counted as active.
    pub assumed_active_plates: usize,
}

impl MetricsSnapshot {
    pub fn compliance_rate(&self) -> f64 {
        percentage(
            self.owner_summary.with_license,
            self.owner_summary.total_owners,
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MetricsAggregator {
    resolver: PlateStatusResolver,
}

impl MetricsAggregator {
    pub fn new(resolver: PlateStatusResolver) -> Self {
        Self { resolver }
    }

    /// Folds the records matching the filter dimensions into a snapshot.
    /// Period selection is left to the caller.
    pub fn aggregate(&self, records: &[VehicleRecord], filters: &ReportFilters) -> MetricsSnapshot {
        let mut vehicle_counts = VehicleCounts::default();
        let mut plate_type_counts = PlateTypeCounts::default();
        let mut classification_counts = ClassificationCounts::default();
        let mut owners = OwnerLedger::default();
        let mut municipalities: Vec<MunicipalityAccumulator> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut assumed_active_plates = 0;

        let matching: Vec<&VehicleRecord> = records
            .iter()
            .filter(|record| filters.matches_dimensions(record))
            .collect();

        for record in &matching {
            let status = self.resolver.resolve_or_assume_active(
                &record.plate_number,
                record.latest_renewal(),
                record.status_type(),
            );
            if status == PlateStatus::AssumedActive {
                assumed_active_plates += 1;
            }
            let status = status.status();
            let plate_type = record.plate_type();
            let classification = record.classification();

            vehicle_counts.record(status);
            plate_type_counts.record(plate_type);
            classification_counts.record(&classification);

            let name = record.municipality();
            let slot = *index.entry(name.clone()).or_insert_with(|| {
                municipalities.push(MunicipalityAccumulator::new(name));
                municipalities.len() - 1
            });
            let Some(acc) = municipalities.get_mut(slot) else {
                continue;
            };
            acc.vehicles.record(status);
            acc.plate_types.record(plate_type);
            acc.classifications.record(&classification);

            if let Some(owner) = &record.owner {
                acc.owners.record(&owner.id, owner.has_drivers_license);
                owners.record(&owner.id, owner.has_drivers_license);
            }
        }

        let mut municipality_stats: Vec<MunicipalityStat> = municipalities
            .into_iter()
            .map(MunicipalityStat::from_accumulator)
            .collect();
        // stable: ties keep encounter order
        municipality_stats.sort_by(|a, b| b.total_vehicles.cmp(&a.total_vehicles));

        let csv_rows = municipality_stats
            .iter()
            .map(MunicipalityRow::from_stat)
            .collect();

        MetricsSnapshot {
            vehicle_counts,
            owner_summary: OwnerSummary {
                total_owners: owners.total(),
                with_license: owners.with_license(),
                without_license: owners.without_license(),
            },
            plate_type_counts,
            classification_counts,
            municipality_stats,
            csv_rows,
            renewal_timeline: renewal_timeline(matching),
            assumed_active_plates,
        }
    }
}
