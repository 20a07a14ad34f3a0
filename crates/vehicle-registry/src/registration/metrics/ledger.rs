use super::super::domain::{OwnerId, PlateType, VehicleClassification};
use super::super::plate::RegistrationStatus;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Distinct owners keyed by identity.
///
/// The first observation of an owner fixes which license bucket it counts
/// toward; recording the same owner again is a no-op, so an owner is never in
/// both buckets and never counted twice.
#[derive(Debug, Default, Clone)]
pub struct OwnerLedger {
    owners: HashMap<OwnerId, bool>,
}

impl OwnerLedger {
    /// Returns `true` when the owner was not yet known.
    pub fn record(&mut self, owner: &OwnerId, has_license: bool) -> bool {
        if self.owners.contains_key(owner) {
            return false;
        }
        self.owners.insert(owner.clone(), has_license);
        true
    }

    pub fn total(&self) -> usize {
        self.owners.len()
    }

    pub fn with_license(&self) -> usize {
        self.owners.values().filter(|licensed| **licensed).count()
    }

    pub fn without_license(&self) -> usize {
        self.total() - self.with_license()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VehicleCounts {
    pub total: usize,
    pub active: usize,
    pub expired: usize,
}

impl VehicleCounts {
    pub(crate) fn record(&mut self, status: RegistrationStatus) {
        self.total += 1;
        match status {
            RegistrationStatus::Active => self.active += 1,
            RegistrationStatus::Expired => self.expired += 1,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlateTypeCounts {
    pub permanent: usize,
    pub temporary: usize,
}

impl PlateTypeCounts {
    pub(crate) fn record(&mut self, plate_type: PlateType) {
        match plate_type {
            PlateType::Permanent => self.permanent += 1,
            PlateType::Temporary => self.temporary += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.permanent + self.temporary
    }
}

/// Canonical classification buckets plus one bucket per unexpected label.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationCounts {
    pub private: usize,
    pub for_hire: usize,
    pub government: usize,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub other: BTreeMap<String, usize>,
}

impl ClassificationCounts {
    pub(crate) fn record(&mut self, classification: &VehicleClassification) {
        match classification {
            VehicleClassification::Private => self.private += 1,
            VehicleClassification::ForHire => self.for_hire += 1,
            VehicleClassification::Government => self.government += 1,
            VehicleClassification::Other(label) => {
                *self.other.entry(label.clone()).or_default() += 1;
            }
        }
    }

    pub fn total(&self) -> usize {
        self.private + self.for_hire + self.government + self.other.values().sum::<usize>()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MunicipalityAccumulator {
    pub(crate) name: String,
    pub(crate) vehicles: VehicleCounts,
    pub(crate) owners: OwnerLedger,
    pub(crate) classifications: ClassificationCounts,
    pub(crate) plate_types: PlateTypeCounts,
}

impl MunicipalityAccumulator {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            vehicles: VehicleCounts::default(),
            owners: OwnerLedger::default(),
            classifications: ClassificationCounts::default(),
            plate_types: PlateTypeCounts::default(),
        }
    }
}
