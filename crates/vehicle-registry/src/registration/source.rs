use super::domain::VehicleRecord;
use super::filters::ReportFilters;
use std::io::Read;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum RecordSourceError {
    #[error("failed to read vehicle records: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid vehicle record data: {0}")]
    Json(#[from] serde_json::Error),
}

/// Supplies joined vehicle/owner rows. Implementations may pre-filter by the
/// dimension filters; the pipeline re-applies them either way.
pub trait RecordSource: Send + Sync {
    fn fetch(&self, filters: &ReportFilters) -> Result<Vec<VehicleRecord>, RecordSourceError>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordSource {
    records: Vec<VehicleRecord>,
}

impl InMemoryRecordSource {
    pub fn new(records: Vec<VehicleRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSource for InMemoryRecordSource {
    fn fetch(&self, filters: &ReportFilters) -> Result<Vec<VehicleRecord>, RecordSourceError> {
        Ok(self
            .records
            .iter()
            .filter(|record| filters.matches_dimensions(record))
            .cloned()
            .collect())
    }
}

/// Loads a JSON array of joined records exported from the registry database.
pub struct JsonRecordImporter;

impl JsonRecordImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<InMemoryRecordSource, RecordSourceError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<InMemoryRecordSource, RecordSourceError> {
        let records: Vec<VehicleRecord> = serde_json::from_reader(reader)?;
        tracing::debug!(records = records.len(), "loaded vehicle records");
        Ok(InMemoryRecordSource::new(records))
    }
}
