use super::super::compliance::ComplianceSummary;
use super::super::filters::ReportScope;
use super::super::forecast::PredictiveBlock;
use super::super::metrics::{MetricsSnapshot, MunicipalityRow};
use super::super::trends::TrendSummary;
use super::export::encode_csv;
use super::layout::{layout_report, DocumentEncoder, PlainTextEncoder};
use super::payload::{CsvRow, KpiSummary, ReportMeta, ReportPayload};
use super::RenderError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Pdf,
    Csv,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unsupported report format '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Report,
    Data,
}

impl ArtifactKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::Data => "data",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Lower-cased alphanumeric runs joined with `-`.
pub fn slugify(label: &str) -> String {
    label
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

pub fn filename(kind: ArtifactKind, scope: ReportScope, period_label: &str, extension: &str) -> String {
    format!(
        "registration-{}-{}-{}.{}",
        kind.label(),
        scope.label(),
        slugify(period_label),
        extension
    )
}

/// Everything computed for one report request.
#[derive(Debug, Clone)]
pub struct ReportSections {
    pub meta: ReportMeta,
    pub snapshot: MetricsSnapshot,
    pub trends: TrendSummary,
    pub compliance: ComplianceSummary,
    pub predictive: Option<PredictiveBlock>,
    /// Whether a forecast was attempted; drives the "unavailable" note.
    pub predictive_requested: bool,
}

#[derive(Clone)]
pub struct ReportAssembler {
    encoder: Arc<dyn DocumentEncoder>,
}

impl std::fmt::Debug for ReportAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportAssembler")
            .field("document_extension", &self.encoder.extension())
            .finish()
    }
}

impl Default for ReportAssembler {
    fn default() -> Self {
        Self::new(Arc::new(PlainTextEncoder))
    }
}

impl ReportAssembler {
    pub fn new(encoder: Arc<dyn DocumentEncoder>) -> Self {
        Self { encoder }
    }

    pub fn assemble(&self, sections: ReportSections) -> ReportPayload {
        let ReportSections {
            meta,
            snapshot,
            trends,
            compliance,
            predictive,
            predictive_requested,
        } = sections;

        let is_peak_month = meta
            .period
            .month()
            .is_some_and(|(year, month)| trends.is_peak_month(year, month));

        let csv_rows = snapshot
            .csv_rows
            .iter()
            .map(|row| csv_row(&meta, row, predictive.as_ref(), is_peak_month))
            .collect();

        let notes = report_notes(&snapshot, &compliance, predictive_requested && predictive.is_none());

        ReportPayload {
            kpis: KpiSummary::from_parts(&snapshot, &compliance),
            meta,
            trends,
            municipality_rankings: snapshot.municipality_stats,
            compliance,
            predictive,
            csv_rows,
            notes,
        }
    }

    pub fn render(
        &self,
        payload: &ReportPayload,
        format: ReportFormat,
    ) -> Result<RenderedArtifact, RenderError> {
        let meta = &payload.meta;
        match format {
            ReportFormat::Csv => Ok(RenderedArtifact {
                filename: filename(ArtifactKind::Data, meta.scope, &meta.period_label, "csv"),
                content_type: "text/csv; charset=utf-8",
                bytes: encode_csv(&payload.csv_rows)?,
            }),
            ReportFormat::Pdf => {
                let layout = layout_report(payload);
                Ok(RenderedArtifact {
                    filename: filename(
                        ArtifactKind::Report,
                        meta.scope,
                        &meta.period_label,
                        self.encoder.extension(),
                    ),
                    content_type: self.encoder.content_type(),
                    bytes: self.encoder.encode(&layout)?,
                })
            }
        }
    }
}

fn csv_row(
    meta: &ReportMeta,
    row: &MunicipalityRow,
    predictive: Option<&PredictiveBlock>,
    is_peak_month: bool,
) -> CsvRow {
    let caravan = predictive.and_then(|block| block.caravan_entry(&row.municipality_name));
    CsvRow {
        period_scope: meta.scope_label,
        period_label: meta.period_label.clone(),
        municipality_name: row.municipality_name.clone(),
        total_registrations: row.total_registrations,
        active_registrations: row.active_registrations,
        expired_registrations: row.expired_registrations,
        owners_with_license: row.owners_with_license,
        owners_without_license: row.owners_without_license,
        private_vehicles: row.private_vehicles,
        for_hire_vehicles: row.for_hire_vehicles,
        government_vehicles: row.government_vehicles,
        plate_permanent: row.plate_permanent,
        plate_temporary: row.plate_temporary,
        overall_compliance_rate: row.compliance_rate,
        predicted_registrations: caravan.map(|entry| entry.predicted_registrations),
        is_peak_month,
        caravan_priority_rank: caravan.map(|entry| entry.rank),
        notes: row.notes.clone(),
    }
}

fn report_notes(
    snapshot: &MetricsSnapshot,
    compliance: &ComplianceSummary,
    predictive_unavailable: bool,
) -> Vec<String> {
    let mut notes = Vec::new();
    if snapshot.assumed_active_plates > 0 {
        notes.push(format!(
            "{} {} with unreadable plate numbers counted as active.",
            snapshot.assumed_active_plates,
            plural(snapshot.assumed_active_plates, "vehicle", "vehicles")
        ));
    }
    if predictive_unavailable {
        notes.push("Predictive insights were unavailable when this report was generated.".to_string());
    }
    if compliance.municipalities_needing_attention > 0 {
        notes.push(format!(
            "{} {} below 50% license compliance.",
            compliance.municipalities_needing_attention,
            plural(
                compliance.municipalities_needing_attention,
                "municipality",
                "municipalities"
            )
        ));
    }
    notes
}

fn plural(count: usize, one: &'static str, many: &'static str) -> &'static str {
    if count == 1 {
        one
    } else {
        many
    }
}
