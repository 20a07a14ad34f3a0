use super::super::compliance::ComplianceSummary;
use super::super::filters::{ReportFilters, ReportPeriod, ReportScope};
use super::super::forecast::PredictiveBlock;
use super::super::metrics::{ClassificationCounts, MetricsSnapshot, MunicipalityStat};
use super::super::trends::TrendSummary;
use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMeta {
    pub scope: ReportScope,
    pub scope_label: &'static str,
    pub period: ReportPeriod,
    pub period_label: String,
    pub generated_at: NaiveDateTime,
    pub actor: String,
    pub filters: ReportFilters,
}

impl ReportMeta {
    pub fn new(
        filters: ReportFilters,
        period: ReportPeriod,
        generated_at: NaiveDateTime,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            scope: period.scope,
            scope_label: period.scope.label(),
            period_label: period.label(),
            period,
            generated_at,
            actor: actor.into(),
            filters,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KpiSummary {
    pub total_vehicles: usize,
    pub active_vehicles: usize,
    pub expired_vehicles: usize,
    pub total_owners: usize,
    pub owners_with_license: usize,
    pub owners_without_license: usize,
    pub overall_compliance_rate: f64,
    pub permanent_plates: usize,
    pub temporary_plates: usize,
    pub classifications: ClassificationCounts,
}

impl KpiSummary {
    pub fn from_parts(snapshot: &MetricsSnapshot, compliance: &ComplianceSummary) -> Self {
        Self {
            total_vehicles: snapshot.vehicle_counts.total,
            active_vehicles: snapshot.vehicle_counts.active,
            expired_vehicles: snapshot.vehicle_counts.expired,
            total_owners: snapshot.owner_summary.total_owners,
            owners_with_license: snapshot.owner_summary.with_license,
            owners_without_license: snapshot.owner_summary.without_license,
            overall_compliance_rate: compliance.overall_compliance_rate,
            permanent_plates: snapshot.plate_type_counts.permanent,
            temporary_plates: snapshot.plate_type_counts.temporary,
            classifications: snapshot.classification_counts.clone(),
        }
    }
}

/// One exported line per municipality, in ranking order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvRow {
    pub period_scope: &'static str,
    pub period_label: String,
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
    pub overall_compliance_rate: f64,
    pub predicted_registrations: Option<f64>,
    pub is_peak_month: bool,
    pub caravan_priority_rank: Option<usize>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportPayload {
    pub meta: ReportMeta,
    pub kpis: KpiSummary,
    pub trends: TrendSummary,
    pub municipality_rankings: Vec<MunicipalityStat>,
    pub compliance: ComplianceSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predictive: Option<PredictiveBlock>,
    pub csv_rows: Vec<CsvRow>,
    pub notes: Vec<String>,
}
