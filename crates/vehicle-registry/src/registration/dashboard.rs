use super::compliance::{ComplianceRanking, ComplianceSummary};
use super::filters::ReportFilters;
use super::metrics::{ClassificationCounts, MetricsSnapshot, PlateTypeCounts};
use super::report::KpiSummary;
use super::trends::TrendSummary;
use chrono::NaiveDateTime;
use serde::Serialize;

/// Interactive analytics view: the report pipeline minus forecasts and rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardAnalytics {
    pub generated_at: NaiveDateTime,
    pub period_label: String,
    pub filters: ReportFilters,
    pub kpis: KpiSummary,
    pub trends: TrendSummary,
    pub compliance: ComplianceSummary,
    pub top_municipalities: Vec<ComplianceRanking>,
    pub bottom_municipalities: Vec<ComplianceRanking>,
    pub plate_types: PlateTypeCounts,
    pub classifications: ClassificationCounts,
}

impl DashboardAnalytics {
    pub fn build(
        generated_at: NaiveDateTime,
        period_label: String,
        filters: ReportFilters,
        snapshot: &MetricsSnapshot,
        trends: TrendSummary,
        compliance: ComplianceSummary,
    ) -> Self {
        Self {
            generated_at,
            period_label,
            filters,
            kpis: KpiSummary::from_parts(snapshot, &compliance),
            trends,
            top_municipalities: compliance.top_performers.clone(),
            bottom_municipalities: compliance.lowest_performers.clone(),
            compliance,
            plate_types: snapshot.plate_type_counts,
            classifications: snapshot.classification_counts.clone(),
        }
    }
}
