use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::info;

use super::clock::Clock;
use super::compliance::{analyze, ComplianceSummary};
use super::dashboard::DashboardAnalytics;
use super::domain::VehicleRecord;
use super::filters::{ReportFilters, ReportPeriod};
use super::forecast::PredictiveInsightsClient;
use super::metrics::{renewal_timeline, MetricsAggregator, MetricsSnapshot};
use super::plate::PlateStatusResolver;
use super::report::{
    RenderError, RenderedArtifact, ReportAssembler, ReportFormat, ReportMeta, ReportPayload,
    ReportSections,
};
use super::source::{RecordSource, RecordSourceError};
use super::trends::{compute_trends, TrendSummary};

pub const DEFAULT_ACTOR: &str = "system";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReportRequest {
    pub filters: ReportFilters,
    pub format: ReportFormat,
    pub actor: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Records(#[from] RecordSourceError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Deterministic part of a report: everything except forecasts.
#[derive(Debug, Clone)]
struct Analysis {
    now: NaiveDateTime,
    period: ReportPeriod,
    snapshot: MetricsSnapshot,
    trends: TrendSummary,
    compliance: ComplianceSummary,
}

/// Drives records through the aggregation pipeline into reports and dashboards.
pub struct RegistrationReportService<R> {
    records: Arc<R>,
    clock: Arc<dyn Clock>,
    predictive: Option<Arc<PredictiveInsightsClient>>,
    assembler: ReportAssembler,
}

impl<R> RegistrationReportService<R>
where
    R: RecordSource + 'static,
{
    pub fn new(records: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self {
            records,
            clock,
            predictive: None,
            assembler: ReportAssembler::default(),
        }
    }

    pub fn with_predictive(mut self, client: PredictiveInsightsClient) -> Self {
        self.predictive = Some(Arc::new(client));
        self
    }

    pub fn with_assembler(mut self, assembler: ReportAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn predictive_enabled(&self) -> bool {
        self.predictive.is_some()
    }

    fn analyze(&self, filters: &ReportFilters) -> Result<Analysis, RecordSourceError> {
        let now = self.clock.now();
        let period = filters.resolve_period(now);
        let records = self.records.fetch(filters)?;

        let in_period: Vec<VehicleRecord> = records
            .iter()
            .filter(|record| record.activity_at().is_some_and(|at| period.contains(at)))
            .cloned()
            .collect();
        // trend history: everything matching the filters up to the end of the period
        let history = records.iter().filter(|record| {
            filters.matches_dimensions(record)
                && record.activity_at().is_some_and(|at| at.date() < period.end)
        });

        let snapshot =
            MetricsAggregator::new(PlateStatusResolver::at(now)).aggregate(&in_period, filters);
        let trends = compute_trends(&renewal_timeline(history));
        let compliance = analyze(&snapshot.municipality_stats);

        Ok(Analysis {
            now,
            period,
            snapshot,
            trends,
            compliance,
        })
    }

    pub async fn build_payload(&self, request: &ReportRequest) -> Result<ReportPayload, ReportError> {
        let analysis = self.analyze(&request.filters)?;
        let predictive = match &self.predictive {
            Some(client) => client.fetch_predictions(&request.filters).await,
            None => None,
        };

        let actor = request
            .actor
            .as_deref()
            .map(str::trim)
            .filter(|actor| !actor.is_empty())
            .unwrap_or(DEFAULT_ACTOR);

        Ok(self.assembler.assemble(ReportSections {
            meta: ReportMeta::new(request.filters.clone(), analysis.period, analysis.now, actor),
            snapshot: analysis.snapshot,
            trends: analysis.trends,
            compliance: analysis.compliance,
            predictive,
            predictive_requested: self.predictive.is_some(),
        }))
    }

    pub async fn generate(&self, request: &ReportRequest) -> Result<RenderedArtifact, ReportError> {
        let payload = self.build_payload(request).await?;
        let artifact = self.assembler.render(&payload, request.format)?;
        info!(
            filename = %artifact.filename,
            bytes = artifact.bytes.len(),
            "generated registration artifact"
        );
        Ok(artifact)
    }

    pub fn dashboard(&self, filters: &ReportFilters) -> Result<DashboardAnalytics, ReportError> {
        let analysis = self.analyze(filters)?;
        Ok(DashboardAnalytics::build(
            analysis.now,
            analysis.period.label(),
            filters.clone(),
            &analysis.snapshot,
            analysis.trends,
            analysis.compliance,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::clock::FixedClock;
    use crate::registration::filters::ReportScope;
    use crate::registration::source::InMemoryRecordSource;
    use chrono::NaiveDate;
    use serde_json::json;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 18)
            .and_then(|date| date.and_hms_opt(9, 0, 0))
            .expect("valid now")
    }

    fn record(plate: &str, owner: &str, town: &str, renewed: serde_json::Value) -> VehicleRecord {
        serde_json::from_value(json!({
            "plateNumber": plate,
            "classification": "Private",
            "renewalHistory": renewed,
            "createdAt": "2023-02-01T08:00:00Z",
            "owner": {
                "id": owner,
                "hasDriversLicense": true,
                "address": { "municipality": town }
            }
        }))
        .expect("record parses")
    }

    fn service(records: Vec<VehicleRecord>) -> RegistrationReportService<InMemoryRecordSource> {
        RegistrationReportService::new(
            Arc::new(InMemoryRecordSource::new(records)),
            Arc::new(FixedClock(now())),
        )
    }

    #[test]
    fn kpis_use_period_records_and_trends_use_history() {
        let service = service(vec![
            record("AB1231", "o-1", "Virac", json!(["2025-10-03"])),
            record("AB1232", "o-2", "Virac", json!(["2025-09-12"])),
            // renewed after the period ends
            record("AB1233", "o-3", "Bato", json!(["2025-11-02"])),
            // falls back to creation date
            record("AB1234", "o-4", "Bato", json!(null)),
        ]);

        let dashboard = service
            .dashboard(&ReportFilters::default())
            .expect("dashboard builds");
        assert_eq!(dashboard.period_label, "October 2025");
        assert_eq!(dashboard.kpis.total_vehicles, 1);

        let counted: usize = dashboard.trends.monthly.iter().map(|point| point.count).sum();
        assert_eq!(counted, 3);
        // 2023 through 2025, with 2024 present as an empty year
        assert_eq!(dashboard.trends.yearly.len(), 3);
    }

    #[test]
    fn yearly_scope_widens_the_window() {
        let service = service(vec![
            record("AB1231", "o-1", "Virac", json!(["2025-10-03"])),
            record("AB1232", "o-2", "Virac", json!(["2025-01-12"])),
            record("AB1233", "o-3", "Bato", json!(["2024-12-31"])),
        ]);
        let filters = ReportFilters {
            scope: ReportScope::Yearly,
            period: Some("2025".to_string()),
            ..ReportFilters::default()
        };
        let dashboard = service.dashboard(&filters).expect("dashboard builds");
        assert_eq!(dashboard.kpis.total_vehicles, 2);
        assert_eq!(dashboard.top_municipalities[0].municipality, "VIRAC");
    }

    #[tokio::test]
    async fn generate_defaults_actor_and_skips_predictive_note_when_disabled() {
        let service = service(vec![record("AB1231", "o-1", "Virac", json!(["2025-10-03"]))]);
        let request = ReportRequest {
            format: ReportFormat::Csv,
            ..ReportRequest::default()
        };

        let payload = service.build_payload(&request).await.expect("payload builds");
        assert_eq!(payload.meta.actor, DEFAULT_ACTOR);
        assert!(payload.notes.is_empty());
        assert!(payload.predictive.is_none());

        let artifact = service.generate(&request).await.expect("artifact renders");
        assert_eq!(artifact.filename, "registration-data-monthly-october-2025.csv");
        let text = String::from_utf8(artifact.bytes).expect("utf-8");
        assert_eq!(text.lines().count(), 2);
    }
}
