use chrono::NaiveDateTime;
use clap::Args;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};
use vehicle_registry::config::AppConfig;
use vehicle_registry::error::AppError;
use vehicle_registry::registration::renewal::parse_timestamp;
use vehicle_registry::registration::{
    Clock, InMemoryRecordSource, JsonRecordImporter, LicenseStatusFilter,
    PredictiveInsightsClient, RegistrationReportService, ReportFilters, ReportScope,
};

pub(crate) type ReportService = RegistrationReportService<InMemoryRecordSource>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) reports: Arc<ReportService>,
}

/// Filter flags shared by the `report` and `dashboard` commands.
#[derive(Args, Debug)]
pub(crate) struct FilterArgs {
    /// Report scope: daily, monthly, or yearly
    #[arg(long, default_value = "monthly")]
    pub(crate) scope: ReportScope,
    /// Period anchor (YYYY-MM-DD, YYYY-MM, or YYYY). Defaults to today.
    #[arg(long)]
    pub(crate) period: Option<String>,
    /// Municipality name, or ALL
    #[arg(long, default_value = "ALL")]
    pub(crate) municipality: String,
    /// Vehicle classification, or all
    #[arg(long, default_value = "all")]
    pub(crate) vehicle_type: String,
    /// with_license, without_license, or all
    #[arg(long, default_value = "all")]
    pub(crate) license_status: LicenseStatusFilter,
}

impl FilterArgs {
    pub(crate) fn into_filters(self) -> ReportFilters {
        ReportFilters {
            scope: self.scope,
            period: self.period,
            municipality: self.municipality,
            vehicle_type: self.vehicle_type,
            license_status: self.license_status,
        }
    }
}

pub(crate) fn parse_datetime(raw: &str) -> Result<NaiveDateTime, String> {
    parse_timestamp(raw).ok_or_else(|| {
        format!("failed to parse '{raw}' as YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS")
    })
}

pub(crate) fn load_records(path: Option<&Path>) -> Result<InMemoryRecordSource, AppError> {
    match path {
        Some(path) => {
            let source = JsonRecordImporter::from_path(path)?;
            info!(path = %path.display(), records = source.len(), "vehicle records loaded");
            Ok(source)
        }
        None => {
            warn!("REGISTRY_DATA_PATH not set, serving an empty record set");
            Ok(InMemoryRecordSource::default())
        }
    }
}

/// Report service over `records`, with forecasts when a forecast URL is configured.
pub(crate) fn build_service(
    config: &AppConfig,
    records: InMemoryRecordSource,
    clock: Arc<dyn Clock>,
) -> Result<ReportService, AppError> {
    let service = RegistrationReportService::new(Arc::new(records), clock);
    match PredictiveInsightsClient::from_config(&config.forecast)? {
        Some(client) => Ok(service.with_predictive(client)),
        None => Ok(service),
    }
}
