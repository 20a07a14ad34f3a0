pub mod clock;
pub mod compliance;
pub mod dashboard;
pub mod domain;
pub mod filters;
pub mod forecast;
pub mod metrics;
pub mod plate;
pub mod renewal;
pub mod report;
pub mod service;
pub mod source;
pub mod trends;

pub use clock::{Clock, FixedClock, SystemClock};
pub use compliance::{analyze, ComplianceRanking, ComplianceSummary, NeedArea};
pub use dashboard::DashboardAnalytics;
pub use domain::{
    OwnerAddress, OwnerId, OwnerRecord, PlateType, RenewalEntry, RenewalHistory,
    TimestampValue, VehicleClassification, VehicleRecord, VehicleStatusType,
};
pub use filters::{LicenseStatusFilter, ReportFilters, ReportPeriod, ReportScope};
pub use forecast::{
    CaravanPriority, Forecast, ForecastError, ForecastQuery, ForecastSource,
    HttpForecastClient, PredictiveBlock, PredictiveInsightsClient,
};
pub use metrics::{MetricsAggregator, MetricsSnapshot, MunicipalityStat};
pub use plate::{ExpirationInfo, PlateError, PlateStatus, PlateStatusResolver, RegistrationStatus};
pub use renewal::latest_renewal;
pub use report::{RenderError, RenderedArtifact, ReportAssembler, ReportFormat, ReportPayload};
pub use service::{RegistrationReportService, ReportError, ReportRequest};
pub use source::{InMemoryRecordSource, JsonRecordImporter, RecordSource, RecordSourceError};
pub use trends::{compute_trends, TrendDirection, TrendSummary};
