use crate::cli::ServeArgs;
use crate::infra::{build_service, load_records, AppState};
use crate::routes::registry_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use vehicle_registry::config::AppConfig;
use vehicle_registry::error::AppError;
use vehicle_registry::registration::SystemClock;
use vehicle_registry::telemetry;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let records = load_records(config.registry.data_path.as_deref())?;
    let reports = build_service(&config, records, Arc::new(SystemClock))?;
    info!(
        predictive = reports.predictive_enabled(),
        "registration report service configured"
    );

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        reports: Arc::new(reports),
    };

    let app = registry_routes()
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "vehicle registry service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
