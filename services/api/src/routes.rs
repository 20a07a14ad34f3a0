use crate::infra::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use serde_json::json;
use vehicle_registry::error::AppError;
use vehicle_registry::registration::{
    DashboardAnalytics, ReportFilters, ReportFormat, ReportRequest,
};

#[derive(Debug, Deserialize)]
pub(crate) struct ReportRequestBody {
    #[serde(default)]
    pub(crate) filters: ReportFilters,
    #[serde(default)]
    pub(crate) format: Option<String>,
    #[serde(default)]
    pub(crate) actor: Option<String>,
}

impl ReportRequestBody {
    fn into_request(self) -> Result<ReportRequest, AppError> {
        let format = match self.format.as_deref() {
            Some(raw) => raw.parse::<ReportFormat>().map_err(AppError::InvalidRequest)?,
            None => ReportFormat::default(),
        };
        Ok(ReportRequest {
            filters: self.filters,
            format,
            actor: self.actor,
        })
    }
}

pub(crate) fn registry_routes() -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/reports/registration", post(report_endpoint))
        .route("/api/v1/analytics/dashboard", get(dashboard_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn report_endpoint(
    Extension(state): Extension<AppState>,
    body: Result<Json<ReportRequestBody>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body.map_err(|rejection| AppError::InvalidRequest(rejection.body_text()))?;
    let request = body.into_request()?;
    let artifact = state.reports.generate(&request).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, artifact.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", artifact.filename),
            ),
        ],
        artifact.bytes,
    ))
}

pub(crate) async fn dashboard_endpoint(
    Extension(state): Extension<AppState>,
    filters: Result<Query<ReportFilters>, QueryRejection>,
) -> Result<Json<DashboardAnalytics>, AppError> {
    let Query(filters) =
        filters.map_err(|rejection| AppError::InvalidRequest(rejection.body_text()))?;
    Ok(Json(state.reports.dashboard(&filters)?))
}
