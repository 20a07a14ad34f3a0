//! Client for the external registration forecasting service.
//!
//! Every call is bounded by its own timeout and resolves to either a forecast
//! or "unavailable"; nothing here ever fails a report.

use super::filters::ReportFilters;
use crate::config::{ForecastConfig, MAX_FORECAST_WEEKS};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Municipalities polled for the caravan priority ranking.
pub const CARAVAN_MUNICIPALITIES: [&str; 11] = [
    "BAGAMANOC",
    "BARAS",
    "BATO",
    "CARAMORAN",
    "GIGMOTO",
    "PANDAN",
    "PANGANIBAN",
    "SAN ANDRES",
    "SAN MIGUEL",
    "VIGA",
    "VIRAC",
];

#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    #[error("forecast request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("forecast service answered with status {0}")]
    Status(u16),
    #[error("forecast service returned an unusable body: {0}")]
    Malformed(String),
    #[error("forecast request timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastQuery {
    pub weeks: u32,
    pub municipality: Option<String>,
}

impl ForecastQuery {
    pub fn new(weeks: u32, municipality: Option<String>) -> Self {
        Self {
            weeks: weeks.clamp(1, MAX_FORECAST_WEEKS),
            municipality,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyPrediction {
    pub week_start: String,
    pub predicted: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub weekly: Vec<WeeklyPrediction>,
}

impl Forecast {
    pub fn total_predicted(&self) -> f64 {
        self.weekly.iter().map(|week| week.predicted).sum()
    }
}

#[derive(Debug, Deserialize)]
struct ForecastEnvelope {
    success: bool,
    #[serde(default)]
    data: Option<ForecastData>,
}

#[derive(Debug, Deserialize)]
struct ForecastData {
    weekly_predictions: Vec<WeeklyPredictionWire>,
}

#[derive(Debug, Deserialize)]
struct WeeklyPredictionWire {
    #[serde(alias = "date")]
    week_start: String,
    #[serde(alias = "predicted", alias = "total_predicted")]
    predicted_count: f64,
}

/// Validates a forecast response body.
pub fn parse_forecast_body(body: &[u8]) -> Result<Forecast, ForecastError> {
    let envelope: ForecastEnvelope =
        serde_json::from_slice(body).map_err(|err| ForecastError::Malformed(err.to_string()))?;
    if !envelope.success {
        return Err(ForecastError::Malformed("success flag not set".to_string()));
    }
    let data = envelope
        .data
        .ok_or_else(|| ForecastError::Malformed("missing data".to_string()))?;

    Ok(Forecast {
        weekly: data
            .weekly_predictions
            .into_iter()
            .map(|week| WeeklyPrediction {
                week_start: week.week_start,
                predicted: week.predicted_count,
            })
            .collect(),
    })
}

#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn forecast(&self, query: &ForecastQuery) -> Result<Forecast, ForecastError>;
}

/// `GET {base_url}?weeks=N[&municipality=NAME]` against the forecasting service.
#[derive(Debug, Clone)]
pub struct HttpForecastClient {
    client: Client,
    base_url: String,
}

impl HttpForecastClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ForecastError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::new(client, base_url))
    }
}

#[async_trait]
impl ForecastSource for HttpForecastClient {
    async fn forecast(&self, query: &ForecastQuery) -> Result<Forecast, ForecastError> {
        let mut params = vec![("weeks", query.weeks.to_string())];
        if let Some(municipality) = &query.municipality {
            params.push(("municipality", municipality.clone()));
        }

        let response = self.client.get(&self.base_url).query(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ForecastError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        parse_forecast_body(&body)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForecastOutcome {
    Available(Forecast),
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaravanPriority {
    pub rank: usize,
    pub municipality: String,
    pub predicted_registrations: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictiveBlock {
    pub weeks: u32,
    pub total_predicted: f64,
    pub weekly: Vec<WeeklyPrediction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub caravan_priority: Vec<CaravanPriority>,
}

impl PredictiveBlock {
    pub fn caravan_entry(&self, municipality: &str) -> Option<&CaravanPriority> {
        self.caravan_priority
            .iter()
            .find(|entry| entry.municipality == municipality)
    }
}

pub struct PredictiveInsightsClient {
    source: Arc<dyn ForecastSource>,
    timeout: Duration,
    weeks: u32,
    concurrency: usize,
}

impl std::fmt::Debug for PredictiveInsightsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictiveInsightsClient")
            .field("timeout", &self.timeout)
            .field("weeks", &self.weeks)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl PredictiveInsightsClient {
    pub fn new(source: Arc<dyn ForecastSource>, config: &ForecastConfig) -> Self {
        Self {
            source,
            timeout: config.timeout,
            weeks: config.weeks.clamp(1, MAX_FORECAST_WEEKS),
            concurrency: config.concurrency.max(1),
        }
    }

    /// HTTP-backed client, or `None` when no forecast service is configured.
    pub fn from_config(config: &ForecastConfig) -> Result<Option<Self>, ForecastError> {
        let Some(base_url) = &config.base_url else {
            return Ok(None);
        };
        let source = HttpForecastClient::with_timeout(base_url.clone(), config.timeout)?;
        Ok(Some(Self::new(Arc::new(source), config)))
    }

    /// Primary forecast plus, without a municipality filter, the caravan
    /// ranking. The block is omitted when the primary forecast is unavailable.
    pub async fn fetch_predictions(&self, filters: &ReportFilters) -> Option<PredictiveBlock> {
        let municipality = filters.municipality_filter();
        let primary_query = ForecastQuery::new(self.weeks, municipality.clone());

        let primary = self.bounded(&primary_query);
        let caravan = async {
            if municipality.is_some() {
                Vec::new()
            } else {
                self.caravan_forecasts().await
            }
        };
        let (primary, caravan) = tokio::join!(primary, caravan);

        let forecast = match primary {
            ForecastOutcome::Available(forecast) => forecast,
            ForecastOutcome::Unavailable(reason) => {
                warn!(%reason, "primary forecast unavailable, omitting predictive block");
                return None;
            }
        };

        Some(PredictiveBlock {
            weeks: primary_query.weeks,
            total_predicted: forecast.total_predicted(),
            weekly: forecast.weekly,
            caravan_priority: rank_caravan(caravan),
        })
    }

    async fn caravan_forecasts(&self) -> Vec<(usize, String, ForecastOutcome)> {
        let municipalities: Vec<(usize, String)> =
            CARAVAN_MUNICIPALITIES.iter().map(|m| m.to_string()).enumerate().collect();
        stream::iter(municipalities)
            .map(|(position, municipality): (usize, String)| async move {
                let query = ForecastQuery::new(self.weeks, Some((*municipality).to_string()));
                let outcome = self.bounded(&query).await;
                if let ForecastOutcome::Unavailable(reason) = &outcome {
                    warn!(%municipality, %reason, "municipality forecast unavailable");
                }
                (position, (*municipality).to_string(), outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }

    async fn bounded(&self, query: &ForecastQuery) -> ForecastOutcome {
        match tokio::time::timeout(self.timeout, self.source.forecast(query)).await {
            Ok(Ok(forecast)) => ForecastOutcome::Available(forecast),
            Ok(Err(error)) => ForecastOutcome::Unavailable(error.to_string()),
            Err(_) => ForecastOutcome::Unavailable(ForecastError::Timeout(self.timeout).to_string()),
        }
    }
}

/// Lowest predicted volume first; ties keep the fixed municipality order.
fn rank_caravan(results: Vec<(usize, String, ForecastOutcome)>) -> Vec<CaravanPriority> {
    let mut available: Vec<(usize, String, f64)> = results
        .into_iter()
        .filter_map(|(position, municipality, outcome)| match outcome {
            ForecastOutcome::Available(forecast) => {
                Some((position, municipality, forecast.total_predicted()))
            }
            ForecastOutcome::Unavailable(_) => None,
        })
        .collect();
    available.sort_by(|a, b| a.2.total_cmp(&b.2).then(a.0.cmp(&b.0)));

    available
        .into_iter()
        .enumerate()
        .map(|(index, (_, municipality, predicted))| CaravanPriority {
            rank: index + 1,
            municipality,
            predicted_registrations: predicted,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedSource {
        totals: HashMap<Option<String>, f64>,
        slow: Vec<Option<String>>,
        calls: Mutex<Vec<ForecastQuery>>,
    }

    impl ScriptedSource {
        fn with(mut self, municipality: Option<&str>, total: f64) -> Self {
            self.totals.insert(municipality.map(str::to_string), total);
            self
        }
    }

    #[async_trait]
    impl ForecastSource for ScriptedSource {
        async fn forecast(&self, query: &ForecastQuery) -> Result<Forecast, ForecastError> {
            self.calls.lock().expect("calls mutex").push(query.clone());
            if self.slow.contains(&query.municipality) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            match self.totals.get(&query.municipality) {
                Some(total) => Ok(Forecast {
                    weekly: vec![WeeklyPrediction {
                        week_start: "2025-10-20".to_string(),
                        predicted: *total,
                    }],
                }),
                None => Err(ForecastError::Status(503)),
            }
        }
    }

    fn config() -> ForecastConfig {
        ForecastConfig {
            base_url: None,
            timeout: Duration::from_millis(200),
            weeks: 80,
            concurrency: 3,
        }
    }

    #[test]
    fn parses_alternate_field_names() {
        let body = br#"{"success":true,"data":{"weekly_predictions":[
            {"date":"2025-10-20","predicted":3.5},
            {"week_start":"2025-10-27","total_predicted":4},
            {"week_start":"2025-11-03","predicted_count":2.5}
        ]}}"#;
        let forecast = parse_forecast_body(body).expect("body parses");
        assert_eq!(forecast.weekly.len(), 3);
        assert_eq!(forecast.total_predicted(), 10.0);
    }

    #[test]
    fn deviating_bodies_are_malformed() {
        for body in [
            br#"{"success":false,"data":{"weekly_predictions":[]}}"#.as_slice(),
            br#"{"success":true}"#.as_slice(),
            br#"{"success":true,"data":{"weekly_predictions":[{"date":"x"}]}}"#.as_slice(),
            b"<html>oops</html>".as_slice(),
        ] {
            assert!(matches!(
                parse_forecast_body(body),
                Err(ForecastError::Malformed(_))
            ));
        }
    }

    #[test]
    fn query_caps_weeks() {
        assert_eq!(ForecastQuery::new(400, None).weeks, 52);
        assert_eq!(ForecastQuery::new(0, None).weeks, 1);
    }

    #[tokio::test]
    async fn caravan_ranking_excludes_failures_and_sorts_ascending() {
        let source = ScriptedSource::default()
            .with(None, 120.0)
            .with(Some("VIRAC"), 40.0)
            .with(Some("BATO"), 5.0)
            .with(Some("VIGA"), 5.0)
            .with(Some("PANDAN"), 12.0);
        let client = PredictiveInsightsClient::new(Arc::new(source), &config());

        let block = client
            .fetch_predictions(&ReportFilters::default())
            .await
            .expect("primary forecast available");

        assert_eq!(block.weeks, 52);
        assert_eq!(block.total_predicted, 120.0);
        let order: Vec<(&str, usize)> = block
            .caravan_priority
            .iter()
            .map(|entry| (entry.municipality.as_str(), entry.rank))
            .collect();
        assert_eq!(
            order,
            vec![("BATO", 1), ("VIGA", 2), ("PANDAN", 3), ("VIRAC", 4)]
        );
    }

    #[tokio::test]
    async fn slow_municipality_times_out_without_failing_siblings() {
        let source = ScriptedSource {
            slow: vec![Some("BARAS".to_string())],
            ..ScriptedSource::default()
        }
        .with(None, 10.0)
        .with(Some("BARAS"), 1.0)
        .with(Some("VIRAC"), 2.0);
        let client = PredictiveInsightsClient::new(Arc::new(source), &config());

        let block = client
            .fetch_predictions(&ReportFilters::default())
            .await
            .expect("primary forecast available");
        assert_eq!(block.caravan_priority.len(), 1);
        assert_eq!(block.caravan_priority[0].municipality, "VIRAC");
    }

    #[tokio::test]
    async fn failed_primary_omits_block() {
        let source = ScriptedSource::default().with(Some("VIRAC"), 2.0);
        let client = PredictiveInsightsClient::new(Arc::new(source), &config());
        assert!(client
            .fetch_predictions(&ReportFilters::default())
            .await
            .is_none());
    }

    #[tokio::test]
    async fn slow_primary_omits_block_within_timeout() {
        let source = ScriptedSource {
            slow: vec![None],
            ..ScriptedSource::default()
        }
        .with(None, 10.0)
        .with(Some("VIRAC"), 2.0);
        let client = PredictiveInsightsClient::new(Arc::new(source), &config());

        let started = std::time::Instant::now();
        let block = tokio::time::timeout(
            Duration::from_secs(5),
            client.fetch_predictions(&ReportFilters::default()),
        )
        .await
        .expect("fetch settles once the primary call times out");
        assert!(block.is_none());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn failed_primary_still_issues_municipality_calls() {
        let source = Arc::new(
            ScriptedSource::default()
                .with(Some("VIRAC"), 2.0)
                .with(Some("BATO"), 1.0),
        );
        let client = PredictiveInsightsClient::new(source.clone(), &config());

        assert!(client
            .fetch_predictions(&ReportFilters::default())
            .await
            .is_none());

        let calls = source.calls.lock().expect("calls mutex");
        assert_eq!(calls.len(), CARAVAN_MUNICIPALITIES.len() + 1);
        assert!(calls.iter().any(|query| query.municipality.is_none()));
        for municipality in CARAVAN_MUNICIPALITIES {
            assert!(calls
                .iter()
                .any(|query| query.municipality.as_deref() == Some(municipality)));
        }
    }

    #[tokio::test]
    async fn http_client_sends_query_and_maps_status() {
        use axum::extract::RawQuery;
        use axum::http::StatusCode;
        use axum::routing::get;
        use axum::{Json, Router};

        async fn forecast(RawQuery(query): RawQuery) -> Result<Json<serde_json::Value>, StatusCode> {
            let query = query.unwrap_or_default();
            if query.contains("municipality=BATO") {
                return Err(StatusCode::BAD_GATEWAY);
            }
            Ok(Json(serde_json::json!({
                "success": true,
                "data": { "weekly_predictions": [
                    { "week_start": "2025-10-20", "predicted_count": 6 },
                    { "week_start": "2025-10-27", "predicted_count": if query.contains("weeks=2") { 4 } else { 0 } }
                ]}
            })))
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind forecast stub");
        let addr = listener.local_addr().expect("local addr");
        let app = Router::new().route("/predict", get(forecast));
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let client =
            HttpForecastClient::with_timeout(format!("http://{addr}/predict"), Duration::from_secs(5))
                .expect("client builds");

        let forecast = client
            .forecast(&ForecastQuery::new(2, None))
            .await
            .expect("forecast available");
        assert_eq!(forecast.total_predicted(), 10.0);

        let failure = client
            .forecast(&ForecastQuery::new(2, Some("BATO".to_string())))
            .await;
        assert!(matches!(failure, Err(ForecastError::Status(502))));
    }

    #[tokio::test]
    async fn municipality_filter_skips_caravan_fan_out() {
        let source = Arc::new(ScriptedSource::default().with(Some("VIRAC"), 8.0));
        let client = PredictiveInsightsClient::new(source.clone(), &config());
        let filters = ReportFilters {
            municipality: "virac".to_string(),
            ..ReportFilters::default()
        };

        let block = client
            .fetch_predictions(&filters)
            .await
            .expect("primary forecast available");
        assert!(block.caravan_priority.is_empty());
        assert_eq!(source.calls.lock().expect("calls mutex").len(), 1);
    }
}
