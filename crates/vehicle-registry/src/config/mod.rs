use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_FORECAST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_FORECAST_WEEKS: u32 = 4;
const DEFAULT_FORECAST_CONCURRENCY: usize = 4;
pub const MAX_FORECAST_WEEKS: u32 = 52;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub forecast: ForecastConfig,
    pub registry: RegistryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let forecast = ForecastConfig {
            base_url: non_empty_var("FORECAST_BASE_URL"),
            timeout: Duration::from_secs(parse_var(
                "FORECAST_TIMEOUT_SECS",
                DEFAULT_FORECAST_TIMEOUT_SECS,
            )?),
            weeks: parse_var("FORECAST_WEEKS", DEFAULT_FORECAST_WEEKS)?
                .clamp(1, MAX_FORECAST_WEEKS),
            concurrency: parse_var("FORECAST_CONCURRENCY", DEFAULT_FORECAST_CONCURRENCY)?.max(1),
        };

        let registry = RegistryConfig {
            data_path: non_empty_var("REGISTRY_DATA_PATH").map(PathBuf::from),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            forecast,
            registry,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty_var(key) {
        Some(raw) => raw.parse::<T>().map_err(|_| ConfigError::InvalidNumber { key }),
        None => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Forecast microservice settings. Predictions are disabled without a base URL.
#[derive(Debug, Clone)]
pub struct ForecastConfig {
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub weeks: u32,
    pub concurrency: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(DEFAULT_FORECAST_TIMEOUT_SECS),
            weeks: DEFAULT_FORECAST_WEEKS,
            concurrency: DEFAULT_FORECAST_CONCURRENCY,
        }
    }
}

/// Where the service loads joined vehicle records from.
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    pub data_path: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a non-negative integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
