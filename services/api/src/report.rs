use crate::infra::{build_service, load_records, parse_datetime, FilterArgs};
use chrono::NaiveDateTime;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use vehicle_registry::config::AppConfig;
use vehicle_registry::error::AppError;
use vehicle_registry::registration::{Clock, FixedClock, ReportFormat, ReportRequest, SystemClock};

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// JSON export of joined vehicle records
    #[arg(long)]
    pub(crate) records: PathBuf,
    /// Output format: pdf (document) or csv
    #[arg(long, default_value = "pdf")]
    pub(crate) format: ReportFormat,
    #[command(flatten)]
    pub(crate) filters: FilterArgs,
    /// Name recorded as the report author
    #[arg(long)]
    pub(crate) actor: Option<String>,
    /// Evaluate expirations as of this instant instead of now
    #[arg(long, value_parser = parse_datetime)]
    pub(crate) now: Option<NaiveDateTime>,
    /// Directory the artifact is written to
    #[arg(long, default_value = ".")]
    pub(crate) out_dir: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct DashboardArgs {
    /// JSON export of joined vehicle records
    #[arg(long)]
    pub(crate) records: PathBuf,
    #[command(flatten)]
    pub(crate) filters: FilterArgs,
    /// Evaluate expirations as of this instant instead of now
    #[arg(long, value_parser = parse_datetime)]
    pub(crate) now: Option<NaiveDateTime>,
}

fn clock(now: Option<NaiveDateTime>) -> Arc<dyn Clock> {
    match now {
        Some(now) => Arc::new(FixedClock(now)),
        None => Arc::new(SystemClock),
    }
}

pub(crate) async fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs {
        records,
        format,
        filters,
        actor,
        now,
        out_dir,
    } = args;

    let config = AppConfig::load()?;
    let service = build_service(&config, load_records(Some(records.as_path()))?, clock(now))?;
    let request = ReportRequest {
        filters: filters.into_filters(),
        format,
        actor,
    };

    let artifact = service.generate(&request).await?;
    std::fs::create_dir_all(&out_dir)?;
    let path = out_dir.join(&artifact.filename);
    std::fs::write(&path, &artifact.bytes)?;
    println!("{}", path.display());
    Ok(())
}

pub(crate) fn run_dashboard(args: DashboardArgs) -> Result<(), AppError> {
    let DashboardArgs {
        records,
        filters,
        now,
    } = args;

    let config = AppConfig::load()?;
    let service = build_service(&config, load_records(Some(records.as_path()))?, clock(now))?;
    let dashboard = service.dashboard(&filters.into_filters())?;
    let rendered = serde_json::to_string_pretty(&dashboard).map_err(std::io::Error::from)?;
    println!("{rendered}");
    Ok(())
}
