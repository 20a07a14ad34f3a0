use crate::report::{run_dashboard, run_report, DashboardArgs, ReportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use vehicle_registry::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Vehicle Registry",
    about = "Registration status reports and analytics for regional vehicle records",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Generate a registration report document or CSV export
    Report(ReportArgs),
    /// Print dashboard analytics as JSON
    Dashboard(DashboardArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Report(args) => run_report(args).await,
        Command::Dashboard(args) => run_dashboard(args),
    }
}
