// src/main.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use attendance_core::config::GraphSettings;
use attendance_core::graph_client::GraphClient;
use attendance_core::pipeline::{run, RunOptions, RunSummary};
use attendance_core::store::{DocumentStore, GraphStore, LocalStore};
use attendance_core::timesheet::DEFAULT_TIMESTAMP_FORMAT;

#[derive(Parser, Debug)]
#[command(
    name = "attendance-core",
    version,
    about = "Reconciles clock-in punches against the weekly schedule"
)]
struct Cli {
    /// Log filter, e.g. "debug" or "attendance_core=debug" (falls back to RUST_LOG, then "info")
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch inputs from the configured Graph drive and upload the summary there
    Sync {
        /// Also upload a CSV copy of the summary
        #[arg(long)]
        csv: bool,
    },
    /// Run against local files
    Local {
        /// Weekly schedule CSV (Name + weekday columns)
        #[arg(long)]
        schedule: PathBuf,
        /// Punch export CSV, or a directory whose newest .csv is used
        #[arg(long)]
        timesheet: PathBuf,
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
        #[arg(long, default_value = DEFAULT_TIMESTAMP_FORMAT)]
        timestamp_format: String,
        /// Also write a CSV copy of the summary
        #[arg(long)]
        csv: bool,
    },
}

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_summary(summary: &RunSummary) {
    println!("\n--- Attendance Summary {} ---", summary.target_date);
    if summary.rows.is_empty() {
        println!("No employees found.");
    }
    for row in &summary.rows {
        println!(
            " - {:<30} {:<22} {:<16} {}",
            row.display_name, row.status, row.scheduled_text, row.clock_in_display
        );
    }
    println!("Published to: {}", summary.location);
    println!("-----------------------------------------------------\n");
}

async fn execute<S: DocumentStore>(store: S, options: RunOptions) -> Result<()> {
    let summary = run(&store, &options)
        .await
        .context("Attendance reconciliation failed")?;
    print_summary(&summary);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let outcome = match cli.command {
        Command::Sync { csv } => {
            let settings = GraphSettings::from_env().context("Failed to load Graph settings from environment")?;
            info!("Graph configuration loaded: {:?}", settings);
            let options = RunOptions {
                timestamp_format: settings.timestamp_format.clone(),
                export_csv: csv,
            };
            let client = GraphClient::new(settings).context("Failed to create Graph client")?;
            execute(GraphStore::new(client), options).await
        }
        Command::Local {
            schedule,
            timesheet,
            output_dir,
            timestamp_format,
            csv,
        } => {
            let options = RunOptions {
                timestamp_format,
                export_csv: csv,
            };
            execute(LocalStore::new(schedule, timesheet, output_dir), options).await
        }
    };

    if let Err(e) = &outcome {
        error!("{:#}", e);
    }
    outcome
}
