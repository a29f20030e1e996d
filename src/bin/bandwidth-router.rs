//! Offline CLI front end: runs the evaluator/optimizer against a
//! historical-record JSON file and prints the resulting Report. Logging
//! init follows the teacher's voice agent demo (`RUST_LOG` env filter,
//! `tracing_subscriber::fmt`).
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use bandwidth_router::config::RouterConfig;
use bandwidth_router::evaluator::{evaluate, HistoricalRecord, Report};
use clap::Parser;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "bandwidth-router", about = "Replays historical records through the routing policy")]
struct Cli {
    /// Path to a JSON file containing a list of historical records.
    #[arg(long)]
    records: PathBuf,
}

fn main() -> ExitCode {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,bandwidth_router=info".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();

    let cli = Cli::parse();
    let config = match RouterConfig::load() {
        Ok(c) => c,
        Err(e) => {
            error!(target: "cli", error = %e, "configuration error");
            return ExitCode::from(2);
        }
    };

    let contents = match fs::read_to_string(&cli.records) {
        Ok(c) => c,
        Err(e) => {
            error!(target: "cli", path = %cli.records.display(), error = %e, "failed to read records file");
            return ExitCode::from(3);
        }
    };

    let records: Vec<HistoricalRecord> = match serde_json::from_str(&contents) {
        Ok(r) => r,
        Err(e) => {
            error!(target: "cli", error = %e, "failed to parse records file");
            return ExitCode::from(3);
        }
    };

    let report = evaluate(&records, &config.policy);
    info!(target: "cli", total_records = report.total_records, "evaluation complete");
    print_report(&report);

    ExitCode::from(0)
}

fn print_report(report: &Report) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{json}"),
        Err(_) => eprintln!("{report:?}"),
    }
}
