use std::path::PathBuf;

use ::tracing::{error, info, warn};
use clap::Parser;

mod config;
mod data_model;
mod fetch;
mod relay;
mod service;
mod sheets;
mod sync;
mod tracing;
use tracing::setup_tracing;
#[cfg(test)]
mod testing;

use service::{Service, SyncRequest};

#[derive(Parser)]
#[command(version, about = "Relay spreadsheet-referenced resources into an object store", long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "config file", help = "Path to config file")]
    config: Option<PathBuf>,
    #[arg(long, help = "Spreadsheet to read from and write back to")]
    spreadsheet_id: String,
    #[arg(long, help = "Destination bucket or container")]
    bucket: String,
    #[arg(long, default_value = "A", help = "Column holding source URLs")]
    source_column: String,
    #[arg(long, default_value = "B", help = "Column receiving object URLs")]
    target_column: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = match cli.config {
        Some(path) => match config::Config::from_path(path.to_str().unwrap()) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("error loading config: {err:#}");
                std::process::exit(1);
            }
        },
        None => config::Config::default(),
    };

    if let Err(err) = setup_tracing(&config) {
        eprintln!("error setting up tracing: {err:#}");
        std::process::exit(1);
    }

    let request = SyncRequest {
        spreadsheet_id: cli.spreadsheet_id.trim().to_string(),
        bucket: cli.bucket.trim().to_string(),
        source_column: cli.source_column,
        target_column: cli.target_column,
    };
    if request.spreadsheet_id.is_empty() || request.bucket.is_empty() {
        error!("please provide both a spreadsheet id and a bucket name");
        std::process::exit(1);
    }

    let service = Service::new(config);
    match service.run(&request).await {
        Ok(report) => {
            if report.failed() > 0 {
                warn!(
                    failed = report.failed(),
                    "some rows failed and were left unchanged"
                );
            }
            info!(
                range = %report.range,
                rows = report.rows,
                uploaded = report.uploaded(),
                "sheet updated with object store URLs"
            );
        }
        Err(err) => {
            error!(phase = ?err.phase(), "run aborted: {err}");
            std::process::exit(1);
        }
    }
}
