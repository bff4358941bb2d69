//! Tempo CLI: load song metadata and listening logs into a Parquet star schema.

use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use tempo::{CliArgs, Config, init_tracing, run_pipeline};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = CliArgs::parse();

    info!("Loading config from {}", args.config.display());

    let config = match Config::from_file(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run_pipeline(&config).await {
        Ok(stats) => {
            info!(
                "Wrote {} tables ({} songplays from {} song plays)",
                stats.tables.len(),
                stats.rows("songplays").unwrap_or_default(),
                stats.song_plays
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Pipeline failed: {e}");
            ExitCode::FAILURE
        }
    }
}
