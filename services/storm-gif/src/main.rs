//! Storm GIF plugin entry point.
//!
//! Reads the job parameters as a JSON object, runs the pipeline and prints
//! `{"plugin_results": {...}}` on stdout.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::{error, info};

use storage::S3StorageProvider;
use storm_gif::logging::init_tracing;
use storm_gif::{run, PluginParams, StormConfig};

#[derive(Parser, Debug)]
#[command(name = "storm-gif")]
#[command(about = "Render a storm's hourly precipitation over a watershed as an animated GIF")]
struct Args {
    /// Job parameters as a JSON object
    params: Option<String>,

    /// Read the job parameters from a file instead
    #[arg(long, conflicts_with = "params")]
    params_file: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

fn read_params(args: &Args) -> Result<PluginParams> {
    let json = match (&args.params, &args.params_file) {
        (Some(json), _) => json.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => bail!("job parameters are required (JSON argument or --params-file)"),
    };
    Ok(PluginParams::from_json(&json)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let params = read_params(&args).inspect_err(|e| error!(error = %e, "Invalid job parameters"))?;

    let config = StormConfig::from_env();
    config
        .validate()
        .inspect_err(|e| error!(error = %e, "Invalid configuration"))?;

    info!(
        start = %params.start_date,
        hours = params.duration,
        bucket = %params.output_bucket,
        "Starting storm-gif"
    );

    let storage = Arc::new(S3StorageProvider::new(config.storage.clone()));
    let result = run(&params, &config, storage).await.inspect_err(|e| {
        error!(kind = e.kind(), error = %e, "Storm animation failed");
    })?;

    println!("{}", json!({ "plugin_results": result }));
    Ok(())
}
