//! CLI binary for the gtfs-merger.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use gtfs_config::load_config_from;
use gtfs_config::shared::{MergeSettings, OutputCompression};
use gtfs_merger::{Merger, MergerConfig, TracingEventSink, resolve_paths};
use gtfs_telemetry::tracing::{DEFAULT_LOG_DIRECTIVE, init_tracing};
use tracing::{error, info};

const SERVICE_NAME: &str = "gtfs-merge";

/// GTFS Merger - Merges GTFS feed archives into one archive.
#[derive(Parser, Debug)]
#[command(name = "gtfs-merge", version)]
#[command(about = "Merges GTFS feed archives into one archive")]
struct Args {
    /// Input archives or glob patterns, followed by the output archive path
    #[arg(value_name = "PATHS")]
    paths: Vec<String>,

    /// Settings file (yaml, yml, json or toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Member whose rows all pass through (repeatable)
    #[arg(long = "pass-all", value_name = "FILE")]
    pass_all: Vec<String>,

    /// Member that only drops byte-identical rows (repeatable)
    #[arg(long = "exact-only", value_name = "FILE")]
    exact_only: Vec<String>,

    /// Compression of the output members (default: stored)
    #[arg(long, value_enum)]
    compression: Option<CompressionArg>,

    /// Write the run summary as JSON to this path
    #[arg(long, value_name = "PATH")]
    summary: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = DEFAULT_LOG_DIRECTIVE)]
    log_level: String,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CompressionArg {
    Stored,
    Deflated,
}

impl From<CompressionArg> for OutputCompression {
    fn from(value: CompressionArg) -> Self {
        match value {
            CompressionArg::Stored => OutputCompression::Stored,
            CompressionArg::Deflated => OutputCompression::Deflated,
        }
    }
}

fn main() {
    let args = Args::parse();

    let flusher = match init_tracing(SERVICE_NAME, &args.log_level) {
        Ok(flusher) => flusher,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };

    let code = match run(args) {
        Ok(()) => 0,
        Err(err) => {
            error!("Error: {err:#}");
            1
        }
    };

    // Flush buffered log lines before exiting.
    drop(flusher);
    std::process::exit(code);
}

fn run(args: Args) -> anyhow::Result<()> {
    let resolved = resolve_paths(&args.paths)?;

    let mut settings: MergeSettings =
        load_config_from(args.config.as_deref()).context("failed to load settings")?;
    settings.pass_all_files.extend(args.pass_all);
    settings.exact_only_files.extend(args.exact_only);
    if let Some(compression) = args.compression {
        settings.compression = compression.into();
    }

    let config = MergerConfig::from_settings(&settings).context("invalid settings")?;

    info!(
        inputs = resolved.inputs.len(),
        output = %resolved.output.display(),
        rules = config.key_table.len(),
        "Starting GTFS Merger"
    );

    let merger = Merger::new(config);
    let summary = merger.merge(&resolved.inputs, &resolved.output, &mut TracingEventSink)?;

    if let Some(path) = &args.summary {
        let json = serde_json::to_string_pretty(&summary).context("failed to serialize summary")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write summary to `{}`", path.display()))?;
    }

    info!(
        members = summary.members.len(),
        rows = summary.rows_written,
        output = %resolved.output.display(),
        "Merge completed successfully"
    );

    Ok(())
}
