//! M-Statistic Pipeline Binary
//!
//! Runs pipeline stages over a local data directory:
//! - `process`: convert decompressed history dumps into compact traces
//! - `extract`: copy single articles out of traces
//! - `m-stat`: score every page of each trace
//! - `over-time`: running score of single-article traces
//!
//! ## Configuration
//!
//! Stage parameters come from a JSON params file (see `wiki_mstat::config`).
//!
//! Environment variables:
//! - `MSTAT_PARAMS`: params file used when no path is given on the command line
//! - `RUST_LOG`: log filter (default: `wiki_mstat=info,mstat_pipeline=info`)
//! - `LOG_FORMAT`: `json` (default) or `pretty`; logs go to stderr
//!
//! ## Usage
//!
//! ```bash
//! LOG_FORMAT=pretty cargo run --bin mstat_pipeline -- config/params.json process m-stat
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use tracing::{error, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use wiki_mstat::config::PipelineConfig;
use wiki_mstat::pipeline::{self, Target};

const DEFAULT_LOG_FILTER: &str = "wiki_mstat=info,mstat_pipeline=info";

/// Log output selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy)]
enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn from_env() -> Self {
        match std::env::var("LOG_FORMAT").as_deref() {
            Ok("pretty") => Self::Pretty,
            _ => Self::Json,
        }
    }
}

/// Install the subscriber on stderr. Stage spans (`process`, `m_stat`,
/// `extract`, `over_time`) log their busy and idle time when they close.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(false)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true),
            )
            .init(),
    }
}

fn usage() -> &'static str {
    "usage: mstat_pipeline [params.json] <process|extract|m-stat|over-time>..."
}

fn main() -> ExitCode {
    init_tracing(LogFormat::from_env());

    let mut args: Vec<String> = std::env::args().skip(1).collect();

    // A leading argument that is not a target names the params file.
    let params_path = match args.first() {
        Some(first) if Target::from_str(first).is_none() => Some(PathBuf::from(args.remove(0))),
        _ => std::env::var("MSTAT_PARAMS").ok().map(PathBuf::from),
    };

    let mut targets = Vec::with_capacity(args.len());
    for arg in &args {
        match Target::from_str(arg) {
            Some(target) => targets.push(target),
            None => {
                error!(target_name = %arg, "{}", usage());
                return ExitCode::FAILURE;
            }
        }
    }
    if targets.is_empty() {
        error!("{}", usage());
        return ExitCode::FAILURE;
    }

    let config = match params_path {
        Some(path) => match PipelineConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                error!(error = %e, path = %path.display(), "Failed to load params");
                return ExitCode::FAILURE;
            }
        },
        None => PipelineConfig::default(),
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %config.data_dir.display(),
        targets = ?targets,
        "Starting pipeline"
    );
    let started = Instant::now();

    match pipeline::run(&config, &targets) {
        Ok(()) => {
            info!(elapsed_ms = started.elapsed().as_millis() as u64, "Pipeline complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Pipeline failed");
            ExitCode::FAILURE
        }
    }
}
