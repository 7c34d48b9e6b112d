//! isocatalog - builds the quickget operating system catalog.
//!
//! Runs every bundled source (or the ones named with `--only`), writes the
//! catalog JSON and a per-source status report, and exits non-zero when
//! nothing at all could be catalogued.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use isocatalog::{catalog_to_json, catalog_to_json_pretty, CatalogEngine, CatalogSettings};
use isocatalog::FetchGateway;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod error;
mod logging;
mod sources;

use error::CliError;

const CONFIG_DIR_NAME: &str = "isocatalog";
const CONFIG_FILE_NAME: &str = "config.ini";

#[derive(Debug, Parser)]
#[command(name = "isocatalog", version, about = "Builds the quickget operating system catalog")]
struct Args {
    /// Settings file (default: <config dir>/isocatalog/config.ini)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Catalog output path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Status report output path
    #[arg(long)]
    status: Option<PathBuf>,

    /// Only run these sources (comma separated)
    #[arg(long, value_delimiter = ',')]
    only: Vec<String>,

    /// Pretty-print the catalog
    #[arg(long)]
    pretty: bool,

    /// Also write logs to daily files in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// List available sources and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let _log_guard = logging::init(args.verbose, args.log_dir.as_deref());

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Catalog run failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode, CliError> {
    let providers = sources::select(sources::registry(), &args.only)?;
    if args.list {
        for provider in &providers {
            println!("{}", provider.metadata().name);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let settings = load_settings(&args)?;

    let cancellation = CancellationToken::new();
    spawn_signal_handler(cancellation.clone());

    let gateway = Arc::new(FetchGateway::new(settings.fetch.clone(), cancellation.clone())?);
    let result = CatalogEngine::new(gateway).run(providers).await;
    if cancellation.is_cancelled() {
        return Err(CliError::Cancelled);
    }

    let catalog = if args.pretty {
        catalog_to_json_pretty(&result.catalog)
    } else {
        catalog_to_json(&result.catalog)
    }
    .map_err(|source| CliError::Serialize {
        what: "catalog",
        source,
    })?;
    write_file(&settings.output_path, &catalog)?;
    info!(
        path = %settings.output_path.display(),
        sources = result.catalog.len(),
        "Catalog written"
    );

    if let Some(path) = &settings.status_path {
        let status = serde_json::to_string_pretty(&result.status.snapshot()).map_err(|source| {
            CliError::Serialize {
                what: "status report",
                source,
            }
        })?;
        write_file(path, &status)?;
    }

    if result.catalog.is_empty() {
        warn!("No source produced a catalog entry");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Settings file first, then command line overrides.
fn load_settings(args: &Args) -> Result<CatalogSettings, CliError> {
    let mut settings = match &args.config {
        Some(path) => CatalogSettings::load(path)?,
        None => match default_config_path() {
            Some(path) => CatalogSettings::load_or_default(&path)?,
            None => CatalogSettings::default(),
        },
    };

    if let Some(output) = &args.output {
        settings.output_path = output.clone();
    }
    if let Some(status) = &args.status {
        settings.status_path = Some(status.clone());
    }
    Ok(settings)
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

fn spawn_signal_handler(cancellation: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling outstanding requests");
            cancellation.cancel();
        }
    });
}

fn write_file(path: &Path, contents: &str) -> Result<(), CliError> {
    std::fs::write(path, contents).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })
}
