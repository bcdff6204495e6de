//! a11y-audit - command line entry point
//!
//! `a11y-audit "1,3,5"` runs the listed operations and writes
//! `audit_results_<timestamp>.json` into the output directory. Without
//! operations the menu is printed.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use a11y_audit::config::{self, AuditToml};
use a11y_audit::dataset::load_dataset;
use a11y_audit::models::operation::menu_text;
use a11y_audit::services::{AnalysisClient, GeminiClient, JsonFileSink, ReportCatalog, ReportSink};
use a11y_audit::{AuditServices, OperationPlan, RunContext};
use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for a11y-audit
#[derive(Parser, Debug)]
#[command(name = "a11y-audit")]
#[command(about = "Audit the accessibility tools dataset")]
#[command(version)]
struct Args {
    /// Operations to run, comma separated (e.g. "1,3,5"; 7 runs 1-6)
    operations: Option<String>,

    /// Config file path (overrides A11Y_AUDIT_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Active tools CSV
    #[arg(long)]
    active: Option<PathBuf>,

    /// Removed tools CSV
    #[arg(long)]
    removed: Option<PathBuf>,

    /// Directory for report artifacts
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Records per batch for the batched operations
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Write the effective configuration to this path and exit
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,
}

impl Args {
    fn apply(&self, config: &mut AuditToml) {
        if let Some(path) = &self.active {
            config.data.active_csv = path.clone();
        }
        if let Some(path) = &self.removed {
            config.data.removed_csv = path.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.data.output_dir = dir.clone();
        }
        if let Some(size) = self.batch_size {
            config.audit.batch_size = size;
        }
    }
}

fn init_tracing(config: &AuditToml) -> Result<()> {
    let file_layer = match &config.logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, config_path) =
        config::load_audit_config(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    init_tracing(&config)?;

    if let Some(path) = &args.write_config {
        a11y_common::config::write_toml_config(&config, path)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Configuration written to {}", path.display());
        return Ok(());
    }

    let Some(request) = args.operations.as_deref() else {
        print!("{}", menu_text());
        return Ok(());
    };

    info!("Starting a11y-audit v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!(path = %path.display(), "Using config file");
    }

    let plan = OperationPlan::parse(request);
    if plan.is_empty() {
        warn!("No valid operations requested");
    }

    let dataset = load_dataset(&config.data.active_csv, &config.data.removed_csv, &config.columns);

    let mut client_unavailable = None;
    let client: Option<Arc<dyn AnalysisClient>> = if plan.needs_client() {
        match GeminiClient::from_config(&config) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!(error = %e, "Analysis client unavailable, external operations will fail");
                client_unavailable = Some(e.to_string());
                None
            }
        }
    } else {
        None
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling in-flight work");
            on_interrupt.cancel();
        }
    });

    let catalog = ReportCatalog::new(&config.data.output_dir);
    let mut services = AuditServices::new(config.audit.clone(), dataset, client, catalog, cancel);
    if let Some(reason) = client_unavailable {
        services = services.with_client_unavailable(reason);
    }
    let report = RunContext::new(plan, services).execute().await;

    let sink = JsonFileSink::new(&config.data.output_dir);
    let path = sink.persist(&report).context("Failed to write audit report")?;

    let summary = &report.summary;
    println!("Report written to {}", path.display());
    println!(
        "Operations: {} total, {} completed ({} partial), {} failed",
        summary.total_operations, summary.operations_completed, summary.operations_partial, summary.operations_failed
    );
    for rejected in &report.rejected_operations {
        println!("Rejected '{}': {}", rejected.token, rejected.reason);
    }

    Ok(())
}
