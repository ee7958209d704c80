use anyhow::{Context, Result};
use audit_config::parser;
use clap::Parser;
use device_session::SshConnector;
use fleet_audit::{FleetRunner, ReportTemplate, ReportWriter, DEFAULT_LOG_DIR};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "fleet-audit")]
#[command(about = "Run diagnostic commands across network devices and write HTML reports")]
#[command(version)]
struct Cli {
    /// Inventory file path
    #[arg(short, long, default_value = "inventory.yaml")]
    inventory: PathBuf,

    /// HTML template with {{command_outputs}} and {{generation_time}} placeholders
    #[arg(long)]
    template: Option<PathBuf>,

    /// Directory for the generated reports
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Maximum number of devices audited at once (default: all)
    #[arg(long)]
    max_concurrency: Option<NonZeroUsize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    smol::block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let inventory = parser::parse_file(&cli.inventory)
        .with_context(|| format!("Failed to load inventory {}", cli.inventory.display()))?;
    let settings = &inventory.settings;

    let template = match cli.template.as_ref().or(settings.template.as_ref()) {
        Some(path) => ReportTemplate::from_file(path)
            .await
            .with_context(|| format!("Failed to read template {}", path.display()))?,
        None => ReportTemplate::builtin(),
    };

    let log_dir = cli
        .log_dir
        .or_else(|| settings.log_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));

    let max_concurrency = cli
        .max_concurrency
        .map(NonZeroUsize::get)
        .or(settings.max_concurrency);

    info!(
        inventory = %cli.inventory.display(),
        devices = inventory.assets.len(),
        "Loaded inventory"
    );

    let runner = FleetRunner::new(
        SshConnector::new(settings.ssh_config()),
        ReportWriter::new(log_dir, template),
    )
    .with_max_concurrency(max_concurrency)
    .with_command_error_policy(settings.on_command_error);

    let summary = runner.run(&inventory).await.context("Audit could not start")?;
    info!("{} of {} devices reported", summary.reported + summary.partial, summary.total());
    Ok(())
}
