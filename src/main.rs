//! Spedition worker entry point

use clap::{Parser, Subcommand};
use spedition_worker::config::WorkerConfig;
use spedition_worker::consignment::{ConsignmentApi, ConsignmentClient};
use spedition_worker::engine::CamundaClient;
use spedition_worker::observability::{health::HealthServer, init_default_logging, metrics};
use spedition_worker::sanitize::sanitize_url;
use spedition_worker::{lifecycle_span, TaskProcessor, Worker, WorkerResult};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, Instrument};

/// Default health server port; 0 disables the server
const DEFAULT_HEALTH_PORT: u16 = 8080;

const DEFAULT_CONFIG_PATHS: [&str; 2] = ["spedition-worker.toml", "config/spedition-worker.toml"];

/// External-task worker placing consignment orders with a logistics provider
#[derive(Parser)]
#[command(name = "spedition-worker")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Subscribe to the engine and process tasks until stopped
    Run,
    /// Validate configuration
    Config {
        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging(cli.verbose > 0);

    info!("Starting spedition worker v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run => run_worker(config).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Application shutdown complete");
}

/// Explicit path, then the default locations, then defaults plus environment
fn load_configuration(
    config_path: Option<&Path>,
) -> Result<WorkerConfig, spedition_worker::ConfigError> {
    if let Some(path) = config_path {
        info!("Loading configuration from: {}", path.display());
        return WorkerConfig::load_from_file(path);
    }

    for path_str in DEFAULT_CONFIG_PATHS {
        let path = Path::new(path_str);
        if path.exists() {
            info!("Loading configuration from: {}", path.display());
            return WorkerConfig::load_from_file(path);
        }
    }

    info!("No configuration file found, using defaults and environment");
    WorkerConfig::from_env()
}

fn health_port() -> u16 {
    std::env::var("HEALTH_PORT")
        .ok()
        .and_then(|p| p.trim().parse().ok())
        .unwrap_or(DEFAULT_HEALTH_PORT)
}

async fn run_worker(config: WorkerConfig) -> WorkerResult<()> {
    let collector = metrics();
    collector.set_worker_state("initializing");

    let queue = Arc::new(CamundaClient::new(&config)?);
    let client = ConsignmentClient::new(&config.provider)?;
    let processor = TaskProcessor::with_retry_policy(client, config.worker.retry_policy());

    async {
        info!(
            worker_id = queue.worker_id(),
            topic = queue.topic(),
            engine = %queue.display_url(),
            provider = %sanitize_url(processor.client().endpoint()),
            "Worker configured"
        );
    }
    .instrument(lifecycle_span!(event = "startup"))
    .await;

    let port = health_port();
    if port != 0 {
        let health_server = Arc::new(HealthServer::new(queue.worker_id().to_string(), port));
        tokio::spawn(health_server.start());
    }

    let worker = Worker::new(Arc::clone(&queue), processor, &config.worker);
    let shutdown = worker.shutdown_handle();

    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully..."),
        }
        metrics().set_worker_state("stopping");
        shutdown.shutdown();
    });

    worker.run().await
}

fn handle_config_command(config: &WorkerConfig, show: bool) -> WorkerResult<()> {
    if show {
        let mut printable = config.clone();
        printable.engine.base_url = config.engine_url_without_credentials();
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(&printable)?);
    }

    info!("Configuration validation complete");
    Ok(())
}
