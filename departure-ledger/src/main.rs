use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use departure_ledger::analysis::Report;
use departure_ledger::collector::{Collector, SystemClock};
use departure_ledger::config::AppConfig;
use departure_ledger::feed::RestFeedClient;

#[derive(Parser, Debug)]
#[command(version, about = "Record transit departures and report on their delays")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the departure feed until Ctrl-C
    Collect {
        /// YAML config file (defaults to $COLLECTOR_CONFIG)
        config: Option<PathBuf>,
    },
    /// Print delay reports for the recorded snapshots
    Analyze {
        /// YAML config file (defaults to $COLLECTOR_CONFIG)
        config: Option<PathBuf>,
    },
}

impl Command {
    fn config_path(&self) -> Option<&PathBuf> {
        match self {
            Command::Collect { config } | Command::Analyze { config } => config.as_ref(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let config = match AppConfig::load_or_default(args.command.config_path().map(PathBuf::as_path)) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load config");
            return ExitCode::FAILURE;
        }
    };

    match args.command {
        Command::Collect { .. } => collect(config).await,
        Command::Analyze { .. } => {
            let report = Report::build(&config.analysis, &config.analysis_dirs());
            print!("{}", report.render());
            ExitCode::SUCCESS
        }
    }
}

async fn collect(config: AppConfig) -> ExitCode {
    let feed = match RestFeedClient::new(&config.feed) {
        Ok(feed) => feed,
        Err(e) => {
            error!(error = %e, "Failed to create feed client");
            return ExitCode::FAILURE;
        }
    };

    let mut collector = match Collector::bootstrap(feed, SystemClock, &config).await {
        Ok(collector) => collector,
        Err(e) => {
            error!(error = %e, "Collector failed to start");
            return ExitCode::FAILURE;
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested, finishing the current cycle");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                warn!(error = %e, "Could not listen for Ctrl-C");
                // dropping the sender would stop the collector
                std::future::pending::<()>().await;
            }
        }
    });

    info!(
        stations = collector.stations().len(),
        data_dir = %config.storage.data_dir.display(),
        "Collector running, press Ctrl-C to stop"
    );
    collector.run(shutdown_rx).await;
    ExitCode::SUCCESS
}
