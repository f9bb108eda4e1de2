#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the traffic watch bot.

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use traffic_watch_ai::OpenAiSummarizer;
use traffic_watch_map::MapboxRenderer;
use traffic_watch_monitor::{
    Control, Monitor, MonitorStatus,
    config::{AppConfig, com_center_from_env, store_path_from_env},
};
use traffic_watch_publish::TelegramNotifier;
use traffic_watch_source::{IncidentSource, chp::ChpSource};
use traffic_watch_store::IncidentLog;

#[derive(Parser)]
#[command(name = "traffic_watch", about = "CHP traffic incident alert bot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitor loop headless (Ctrl-C to stop)
    Run,
    /// Run the monitor with the terminal status panel
    Panel,
    /// Fetch the current incident once and print it as JSON
    Fetch,
    /// Print the statistics snapshot for the persisted history
    Stats,
    /// Clear the persisted incident history
    Clear,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            let config = AppConfig::from_env()?;
            let (monitor, _status_rx) = build_monitor(&config)?;
            let (control_tx, control_rx) = watch::channel(Control::Run);
            let handle = tokio::spawn(monitor.run(control_rx));

            tokio::signal::ctrl_c().await?;
            log::info!("Shutting down after the in-flight cycle...");
            control_tx.send_replace(Control::Shutdown);
            handle.await?;
        }
        Commands::Panel => {
            let config = AppConfig::from_env()?;
            let (monitor, status_rx) = build_monitor(&config)?;
            let (control_tx, control_rx) = watch::channel(Control::Run);
            let handle = tokio::spawn(monitor.run(control_rx));

            traffic_watch_panel::run(config.store_path, control_tx, status_rx).await?;
            handle.await?;
        }
        Commands::Fetch => {
            let source = ChpSource::new(&com_center_from_env())?;
            match source.fetch().await? {
                Some(incident) => println!("{}", serde_json::to_string_pretty(&incident)?),
                None => log::info!("Nothing to report right now"),
            }
        }
        Commands::Stats => {
            let snapshot = traffic_watch_analytics::read_snapshot(&store_path_from_env());
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Clear => {
            let path = store_path_from_env();
            traffic_watch_store::truncate(&path)?;
            log::info!("Cleared incident history at {}", path.display());
        }
    }

    Ok(())
}

/// Wires the concrete collaborators from the environment configuration.
fn build_monitor(
    config: &AppConfig,
) -> Result<
    (
        Monitor<ChpSource, MapboxRenderer, OpenAiSummarizer, TelegramNotifier>,
        watch::Receiver<MonitorStatus>,
    ),
    Box<dyn std::error::Error>,
> {
    let source = ChpSource::new(&config.com_center)?;
    let map = MapboxRenderer::new(config.map_access_token.clone());
    let summarizer = OpenAiSummarizer::from_env()?;
    let notifier =
        TelegramNotifier::new(config.telegram_bot_token.clone(), config.telegram_chat_id);
    let log = IncidentLog::load(&config.store_path)?;

    Ok(Monitor::new(
        source,
        map,
        summarizer,
        notifier,
        log,
        config.poll_interval,
    ))
}
