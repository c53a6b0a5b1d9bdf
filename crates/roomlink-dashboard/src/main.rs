use anyhow::Context;
use clap::Parser;
use roomlink_config::ConfigLoader;
use roomlink_core::DashboardEvent;
use roomlink_dashboard::Session;
use roomlink_logging::init_logging;
use roomlink_shutdown::SignalHandler;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "roomlink.toml")]
    config: String,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ConfigLoader::new(&args.config)
        .load()
        .with_context(|| format!("failed to load config from {}", args.config))?;

    if args.print_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    init_logging(&config.logging)?;
    info!(config = %args.config, endpoint = %config.transport.endpoint, "Starting roomlink dashboard");

    let session = Session::start(&config).await?;
    let reporter = tokio::spawn(log_events(session.subscribe_events()));

    let signals = SignalHandler::default();
    match signals.wait_for_system_signal().await {
        Ok(signal) => info!(signal = ?signal, "Shutdown requested"),
        Err(e) => error!(error = %e, "Failed to install signal handlers, shutting down"),
    }

    let summary = session.shutdown().await;
    reporter.abort();

    if let Some(stats) = summary.ingest {
        info!(
            events = stats.events,
            readings = stats.readings,
            images = stats.images,
            statuses = stats.statuses,
            decode_failures = stats.decode_failures,
            logged = stats.logged,
            "Session summary"
        );
    }
    if !summary.cleanup.is_clean() {
        anyhow::bail!("{} resource(s) failed to release", summary.cleanup.failed.len());
    }

    info!("roomlink dashboard stopped");
    Ok(())
}

/// 把状态变化写入日志
async fn log_events(mut events: broadcast::Receiver<DashboardEvent>) {
    loop {
        match events.recv().await {
            Ok(DashboardEvent::ConnectionChanged(status)) => {
                info!(status = ?status, "Connection status changed")
            }
            Ok(DashboardEvent::TransportError(reason)) => warn!(error = %reason, "Transport error"),
            Ok(DashboardEvent::SensorUpdated(reading)) => {
                debug!(kind = %reading.kind, value = reading.value, "Sensor reading")
            }
            Ok(DashboardEvent::ImageUpdated { bytes, encoding }) => {
                debug!(bytes, encoding = ?encoding, "Camera frame")
            }
            Ok(DashboardEvent::ActuatorUpdated(status)) => {
                info!(state = %status.state, message = %status.message, "Door status")
            }
            Ok(DashboardEvent::DecodeFailed { topic, reason, excerpt }) => {
                warn!(topic = %topic, error = %reason, excerpt = %excerpt, "Undecodable message")
            }
            Ok(DashboardEvent::SnapshotUpdated(state)) => {
                debug!(observed = state.observed_count(), "Snapshot reconciled")
            }
            Ok(DashboardEvent::SnapshotFailed(reason)) => warn!(error = %reason, "Snapshot failed"),
            Ok(DashboardEvent::CommandFailed(reason)) => warn!(error = %reason, "Command failed"),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "Event reporter lagged")
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
