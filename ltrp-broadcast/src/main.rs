//! Broadcast node (ltrp-broadcast) - Main entry point
//!
//! Plays notification sounds on request from other robot nodes, reports node
//! health, and plays the shutdown message before terminating.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use ltrp_broadcast::api::{self, AppState};
use ltrp_broadcast::audio::{AudioSink, DeviceSink, SimulatedSink};
use ltrp_broadcast::BroadcastNode;
use ltrp_common::config::{resolve_root_folder, ConfigPaths, TomlConfig, ROOT_FOLDER_ENV};
use ltrp_common::events::{EventBus, NodeEvent};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Reports buffered per subscriber before it lags
const EVENT_BUS_CAPACITY: usize = 256;

/// Command-line arguments for ltrp-broadcast
#[derive(Parser, Debug)]
#[command(name = "ltrp-broadcast")]
#[command(about = "Broadcast notification node for LTRP")]
#[command(version)]
struct Args {
    /// Root folder holding config/parameters.json and config/error_code_list.json
    #[arg(short, long, env = "LTRP_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Sound file directory [default: <root>/config/sound_files]
    #[arg(long)]
    sound_dir: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, default_value = "5750", env = "LTRP_BROADCAST_PORT")]
    port: u16,

    /// Audio output device name (default device if omitted)
    #[arg(long)]
    device: Option<String>,

    /// Output volume (0.0-1.0)
    #[arg(long, default_value_t = 1.0)]
    volume: f32,

    /// Run without an audio device; every clip lasts this many milliseconds
    #[arg(long, value_name = "MS")]
    simulate_audio: Option<u64>,

    /// Print the available audio output devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = TomlConfig::load_default();

    // Initialize tracing; RUST_LOG wins over the config file
    let default_filter = toml_config
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|| "ltrp_broadcast=info,ltrp_common=info,tower_http=info".to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if args.list_devices {
        for device in DeviceSink::list_devices().context("Failed to list audio devices")? {
            println!("{}", device);
        }
        return Ok(());
    }

    info!(
        "Starting ltrp-broadcast {} ({}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder =
        resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, toml_config.as_ref());
    let paths = ConfigPaths::new(root_folder);
    let sound_dir = args.sound_dir.clone().unwrap_or_else(|| paths.sound_dir());
    info!("Root folder: {}", paths.root_folder().display());
    info!("Sound files: {}", sound_dir.display());

    let sink: Arc<dyn AudioSink> = match args.simulate_audio {
        Some(ms) => {
            warn!("Simulated audio output ({}ms per clip)", ms);
            Arc::new(SimulatedSink::new(Duration::from_millis(ms)))
        }
        None => Arc::new(DeviceSink::new(args.device.clone(), args.volume)),
    };

    let bus = EventBus::new(EVENT_BUS_CAPACITY);
    spawn_report_logger(&bus);

    let node = Arc::new(
        BroadcastNode::load(&paths, &sound_dir, sink, bus)
            .context("Broadcast node failed to start")?,
    );
    let node_code = node.config().node_code;

    // OS signals become a shutdown message addressed to this node
    let signal_dispatcher = Arc::clone(node.dispatcher());
    tokio::spawn(async move {
        match wait_for_shutdown_signal().await {
            Ok(()) => {
                info!("Received termination signal");
                signal_dispatcher.handle_shutdown(node_code);
            }
            Err(e) => error!("Failed to install signal handlers: {}", e),
        }
    });

    let (terminated_tx, terminated_rx) = watch::channel(false);
    let app_state = AppState::new(&node, terminated_rx, args.port);

    let supervisor_node = Arc::clone(&node);
    let mut supervisor = tokio::task::spawn_blocking(move || {
        let result = supervisor_node.run();
        let _ = terminated_tx.send(true);
        result
    });
    let mut server = tokio::spawn(api::run(app_state));

    let (result, served) = tokio::select! {
        result = &mut supervisor => (result, server.await),
        served = &mut server => {
            // No transport left; stop without the shutdown message
            error!("HTTP server stopped before the node terminated");
            node.state().stop_operation();
            (supervisor.await, served)
        }
    };

    let result = result.context("Supervisor task failed")?;
    info!(
        "Final readiness: {} (state {})",
        result.readiness, result.state
    );
    served.context("HTTP server task failed")??;

    info!("Shutdown complete");
    Ok(())
}

/// Mirror outbound reports into the log
fn spawn_report_logger(bus: &EventBus) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match &event {
                NodeEvent::Error(report) => {
                    warn!("Report: {}", serde_json::to_string(report).unwrap_or_default())
                }
                _ => debug!(
                    "Report: {}",
                    serde_json::to_string(&event).unwrap_or_default()
                ),
            }
        }
    });
}

/// Waits for a termination signal.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
