//! semaforo: network-triggered traffic-light controller.
//!
//! Listens for broker-style PUBLISH frames on the trigger topics and, for each
//! accepted trigger, walks the LED panel through green → yellow → red → green.
//! A JSON status endpoint reports the current colour and the recent event log.
//!
//! # Usage
//!
//! ```text
//! semaforo [OPTIONS]
//!
//! Options:
//!   --config <PATH>        Config file [default: $XDG_CONFIG_HOME/semaforo/config.toml]
//!   --broker-port <PORT>   Override [broker] port
//!   --status-port <PORT>   Override [status] port
//!   --print-config         Print the effective config as TOML and exit
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable               | Overrides        |
//! |------------------------|------------------|
//! | `SEMAFORO_CONFIG`      | `--config`       |
//! | `SEMAFORO_BROKER_PORT` | `--broker-port`  |
//! | `SEMAFORO_STATUS_PORT` | `--status-port`  |
//! | `RUST_LOG`             | `[log] level`    |
//!
//! # Architecture overview
//!
//! ```text
//! broker clients (TCP 1883)          browsers (HTTP 80)
//!        │                                  │
//!  BrokerListener ─► FrameDispatcher   GET /status ─► StatusExporter
//!                        │                                  │
//!                        ▼                                  ▼
//!              SequenceController ──────────────►  SharedState
//!                        │
//!                        ▼
//!                   PixelStrip (LED panel)
//! ```

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use semaforo_controller::application::dispatch::FrameDispatcher;
use semaforo_controller::application::ports::Actuator;
use semaforo_controller::application::sequence::SequenceController;
use semaforo_controller::application::state::SharedState;
use semaforo_controller::application::status::StatusExporter;
use semaforo_controller::application::supervisor::TaskSupervisor;
use semaforo_controller::infrastructure::actuator::PixelStrip;
use semaforo_controller::infrastructure::clock::sntp::{run_clock_sync, SntpServer};
use semaforo_controller::infrastructure::clock::WallClock;
use semaforo_controller::infrastructure::network::listener::{BrokerListener, ConnectionContext};
use semaforo_controller::infrastructure::status_http::serve_status;
use semaforo_controller::infrastructure::storage::config::{
    default_config_path, load_config, AppConfig,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Network-triggered traffic-light controller.
#[derive(Debug, Parser)]
#[command(
    name = "semaforo",
    about = "Traffic-light controller driven by broker-style trigger messages",
    version
)]
struct Cli {
    /// Path to the TOML config file.  A missing file means all defaults.
    #[arg(long, env = "SEMAFORO_CONFIG")]
    config: Option<PathBuf>,

    /// TCP port for the broker listener.  Overrides `[broker] port`.
    #[arg(long, env = "SEMAFORO_BROKER_PORT")]
    broker_port: Option<u16>,

    /// TCP port for the status endpoint.  Overrides `[status] port`.
    #[arg(long, env = "SEMAFORO_STATUS_PORT")]
    status_port: Option<u16>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(default_config_path)
    }

    /// Applies command-line overrides on top of the file config.
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(port) = self.broker_port {
            config.broker.port = port;
        }
        if let Some(port) = self.status_port {
            config.status.port = port;
        }
    }

    /// Loads the config file, applies overrides and validates the result.
    fn resolve_config(&self) -> anyhow::Result<AppConfig> {
        let mut config = match self.config_path() {
            Some(path) => load_config(&path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => AppConfig::default(),
        };
        self.apply_overrides(&mut config);
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// Runs on Tokio's single-threaded runtime: every task (accept loop, one per
/// connection, the active cycle, the status server, clock sync) is multiplexed
/// on one thread.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    // ── Logging setup ─────────────────────────────────────────────────────────
    //
    // `RUST_LOG` wins; otherwise the configured level; otherwise `info`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&config.log.level))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let broker_addr = config.broker_addr()?;
    let status_addr = config.status_addr()?;
    info!("semaforo starting: broker={broker_addr}, status={status_addr}");

    // ── Shared state and panel ────────────────────────────────────────────────
    let clock = Arc::new(WallClock::new());
    let state = Arc::new(SharedState::new(config.log.max_lines, clock.clone()));
    let panel = Arc::new(PixelStrip::new(config.panel.num_leds));
    if let Err(e) = panel.render(state.signal()) {
        warn!("failed to show initial state: {e}");
    }

    let (supervisor, _reaper) = TaskSupervisor::start();
    let sequence = Arc::new(SequenceController::new(
        Arc::clone(&state),
        panel.clone(),
        config.cycle_times(),
        supervisor.clone(),
    ));

    // ── Graceful shutdown ─────────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let stop_status = Arc::new(Notify::new());
    {
        let running = Arc::clone(&running);
        let stop_status = Arc::clone(&stop_status);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("received Ctrl+C; shutting down");
                    running.store(false, Ordering::Relaxed);
                    stop_status.notify_one();
                }
                Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
            }
        });
    }

    // ── Status endpoint ───────────────────────────────────────────────────────
    let status_listener = TcpListener::bind(status_addr)
        .await
        .with_context(|| format!("failed to bind status endpoint on {status_addr}"))?;
    let exporter = StatusExporter::new(Arc::clone(&state));
    supervisor.spawn("status endpoint", async move {
        serve_status(status_listener, exporter, async move {
            stop_status.notified().await;
        })
        .await
        .context("status endpoint stopped")
    });

    // ── Clock sync ────────────────────────────────────────────────────────────
    if config.clock.enabled {
        let server = SntpServer::new(config.clock.ntp_host.clone());
        let interval = config.sync_interval();
        let clock = Arc::clone(&clock);
        let state = Arc::clone(&state);
        let running = Arc::clone(&running);
        supervisor.spawn("clock sync", async move {
            run_clock_sync(server, interval, clock, state, running).await;
            Ok(())
        });
    }

    // ── Broker listener ───────────────────────────────────────────────────────
    let broker = BrokerListener::bind(broker_addr)
        .await
        .with_context(|| format!("failed to bind broker listener on {broker_addr}"))?;
    let ctx = ConnectionContext {
        dispatcher: FrameDispatcher::new(Arc::clone(&state), sequence),
        state: Arc::clone(&state),
        read_timeout: config.read_timeout(),
    };
    state.log(format!("Controller ready (MQTT port {})", broker_addr.port()));

    broker.run(ctx, supervisor.clone(), running).await;

    if let Err(e) = panel.blank() {
        warn!("failed to blank panel: {e}");
    }
    let live = supervisor.live_tasks();
    info!("semaforo stopped ({live} tasks still running)");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
