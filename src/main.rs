//! Keygate server - main entry point.
//!
//! Boot order: config → device → stores → listener → decision loop. On
//! Ctrl-C the listener stops accepting and drains its workers, then the
//! decision loop is stopped, then shared state is released.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use keygate::device::{CharDevice, DeviceGateway, Peripheral, ScanFeeder, SimulatedDevice};
use keygate::engine::DecisionLoop;
use keygate::http::AccessServer;
use keygate::{AppState, Config};

/// Keypad access-control server with a browser admin console.
#[derive(Debug, Parser)]
#[command(name = "keygate", version)]
struct Cli {
    /// TCP port for the admin console.
    port: u16,

    /// KEY=VALUE configuration file (BACKLOG, MAX_CONNECTIONS, ...).
    #[arg(long, env = "KEYGATE_CONFIG", default_value = "config.ini")]
    config: PathBuf,

    /// Alarm driver device node.
    #[arg(long, env = "KEYGATE_DEVICE")]
    device: Option<PathBuf>,

    /// Directory holding webserver.html and favicon.ico.
    #[arg(long, env = "KEYGATE_WEB_ROOT")]
    web_root: Option<PathBuf>,

    /// Use an in-memory keypad fed one code per stdin line.
    #[arg(long)]
    simulate: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;

    // Initialize observability (RUST_LOG / KEYGATE_LOG_FORMAT override the file)
    keygate::observability::init_tracing(&config.observability);
    if !cli.config.exists() {
        tracing::warn!("Config file {} not found, using defaults", cli.config.display());
    }

    let addr = config.server.socket_addr()?;
    config.server.listen_addr = SocketAddr::new(addr.ip(), cli.port).to_string();
    if let Some(device) = cli.device {
        config.device.path = device;
    }
    if let Some(web_root) = cli.web_root {
        config.assets.web_root = web_root;
    }

    let peripheral: Arc<dyn Peripheral> = if cli.simulate {
        let (device, feeder) = SimulatedDevice::new();
        tokio::spawn(feed_from_stdin(feeder));
        tracing::info!("Using simulated keypad (one code per stdin line)");
        device
    } else {
        Arc::new(CharDevice::open(&config.device.path)?)
    };
    let state = AppState::new(DeviceGateway::new(peripheral));

    let server = AccessServer::bind(&config, state.clone()).await?;

    let mut decision = DecisionLoop::new(state.clone(), config.device.retry_backoff());
    let decision_task = decision.start();

    let shutdown = server.shutdown_token();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Cannot listen for Ctrl-C: {}", e);
            return;
        }
        tracing::info!("Interrupt received, shutting down");
        shutdown.cancel();
    });

    let served = server.serve().await;

    decision.stop();
    if let Err(e) = decision_task.await {
        tracing::error!("Decision loop ended abnormally: {}", e);
    }
    drop(state);
    tracing::info!("Shutdown complete");

    served?;
    Ok(())
}

async fn feed_from_stdin(feeder: ScanFeeder) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let code = line.trim();
                if code.is_empty() {
                    continue;
                }
                if let Err(e) = feeder.scan(code).await {
                    tracing::warn!("Ignoring scan {:?}: {}", code, e);
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("stdin closed: {}", e);
                break;
            }
        }
    }
}
