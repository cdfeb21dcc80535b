//! udsd - UDS diagnostic endpoint daemon
//!
//! Listens on TCP and serves UDS diagnostics (session control, security
//! access, memory read) over an ISO-TP style 8-byte frame transport.
//! One independent session per connection; the firmware image is loaded
//! once and shared read-only across all of them.
//!
//! # Usage
//!
//! ```bash
//! udsd --firmware fw.bin --bind 127.0.0.1:11231
//! udsd --config udsd.toml
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use udsd_core::{run_diagnostic_session, EngineConfig, FirmwareImage, RetryPolicy};
use udsd_isotp::TcpFrameChannel;

mod config;

use config::DaemonConfig;

const DEFAULT_BIND: &str = "127.0.0.1:11231";
const DEFAULT_FIRMWARE: &str = "fw.bin";
const DEFAULT_RECV_TIMEOUT_MS: u64 = 500;

#[derive(Parser, Debug)]
#[command(name = "udsd")]
#[command(about = "UDS-over-ISO-TP diagnostic endpoint daemon")]
struct Args {
    /// Configuration file path (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (overrides config file)
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Firmware image path (overrides config file)
    #[arg(short, long)]
    firmware: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        "udsd=debug,udsd_core=debug,udsd_isotp=trace"
    } else {
        "udsd=info,udsd_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .init();

    let config = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            DaemonConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?
        }
        None => DaemonConfig::default(),
    };

    let bind = args
        .bind
        .or(config.server.bind)
        .unwrap_or_else(|| DEFAULT_BIND.parse().expect("default bind address parses"));

    let firmware_path = args
        .firmware
        .or(config.firmware.path)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_FIRMWARE));

    let firmware = Arc::new(
        FirmwareImage::load(&firmware_path).with_context(|| {
            format!("failed to load firmware image {}", firmware_path.display())
        })?,
    );
    info!(
        path = %firmware_path.display(),
        bytes = firmware.len(),
        "firmware image loaded"
    );

    let recv_timeout = Duration::from_millis(
        config
            .transport
            .recv_timeout_ms
            .unwrap_or(DEFAULT_RECV_TIMEOUT_MS),
    );
    let engine_config = EngineConfig {
        retry: match config.engine.max_transport_faults {
            Some(max) => RetryPolicy::Limited(max),
            None => RetryPolicy::Unbounded,
        },
    };

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(%bind, "listening for diagnostic connections");

    loop {
        let (stream, peer) = listener.accept().await?;
        let firmware = firmware.clone();

        tokio::spawn(async move {
            let channel = TcpFrameChannel::new(stream).with_recv_timeout(recv_timeout);
            if let Err(err) =
                run_diagnostic_session(channel, peer.to_string(), firmware, engine_config).await
            {
                warn!(%peer, %err, "diagnostic session aborted");
            }
        });
    }
}
