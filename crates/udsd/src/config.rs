//! Daemon configuration (TOML)
//!
//! Every field is optional; command-line arguments override file
//! values, and anything left unset falls back to the built-in default.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    pub server: ServerSection,
    pub firmware: FirmwareSection,
    pub transport: TransportSection,
    pub engine: EngineSection,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    /// Listen address, e.g. "127.0.0.1:11231".
    pub bind: Option<SocketAddr>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FirmwareSection {
    /// Path to the firmware image served by ReadMemoryByAddress.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportSection {
    /// Per-attempt frame receive timeout in milliseconds.
    pub recv_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSection {
    /// Give up on a connection after this many consecutive transport
    /// faults. Unset means retry forever.
    pub max_transport_faults: Option<u32>,
}

impl DaemonConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&content)?)
    }
}
