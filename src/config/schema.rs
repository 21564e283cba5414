//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files, and
//! every section has defaults so a minimal file only names the target.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for a client run.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Remote endpoint.
    pub target: TargetConfig,

    /// Scripted payload.
    pub payload: PayloadConfig,

    /// Plain vs. secured pipeline.
    pub security: SecurityConfig,

    /// Receive threshold settings.
    pub receive: ReceiveConfig,

    /// Interactive phase, timeouts and runtime sizing.
    pub session: SessionConfig,
}

/// Remote endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TargetConfig {
    pub host: String,
    pub port: u16,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: super::defaults::DEFAULT_PORT,
        }
    }
}

/// Scripted payload configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PayloadConfig {
    /// File whose bytes are sent as the scripted payload.
    pub path: Option<PathBuf>,
}

/// Pipeline security configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SecurityConfig {
    /// Install the TLS pipeline.
    pub secured: bool,

    /// Name for SNI and certificate checks (defaults to the target host).
    pub server_name: Option<String>,

    /// PEM file of trusted roots. Without it server certificates are not verified.
    pub ca_cert_path: Option<PathBuf>,
}

/// What counts as one inbound unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InboundUnit {
    /// Length-prefixed frames with an 8-byte header.
    #[default]
    Frames,
    /// Raw bytes.
    Bytes,
}

/// Receive threshold configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ReceiveConfig {
    /// Inbound units to wait for before `threshold_received` settles.
    pub threshold: usize,

    pub unit: InboundUnit,
}

/// Session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Console line that ends the interactive phase (case-insensitive).
    pub sentinel: String,

    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// How long queued writes may drain, and tasks may finish, at shutdown.
    pub shutdown_grace_ms: u64,

    /// Worker threads in the I/O resource group.
    pub worker_threads: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sentinel: crate::phases::DEFAULT_SENTINEL.to_string(),
            connect_timeout_ms: 10_000,
            shutdown_grace_ms: 2_000,
            worker_threads: 2,
        }
    }
}
