//! Scripted byte-stream test client.
//!
//! ```text
//! scripted-client <host> <port> <secured> <filename>
//! ```
//!
//! Without all four arguments (and without `--config`) the client falls back
//! to the local machine's address, port 6633, the bundled payload and a
//! secured pipeline.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use scripted_client::config::defaults::{fallback_config, DEFAULT_PAYLOAD};
use scripted_client::config::{load_config, validate_config, ClientConfig, ConfigError, InboundUnit};
use scripted_client::observability::logging;
use scripted_client::{PayloadSource, ScriptedClient};

#[derive(Parser, Debug)]
#[command(name = "scripted-client")]
#[command(about = "Scripted byte-stream test client", long_about = None)]
struct Cli {
    /// Server host
    host: Option<String>,

    /// Server port
    port: Option<u16>,

    /// "true" installs the TLS pipeline; anything else is plain
    secured: Option<String>,

    /// File whose bytes are sent as the scripted payload
    filename: Option<PathBuf>,

    /// TOML configuration file; positional arguments override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Inbound units to wait for
    #[arg(short, long)]
    threshold: Option<usize>,

    /// What counts as an inbound unit
    #[arg(long, value_enum)]
    unit: Option<InboundUnit>,

    /// Print a JSON run report on stdout
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn has_positionals(&self) -> bool {
        self.host.is_some()
            && self.port.is_some()
            && self.secured.is_some()
            && self.filename.is_some()
    }
}

/// Resolved configuration, plus whether the bundled payload must be used.
fn resolve(cli: &Cli) -> Result<(ClientConfig, bool), ConfigError> {
    let (mut config, fallback) = match &cli.config {
        Some(path) => (load_config(path)?, false),
        None if cli.has_positionals() => (ClientConfig::default(), false),
        None => {
            tracing::warn!("Usage: scripted-client <host> <port> <secured> <filename>");
            tracing::warn!("Trying to use default setting.");
            (fallback_config(), true)
        }
    };

    if !fallback {
        if let Some(host) = &cli.host {
            config.target.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.target.port = port;
        }
        if let Some(secured) = &cli.secured {
            config.security.secured = secured.eq_ignore_ascii_case("true");
        }
        if let Some(filename) = &cli.filename {
            config.payload.path = Some(filename.clone());
        }
    }
    if let Some(threshold) = cli.threshold {
        config.receive.threshold = threshold;
    }
    if let Some(unit) = cli.unit {
        config.receive.unit = unit;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok((config, fallback))
}

fn main() -> ExitCode {
    logging::init_logging("scripted_client=info");
    let cli = Cli::parse();

    let (config, fallback) = match resolve(&cli) {
        Ok(resolved) => resolved,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        host = %config.target.host,
        port = config.target.port,
        secured = config.security.secured,
        threshold = config.receive.threshold,
        "Configuration loaded"
    );

    let mut client = ScriptedClient::from_config(&config);
    if fallback {
        client.set_payload(Some(PayloadSource::from_bytes(DEFAULT_PAYLOAD)));
    }

    let handle = match client.start() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start client");
            return ExitCode::FAILURE;
        }
    };

    let (result, report) = handle.join_with_report();
    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!(error = %e, "Failed to serialize run report"),
        }
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
