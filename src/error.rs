//! Error types shared by every phase of a client run.
//!
//! `ClientError` is cheap to clone: I/O causes are held behind an `Arc` so the
//! same failure can settle a completion signal and be returned from the run.

use std::sync::Arc;
use thiserror::Error;

/// Result alias used across the crate.
pub type ClientResult<T> = Result<T, ClientError>;

/// Failures of a client run.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The I/O resource group (runtime or driver thread) could not be created.
    #[error("failed to acquire I/O resources: {0}")]
    Resource(#[source] Arc<std::io::Error>),

    /// The TCP connect attempt failed.
    #[error("connect to {target} failed: {source}")]
    Connect {
        target: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The TCP connect attempt did not complete in time.
    #[error("connect to {target} timed out after {timeout_ms} ms")]
    ConnectTimeout { target: String, timeout_ms: u64 },

    /// The secured pipeline could not be configured.
    #[error("TLS setup failed: {0}")]
    TlsConfig(String),

    /// The TLS handshake with the server failed.
    #[error("TLS handshake with {target} failed: {source}")]
    Handshake {
        target: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Reading the scripted payload failed.
    #[error("failed to read payload: {0}")]
    Payload(#[source] Arc<std::io::Error>),

    /// The outbound writer is gone; nothing more can be sent.
    #[error("outbound connection closed")]
    ConnectionClosed,

    /// Reading from the connection failed.
    #[error("inbound read failed: {0}")]
    Inbound(#[source] Arc<std::io::Error>),

    /// The peer closed before the receive threshold was reached.
    #[error("peer closed the connection after {received} of {expected} units")]
    PeerClosed { received: usize, expected: usize },

    /// An inbound frame header declared an impossible length.
    #[error("malformed inbound frame: declared length {0} is shorter than the header")]
    Framing(usize),

    /// The client was disconnected before the operation completed.
    #[error("client disconnected")]
    Disconnected,

    /// The driver thread panicked.
    #[error("client driver thread panicked")]
    DriverPanicked,
}

impl ClientError {
    pub(crate) fn connect(target: impl ToString, source: std::io::Error) -> Self {
        Self::Connect {
            target: target.to_string(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn handshake(target: impl ToString, source: std::io::Error) -> Self {
        Self::Handshake {
            target: target.to_string(),
            source: Arc::new(source),
        }
    }
}

/// Failure outcome carried by a completion signal.
#[derive(Debug, Clone, Error)]
pub enum SignalError {
    /// The milestone failed.
    #[error(transparent)]
    Failed(#[from] ClientError),

    /// Every fulfilling side went away without settling the signal.
    #[error("signal abandoned before it settled")]
    Abandoned,
}
