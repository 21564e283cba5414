//! Client identity, connection target and lifecycle state tracking.
//!
//! # Responsibilities
//! - Generate unique client IDs for tracing
//! - Describe the remote endpoint
//! - Track the run's lifecycle state (Idle → ... → Closed)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Global atomic counter for client IDs.
/// Relaxed ordering is enough since we only need uniqueness.
static CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a client instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

impl ClientId {
    /// Generate a new unique client ID.
    pub fn new() -> Self {
        Self(CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Remote endpoint. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    host: String,
    port: u16,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Which pipeline to install before connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityMode {
    #[default]
    Plain,
    Secured,
}

impl From<bool> for SecurityMode {
    fn from(secured: bool) -> Self {
        if secured {
            SecurityMode::Secured
        } else {
            SecurityMode::Plain
        }
    }
}

/// Lifecycle state of a client run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Configured, not started.
    Idle,
    /// Resource group acquired, connect in progress.
    Connecting,
    /// Transport established and pipeline attached.
    PipelineInstalled,
    /// Scripted payload phase.
    SendingPayload,
    /// Forwarding console lines.
    Interactive,
    /// An unrecoverable error was hit; shutdown follows.
    Failed,
    /// Draining writes and releasing resources.
    ShuttingDown,
    /// Resources released.
    Closed,
}

impl LifecycleState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Closed)
    }
}

/// Publishes lifecycle transitions to observers.
#[derive(Debug, Clone)]
pub struct StateTracker {
    client_id: ClientId,
    tx: Arc<watch::Sender<LifecycleState>>,
}

impl StateTracker {
    pub fn new(client_id: ClientId) -> Self {
        let (tx, _) = watch::channel(LifecycleState::Idle);
        Self {
            client_id,
            tx: Arc::new(tx),
        }
    }

    /// Record a transition.
    pub fn set(&self, state: LifecycleState) {
        let previous = self.tx.send_replace(state);
        tracing::debug!(
            client_id = %self.client_id,
            from = ?previous,
            to = ?state,
            "Lifecycle transition"
        );
    }

    pub fn current(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.tx.subscribe()
    }
}
