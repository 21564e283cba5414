//! Scripted byte-stream test client.
//!
//! Connects to a server (plain TCP or TLS), sends a scripted payload in one
//! write, forwards console lines until `bye` or end-of-input, then tears the
//! connection down. A test harness awaits the run's milestones through three
//! completion signals: connected, payload sent and receive threshold reached.

// Core subsystems
pub mod config;
pub mod lifecycle;
pub mod net;
pub mod phases;

// Cross-cutting concerns
pub mod error;
pub mod observability;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, SignalError};
pub use lifecycle::{ClientHandle, ClientSettings, ScriptedClient, SignalView};
pub use net::{SecurityMode, Target};
pub use phases::PayloadSource;
