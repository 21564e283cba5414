//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! ScriptedClient::start (controller.rs)
//!     → driver thread: acquire io_group.rs → connect + pipeline → payload → interactive
//!     → drain writes → release group (shutdown.rs notifies tasks) → Closed
//!
//! Completion signals (signal.rs):
//!     connected / payload_sent / threshold_received → awaited by the harness
//! ```
//!
//! # Design Decisions
//! - Phases run strictly in order on one thread; transport I/O runs elsewhere
//! - Release is idempotent and may race with `disconnect()`
//! - Every signal settles by the time the run is Closed

pub mod controller;
pub mod io_group;
pub mod report;
pub mod shutdown;
pub mod signal;

pub use controller::{ClientHandle, ClientSettings, ScriptedClient};
pub use report::{RunReport, SignalReport};
pub use shutdown::Shutdown;
pub use signal::{CompletionSignal, Outcome, SignalView, Signals};
