//! The two send phases of a run.
//!
//! # Data Flow
//! ```text
//! payload.rs:     source → one buffer → one outbound write → payload_sent
//! interactive.rs: console line → one outbound write → ... → sentinel / EOF
//! ```
//!
//! Both phases run on the driver thread and only talk to the connection
//! through a `FrameSink`.

pub mod interactive;
pub mod payload;

pub use interactive::{Console, InteractiveEnd, InteractiveForwarder, DEFAULT_SENTINEL};
pub use payload::{PayloadLoader, PayloadSource};
