//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound TCP connect
//!     → pipeline.rs (plain, or TLS handshake via tls.rs)
//!     → inbound.rs (reader task: count units, settle threshold signal)
//!     → outbound.rs (writer task: fire-and-forget frames from the driver)
//!
//! connection.rs: client IDs, target, lifecycle state tracking
//! ```
//!
//! # Design Decisions
//! - The pipeline is chosen before the connect attempt and never swapped
//! - Inbound bytes are opaque to the lifecycle; only unit counts leave this layer
//! - TLS trust is optional; without a CA file any certificate is accepted

pub mod connection;
pub mod inbound;
pub mod outbound;
pub mod pipeline;
pub mod tls;

pub use connection::{ClientId, LifecycleState, SecurityMode, Target};
pub use outbound::{FrameSink, Outbound};
pub use pipeline::{Pipeline, TlsSettings};
