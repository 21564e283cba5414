//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! lifecycle, phases, net:
//!     → logging.rs (structured tracing events, one span per client run)
//!     → metrics.rs (write/byte/unit/run counters)
//! ```

pub mod logging;
pub mod metrics;
