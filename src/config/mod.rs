//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)            CLI arguments
//!     → loader.rs (parse)           → override fields
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → ScriptedClient::from_config
//!
//! Missing arguments and no file:
//!     defaults.rs (local address, port 6633, bundled payload, secured)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod defaults;
pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ClientConfig, InboundUnit, PayloadConfig, ReceiveConfig, SecurityConfig, SessionConfig,
    TargetConfig,
};
pub use validation::{validate_config, ValidationError};
