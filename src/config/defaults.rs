//! Fallback settings used when the process is started without arguments.

use std::net::ToSocketAddrs;

use crate::config::schema::ClientConfig;

/// Port used when none is given.
pub const DEFAULT_PORT: u16 = 6633;

/// Payload bundled with the binary: a HELLO followed by an ECHO_REQUEST.
pub static DEFAULT_PAYLOAD: &[u8] = include_bytes!("../../resources/default_payload.bin");

/// First address the local machine's host name resolves to.
pub fn local_address() -> String {
    let hostname = std::env::var("HOSTNAME")
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "localhost".to_string());

    match (hostname.as_str(), 0).to_socket_addrs() {
        Ok(mut addrs) => {
            if let Some(addr) = addrs.next() {
                return addr.ip().to_string();
            }
            tracing::warn!(hostname = %hostname, "Host name resolved to no addresses");
        }
        Err(e) => {
            tracing::warn!(hostname = %hostname, error = %e, "Failed to resolve local host name");
        }
    }
    "127.0.0.1".to_string()
}

/// Configuration used when required arguments are missing: the local
/// address, the default port and a forced secured pipeline. The caller
/// supplies `DEFAULT_PAYLOAD` as the payload.
pub fn fallback_config() -> ClientConfig {
    let mut config = ClientConfig::default();
    config.target.host = local_address();
    config.target.port = DEFAULT_PORT;
    config.security.secured = true;
    config
}
