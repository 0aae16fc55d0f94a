//! # Config Module
//!
//! Server settings collected from `serve` flags and their `COREGAME_*`
//! environment fallbacks, plus logging setup.

use crate::cli::CliError;
use std::net::{SocketAddr, ToSocketAddrs};
use std::num::NonZeroU32;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "coregame=info,tower_http=info";

/// Settings for the HTTP API.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Bearer key required on API routes; `None` leaves them open.
    pub api_key: Option<String>,
    /// Global requests per second; 0 disables limiting.
    pub rate_limit: u32,
    /// Facet artifacts for cut planning.
    pub abi_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("coregame.redb"),
            host: "127.0.0.1".to_string(),
            port: 8080,
            api_key: None,
            rate_limit: 50,
            abi_dir: None,
        }
    }
}

impl ServerConfig {
    /// Address to bind. `host` may be an IP literal or a hostname; the first
    /// resolved address wins.
    pub fn socket_addr(&self) -> Result<SocketAddr, CliError> {
        let bad = |reason: String| CliError::Config(format!("bad listen address {}:{}: {reason}", self.host, self.port));
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| bad(e.to_string()))?
            .next()
            .ok_or_else(|| bad("host resolved to no addresses".to_string()))
    }

    /// Rate limit quota, if limiting is enabled.
    pub fn rate_limit_quota(&self) -> Option<NonZeroU32> {
        NonZeroU32::new(self.rate_limit)
    }
}

/// Install the global tracing subscriber.
///
/// Honors `RUST_LOG`; falls back to [`DEFAULT_LOG_FILTER`].
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// =============================================================================
// TESTS
// =============================================================================
