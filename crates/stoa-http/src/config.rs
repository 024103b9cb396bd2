//! Server configuration.
//!
//! [`ServerConfig`] can be built fluently or deserialized from a config
//! file. Missing fields fall back to the documented defaults; unknown
//! fields are rejected so typos surface at load time.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use stoa_http::ServerConfig;
//!
//! let config = ServerConfig::builder()
//!     .addr("127.0.0.1:3000")
//!     .request_timeout(Some(Duration::from_secs(5)))
//!     .build();
//!
//! assert_eq!(config.addr(), "127.0.0.1:3000");
//! ```

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Default bind address.
pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// Default graceful shutdown grace period in seconds.
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 30;

/// Settings for a [`Server`](crate::Server).
///
/// Use [`ServerConfig::builder()`] to construct instances in code, or
/// deserialize from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address, e.g. "0.0.0.0:8080".
    #[serde(default = "default_addr")]
    addr: String,

    /// Per-request handler deadline in milliseconds. Absent means no
    /// deadline: requests run as long as the handler takes.
    #[serde(default)]
    request_timeout_ms: Option<u64>,

    /// How long shutdown waits for in-flight connections, in seconds.
    #[serde(default = "default_shutdown_grace_secs")]
    shutdown_grace_secs: u64,
}

fn default_addr() -> String {
    DEFAULT_ADDR.to_string()
}

fn default_shutdown_grace_secs() -> u64 {
    DEFAULT_SHUTDOWN_GRACE_SECS
}

impl ServerConfig {
    /// Creates a configuration builder with default values.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Returns the bind address.
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Parses the bind address as a `SocketAddr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address does not parse.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.addr.parse()
    }

    /// Returns the per-request deadline, if one is configured.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Returns the shutdown grace period.
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Fluent builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    addr: String,
    request_timeout: Option<Duration>,
    shutdown_grace: Duration,
}

impl ServerConfigBuilder {
    /// Creates a builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            request_timeout: None,
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
        }
    }

    /// Sets the bind address, e.g. "127.0.0.1:3000".
    #[must_use]
    pub fn addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    /// Sets the per-request deadline. `None` disables the deadline.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets how long shutdown waits for in-flight connections.
    #[must_use]
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Builds the [`ServerConfig`].
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            addr: self.addr,
            request_timeout_ms: self
                .request_timeout
                .map(|timeout| u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)),
            shutdown_grace_secs: self.shutdown_grace.as_secs(),
        }
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
