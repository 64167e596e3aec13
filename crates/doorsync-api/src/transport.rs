// Shared transport configuration for building reqwest::Client instances.
//
// Both the calendar and controller clients share timeout and TLS settings
// through this module, avoiding duplicated builder logic.

use std::time::Duration;

/// Lowest allowed request timeout. Every network call in the sync pipeline
/// is bounded by at least this much.
pub const MIN_TIMEOUT: Duration = Duration::from_secs(15);

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    /// Accept any certificate (for self-signed controllers).
    pub danger_accept_invalid_certs: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            danger_accept_invalid_certs: false,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        self.builder()
            .build()
            .map_err(crate::error::Error::Transport)
    }

    /// Build a `reqwest::Client` with additional default headers.
    ///
    /// Used by the controller client to inject its API-key header.
    pub fn build_client_with_headers(
        &self,
        headers: reqwest::header::HeaderMap,
    ) -> Result<reqwest::Client, crate::error::Error> {
        self.builder()
            .default_headers(headers)
            .build()
            .map_err(crate::error::Error::Transport)
    }

    fn builder(&self) -> reqwest::ClientBuilder {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout.max(MIN_TIMEOUT))
            .user_agent(concat!("doorsync/", env!("CARGO_PKG_VERSION")));

        if self.danger_accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder
    }
}
