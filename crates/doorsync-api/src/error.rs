use thiserror::Error;

/// Top-level error type for the `doorsync-api` crate.
///
/// Covers every failure mode across both API surfaces: authentication,
/// transport, the calendar API, and the controller's developer API.
/// `doorsync-core` maps these into per-cycle sync diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Credentials missing or malformed for the configured auth type.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Calendar API ────────────────────────────────────────────────
    /// Rate limited (HTTP 429) with no cached window to fall back on.
    #[error("Rate limited by upstream calendar")]
    RateLimited,

    /// Non-success HTTP status with the response body for debugging.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Controller API ──────────────────────────────────────────────
    /// Error parsed from the controller's `{code, msg, data}` envelope.
    #[error("Controller error: {code}: {message}")]
    Controller { code: String, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying next cycle.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::RateLimited => true,
            _ => false,
        }
    }

    /// Returns `true` for a 429-class response.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Api { status: 429, .. })
    }
}
