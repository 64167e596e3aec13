use thiserror::Error;

/// Unified error type for the sync engine.
///
/// Recoverable variants are recorded in the cycle's error ring buffer;
/// `ConfigInvalid` with no last-good mapping snapshot is the only condition
/// that fails a whole cycle.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A state file failed structural validation.
    #[error("invalid {field}: {reason}")]
    ConfigInvalid { field: String, reason: String },

    /// The calendar API could not be reached (cycle proceeds on cache when
    /// the client has one, otherwise the cycle fails).
    #[error("upstream calendar unavailable: {0}")]
    UpstreamUnavailable(#[source] doorsync_api::Error),

    /// No remote schedule with the expected name exists for this door.
    /// Per-door fatal; other doors continue.
    #[error("no remote schedule named '{schedule}' for door '{door_key}'")]
    RemoteScheduleMissing { door_key: String, schedule: String },

    /// A schedule or policy write failed. Per-door fatal; other doors
    /// continue and the next cycle reconverges.
    #[error("remote write failed for door '{door_key}': {source}")]
    RemoteWriteFailed {
        door_key: String,
        #[source]
        source: doorsync_api::Error,
    },

    /// A state blob could not be persisted; the next cycle retries.
    #[error("state write failed for {path}: {source}")]
    StateWriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configured cron cadence does not parse.
    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },
}

impl SyncError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
