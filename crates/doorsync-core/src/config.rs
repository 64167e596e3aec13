// ── Runtime sync configuration ──
//
// These types describe *what* one sync cycle covers: the display zone,
// the fetch window, and where the JSON state blobs live. The binary
// constructs a `SyncConfig` from the environment and hands it in -- core
// never reads environment variables.

use std::path::PathBuf;

use chrono_tz::Tz;

/// Paths to the on-disk JSON state blobs.
///
/// Operator-facing files are re-read on every cycle; the rest are owned by
/// the sync process (plus the dashboard for cancellations).
#[derive(Debug, Clone)]
pub struct StateFiles {
    pub mapping: PathBuf,
    pub office_hours: PathBuf,
    pub overrides: PathBuf,
    pub safe_hours: PathBuf,
    pub approved_names: PathBuf,
    pub event_memory: PathBuf,
    pub pending_approvals: PathBuf,
    pub cancelled_events: PathBuf,
    pub sync_state: PathBuf,
}

impl Default for StateFiles {
    fn default() -> Self {
        Self {
            mapping: "./config/room-door-mapping.json".into(),
            office_hours: "./config/office-hours.json".into(),
            overrides: "./config/event-overrides.json".into(),
            safe_hours: "./config/safe-hours.json".into(),
            approved_names: "./config/approved-event-names.json".into(),
            event_memory: "./state/event-memory.json".into(),
            pending_approvals: "./state/pending-approvals.json".into(),
            cancelled_events: "./state/cancelled-events.json".into(),
            sync_state: "./state/sync-state.json".into(),
        }
    }
}

/// Configuration for the sync orchestrator.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// IANA zone used for every local-time conversion.
    pub display_zone: Tz,
    /// How far ahead of now the event fetch window extends.
    pub lookahead: chrono::Duration,
    /// How far behind now the event fetch window extends.
    pub lookbehind: chrono::Duration,
    /// Initial apply mode when no persisted sync state exists.
    pub apply_default: bool,
    pub files: StateFiles,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            display_zone: chrono_tz::America::New_York,
            lookahead: chrono::Duration::hours(168),
            lookbehind: chrono::Duration::hours(24),
            apply_default: false,
            files: StateFiles::default(),
        }
    }
}
