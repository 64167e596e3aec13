// doorsync-core: the sync engine between the calendar API and the access
// controller. Pure projection logic (time windows, schedule builder,
// weekly projector) plus the JSON state stores and the cycle orchestrator.

pub mod apply;
pub mod builder;
pub mod config;
pub mod error;
pub mod model;
pub mod scheduler;
pub mod store;
pub mod sync;
pub mod timewin;
pub mod weekly;

// ── Primary re-exports ──────────────────────────────────────────────
pub use builder::SchedulePlan;
pub use config::{StateFiles, SyncConfig};
pub use error::SyncError;
pub use model::{DisplayItem, Event, ItemSource};
pub use scheduler::Cadence;
pub use sync::{CycleCounts, Preview, RunOutcome, StatusSnapshot, SyncService};
pub use timewin::Interval;
