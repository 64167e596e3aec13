// doorsync-api: async HTTP clients for the two remote systems the sync
// service reconciles -- the Planning Center Calendar API (event source)
// and the UniFi Access controller (schedule/policy target).

pub mod access;
pub mod error;
pub mod pco;
pub mod telegram;
pub mod transport;

// ── Primary re-exports ──────────────────────────────────────────────
pub use access::{AccessClient, AccessConfig};
pub use error::Error;
pub use pco::{EventInstance, PcoAuth, PcoClient, PcoConfig, PcoStats};
pub use telegram::TelegramClient;
pub use transport::TransportConfig;
