// Planning Center Calendar API client.
//
// Hand-crafted async client over the JSON:API surface at /calendar/v2/.
// Supports personal-access-token (HTTP Basic) and OAuth bearer auth.

pub mod client;
pub mod types;

pub use client::{PcoAuth, PcoClient, PcoConfig};
pub use types::{EventInstance, PcoStats};
