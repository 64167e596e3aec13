// UniFi Access controller client.
//
// Hand-crafted async client for the developer API at /api/v1/developer/.
// Every response arrives in a `{code, msg, data}` envelope; `code` other
// than "SUCCESS" is surfaced as an error.

pub mod client;
pub mod types;

pub use client::{AccessClient, AccessConfig};
pub use types::{
    AccessPolicy, PolicyCreate, PolicyResource, ScheduleDetail, ScheduleSummary, ScheduleUpdate,
    TimeRange, WeekSchedule,
};
