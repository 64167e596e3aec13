// Wire and output types for the Planning Center Calendar API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Output type ──────────────────────────────────────────────────────

/// One calendar event instance, flattened from the JSON:API envelope.
///
/// `rooms` holds the resource-booking room names for the instance (may be
/// empty); consumers fall back to `location_raw` when no room is booked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInstance {
    pub id: String,
    pub name: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub rooms: Vec<String>,
    pub location_raw: String,
    /// Campus name parsed from the "Campus - address" location convention.
    pub building: Option<String>,
}

// ── Fetch statistics ─────────────────────────────────────────────────

/// Counters surfaced into the sync status snapshot.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PcoStats {
    pub cache_hit_returns: u64,
    pub min_interval_cache_returns: u64,
    pub live_window_fetches: u64,
    pub event_instance_requests: u64,
    pub resource_booking_requests: u64,
    pub rate_limit_fallback_returns: u64,
    pub last_live_fetch_at: Option<DateTime<Utc>>,
    pub last_cache_hit_at: Option<DateTime<Utc>>,
    pub last_rate_limit_fallback_at: Option<DateTime<Utc>>,
    pub cache_keys: usize,
}

// ── JSON:API envelope shapes ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub included: Vec<IncludedResource>,
    #[serde(default)]
    pub links: PageLinks,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageLinks {
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventInstanceRow {
    pub id: String,
    #[serde(default)]
    pub attributes: EventInstanceAttributes,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct EventInstanceAttributes {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub starts_at: Option<String>,
    #[serde(default)]
    pub ends_at: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResourceBookingRow {
    #[serde(default)]
    pub relationships: Option<BookingRelationships>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BookingRelationships {
    #[serde(default)]
    pub resource: Option<RelationshipData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RelationshipData {
    #[serde(default)]
    pub data: Option<ResourceRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResourceRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IncludedResource {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub attributes: IncludedAttributes,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct IncludedAttributes {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}
