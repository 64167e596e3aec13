// ── Domain model for one sync cycle ──

use chrono::{DateTime, Utc};
use doorsync_api::EventInstance;
use serde::Serialize;

/// One calendar booking mapped to a single room.
///
/// Multi-room instances from the calendar are expanded one-per-room at the
/// source boundary; an instance with no booked rooms falls back to a single
/// event whose room is derived from the location string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub name: String,
    pub room: String,
    /// Raw location string from the calendar; never used for exclusion.
    pub location_raw: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

impl Event {
    /// Expand a calendar instance into per-room events.
    pub fn expand(instance: &EventInstance) -> Vec<Event> {
        let rooms: Vec<String> = if instance.rooms.is_empty() {
            vec![fallback_room(instance)]
        } else {
            instance.rooms.clone()
        };

        rooms
            .into_iter()
            .filter(|room| !room.is_empty())
            .map(|room| Event {
                id: instance.id.clone(),
                name: instance.name.clone(),
                room,
                location_raw: instance.location_raw.clone(),
                start_at: instance.start_at,
                end_at: instance.end_at,
            })
            .collect()
    }
}

/// Room name for an instance with no resource bookings.
///
/// Locations follow a "Campus - address - room" convention; with three or
/// more segments the last one names a room, otherwise the whole string is
/// the best we have.
pub fn fallback_room(instance: &EventInstance) -> String {
    let parts: Vec<&str> = instance
        .location_raw
        .split(" - ")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() >= 3 {
        parts[parts.len() - 1].to_owned()
    } else {
        instance.location_raw.trim().to_owned()
    }
}

/// Where a display item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemSource {
    Event,
    Override,
    OfficeHours,
}

/// One row in the desired-schedule preview: a single unlock window a
/// single event (or office hours) contributes to a single door.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayItem {
    pub event_id: String,
    pub name: String,
    pub room: String,
    pub door_key: String,
    pub door_label: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub source: ItemSource,
}
