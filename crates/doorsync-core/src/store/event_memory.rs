// ── Event memory store ──
//
// Rolling observation log of event names: when each name was last seen and
// when it next occurs. Purely informational (dashboard display); the sync
// pipeline never reads it back.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use doorsync_api::EventInstance;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::model;
use crate::store;

/// Entries with no upcoming occurrence are dropped once unseen this long.
const RETENTION_DAYS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEntry {
    pub name: String,
    #[serde(default)]
    pub building: String,
    #[serde(default)]
    pub rooms: Vec<String>,
    /// Most recent past start we have ever observed for this name.
    #[serde(default)]
    pub last_seen_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_end_at: Option<DateTime<Utc>>,
    /// Nearest future start from the latest observation batch.
    #[serde(default)]
    pub next_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_end_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMemory {
    #[serde(default)]
    pub events: Vec<MemoryEntry>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

pub fn load(path: &Path) -> EventMemory {
    store::load_or_default(path)
}

/// Merge one observation batch into the memory file.
///
/// `lastSeenAt` tracks the most recent past start ever observed; `nextAt`
/// the nearest future start, cleared once it passes. Rooms and building
/// follow the most recent observation in the batch.
pub fn update(
    path: &Path,
    instances: &[EventInstance],
    now: DateTime<Utc>,
) -> Result<(), SyncError> {
    let memory = load(path);

    let mut entries: HashMap<String, MemoryEntry> = memory
        .events
        .into_iter()
        .filter(|e| !e.name.trim().is_empty())
        .map(|e| (e.name.trim().to_lowercase(), e))
        .collect();

    // Expire nextAt values that are now in the past.
    for entry in entries.values_mut() {
        if entry.next_at.is_some_and(|next| next < now) {
            entry.next_at = None;
            entry.next_end_at = None;
        }
    }

    // Process the batch oldest-first so the newest observation of a name
    // wins for rooms/building.
    let mut batch: Vec<&EventInstance> = instances
        .iter()
        .filter(|i| !i.name.trim().is_empty())
        .collect();
    batch.sort_by_key(|i| (i.start_at, i.id.clone()));

    for instance in batch {
        let key = instance.name.trim().to_lowercase();
        let entry = entries.entry(key).or_insert_with(|| MemoryEntry {
            name: instance.name.trim().to_owned(),
            building: String::new(),
            rooms: Vec::new(),
            last_seen_at: None,
            last_end_at: None,
            next_at: None,
            next_end_at: None,
        });

        if instance.start_at <= now {
            if entry.last_seen_at.is_none_or(|seen| instance.start_at > seen) {
                entry.last_seen_at = Some(instance.start_at);
                entry.last_end_at = Some(instance.end_at);
            }
        } else if entry.next_at.is_none_or(|next| instance.start_at < next) {
            entry.next_at = Some(instance.start_at);
            entry.next_end_at = Some(instance.end_at);
        }

        entry.rooms = if instance.rooms.is_empty() {
            vec![model::fallback_room(instance)]
        } else {
            instance.rooms.clone()
        };
        if let Some(building) = &instance.building {
            entry.building = building.clone();
        }
    }

    let cutoff = now - chrono::Duration::days(RETENTION_DAYS);
    let mut kept: Vec<MemoryEntry> = entries
        .into_values()
        .filter(|e| e.next_at.is_some() || e.last_seen_at.is_some_and(|seen| seen >= cutoff))
        .collect();

    // Upcoming soonest-first, then past most-recent-first.
    kept.sort_by(|a, b| match (a.next_at, b.next_at) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.name.cmp(&b.name)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => b
            .last_seen_at
            .cmp(&a.last_seen_at)
            .then_with(|| a.name.cmp(&b.name)),
    });

    store::save_atomic(
        path,
        &EventMemory {
            events: kept,
            updated_at: Some(now),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(name: &str, start: &str, end: &str, rooms: &[&str]) -> EventInstance {
        EventInstance {
            id: format!("{name}-{start}"),
            name: name.into(),
            start_at: start.parse().unwrap(),
            end_at: end.parse().unwrap(),
            rooms: rooms.iter().map(|r| r.to_string()).collect(),
            location_raw: "North Campus - 1 Main St".into(),
            building: Some("North Campus".into()),
        }
    }

    #[test]
    fn tracks_last_and_next_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event-memory.json");
        let now: DateTime<Utc> = "2026-03-04T12:00:00Z".parse().unwrap();

        update(
            &path,
            &[
                instance("Sunday Service", "2026-03-01T14:00:00Z", "2026-03-01T16:00:00Z", &["Sanctuary"]),
                instance("Sunday Service", "2026-03-08T14:00:00Z", "2026-03-08T16:00:00Z", &["Sanctuary"]),
            ],
            now,
        )
        .unwrap();

        let memory = load(&path);
        assert_eq!(memory.events.len(), 1);
        let entry = &memory.events[0];
        assert_eq!(entry.name, "Sunday Service");
        assert_eq!(entry.last_seen_at.unwrap().to_rfc3339(), "2026-03-01T14:00:00+00:00");
        assert_eq!(entry.next_at.unwrap().to_rfc3339(), "2026-03-08T14:00:00+00:00");
        assert_eq!(entry.rooms, vec!["Sanctuary"]);
        assert_eq!(entry.building, "North Campus");
    }

    #[test]
    fn expires_next_at_once_past() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event-memory.json");

        let t1: DateTime<Utc> = "2026-03-04T12:00:00Z".parse().unwrap();
        update(
            &path,
            &[instance("Midweek", "2026-03-05T00:00:00Z", "2026-03-05T02:00:00Z", &["Gym"])],
            t1,
        )
        .unwrap();
        assert!(load(&path).events[0].next_at.is_some());

        // A later batch with no occurrences for this name clears the stale nextAt.
        let t2: DateTime<Utc> = "2026-03-06T12:00:00Z".parse().unwrap();
        update(&path, &[], t2).unwrap();
        let entry = &load(&path).events[0];
        assert!(entry.next_at.is_none());
        assert!(entry.next_end_at.is_none());
    }

    #[test]
    fn prunes_stale_names_without_upcoming() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event-memory.json");

        let t1: DateTime<Utc> = "2026-01-01T12:00:00Z".parse().unwrap();
        update(
            &path,
            &[instance("One Off", "2026-01-01T00:00:00Z", "2026-01-01T01:00:00Z", &[])],
            t1,
        )
        .unwrap();

        let t2: DateTime<Utc> = "2026-03-15T12:00:00Z".parse().unwrap();
        update(&path, &[], t2).unwrap();
        assert!(load(&path).events.is_empty());
    }

    #[test]
    fn sorts_upcoming_before_past() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event-memory.json");
        let now: DateTime<Utc> = "2026-03-04T12:00:00Z".parse().unwrap();

        update(
            &path,
            &[
                instance("Past A", "2026-03-01T10:00:00Z", "2026-03-01T11:00:00Z", &[]),
                instance("Past B", "2026-03-03T10:00:00Z", "2026-03-03T11:00:00Z", &[]),
                instance("Soon", "2026-03-05T10:00:00Z", "2026-03-05T11:00:00Z", &[]),
                instance("Later", "2026-03-09T10:00:00Z", "2026-03-09T11:00:00Z", &[]),
            ],
            now,
        )
        .unwrap();

        let names: Vec<String> = load(&path).events.iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, ["Soon", "Later", "Past B", "Past A"]);
    }
}
