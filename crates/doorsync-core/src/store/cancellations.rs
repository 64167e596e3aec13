// ── Cancelled-events store ──
//
// Event instances the dashboard has manually cancelled. The sync loop only
// needs set membership by instance id; mutations come from the dashboard.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::store;

/// Entries are kept this long past the event's end before pruning.
const RETENTION_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelledInstance {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,
    pub cancelled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CancelledEvents {
    #[serde(default)]
    pub instances: Vec<CancelledInstance>,
}

impl CancelledEvents {
    pub fn ids(&self) -> HashSet<&str> {
        self.instances.iter().map(|i| i.id.as_str()).collect()
    }
}

pub fn load(path: &Path) -> CancelledEvents {
    store::load_or_default(path)
}

/// Cancel one instance. Idempotent by id; prunes expired entries on write.
pub fn add(
    path: &Path,
    id: &str,
    name: &str,
    start_at: Option<DateTime<Utc>>,
    end_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), SyncError> {
    let mut data = load(path);
    data.instances.retain(|i| i.id != id);
    data.instances.push(CancelledInstance {
        id: id.to_owned(),
        name: name.to_owned(),
        start_at,
        end_at,
        cancelled_at: now,
    });
    prune(&mut data.instances, now);
    store::save_atomic(path, &data)
}

/// Restore (un-cancel) one instance.
pub fn remove(path: &Path, id: &str) -> Result<(), SyncError> {
    let mut data = load(path);
    data.instances.retain(|i| i.id != id);
    store::save_atomic(path, &data)
}

fn prune(instances: &mut Vec<CancelledInstance>, now: DateTime<Utc>) {
    let cutoff = now - chrono::Duration::hours(RETENTION_HOURS);
    instances.retain(|i| match i.end_at.or(i.start_at) {
        Some(reference) => reference >= cutoff,
        None => true,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_idempotent_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cancelled-events.json");
        let now: DateTime<Utc> = "2026-03-04T12:00:00Z".parse().unwrap();
        let start: DateTime<Utc> = "2026-03-05T00:00:00Z".parse().unwrap();
        let end: DateTime<Utc> = "2026-03-05T02:00:00Z".parse().unwrap();

        add(&path, "e1", "Youth Group", Some(start), Some(end), now).unwrap();
        add(&path, "e1", "Youth Group", Some(start), Some(end), now).unwrap();

        let data = load(&path);
        assert_eq!(data.instances.len(), 1);
        assert!(data.ids().contains("e1"));
    }

    #[test]
    fn remove_restores_the_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cancelled-events.json");
        let now: DateTime<Utc> = "2026-03-04T12:00:00Z".parse().unwrap();

        add(&path, "e1", "Youth Group", None, None, now).unwrap();
        remove(&path, "e1").unwrap();
        assert!(load(&path).instances.is_empty());
    }

    #[test]
    fn prunes_long_finished_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cancelled-events.json");

        let old_end: DateTime<Utc> = "2026-03-01T00:00:00Z".parse().unwrap();
        let t1: DateTime<Utc> = "2026-03-01T01:00:00Z".parse().unwrap();
        add(&path, "old", "Old", None, Some(old_end), t1).unwrap();

        // Adding later prunes the long-finished entry.
        let t2: DateTime<Utc> = "2026-03-04T12:00:00Z".parse().unwrap();
        add(&path, "new", "New", None, Some(t2 + chrono::Duration::hours(2)), t2).unwrap();

        let loaded = load(&path);
        let ids: Vec<&str> = loaded.instances.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["new"]);
    }
}
