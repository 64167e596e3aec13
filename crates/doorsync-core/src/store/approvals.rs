// ── After-hours approval gate ──
//
// Events starting outside the per-weekday safe hours are held from the
// desired schedule until a human approves them. Approving records the
// event name, so future occurrences of the same event pass automatically.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::model::Event;
use crate::store;
use crate::timewin::{fmt_hhmm, parse_hhmm};

const DEFAULT_SAFE_START: u32 = 5 * 60;
const DEFAULT_SAFE_END: u32 = 23 * 60;

// ── Safe hours ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub start: String,
    pub end: String,
}

impl Default for DayWindow {
    fn default() -> Self {
        Self {
            start: "05:00".into(),
            end: "23:00".into(),
        }
    }
}

/// Per-weekday local window within which events are auto-approved.
/// Absent days fall back to 05:00-23:00.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeHours {
    #[serde(default)]
    pub monday: DayWindow,
    #[serde(default)]
    pub tuesday: DayWindow,
    #[serde(default)]
    pub wednesday: DayWindow,
    #[serde(default)]
    pub thursday: DayWindow,
    #[serde(default)]
    pub friday: DayWindow,
    #[serde(default)]
    pub saturday: DayWindow,
    #[serde(default)]
    pub sunday: DayWindow,
}

impl SafeHours {
    fn day(&self, weekday: Weekday) -> &DayWindow {
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    /// Parsed `(start, end)` minutes for a weekday, with the built-in
    /// defaults covering unparseable values.
    pub fn window(&self, weekday: Weekday) -> (u32, u32) {
        let day = self.day(weekday);
        (
            parse_hhmm(&day.start).unwrap_or(DEFAULT_SAFE_START),
            parse_hhmm(&day.end).unwrap_or(DEFAULT_SAFE_END),
        )
    }

    /// Structural validation for dashboard-facing writes.
    pub fn validate(&self) -> Result<(), SyncError> {
        const NAMES: [(&str, Weekday); 7] = [
            ("monday", Weekday::Mon),
            ("tuesday", Weekday::Tue),
            ("wednesday", Weekday::Wed),
            ("thursday", Weekday::Thu),
            ("friday", Weekday::Fri),
            ("saturday", Weekday::Sat),
            ("sunday", Weekday::Sun),
        ];
        for (name, weekday) in NAMES {
            let day = self.day(weekday);
            if parse_hhmm(&day.start).is_none() {
                return Err(SyncError::invalid(
                    format!("{name}.start"),
                    format!("'{}' is not HH:MM", day.start),
                ));
            }
            if parse_hhmm(&day.end).is_none() {
                return Err(SyncError::invalid(
                    format!("{name}.end"),
                    format!("'{}' is not HH:MM", day.end),
                ));
            }
        }
        Ok(())
    }
}

pub fn load_safe_hours(path: &Path) -> SafeHours {
    store::load_or_default(path)
}

// ── Approved names ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedName {
    pub name: String,
    pub approved_at: DateTime<Utc>,
}

/// Case-insensitive set of event names that bypass the gate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApprovedNames {
    #[serde(default)]
    pub names: Vec<ApprovedName>,
}

impl ApprovedNames {
    pub fn contains(&self, name: &str) -> bool {
        let name = name.trim().to_lowercase();
        !name.is_empty()
            && self
                .names
                .iter()
                .any(|n| n.name.trim().to_lowercase() == name)
    }

    /// Add a name as given; membership stays case-insensitive.
    pub fn add(&mut self, name: &str, now: DateTime<Utc>) {
        if !self.contains(name) && !name.trim().is_empty() {
            self.names.push(ApprovedName {
                name: name.to_owned(),
                approved_at: now,
            });
        }
    }
}

pub fn load_approved_names(path: &Path) -> ApprovedNames {
    store::load_or_default(path)
}

// ── Pending queue ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingApproval {
    pub id: String,
    pub name: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub flagged_at: DateTime<Utc>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingApprovals {
    #[serde(default)]
    pub pending: Vec<PendingApproval>,
}

impl PendingApprovals {
    fn remove(&mut self, id: &str) -> Option<PendingApproval> {
        let idx = self.pending.iter().position(|p| p.id == id)?;
        Some(self.pending.remove(idx))
    }

    /// Drop entries whose event has already ended.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        self.pending.retain(|p| p.end_at >= now);
    }
}

pub fn load_pending(path: &Path) -> PendingApprovals {
    store::load_or_default(path)
}

// ── Gate ─────────────────────────────────────────────────────────────

/// Split events into the approved stream, updating the pending queue.
///
/// An event passes when its name is pre-approved or its local start falls
/// inside that weekday's safe window; either way any stale pending entry
/// for the id is cleared. Everything else is held and upserted into the
/// queue (`flaggedAt` set on first insert). Finished entries are pruned.
pub fn gate(
    events: &[Event],
    safe_hours: &SafeHours,
    approved: &ApprovedNames,
    pending: &mut PendingApprovals,
    now: DateTime<Utc>,
    tz: Tz,
) -> Vec<Event> {
    let mut passed = Vec::with_capacity(events.len());
    let mut held_ids: HashSet<&str> = HashSet::new();

    for event in events {
        if approved.contains(&event.name) {
            pending.remove(&event.id);
            passed.push(event.clone());
            continue;
        }

        let start_local = event.start_at.with_timezone(&tz);
        let start_min = start_local.hour() * 60 + start_local.minute();
        let (safe_start, safe_end) = safe_hours.window(start_local.weekday());

        if (safe_start..=safe_end).contains(&start_min) {
            pending.remove(&event.id);
            passed.push(event.clone());
            continue;
        }

        // Held. Multi-room expansions share an id; flag it once.
        if held_ids.insert(&event.id) && !pending.pending.iter().any(|p| p.id == event.id) {
            pending.pending.push(PendingApproval {
                id: event.id.clone(),
                name: event.name.clone(),
                start_at: event.start_at,
                end_at: event.end_at,
                flagged_at: now,
                reason: format!(
                    "starts {} local; outside safe window {}-{}",
                    fmt_hhmm(start_min),
                    fmt_hhmm(safe_start),
                    fmt_hhmm(safe_end),
                ),
            });
        }
    }

    pending.prune(now);
    passed
}

/// Approve a pending event: remove it from the queue and remember its name.
/// Returns the approved name, or `None` when the id is not pending.
pub fn approve(
    pending_path: &Path,
    approved_path: &Path,
    event_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<String>, SyncError> {
    let mut pending = load_pending(pending_path);
    let Some(entry) = pending.remove(event_id) else {
        return Ok(None);
    };
    store::save_atomic(pending_path, &pending)?;

    let mut approved = load_approved_names(approved_path);
    approved.add(&entry.name, now);
    store::save_atomic(approved_path, &approved)?;

    Ok(Some(entry.name))
}

/// Deny a pending event: remove it from the queue. The next cycle
/// re-evaluates and may flag it again.
pub fn deny(pending_path: &Path, event_id: &str) -> Result<Option<String>, SyncError> {
    let mut pending = load_pending(pending_path);
    let Some(entry) = pending.remove(event_id) else {
        return Ok(None);
    };
    store::save_atomic(pending_path, &pending)?;
    Ok(Some(entry.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EASTERN: Tz = chrono_tz::America::New_York;

    fn event(id: &str, name: &str, start: &str, end: &str) -> Event {
        Event {
            id: id.into(),
            name: name.into(),
            room: "Sanctuary".into(),
            location_raw: String::new(),
            start_at: start.parse().unwrap(),
            end_at: end.parse().unwrap(),
        }
    }

    #[test]
    fn daytime_event_passes() {
        // Sunday 2026-03-01 09:00 Eastern.
        let events = vec![event("e1", "Sunday Service", "2026-03-01T14:00:00Z", "2026-03-01T16:00:00Z")];
        let mut pending = PendingApprovals::default();
        let now: DateTime<Utc> = "2026-02-28T12:00:00Z".parse().unwrap();

        let passed = gate(&events, &SafeHours::default(), &ApprovedNames::default(), &mut pending, now, EASTERN);
        assert_eq!(passed.len(), 1);
        assert!(pending.pending.is_empty());
    }

    #[test]
    fn early_morning_event_is_held_with_reason() {
        // Sunday 02:00 Eastern = 07:00Z.
        let events = vec![event("e1", "Lock-In", "2026-03-01T07:00:00Z", "2026-03-01T09:00:00Z")];
        let mut pending = PendingApprovals::default();
        let now: DateTime<Utc> = "2026-02-28T12:00:00Z".parse().unwrap();

        let passed = gate(&events, &SafeHours::default(), &ApprovedNames::default(), &mut pending, now, EASTERN);
        assert!(passed.is_empty());
        assert_eq!(pending.pending.len(), 1);
        let entry = &pending.pending[0];
        assert_eq!(entry.id, "e1");
        assert_eq!(entry.reason, "starts 02:00 local; outside safe window 05:00-23:00");
    }

    #[test]
    fn approved_name_bypasses_and_clears_pending() {
        let events = vec![event("e1", "Lock-In", "2026-03-01T07:00:00Z", "2026-03-01T09:00:00Z")];
        let now: DateTime<Utc> = "2026-02-28T12:00:00Z".parse().unwrap();

        let mut pending = PendingApprovals::default();
        gate(&events, &SafeHours::default(), &ApprovedNames::default(), &mut pending, now, EASTERN);
        assert_eq!(pending.pending.len(), 1);

        let mut approved = ApprovedNames::default();
        approved.add("lock-in", now); // case-insensitive membership

        let passed = gate(&events, &SafeHours::default(), &approved, &mut pending, now, EASTERN);
        assert_eq!(passed.len(), 1);
        assert!(pending.pending.is_empty());
    }

    #[test]
    fn held_entry_keeps_original_flagged_at() {
        let events = vec![event("e1", "Lock-In", "2026-03-01T07:00:00Z", "2026-03-01T09:00:00Z")];
        let mut pending = PendingApprovals::default();

        let t1: DateTime<Utc> = "2026-02-27T12:00:00Z".parse().unwrap();
        gate(&events, &SafeHours::default(), &ApprovedNames::default(), &mut pending, t1, EASTERN);
        let t2: DateTime<Utc> = "2026-02-28T12:00:00Z".parse().unwrap();
        gate(&events, &SafeHours::default(), &ApprovedNames::default(), &mut pending, t2, EASTERN);

        assert_eq!(pending.pending.len(), 1);
        assert_eq!(pending.pending[0].flagged_at, t1);
    }

    #[test]
    fn finished_entries_are_pruned() {
        let events = vec![event("e1", "Lock-In", "2026-03-01T07:00:00Z", "2026-03-01T09:00:00Z")];
        let mut pending = PendingApprovals::default();

        let before: DateTime<Utc> = "2026-02-28T12:00:00Z".parse().unwrap();
        gate(&events, &SafeHours::default(), &ApprovedNames::default(), &mut pending, before, EASTERN);
        assert_eq!(pending.pending.len(), 1);

        let after: DateTime<Utc> = "2026-03-02T12:00:00Z".parse().unwrap();
        gate(&[], &SafeHours::default(), &ApprovedNames::default(), &mut pending, after, EASTERN);
        assert!(pending.pending.is_empty());
    }

    #[test]
    fn approve_records_name_for_future_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let pending_path = dir.path().join("pending-approvals.json");
        let approved_path = dir.path().join("approved-event-names.json");
        let now: DateTime<Utc> = "2026-02-28T12:00:00Z".parse().unwrap();

        let mut pending = PendingApprovals::default();
        gate(
            &[event("e1", "Lock-In", "2026-03-01T07:00:00Z", "2026-03-01T09:00:00Z")],
            &SafeHours::default(),
            &ApprovedNames::default(),
            &mut pending,
            now,
            EASTERN,
        );
        store::save_atomic(&pending_path, &pending).unwrap();

        let name = approve(&pending_path, &approved_path, "e1", now).unwrap();
        assert_eq!(name.as_deref(), Some("Lock-In"));
        assert!(load_pending(&pending_path).pending.is_empty());
        assert!(load_approved_names(&approved_path).contains("LOCK-IN"));

        // Denying a missing id is a no-op.
        assert!(deny(&pending_path, "e1").unwrap().is_none());
    }

    #[test]
    fn safe_hours_round_trip_and_validation() {
        let safe = SafeHours {
            friday: DayWindow {
                start: "06:30".into(),
                end: "23:30".into(),
            },
            ..SafeHours::default()
        };
        let raw = serde_json::to_string(&safe).unwrap();
        assert_eq!(serde_json::from_str::<SafeHours>(&raw).unwrap(), safe);
        assert!(safe.validate().is_ok());

        let broken = SafeHours {
            monday: DayWindow {
                start: "late".into(),
                end: "23:00".into(),
            },
            ..SafeHours::default()
        };
        assert!(broken.validate().is_err());
        // The gate still runs on defaults when a value is unparseable.
        assert_eq!(broken.window(Weekday::Mon), (300, 1380));
    }

    #[test]
    fn per_day_windows_are_respected() {
        let safe = SafeHours {
            friday: DayWindow {
                start: "05:00".into(),
                end: "23:30".into(),
            },
            ..SafeHours::default()
        };
        // Friday 2026-03-06 23:15 Eastern = 2026-03-07T04:15Z.
        let events = vec![event("e1", "Late Show", "2026-03-07T04:15:00Z", "2026-03-07T05:00:00Z")];
        let mut pending = PendingApprovals::default();
        let now: DateTime<Utc> = "2026-03-06T12:00:00Z".parse().unwrap();

        let passed = gate(&events, &safe, &ApprovedNames::default(), &mut pending, now, EASTERN);
        assert_eq!(passed.len(), 1);

        let passed = gate(&events, &SafeHours::default(), &ApprovedNames::default(), &mut pending, now, EASTERN);
        assert!(passed.is_empty());
    }
}
