// ── Event override store ──
//
// Per-event-name, per-door explicit window sets. An override replaces the
// default lead/lag padding with exact clock times on the event's local
// start date; an empty window list suppresses the door for that event.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::timewin;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideWindow {
    pub open_time: String,
    pub close_time: String,
}

impl OverrideWindow {
    pub fn open_minutes(&self) -> Option<u32> {
        timewin::parse_hhmm(&self.open_time)
    }

    pub fn close_minutes(&self) -> Option<u32> {
        timewin::parse_hhmm(&self.close_time)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoorOverride {
    /// Empty list means: suppress this door for this event.
    #[serde(default)]
    pub windows: Vec<OverrideWindow>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOverride {
    #[serde(default)]
    pub door_overrides: HashMap<String, DoorOverride>,
}

/// All configured overrides, keyed by event name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overrides {
    #[serde(default)]
    pub overrides: HashMap<String, EventOverride>,
}

/// Resolution for one (event, door) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideClass<'a> {
    /// No override: default lead/lag padding applies.
    Default,
    /// Replace with these clock windows on the event's local start date.
    Explicit(&'a [OverrideWindow]),
    /// Emit nothing for this door.
    Suppress,
}

impl Overrides {
    /// Case-insensitive exact name match, then case-insensitive exact
    /// door-key match.
    pub fn find(&self, event_name: &str, door_key: &str) -> OverrideClass<'_> {
        let name = event_name.trim().to_lowercase();
        if name.is_empty() {
            return OverrideClass::Default;
        }

        let Some(event) = self
            .overrides
            .iter()
            .find(|(key, _)| key.trim().to_lowercase() == name)
            .map(|(_, v)| v)
        else {
            return OverrideClass::Default;
        };

        let Some(door) = event
            .door_overrides
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(door_key))
            .map(|(_, v)| v)
        else {
            return OverrideClass::Default;
        };

        if door.windows.is_empty() {
            OverrideClass::Suppress
        } else {
            OverrideClass::Explicit(&door.windows)
        }
    }

    /// Structural validation for dashboard-facing writes.
    pub fn validate(&self) -> Result<(), SyncError> {
        for (event_name, event) in &self.overrides {
            for (door_key, door) in &event.door_overrides {
                for (idx, window) in door.windows.iter().enumerate() {
                    let field = format!(
                        "overrides.{event_name}.doorOverrides.{door_key}.windows[{idx}]"
                    );
                    if window.open_minutes().is_none() {
                        return Err(SyncError::invalid(
                            format!("{field}.openTime"),
                            format!("'{}' is not HH:MM", window.open_time),
                        ));
                    }
                    if window.close_minutes().is_none() {
                        return Err(SyncError::invalid(
                            format!("{field}.closeTime"),
                            format!("'{}' is not HH:MM", window.close_time),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}
