// ── Room→door mapping store ──
//
// The central operator-facing config: which rooms open which door groups,
// the default lead/lag around events, and the exclusion rules. Door entry
// order in the JSON object is the canonical display order, so `doors`
// deserializes through an order-preserving visitor rather than a HashMap.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SyncError;

/// One door group: a stable slug, a display label, and the controller door
/// ids its policy unlocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Door {
    pub key: String,
    pub label: String,
    pub unifi_door_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DoorSpec {
    #[serde(default)]
    label: String,
    #[serde(default)]
    unifi_door_ids: Vec<String>,
}

/// Door table preserving JSON insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Doors(Vec<Door>);

impl Doors {
    pub fn get(&self, key: &str) -> Option<&Door> {
        self.0.iter().find(|d| d.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Door> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for Doors {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DoorsVisitor;

        impl<'de> Visitor<'de> for DoorsVisitor {
            type Value = Doors;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of door key to door definition")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Doors, A::Error> {
                let mut doors: Vec<Door> = Vec::new();
                while let Some((key, spec)) = map.next_entry::<String, DoorSpec>()? {
                    if doors.iter().any(|d| d.key == key) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate door key '{key}'"
                        )));
                    }
                    let label = if spec.label.is_empty() {
                        key.clone()
                    } else {
                        spec.label
                    };
                    doors.push(Door {
                        key,
                        label,
                        unifi_door_ids: spec.unifi_door_ids,
                    });
                }
                Ok(Doors(doors))
            }
        }

        deserializer.deserialize_map(DoorsVisitor)
    }
}

impl Serialize for Doors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for door in &self.0 {
            map.serialize_entry(
                &door.key,
                &DoorSpec {
                    label: door.label.clone(),
                    unifi_door_ids: door.unifi_door_ids.clone(),
                },
            )?;
        }
        map.end()
    }
}

/// Default unlock padding around an event, in minutes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UnlockDefaults {
    pub unlock_lead_minutes: i64,
    pub unlock_lag_minutes: i64,
}

impl Default for UnlockDefaults {
    fn default() -> Self {
        Self {
            unlock_lead_minutes: 15,
            unlock_lag_minutes: 15,
        }
    }
}

/// One event-name exclusion rule: events whose name contains the substring
/// (case-insensitive) never open the listed doors.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NameExclusion {
    pub event_name_contains: String,
    #[serde(default)]
    pub door_keys: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MappingRules {
    #[serde(default)]
    pub exclude_door_keys_by_event_name: Vec<NameExclusion>,
    #[serde(default)]
    pub exclude_events_by_room_contains: Vec<String>,
}

/// Validated room→door mapping snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Mapping {
    #[serde(default)]
    pub doors: Doors,
    #[serde(default)]
    pub rooms: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub defaults: UnlockDefaults,
    #[serde(default)]
    pub rules: MappingRules,
}

impl Mapping {
    /// Structural validation beyond what serde enforces.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.defaults.unlock_lead_minutes <= 0 {
            return Err(SyncError::invalid(
                "defaults.unlockLeadMinutes",
                "must be a positive number of minutes",
            ));
        }
        if self.defaults.unlock_lag_minutes <= 0 {
            return Err(SyncError::invalid(
                "defaults.unlockLagMinutes",
                "must be a positive number of minutes",
            ));
        }

        for (room, keys) in &self.rooms {
            for key in keys {
                if !self.doors.contains(key) {
                    return Err(SyncError::invalid(
                        format!("rooms.{room}"),
                        format!("references unknown door key '{key}'"),
                    ));
                }
            }
        }

        for (idx, rule) in self.rules.exclude_door_keys_by_event_name.iter().enumerate() {
            for key in &rule.door_keys {
                if !self.doors.contains(key) {
                    return Err(SyncError::invalid(
                        format!("rules.excludeDoorKeysByEventName[{idx}]"),
                        format!("references unknown door key '{key}'"),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Is this door excluded for an event with this name?
    pub fn door_excluded_for_event(&self, event_name: &str, door_key: &str) -> bool {
        let name = event_name.trim().to_lowercase();
        if name.is_empty() {
            return false;
        }
        self.rules
            .exclude_door_keys_by_event_name
            .iter()
            .filter(|rule| {
                let needle = rule.event_name_contains.trim().to_lowercase();
                !needle.is_empty() && name.contains(&needle)
            })
            .any(|rule| rule.door_keys.iter().any(|k| k == door_key))
    }

    /// Is an event in this room excluded entirely?
    pub fn room_excluded(&self, room: &str) -> bool {
        let room = room.to_lowercase();
        self.rules
            .exclude_events_by_room_contains
            .iter()
            .map(|needle| needle.trim().to_lowercase())
            .any(|needle| !needle.is_empty() && room.contains(&needle))
    }
}

/// Load and validate the mapping file. Unlike the sync-owned state blobs,
/// an unreadable or invalid mapping is an error the caller must handle
/// (the orchestrator falls back to its last good snapshot).
pub fn load(path: &Path) -> Result<Mapping, SyncError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| SyncError::invalid("mapping", format!("cannot read {}: {e}", path.display())))?;
    let mapping: Mapping = serde_json::from_str(&raw)
        .map_err(|e| SyncError::invalid("mapping", format!("malformed JSON: {e}")))?;
    mapping.validate()?;
    Ok(mapping)
}
