// ── Schedule builder ──
//
// Pure projection from an approved event stream to per-door unlock
// windows. Deterministic: events are sorted before iteration and the
// per-door output is merged and sorted, so equal inputs always produce
// byte-identical output.

use std::collections::BTreeMap;

use chrono_tz::Tz;
use serde::Serialize;

use crate::model::{DisplayItem, Event, ItemSource};
use crate::store::mapping::Mapping;
use crate::store::overrides::{OverrideClass, Overrides};
use crate::timewin::{self, Interval};

/// The desired schedule for one cycle: display rows plus merged unlock
/// windows per door key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePlan {
    pub items: Vec<DisplayItem>,
    pub door_windows: BTreeMap<String, Vec<Interval>>,
}

impl SchedulePlan {
    /// Add one window for a door, without re-merging (call `finish`).
    pub(crate) fn push(&mut self, door_key: &str, item: DisplayItem, interval: Interval) {
        self.items.push(item);
        self.door_windows
            .entry(door_key.to_owned())
            .or_default()
            .push(interval);
    }

    /// Merge per-door windows and order items deterministically.
    pub(crate) fn finish(&mut self) {
        for windows in self.door_windows.values_mut() {
            *windows = timewin::merge_intervals(std::mem::take(windows));
        }
        self.door_windows.retain(|_, windows| !windows.is_empty());
        self.items
            .sort_by(|a, b| (a.start_at, &a.door_key, &a.event_id).cmp(&(b.start_at, &b.door_key, &b.event_id)));
    }
}

/// Project approved events into per-door unlock windows.
pub fn build(events: &[Event], mapping: &Mapping, overrides: &Overrides, tz: Tz) -> SchedulePlan {
    let mut plan = SchedulePlan::default();

    let mut events: Vec<&Event> = events.iter().collect();
    events.sort_by(|a, b| (a.start_at, &a.id, &a.room).cmp(&(b.start_at, &b.id, &b.room)));

    for event in events {
        if event.start_at >= event.end_at {
            continue;
        }
        if mapping.room_excluded(&event.room) {
            continue;
        }
        let Some(door_keys) = mapping.rooms.get(&event.room) else {
            continue; // unmapped room
        };

        for door_key in door_keys {
            if mapping.door_excluded_for_event(&event.name, door_key) {
                continue;
            }
            let Some(door) = mapping.doors.get(door_key) else {
                continue;
            };

            match overrides.find(&event.name, door_key) {
                OverrideClass::Suppress => {}
                OverrideClass::Default => {
                    let interval = Interval::new(
                        event.start_at - chrono::Duration::minutes(mapping.defaults.unlock_lead_minutes),
                        event.end_at + chrono::Duration::minutes(mapping.defaults.unlock_lag_minutes),
                    );
                    plan.push(
                        door_key,
                        display_item(event, door_key, &door.label, interval, ItemSource::Event),
                        interval,
                    );
                }
                OverrideClass::Explicit(windows) => {
                    // Clock times anchor to the event's local *start* date,
                    // even when the event itself crosses midnight.
                    let date = event.start_at.with_timezone(&tz).date_naive();
                    for window in windows {
                        let (Some(open), Some(close)) =
                            (window.open_minutes(), window.close_minutes())
                        else {
                            continue;
                        };
                        for interval in timewin::windows_for_local_date(date, &[(open, close)], tz)
                        {
                            plan.push(
                                door_key,
                                display_item(event, door_key, &door.label, interval, ItemSource::Override),
                                interval,
                            );
                        }
                    }
                }
            }
        }
    }

    plan.finish();
    plan
}

fn display_item(
    event: &Event,
    door_key: &str,
    door_label: &str,
    interval: Interval,
    source: ItemSource,
) -> DisplayItem {
    DisplayItem {
        event_id: event.id.clone(),
        name: event.name.clone(),
        room: event.room.clone(),
        door_key: door_key.to_owned(),
        door_label: door_label.to_owned(),
        start_at: interval.start,
        end_at: interval.end,
        source,
    }
}
