// Wire types for the UniFi Access developer API.

use serde::{Deserialize, Serialize};

/// One `HH:MM:SS` open range inside a weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_time: String,
    pub end_time: String,
}

/// Weekly unlock schedule as the controller stores it: one list of
/// `HH:MM:SS` ranges per weekday, in the display zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekSchedule {
    #[serde(default)]
    pub sunday: Vec<TimeRange>,
    #[serde(default)]
    pub monday: Vec<TimeRange>,
    #[serde(default)]
    pub tuesday: Vec<TimeRange>,
    #[serde(default)]
    pub wednesday: Vec<TimeRange>,
    #[serde(default)]
    pub thursday: Vec<TimeRange>,
    #[serde(default)]
    pub friday: Vec<TimeRange>,
    #[serde(default)]
    pub saturday: Vec<TimeRange>,
}

impl WeekSchedule {
    /// Days in controller order (Sunday first).
    pub fn days(&self) -> [&Vec<TimeRange>; 7] {
        [
            &self.sunday,
            &self.monday,
            &self.tuesday,
            &self.wednesday,
            &self.thursday,
            &self.friday,
            &self.saturday,
        ]
    }

    /// Order-insensitive representation for set-equality comparison.
    ///
    /// Two schedules are the same when every weekday holds the same set of
    /// ranges, regardless of the order the controller returns them in.
    pub fn normalized(&self) -> [Vec<(String, String)>; 7] {
        self.days().map(|ranges| {
            let mut day: Vec<(String, String)> = ranges
                .iter()
                .map(|r| (r.start_time.clone(), r.end_time.clone()))
                .collect();
            day.sort();
            day
        })
    }
}

/// Row from the schedule list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub holiday_group_id: Option<String>,
}

/// Full schedule object from the detail endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleDetail {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub weekly: WeekSchedule,
    #[serde(default)]
    pub holiday_group_id: Option<String>,
    #[serde(default)]
    pub holiday_schedule: serde_json::Value,
}

/// Replacement payload for a schedule update.
///
/// The write side calls the weekly field `week_schedule`; reads return it
/// as `weekly`.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleUpdate {
    pub name: String,
    pub week_schedule: WeekSchedule,
    pub holiday_group_id: String,
    pub holiday_schedule: serde_json::Value,
}

/// A door (or other resource) referenced by an access policy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyResource {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
}

impl PolicyResource {
    pub fn door(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_type: "door".to_owned(),
        }
    }
}

/// An access policy binding a schedule to a set of resources.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessPolicy {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub schedule_id: String,
    #[serde(default)]
    pub resources: Vec<PolicyResource>,
}

/// Create payload. The write side calls the resource list `resource`;
/// reads return it as `resources`.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyCreate {
    pub name: String,
    pub resource: Vec<PolicyResource>,
    pub schedule_id: String,
}

// ── Response envelope ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}
