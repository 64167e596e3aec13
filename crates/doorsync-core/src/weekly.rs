// ── Weekly projection ──
//
// Collapses dated per-door windows onto the controller's weekly shape
// (HH:MM:SS ranges per weekday in the display zone) and folds the
// office-hours windows into a built plan.

use chrono::{DateTime, Utc, Weekday};
use chrono_tz::Tz;
use doorsync_api::access::{TimeRange, WeekSchedule};

use crate::builder::SchedulePlan;
use crate::model::{DisplayItem, ItemSource};
use crate::store::mapping::Mapping;
use crate::store::office_hours::{self, OfficeHours};
use crate::timewin::{self, Interval, LocalSpan, MINUTES_PER_DAY};

/// Synthetic event id carried by office-hours display items.
pub const OFFICE_HOURS_ID: &str = "office-hours";

/// Project a door's merged windows onto the controller's weekly shape.
pub fn week_schedule(windows: &[Interval], tz: Tz) -> WeekSchedule {
    let weekly = timewin::project_weekly(windows, tz);

    let mut schedule = WeekSchedule::default();
    for (weekday, spans) in weekly.iter() {
        let day = match weekday {
            Weekday::Sun => &mut schedule.sunday,
            Weekday::Mon => &mut schedule.monday,
            Weekday::Tue => &mut schedule.tuesday,
            Weekday::Wed => &mut schedule.wednesday,
            Weekday::Thu => &mut schedule.thursday,
            Weekday::Fri => &mut schedule.friday,
            Weekday::Sat => &mut schedule.saturday,
        };
        *day = spans.iter().map(time_range).collect();
    }
    schedule
}

fn time_range(span: &LocalSpan) -> TimeRange {
    TimeRange {
        start_time: fmt_hhmmss(span.start_min),
        end_time: fmt_hhmmss(span.end_min),
    }
}

/// `HH:MM:SS` for the controller; a span running through midnight caps at
/// the controller's last representable second.
fn fmt_hhmmss(minutes: u32) -> String {
    if minutes >= MINUTES_PER_DAY {
        "23:59:59".to_owned()
    } else {
        format!("{:02}:{:02}:00", minutes / 60, minutes % 60)
    }
}

/// Fold office-hours windows into a built plan and re-merge per door.
///
/// Doors named by the office-hours config but absent from the mapping are
/// skipped.
pub fn merge_office_hours(
    plan: &mut SchedulePlan,
    office: &OfficeHours,
    mapping: &Mapping,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    tz: Tz,
) {
    let windows = office_hours::expand(office, from, to, tz);
    if windows.is_empty() {
        return;
    }

    for (door_key, interval) in windows {
        let Some(door) = mapping.doors.get(&door_key) else {
            continue;
        };
        plan.push(
            &door_key,
            DisplayItem {
                event_id: OFFICE_HOURS_ID.to_owned(),
                name: "Office Hours".to_owned(),
                room: String::new(),
                door_key: door_key.clone(),
                door_label: door.label.clone(),
                start_at: interval.start,
                end_at: interval.end,
                source: ItemSource::OfficeHours,
            },
            interval,
        );
    }

    plan.finish();
}
