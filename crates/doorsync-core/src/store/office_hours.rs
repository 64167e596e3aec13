// ── Office-hours store ──
//
// A static recurring weekly unlock schedule, independent of calendar
// events. Ranges are free-text per weekday ("8:00-12:00, 13:00-17:00");
// invalid tokens are dropped rather than failing the whole day.

use chrono::{DateTime, Datelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::timewin::{self, Interval};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayConfig {
    #[serde(default)]
    pub ranges: String,
    #[serde(default)]
    pub doors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekConfig {
    #[serde(default)]
    pub monday: DayConfig,
    #[serde(default)]
    pub tuesday: DayConfig,
    #[serde(default)]
    pub wednesday: DayConfig,
    #[serde(default)]
    pub thursday: DayConfig,
    #[serde(default)]
    pub friday: DayConfig,
    #[serde(default)]
    pub saturday: DayConfig,
    #[serde(default)]
    pub sunday: DayConfig,
}

impl WeekConfig {
    pub fn day(&self, weekday: Weekday) -> &DayConfig {
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
}

/// Operator-facing office-hours config. Disabled emits nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficeHours {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub schedule: WeekConfig,
}

/// Parse a comma- or semicolon-separated list of `HH[:MM]-HH[:MM]` tokens
/// into minute pairs. En-dash separators are accepted. Invalid tokens are
/// silently skipped.
pub fn parse_ranges(text: &str) -> Vec<(u32, u32)> {
    text.split([',', ';'])
        .filter_map(parse_range_token)
        .collect()
}

fn parse_range_token(token: &str) -> Option<(u32, u32)> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    let (start, end) = token.split_once(['-', '\u{2013}'])?;
    Some((parse_clock(start)?, parse_clock(end)?))
}

/// `HH` or `HH:MM`, whole hours allowed.
fn parse_clock(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    let (h, m) = match raw.split_once(':') {
        Some((h, m)) => (h, m.parse::<u32>().ok()?),
        None => (raw, 0),
    };
    let h: u32 = h.parse().ok()?;
    (h <= 23 && m <= 59).then_some(h * 60 + m)
}

/// Expand office hours into concrete dated door windows for every local
/// date in `[from, to]`.
pub fn expand(
    config: &OfficeHours,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    tz: Tz,
) -> Vec<(String, Interval)> {
    if !config.enabled {
        return Vec::new();
    }

    let mut windows = Vec::new();
    let mut date = from.with_timezone(&tz).date_naive();
    let end_date = to.with_timezone(&tz).date_naive();

    while date <= end_date {
        let day = config.schedule.day(date.weekday());
        let ranges = parse_ranges(&day.ranges);

        if !ranges.is_empty() && !day.doors.is_empty() {
            for interval in timewin::windows_for_local_date(date, &ranges, tz) {
                for door_key in &day.doors {
                    let key = door_key.trim();
                    if !key.is_empty() {
                        windows.push((key.to_owned(), interval));
                    }
                }
            }
        }

        let Some(next) = date.succ_opt() else { break };
        date = next;
    }

    windows
}
