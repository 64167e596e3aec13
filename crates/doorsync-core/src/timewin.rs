// ── Time & window primitives ──
//
// Half-open UTC intervals, interval merging, and projection between UTC
// instants and local clock time in the display zone. Local spans use
// minute resolution; an end of 1440 means "through midnight".

use chrono::{DateTime, Datelike, LocalResult, NaiveDate, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Half-open UTC time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }
}

/// Merge overlapping and touching intervals.
///
/// Output is sorted by start and non-overlapping; empty inputs are dropped.
pub fn merge_intervals(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.retain(|iv| iv.start < iv.end);
    intervals.sort_by_key(|iv| (iv.start, iv.end));

    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for iv in intervals {
        match merged.last_mut() {
            Some(last) if iv.start <= last.end => {
                if iv.end > last.end {
                    last.end = iv.end;
                }
            }
            _ => merged.push(iv),
        }
    }
    merged
}

// ── Local spans ──────────────────────────────────────────────────────

/// One local-clock span within a single day, minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LocalSpan {
    pub start_min: u32,
    /// Exclusive end; 1440 means the span runs through midnight.
    pub end_min: u32,
}

/// Merged local spans per weekday (Monday-first indexing).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeeklyRanges {
    days: [Vec<LocalSpan>; 7],
}

impl WeeklyRanges {
    pub fn day(&self, weekday: Weekday) -> &[LocalSpan] {
        &self.days[weekday.num_days_from_monday() as usize]
    }

    fn day_mut(&mut self, weekday: Weekday) -> &mut Vec<LocalSpan> {
        &mut self.days[weekday.num_days_from_monday() as usize]
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(Vec::is_empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Weekday, &[LocalSpan])> {
        const DAYS: [Weekday; 7] = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ];
        DAYS.into_iter().map(move |wd| (wd, self.day(wd)))
    }
}

/// Project UTC intervals onto local weekdays in the display zone.
///
/// Intervals crossing local midnight are split at midnight; each segment is
/// grouped under the weekday of its local start. Spans within a weekday are
/// re-merged and sorted.
pub fn project_weekly(intervals: &[Interval], tz: Tz) -> WeeklyRanges {
    let mut weekly = WeeklyRanges::default();

    for iv in intervals {
        let end = iv.end.with_timezone(&tz);
        let mut cursor = iv.start.with_timezone(&tz);

        while cursor < end {
            let date = cursor.date_naive();
            let next_midnight = local_instant(date, MINUTES_PER_DAY, tz)
                .map(|utc| utc.with_timezone(&tz))
                .unwrap_or(end);

            let segment_end = end.min(next_midnight);
            let start_min = cursor.hour() * 60 + cursor.minute();
            let end_min = if segment_end >= next_midnight {
                MINUTES_PER_DAY
            } else {
                segment_end.hour() * 60 + segment_end.minute()
            };

            if end_min > start_min {
                weekly
                    .day_mut(cursor.weekday())
                    .push(LocalSpan { start_min, end_min });
            }

            if next_midnight <= cursor {
                break; // defensive against a zone without a representable midnight
            }
            cursor = next_midnight;
        }
    }

    for day in &mut weekly.days {
        *day = merge_spans(std::mem::take(day));
    }
    weekly
}

fn merge_spans(mut spans: Vec<LocalSpan>) -> Vec<LocalSpan> {
    spans.retain(|s| s.end_min > s.start_min);
    spans.sort();

    let mut merged: Vec<LocalSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if span.start_min <= last.end_min => {
                if span.end_min > last.end_min {
                    last.end_min = span.end_min;
                }
            }
            _ => merged.push(span),
        }
    }
    merged
}

// ── Local date + clock to UTC ────────────────────────────────────────

/// Build UTC intervals for clock ranges on one local date.
///
/// A close at or before its open rolls over to the next day. Ranges whose
/// local time cannot be resolved in the zone are skipped.
pub fn windows_for_local_date(date: NaiveDate, ranges: &[(u32, u32)], tz: Tz) -> Vec<Interval> {
    let mut windows = Vec::with_capacity(ranges.len());
    for &(open, close) in ranges {
        let close_date = if close <= open {
            match date.succ_opt() {
                Some(next) => next,
                None => continue,
            }
        } else {
            date
        };

        let (Some(start), Some(end)) =
            (local_instant(date, open, tz), local_instant(close_date, close, tz))
        else {
            continue;
        };
        if start < end {
            windows.push(Interval::new(start, end));
        }
    }
    windows
}

/// Resolve a local date + minutes-since-midnight to a UTC instant.
///
/// Ambiguous local times (DST fall-back) resolve to the earlier instant;
/// nonexistent times (spring-forward gap) shift forward one hour.
pub fn local_instant(date: NaiveDate, minutes: u32, tz: Tz) -> Option<DateTime<Utc>> {
    let (date, minutes) = if minutes >= MINUTES_PER_DAY {
        (date.succ_opt()?, minutes - MINUTES_PER_DAY)
    } else {
        (date, minutes)
    };

    let naive = date.and_hms_opt(minutes / 60, minutes % 60, 0)?;
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => tz
            .from_local_datetime(&(naive + chrono::Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc)),
    }
}

/// Parse a `HH:MM` clock string into minutes since midnight.
pub fn parse_hhmm(raw: &str) -> Option<u32> {
    let (h, m) = raw.trim().split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    (h <= 23 && m <= 59).then_some(h * 60 + m)
}

/// Format minutes since midnight as `HH:MM`.
pub fn fmt_hhmm(minutes: u32) -> String {
    format!("{:02}:{:02}", (minutes / 60).min(23), minutes % 60)
}
