use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::assignment::Assignment;

/// Tolerance for hour arithmetic on f64.
pub const EPSILON_HOURS: f64 = 1e-9;

/// Shift length in minutes; `end` strictly before `start` rolls over
/// midnight and gains 24 hours.
pub fn shift_minutes(start: NaiveTime, end: NaiveTime) -> i64 {
    let raw = end.signed_duration_since(start).num_minutes();
    if raw < 0 {
        raw + 24 * 60
    } else {
        raw
    }
}

pub fn shift_hours(start: NaiveTime, end: NaiveTime) -> f64 {
    shift_minutes(start, end) as f64 / 60.0
}

/// Absolute wall-clock window of a dated shift, overnight normalized.
pub fn window(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> (NaiveDateTime, NaiveDateTime) {
    let start_dt = date.and_time(start);
    let end_dt = start_dt + Duration::minutes(shift_minutes(start, end));
    (start_dt, end_dt)
}

pub fn assignment_window(assignment: &Assignment) -> (NaiveDateTime, NaiveDateTime) {
    window(assignment.date, assignment.start, assignment.end)
}

/// Strict-inequality overlap test on absolute windows: touching edges do
/// not overlap.
pub fn windows_overlap(a: (NaiveDateTime, NaiveDateTime), b: (NaiveDateTime, NaiveDateTime)) -> bool {
    a.0 < b.1 && b.0 < a.1
}

/// Overlap length in hours; 0.0 when the windows do not intersect.
pub fn overlap_hours(a: (NaiveDateTime, NaiveDateTime), b: (NaiveDateTime, NaiveDateTime)) -> f64 {
    if !windows_overlap(a, b) {
        return 0.0;
    }
    let start = a.0.max(b.0);
    let end = a.1.min(b.1);
    end.signed_duration_since(start).num_minutes() as f64 / 60.0
}

/// Gap between the end of one shift and the start of the next, in hours.
/// Negative when the windows overlap; callers clamp as needed.
pub fn rest_gap_hours(prev_end: NaiveDateTime, next_start: NaiveDateTime) -> f64 {
    next_start.signed_duration_since(prev_end).num_minutes() as f64 / 60.0
}

/// Monday 00:00 of the ISO week containing `date`.
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    let days_from_monday = date.weekday().num_days_from_monday() as i64;
    date - Duration::days(days_from_monday)
}

/// Sum of assignment durations whose *date* falls inside the ISO week
/// `[week_start, week_start + 7 days)`. Overnight shifts count toward the
/// week of their start date.
pub fn weekly_hours(assignments: &[Assignment], week_start: NaiveDate) -> f64 {
    let week_end = week_start + Duration::days(7);
    assignments
        .iter()
        .filter(|assignment| assignment.date >= week_start && assignment.date < week_end)
        .map(|assignment| shift_hours(assignment.start, assignment.end))
        .sum()
}

/// Whether `inner` sits fully inside `outer`, both taken as same-day
/// windows anchored on `date` (overnight aware on both sides).
pub fn window_contains(
    date: NaiveDate,
    outer_start: NaiveTime,
    outer_end: NaiveTime,
    inner_start: NaiveTime,
    inner_end: NaiveTime,
) -> bool {
    let outer = window(date, outer_start, outer_end);
    let inner = window(date, inner_start, inner_end);
    outer.0 <= inner.0 && inner.1 <= outer.1
}
