use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_HOURS_PER_WEEK: f64 = 40.0;
pub const DEFAULT_MIN_REST_HOURS: f64 = 11.0;

/// A wall-clock window within a single day. `end` at or before `start`
/// means the window rolls over midnight into the next day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }
}

/// Declared availability for one weekday. An employee with no entry for a
/// weekday counts as available the whole day; rules must opt them out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DayAvailability {
    pub day: Weekday,
    pub available: bool,
    #[serde(default)]
    pub windows: Vec<TimeRange>,
}

/// Soft preference used for suggestion ranking and generator tie-breaks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ShiftPreference {
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub days: Vec<Weekday>,
    #[serde(default)]
    pub time_range: Option<TimeRange>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub department: String,
    #[serde(default = "default_max_hours")]
    pub max_hours_per_week: f64,
    #[serde(default = "default_min_rest")]
    pub min_rest_hours: f64,
    #[serde(default)]
    pub availability: Vec<DayAvailability>,
    #[serde(default)]
    pub preferences: Vec<ShiftPreference>,
}

fn default_max_hours() -> f64 {
    DEFAULT_MAX_HOURS_PER_WEEK
}

fn default_min_rest() -> f64 {
    DEFAULT_MIN_REST_HOURS
}

impl Employee {
    pub fn new(id: impl Into<String>, name: impl Into<String>, department: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            department: department.into(),
            max_hours_per_week: DEFAULT_MAX_HOURS_PER_WEEK,
            min_rest_hours: DEFAULT_MIN_REST_HOURS,
            availability: Vec::new(),
            preferences: Vec::new(),
        }
    }

    pub fn availability_for(&self, day: Weekday) -> Option<&DayAvailability> {
        self.availability.iter().find(|entry| entry.day == day)
    }

    /// Whether any soft preference matches the given position and weekday.
    pub fn prefers(&self, position: &str, day: Weekday) -> bool {
        self.preferences.iter().any(|preference| {
            let position_match = preference
                .position
                .as_deref()
                .map(|preferred| preferred.eq_ignore_ascii_case(position))
                .unwrap_or(false);
            let day_match = preference.days.contains(&day);
            position_match || day_match
        })
    }
}
