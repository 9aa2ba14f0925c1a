use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::models::employee::TimeRange;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ConflictType {
    DoubleBooking,
    Overlap,
    DurationBounds,
    InsufficientRest,
    MaxHoursExceeded,
    AvailabilityViolation,
    CrossScheduleOverlap,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum ConflictSeverity {
    Warning,
    Error,
    Critical,
}

/// Structured numeric facts behind a conflict; only the fields relevant to
/// the conflict type are populated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConflictDetails {
    #[serde(default)]
    pub overlap_hours: Option<f64>,
    #[serde(default)]
    pub shift_hours: Option<f64>,
    #[serde(default)]
    pub required_rest: Option<f64>,
    #[serde(default)]
    pub actual_rest: Option<f64>,
    #[serde(default)]
    pub total_weekly_hours: Option<f64>,
    #[serde(default)]
    pub max_weekly_hours: Option<f64>,
    #[serde(default)]
    pub other_schedule_id: Option<String>,
    #[serde(default)]
    pub other_schedule_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SuggestionKind {
    ReassignEmployee,
    SplitShift,
    ShiftStart,
    ReduceHours,
}

/// A ranked, non-mutating resolution proposal. Callers apply it as a new
/// candidate assignment and re-run detection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: String,
    pub kind: SuggestionKind,
    pub rank: usize,
    pub message: String,
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub segments: Vec<TimeRange>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub start: Option<NaiveTime>,
    #[serde(default)]
    pub end: Option<NaiveTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub conflict_type: ConflictType,
    pub severity: ConflictSeverity,
    pub overridable: bool,
    #[serde(default)]
    pub involved_assignments: Vec<String>,
    #[serde(default)]
    pub details: ConflictDetails,
    pub message: String,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

impl Conflict {
    /// Non-overridable conflicts always block commit regardless of severity.
    pub fn blocks_commit(&self) -> bool {
        !self.overridable
    }
}
