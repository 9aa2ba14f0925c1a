use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::shift::Shift;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AssignmentStatus {
    Proposed,
    Confirmed,
}

/// One employee bound to one shift window. The window is denormalized so
/// conflict detection never needs a shift lookup, and ad-hoc assignments
/// without a backing shift stay representable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    pub employee_id: String,
    #[serde(default)]
    pub shift_id: Option<String>,
    pub schedule_id: String,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    #[serde(default)]
    pub position: Option<String>,
    pub status: AssignmentStatus,
    #[serde(default)]
    pub overridden: bool,
    /// Monotonic version for optimistic concurrency; 0 = never committed.
    #[serde(default)]
    pub version: i64,
}

impl Assignment {
    pub fn proposed(
        employee_id: impl Into<String>,
        schedule_id: impl Into<String>,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            employee_id: employee_id.into(),
            shift_id: None,
            schedule_id: schedule_id.into(),
            date,
            start,
            end,
            position: None,
            status: AssignmentStatus::Proposed,
            overridden: false,
            version: 0,
        }
    }

    pub fn for_shift(
        employee_id: impl Into<String>,
        schedule_id: impl Into<String>,
        shift: &Shift,
    ) -> Self {
        let mut assignment = Self::proposed(
            employee_id,
            schedule_id,
            shift.date,
            shift.start,
            shift.end,
        );
        assignment.shift_id = Some(shift.id.clone());
        assignment.position = Some(shift.position.clone());
        assignment
    }
}
