use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::services::schedule_utils;

pub const MIN_SHIFT_HOURS: f64 = 4.0;
pub const MAX_SHIFT_HOURS: f64 = 12.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub id: String,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub position: String,
    pub department: String,
    /// Set when the shift was created past the duration bounds on purpose.
    #[serde(default)]
    pub duration_override: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShiftCreateInput {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub position: String,
    pub department: String,
    #[serde(default)]
    pub duration_override: bool,
}

impl Shift {
    /// Build a shift, enforcing the duration bounds unless the input
    /// carries an explicit override.
    pub fn try_new(input: ShiftCreateInput) -> EngineResult<Self> {
        let hours = schedule_utils::shift_hours(input.start, input.end);
        if !input.duration_override && !(MIN_SHIFT_HOURS..=MAX_SHIFT_HOURS).contains(&hours) {
            return Err(EngineError::validation_with_details(
                "班次时长超出允许范围",
                json!({
                    "hours": hours,
                    "minHours": MIN_SHIFT_HOURS,
                    "maxHours": MAX_SHIFT_HOURS,
                }),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            date: input.date,
            start: input.start,
            end: input.end,
            position: input.position,
            department: input.department,
            duration_override: input.duration_override,
        })
    }

    pub fn hours(&self) -> f64 {
        schedule_utils::shift_hours(self.start, self.end)
    }
}
