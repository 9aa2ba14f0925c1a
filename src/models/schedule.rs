use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ScheduleStatus {
    Draft,
    Published,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: String,
    pub name: String,
    pub department: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ScheduleStatus,
    #[serde(default)]
    pub assignment_ids: Vec<String>,
}

impl Schedule {
    /// Draft and published schedules both participate in cross-schedule
    /// overlap checks.
    pub fn is_active(&self) -> bool {
        matches!(self.status, ScheduleStatus::Draft | ScheduleStatus::Published)
    }
}
