use chrono::Weekday;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::employee::TimeRange;

/// Classification decided once at parse time; downstream code switches
/// exhaustively on the tag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RuleType {
    Availability,
    Preference,
    Requirement,
    Restriction,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ConstraintKind {
    /// The employee must not be scheduled inside the constrained window.
    Unavailable,
    /// Declared working window; informational for the generator.
    RequiredWindow,
    /// Soft preference for the constrained days/window.
    Preferred,
    /// Weekly hour floor.
    MinWeeklyHours,
    /// Weekly hour cap; tightens the employee-level cap when lower.
    MaxWeeklyHours,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleConstraint {
    pub kind: ConstraintKind,
    /// Empty = applies to every day of the week.
    #[serde(default)]
    pub days: Vec<Weekday>,
    #[serde(default)]
    pub time_range: Option<TimeRange>,
    #[serde(default)]
    pub max_hours: Option<f64>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Scope a rule applies to: one employee, or a whole department.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum RuleScope {
    Employee(String),
    Department(String),
}

/// Structured constraint derived from a manager's free-text statement.
/// Immutable once confirmed; edits create a new version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    pub rule_type: RuleType,
    pub constraints: Vec<RuleConstraint>,
    pub raw_text: String,
    #[serde(default)]
    pub version: i64,
}

/// Parser output before it is bound to a scope and given an identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedRule {
    pub rule_type: RuleType,
    pub constraints: Vec<RuleConstraint>,
}

impl Rule {
    pub fn from_parsed(parsed: ParsedRule, scope: RuleScope, raw_text: impl Into<String>) -> Self {
        let (employee_id, department) = match scope {
            RuleScope::Employee(id) => (Some(id), None),
            RuleScope::Department(name) => (None, Some(name)),
        };
        Self {
            id: Uuid::new_v4().to_string(),
            employee_id,
            department,
            rule_type: parsed.rule_type,
            constraints: parsed.constraints,
            raw_text: raw_text.into(),
            version: 1,
        }
    }

    pub fn scope(&self) -> RuleScope {
        match (&self.employee_id, &self.department) {
            (Some(id), _) => RuleScope::Employee(id.clone()),
            (None, Some(name)) => RuleScope::Department(name.clone()),
            (None, None) => RuleScope::Department(String::new()),
        }
    }

    /// Whether this rule binds the given employee, either directly or
    /// through their department.
    pub fn applies_to(&self, employee: &crate::models::employee::Employee) -> bool {
        match (&self.employee_id, &self.department) {
            (Some(id), _) => id == &employee.id,
            (None, Some(department)) => department == &employee.department,
            (None, None) => true,
        }
    }

    /// Lowest weekly-hour cap declared by this rule, if any.
    pub fn weekly_hour_cap(&self) -> Option<f64> {
        self.constraints
            .iter()
            .filter(|constraint| constraint.kind == ConstraintKind::MaxWeeklyHours)
            .filter_map(|constraint| constraint.max_hours)
            .fold(None, |lowest: Option<f64>, hours| match lowest {
                Some(current) if current <= hours => Some(current),
                _ => Some(hours),
            })
    }
}
