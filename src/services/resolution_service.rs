use std::cmp::Ordering;

use chrono::{Datelike, Duration, NaiveDateTime};
use uuid::Uuid;

use crate::models::assignment::Assignment;
use crate::models::conflict::{Conflict, ConflictType, Suggestion, SuggestionKind};
use crate::models::employee::{Employee, TimeRange};
use crate::models::rule::Rule;
use crate::models::schedule::Schedule;
use crate::models::shift::{MAX_SHIFT_HOURS, MIN_SHIFT_HOURS};
use crate::services::conflict_detector::{self, DetectionContext};
use crate::services::schedule_utils::{self, EPSILON_HOURS};

/// Snapshot the suggester ranks alternatives against: the whole employee
/// pool and everyone's existing assignments.
#[derive(Debug, Clone, Copy)]
pub struct SuggestionContext<'a> {
    pub employees: &'a [Employee],
    pub rules: &'a [Rule],
    pub assignments: &'a [Assignment],
    pub schedules: &'a [Schedule],
}

/// Rank resolutions for a conflict, best first. Side-effect free: callers
/// apply a suggestion as a new candidate assignment and re-run detection.
pub fn suggest(
    conflict: &Conflict,
    candidate: &Assignment,
    ctx: &SuggestionContext<'_>,
) -> Vec<Suggestion> {
    let mut suggestions = match conflict.conflict_type {
        ConflictType::DoubleBooking | ConflictType::Overlap | ConflictType::CrossScheduleOverlap => {
            alternative_employees(candidate, ctx)
        }
        ConflictType::DurationBounds => split_suggestion(candidate).into_iter().collect(),
        ConflictType::InsufficientRest => rest_suggestion_for(candidate, ctx).into_iter().collect(),
        ConflictType::MaxHoursExceeded => {
            let mut ranked = alternative_employees(candidate, ctx);
            if let Some(reduced) = reduced_hours_suggestion(candidate, ctx) {
                ranked.push(reduced);
            }
            ranked
        }
        ConflictType::AvailabilityViolation => alternative_employees(candidate, ctx),
    };

    for (index, suggestion) in suggestions.iter_mut().enumerate() {
        suggestion.rank = index + 1;
    }
    suggestions
}

/// Employees who could take the slot instead, ranked by ascending weekly
/// hours, then preference match, then id for determinism.
pub fn alternative_employees(
    candidate: &Assignment,
    ctx: &SuggestionContext<'_>,
) -> Vec<Suggestion> {
    let department = ctx
        .employees
        .iter()
        .find(|employee| employee.id == candidate.employee_id)
        .map(|employee| employee.department.clone());

    let week_start = schedule_utils::week_start_of(candidate.date);
    let weekday = candidate.date.weekday();
    let position = candidate.position.as_deref().unwrap_or("");

    let mut ranked: Vec<(f64, bool, &Employee)> = Vec::new();
    for employee in ctx.employees {
        if employee.id == candidate.employee_id {
            continue;
        }
        if let Some(department) = &department {
            if &employee.department != department {
                continue;
            }
        }

        let existing: Vec<Assignment> = ctx
            .assignments
            .iter()
            .filter(|assignment| assignment.employee_id == employee.id)
            .cloned()
            .collect();

        let mut trial = candidate.clone();
        trial.id = Uuid::new_v4().to_string();
        trial.employee_id = employee.id.clone();

        let detection = DetectionContext {
            employee,
            rules: ctx.rules,
            existing: &existing,
            schedules: ctx.schedules,
            shift: None,
        };
        let conflicts = conflict_detector::detect(&trial, &detection);
        if conflict_detector::has_blocking(&conflicts) {
            continue;
        }
        if conflicts
            .iter()
            .any(|c| c.conflict_type == ConflictType::AvailabilityViolation)
        {
            continue;
        }

        let hours = schedule_utils::weekly_hours(&existing, week_start);
        let preferred = employee.prefers(position, weekday);
        ranked.push((hours, preferred, employee));
    }

    ranked.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.1.cmp(&a.1))
            .then_with(|| a.2.id.cmp(&b.2.id))
    });

    ranked
        .into_iter()
        .map(|(hours, _, employee)| Suggestion {
            id: Uuid::new_v4().to_string(),
            kind: SuggestionKind::ReassignEmployee,
            rank: 0,
            message: format!(
                "改派给员工 {} (本周已排 {:.1} 小时)",
                employee.name, hours
            ),
            employee_id: Some(employee.id.clone()),
            segments: Vec::new(),
            date: Some(candidate.date),
            start: Some(candidate.start),
            end: Some(candidate.end),
        })
        .collect()
}

/// Exact contiguous split of an over-long window into near-equal segments
/// of at most `MAX_SHIFT_HOURS` each.
pub fn split_suggestion(candidate: &Assignment) -> Option<Suggestion> {
    let total_minutes = schedule_utils::shift_minutes(candidate.start, candidate.end);
    let total_hours = total_minutes as f64 / 60.0;
    if total_hours <= MAX_SHIFT_HOURS + EPSILON_HOURS {
        return None;
    }

    let parts = (total_hours / MAX_SHIFT_HOURS).ceil() as i64;
    let base = total_minutes / parts;
    let remainder = total_minutes % parts;

    let mut segments = Vec::with_capacity(parts as usize);
    let (window_start, _) = schedule_utils::assignment_window(candidate);
    let mut cursor = window_start;
    for part in 0..parts {
        let length = if part < remainder { base + 1 } else { base };
        let next = cursor + Duration::minutes(length);
        segments.push(TimeRange::new(cursor.time(), next.time()));
        cursor = next;
    }

    Some(Suggestion {
        id: Uuid::new_v4().to_string(),
        kind: SuggestionKind::SplitShift,
        rank: 0,
        message: format!("拆分为 {} 段连续班次, 覆盖原时间窗口", parts),
        employee_id: Some(candidate.employee_id.clone()),
        segments,
        date: Some(candidate.date),
        start: None,
        end: None,
    })
}

/// Earliest start at or after `prev_end + min_rest` that preserves the
/// original shift length.
pub fn rest_suggestion(
    prev_end: NaiveDateTime,
    duration_minutes: i64,
    min_rest_hours: f64,
) -> Suggestion {
    let rest_minutes = (min_rest_hours * 60.0).ceil() as i64;
    let start = prev_end + Duration::minutes(rest_minutes);
    let end = start + Duration::minutes(duration_minutes);

    Suggestion {
        id: Uuid::new_v4().to_string(),
        kind: SuggestionKind::ShiftStart,
        rank: 0,
        message: format!("将开始时间推迟到 {} 以满足休息要求", start.format("%Y-%m-%d %H:%M")),
        employee_id: None,
        segments: Vec::new(),
        date: Some(start.date()),
        start: Some(start.time()),
        end: Some(end.time()),
    }
}

fn rest_suggestion_for(candidate: &Assignment, ctx: &SuggestionContext<'_>) -> Option<Suggestion> {
    let employee = ctx
        .employees
        .iter()
        .find(|employee| employee.id == candidate.employee_id)?;
    let candidate_window = schedule_utils::assignment_window(candidate);

    let prev_end = ctx
        .assignments
        .iter()
        .filter(|assignment| {
            assignment.employee_id == candidate.employee_id && assignment.id != candidate.id
        })
        .map(schedule_utils::assignment_window)
        .filter(|window| window.1 <= candidate_window.0)
        .map(|window| window.1)
        .max()?;

    let duration_minutes = schedule_utils::shift_minutes(candidate.start, candidate.end);
    Some(rest_suggestion(
        prev_end,
        duration_minutes,
        employee.min_rest_hours,
    ))
}

/// A shorter variant of the candidate that fits inside the remaining
/// weekly headroom, when that headroom still makes a valid shift.
fn reduced_hours_suggestion(
    candidate: &Assignment,
    ctx: &SuggestionContext<'_>,
) -> Option<Suggestion> {
    let employee = ctx
        .employees
        .iter()
        .find(|employee| employee.id == candidate.employee_id)?;

    let existing: Vec<Assignment> = ctx
        .assignments
        .iter()
        .filter(|assignment| {
            assignment.employee_id == employee.id && assignment.id != candidate.id
        })
        .cloned()
        .collect();

    let week_start = schedule_utils::week_start_of(candidate.date);
    let cap = conflict_detector::effective_weekly_cap(employee, ctx.rules);
    let headroom = cap - schedule_utils::weekly_hours(&existing, week_start);
    if headroom < MIN_SHIFT_HOURS - EPSILON_HOURS {
        return None;
    }

    let shortened_minutes = (headroom * 60.0).floor() as i64;
    let current_minutes = schedule_utils::shift_minutes(candidate.start, candidate.end);
    if shortened_minutes >= current_minutes {
        return None;
    }

    let (window_start, _) = schedule_utils::assignment_window(candidate);
    let end = window_start + Duration::minutes(shortened_minutes);

    Some(Suggestion {
        id: Uuid::new_v4().to_string(),
        kind: SuggestionKind::ReduceHours,
        rank: 0,
        message: format!(
            "缩短班次到 {:.1} 小时以保持在每周上限内",
            shortened_minutes as f64 / 60.0
        ),
        employee_id: Some(employee.id.clone()),
        segments: Vec::new(),
        date: Some(candidate.date),
        start: Some(candidate.start),
        end: Some(end.time()),
    })
}
