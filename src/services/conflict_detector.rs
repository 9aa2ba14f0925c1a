use chrono::Datelike;
use tracing::debug;

use crate::models::assignment::Assignment;
use crate::models::conflict::{
    Conflict, ConflictDetails, ConflictSeverity, ConflictType,
};
use crate::models::employee::Employee;
use crate::models::rule::{ConstraintKind, Rule};
use crate::models::schedule::Schedule;
use crate::models::shift::{Shift, MAX_SHIFT_HOURS, MIN_SHIFT_HOURS};
use crate::services::resolution_service;
use crate::services::schedule_utils::{self, EPSILON_HOURS};

/// Read-only snapshot a single detection run works against. `existing`
/// carries the employee's assignments across all active schedules.
#[derive(Debug, Clone, Copy)]
pub struct DetectionContext<'a> {
    pub employee: &'a Employee,
    pub rules: &'a [Rule],
    pub existing: &'a [Assignment],
    pub schedules: &'a [Schedule],
    pub shift: Option<&'a Shift>,
}

/// Evaluate a candidate assignment against the hard invariants and the
/// employee's declared rules. Deterministic and side-effect free: the same
/// inputs always yield the same ordered conflict list.
pub fn detect(candidate: &Assignment, ctx: &DetectionContext<'_>) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    let candidate_window = schedule_utils::assignment_window(candidate);

    let mut same_employee: Vec<&Assignment> = ctx
        .existing
        .iter()
        .filter(|existing| {
            existing.employee_id == candidate.employee_id && existing.id != candidate.id
        })
        .collect();
    same_employee.sort_by(|a, b| a.id.cmp(&b.id));

    let same_schedule: Vec<&Assignment> = same_employee
        .iter()
        .copied()
        .filter(|existing| existing.schedule_id == candidate.schedule_id)
        .collect();

    // 1. Exact duplicates inside the candidate's schedule.
    let mut duplicate_ids: Vec<String> = Vec::new();
    for existing in &same_schedule {
        if existing.date == candidate.date
            && existing.start == candidate.start
            && existing.end == candidate.end
        {
            duplicate_ids.push(existing.id.clone());
            conflicts.push(Conflict {
                conflict_type: ConflictType::DoubleBooking,
                severity: ConflictSeverity::Critical,
                overridable: false,
                involved_assignments: vec![candidate.id.clone(), existing.id.clone()],
                details: ConflictDetails::default(),
                message: format!(
                    "员工 {} 在 {} 已有完全相同的班次",
                    ctx.employee.name, candidate.date
                ),
                suggestions: Vec::new(),
            });
        }
    }

    // 2. Partial overlap inside the candidate's schedule.
    for existing in &same_schedule {
        if duplicate_ids.iter().any(|id| id == &existing.id) {
            continue;
        }
        let existing_window = schedule_utils::assignment_window(existing);
        if schedule_utils::windows_overlap(candidate_window, existing_window) {
            let overlap = schedule_utils::overlap_hours(candidate_window, existing_window);
            conflicts.push(Conflict {
                conflict_type: ConflictType::Overlap,
                severity: ConflictSeverity::Critical,
                overridable: false,
                involved_assignments: vec![candidate.id.clone(), existing.id.clone()],
                details: ConflictDetails {
                    overlap_hours: Some(overlap),
                    ..ConflictDetails::default()
                },
                message: format!("与现有班次重叠 {:.1} 小时", overlap),
                suggestions: Vec::new(),
            });
        }
    }

    // 3. Duration bounds, unless the backing shift carries an override.
    let duration_overridden = ctx.shift.map(|shift| shift.duration_override).unwrap_or(false);
    let hours = schedule_utils::shift_hours(candidate.start, candidate.end);
    if !duration_overridden
        && (hours < MIN_SHIFT_HOURS - EPSILON_HOURS || hours > MAX_SHIFT_HOURS + EPSILON_HOURS)
    {
        let suggestions = if hours > MAX_SHIFT_HOURS {
            resolution_service::split_suggestion(candidate)
                .into_iter()
                .collect()
        } else {
            Vec::new()
        };
        conflicts.push(Conflict {
            conflict_type: ConflictType::DurationBounds,
            severity: ConflictSeverity::Error,
            overridable: false,
            involved_assignments: vec![candidate.id.clone()],
            details: ConflictDetails {
                shift_hours: Some(hours),
                ..ConflictDetails::default()
            },
            message: format!(
                "班次时长 {:.1} 小时超出允许范围 [{:.0}, {:.0}] 小时",
                hours, MIN_SHIFT_HOURS, MAX_SHIFT_HOURS
            ),
            suggestions,
        });
    }

    // 4. Rest gap to the nearest non-overlapping neighbor on each side.
    // Overlapping pairs are owned by checks 1/2/7 and never re-reported
    // here.
    let required_rest = ctx.employee.min_rest_hours;
    let mut nearest_prev: Option<&Assignment> = None;
    let mut nearest_next: Option<&Assignment> = None;
    for &existing in &same_employee {
        let existing_window = schedule_utils::assignment_window(existing);
        if schedule_utils::windows_overlap(candidate_window, existing_window) {
            continue;
        }
        if existing_window.1 <= candidate_window.0 {
            let replace = match nearest_prev {
                Some(current) => {
                    schedule_utils::assignment_window(current).1 < existing_window.1
                }
                None => true,
            };
            if replace {
                nearest_prev = Some(existing);
            }
        } else if existing_window.0 >= candidate_window.1 {
            let replace = match nearest_next {
                Some(current) => {
                    schedule_utils::assignment_window(current).0 > existing_window.0
                }
                None => true,
            };
            if replace {
                nearest_next = Some(existing);
            }
        }
    }

    if let Some(prev) = nearest_prev {
        let prev_end = schedule_utils::assignment_window(prev).1;
        let gap = schedule_utils::rest_gap_hours(prev_end, candidate_window.0);
        if gap < required_rest - EPSILON_HOURS {
            let duration_minutes = schedule_utils::shift_minutes(candidate.start, candidate.end);
            let suggestion =
                resolution_service::rest_suggestion(prev_end, duration_minutes, required_rest);
            conflicts.push(Conflict {
                conflict_type: ConflictType::InsufficientRest,
                severity: ConflictSeverity::Warning,
                overridable: true,
                involved_assignments: vec![candidate.id.clone(), prev.id.clone()],
                details: ConflictDetails {
                    actual_rest: Some(gap.max(0.0)),
                    required_rest: Some(required_rest),
                    ..ConflictDetails::default()
                },
                message: format!(
                    "休息时间不足: 距上一班次仅 {:.1} 小时, 需要 {:.1} 小时",
                    gap.max(0.0),
                    required_rest
                ),
                suggestions: vec![suggestion],
            });
        }
    }

    if let Some(next) = nearest_next {
        let next_start = schedule_utils::assignment_window(next).0;
        let gap = schedule_utils::rest_gap_hours(candidate_window.1, next_start);
        if gap < required_rest - EPSILON_HOURS {
            conflicts.push(Conflict {
                conflict_type: ConflictType::InsufficientRest,
                severity: ConflictSeverity::Warning,
                overridable: true,
                involved_assignments: vec![candidate.id.clone(), next.id.clone()],
                details: ConflictDetails {
                    actual_rest: Some(gap.max(0.0)),
                    required_rest: Some(required_rest),
                    ..ConflictDetails::default()
                },
                message: format!(
                    "休息时间不足: 距下一班次仅 {:.1} 小时, 需要 {:.1} 小时",
                    gap.max(0.0),
                    required_rest
                ),
                suggestions: Vec::new(),
            });
        }
    }

    // 5. Weekly hour cap. Hard-cap policy: any excess over the effective
    // cap is critical and never overridable.
    let week_start = schedule_utils::week_start_of(candidate.date);
    let mut week_assignments: Vec<Assignment> =
        same_employee.iter().map(|a| (*a).clone()).collect();
    week_assignments.push(candidate.clone());
    let total_weekly = schedule_utils::weekly_hours(&week_assignments, week_start);
    let cap = effective_weekly_cap(ctx.employee, ctx.rules);
    if total_weekly > cap + EPSILON_HOURS {
        conflicts.push(Conflict {
            conflict_type: ConflictType::MaxHoursExceeded,
            severity: ConflictSeverity::Critical,
            overridable: false,
            involved_assignments: vec![candidate.id.clone()],
            details: ConflictDetails {
                total_weekly_hours: Some(total_weekly),
                max_weekly_hours: Some(cap),
                ..ConflictDetails::default()
            },
            message: format!(
                "本周总工时 {:.1} 小时超过上限 {:.1} 小时",
                total_weekly, cap
            ),
            suggestions: Vec::new(),
        });
    }

    // 6. Declared availability: the employee's availability map first,
    // then unavailable-kind rule constraints.
    let weekday = candidate.date.weekday();
    if let Some(day) = ctx.employee.availability_for(weekday) {
        let violated = if !day.available {
            true
        } else if day.windows.is_empty() {
            false
        } else {
            !day.windows.iter().any(|window| {
                schedule_utils::window_contains(
                    candidate.date,
                    window.start,
                    window.end,
                    candidate.start,
                    candidate.end,
                )
            })
        };
        if violated {
            conflicts.push(Conflict {
                conflict_type: ConflictType::AvailabilityViolation,
                severity: ConflictSeverity::Warning,
                overridable: true,
                involved_assignments: vec![candidate.id.clone()],
                details: ConflictDetails::default(),
                message: format!("员工 {} 在 {:?} 不在可用时段内", ctx.employee.name, weekday),
                suggestions: Vec::new(),
            });
        }
    }

    for rule in ctx.rules.iter().filter(|rule| rule.applies_to(ctx.employee)) {
        for constraint in &rule.constraints {
            if constraint.kind != ConstraintKind::Unavailable {
                continue;
            }
            if !constraint.days.is_empty() && !constraint.days.contains(&weekday) {
                continue;
            }
            let hit = match constraint.time_range {
                Some(range) => {
                    let rule_window = schedule_utils::window(candidate.date, range.start, range.end);
                    schedule_utils::windows_overlap(candidate_window, rule_window)
                }
                None => true,
            };
            if hit {
                conflicts.push(Conflict {
                    conflict_type: ConflictType::AvailabilityViolation,
                    severity: ConflictSeverity::Warning,
                    overridable: true,
                    involved_assignments: vec![candidate.id.clone()],
                    details: ConflictDetails::default(),
                    message: format!("班次违反规则: {}", rule.raw_text),
                    suggestions: Vec::new(),
                });
            }
        }
    }

    // 7. Overlap with assignments in other active schedules.
    for &existing in &same_employee {
        if existing.schedule_id == candidate.schedule_id {
            continue;
        }
        let schedule = ctx
            .schedules
            .iter()
            .find(|schedule| schedule.id == existing.schedule_id);
        if let Some(schedule) = schedule {
            if !schedule.is_active() {
                continue;
            }
        }
        let existing_window = schedule_utils::assignment_window(existing);
        if schedule_utils::windows_overlap(candidate_window, existing_window) {
            let overlap = schedule_utils::overlap_hours(candidate_window, existing_window);
            let (other_id, other_name) = match schedule {
                Some(schedule) => (schedule.id.clone(), Some(schedule.name.clone())),
                None => (existing.schedule_id.clone(), None),
            };
            conflicts.push(Conflict {
                conflict_type: ConflictType::CrossScheduleOverlap,
                severity: ConflictSeverity::Warning,
                overridable: true,
                involved_assignments: vec![candidate.id.clone(), existing.id.clone()],
                details: ConflictDetails {
                    overlap_hours: Some(overlap),
                    other_schedule_id: Some(other_id),
                    other_schedule_name: other_name.clone(),
                    ..ConflictDetails::default()
                },
                message: format!(
                    "与排班表 {} 中的班次重叠 {:.1} 小时",
                    other_name.unwrap_or_else(|| existing.schedule_id.clone()),
                    overlap
                ),
                suggestions: Vec::new(),
            });
        }
    }

    debug!(
        target: "engine::detect",
        candidate_id = %candidate.id,
        employee_id = %candidate.employee_id,
        conflicts = conflicts.len(),
        "candidate evaluated"
    );

    conflicts
}

/// Employee-level weekly cap tightened by any max-hours rule constraint.
pub fn effective_weekly_cap(employee: &Employee, rules: &[Rule]) -> f64 {
    rules
        .iter()
        .filter(|rule| rule.applies_to(employee))
        .filter_map(|rule| rule.weekly_hour_cap())
        .fold(employee.max_hours_per_week, f64::min)
}

/// Whether any conflict in the list blocks commit outright.
pub fn has_blocking(conflicts: &[Conflict]) -> bool {
    conflicts.iter().any(Conflict::blocks_commit)
}
