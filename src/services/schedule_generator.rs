use std::cmp::Ordering;
use std::time::Instant;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::assignment::Assignment;
use crate::models::conflict::Conflict;
use crate::models::employee::Employee;
use crate::models::rule::Rule;
use crate::models::schedule::Schedule;
use crate::models::shift::Shift;
use crate::services::conflict_detector::{self, DetectionContext};
use crate::services::schedule_utils;

const DEFAULT_MAX_STEPS: u64 = 10_000;

/// Bounds for one generation run. The deadline and step budget make the
/// search terminable: exhaustion returns the best partial result instead
/// of failing.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub backtrack_depth: usize,
    pub max_steps: u64,
    pub deadline: Option<Instant>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            backtrack_depth: 1,
            max_steps: DEFAULT_MAX_STEPS,
            deadline: None,
        }
    }
}

/// Snapshot a generation run works against. `existing` carries committed
/// assignments across all active schedules for every pool employee.
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    pub employees: &'a [Employee],
    pub rules: &'a [Rule],
    pub existing: &'a [Assignment],
    pub schedules: &'a [Schedule],
    pub schedule_id: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UncoveredShift {
    pub shift_id: String,
    /// Last blocking conflict seen while trying candidates; `None` when
    /// the pool was empty or the budget ran out first.
    #[serde(default)]
    pub last_conflict: Option<Conflict>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub assignments: Vec<Assignment>,
    pub uncovered_shifts: Vec<UncoveredShift>,
    pub steps_used: u64,
    pub budget_exhausted: bool,
}

/// Assign employees to a batch of shifts: greedy in chronological order,
/// with a bounded backtrack that may displace one earlier assignment when
/// doing so strictly reduces the uncovered count. Never aborts — whatever
/// could not be covered is reported per shift.
pub fn generate(
    shifts: &[Shift],
    config: &GeneratorConfig,
    ctx: &GenerationContext<'_>,
) -> GenerationOutcome {
    let mut ordered: Vec<&Shift> = shifts.iter().collect();
    ordered.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.start.cmp(&b.start))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut search = Search {
        config,
        ctx,
        steps: 0,
        exhausted: false,
    };
    let mut assigned: Vec<Assignment> = Vec::new();
    let mut uncovered: Vec<UncoveredShift> = Vec::new();

    for shift in &ordered {
        if search.budget_spent() {
            uncovered.push(UncoveredShift {
                shift_id: shift.id.clone(),
                last_conflict: None,
            });
            continue;
        }
        match search.cover(shift, None, &mut assigned, config.backtrack_depth, &ordered) {
            Ok(()) => {}
            Err(last_conflict) => {
                debug!(
                    target: "engine::generate",
                    shift_id = %shift.id,
                    "shift left uncovered"
                );
                uncovered.push(UncoveredShift {
                    shift_id: shift.id.clone(),
                    last_conflict,
                });
            }
        }
    }

    info!(
        target: "engine::generate",
        schedule_id = %ctx.schedule_id,
        assigned = assigned.len(),
        uncovered = uncovered.len(),
        steps = search.steps,
        exhausted = search.exhausted,
        "generation finished"
    );

    GenerationOutcome {
        assignments: assigned,
        uncovered_shifts: uncovered,
        steps_used: search.steps,
        budget_exhausted: search.exhausted,
    }
}

struct Search<'a, 'b> {
    config: &'b GeneratorConfig,
    ctx: &'b GenerationContext<'a>,
    steps: u64,
    exhausted: bool,
}

impl<'a, 'b> Search<'a, 'b> {
    fn budget_spent(&mut self) -> bool {
        if self.exhausted {
            return true;
        }
        if self.steps >= self.config.max_steps {
            self.exhausted = true;
            return true;
        }
        if let Some(deadline) = self.config.deadline {
            if Instant::now() >= deadline {
                self.exhausted = true;
                return true;
            }
        }
        false
    }

    /// Candidates for a shift: department match, ranked by ascending
    /// weekly hours (existing plus generated), then preference match,
    /// then id.
    fn candidates(
        &self,
        shift: &Shift,
        exclude: Option<&str>,
        assigned: &[Assignment],
    ) -> Vec<&'a Employee> {
        let week_start = schedule_utils::week_start_of(shift.date);
        let weekday = shift.date.weekday();

        let mut pool: Vec<(f64, bool, &Employee)> = self
            .ctx
            .employees
            .iter()
            .filter(|employee| employee.department == shift.department)
            .filter(|employee| Some(employee.id.as_str()) != exclude)
            .map(|employee| {
                let load: Vec<Assignment> = self
                    .ctx
                    .existing
                    .iter()
                    .chain(assigned.iter())
                    .filter(|assignment| assignment.employee_id == employee.id)
                    .cloned()
                    .collect();
                let hours = schedule_utils::weekly_hours(&load, week_start);
                let preferred = employee.prefers(&shift.position, weekday);
                (hours, preferred, employee)
            })
            .collect();

        pool.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.1.cmp(&a.1))
                .then_with(|| a.2.id.cmp(&b.2.id))
        });

        pool.into_iter().map(|(_, _, employee)| employee).collect()
    }

    fn attempt(
        &mut self,
        trial: &Assignment,
        employee: &Employee,
        shift: &Shift,
        assigned: &[Assignment],
    ) -> Vec<Conflict> {
        self.steps += 1;
        let combined: Vec<Assignment> = self
            .ctx
            .existing
            .iter()
            .chain(assigned.iter())
            .cloned()
            .collect();
        let detection = DetectionContext {
            employee,
            rules: self.ctx.rules,
            existing: &combined,
            schedules: self.ctx.schedules,
            shift: Some(shift),
        };
        conflict_detector::detect(trial, &detection)
    }

    /// Cover one shift, preferring a conflict-free candidate, then one
    /// with only overridable warnings, then a bounded displacement of an
    /// earlier assignment.
    fn cover(
        &mut self,
        shift: &Shift,
        exclude: Option<&str>,
        assigned: &mut Vec<Assignment>,
        depth: usize,
        shifts: &[&Shift],
    ) -> Result<(), Option<Conflict>> {
        let ranked = self.candidates(shift, exclude, assigned);
        let mut fallback: Option<Assignment> = None;
        let mut last_blocking: Option<Conflict> = None;

        for employee in &ranked {
            if self.budget_spent() {
                break;
            }
            let trial = Assignment::for_shift(&employee.id, self.ctx.schedule_id, shift);
            let conflicts = self.attempt(&trial, employee, shift, assigned);
            if conflicts.is_empty() {
                assigned.push(trial);
                return Ok(());
            }
            if conflict_detector::has_blocking(&conflicts) {
                last_blocking = conflicts.into_iter().find(Conflict::blocks_commit);
                continue;
            }
            if fallback.is_none() {
                let mut acknowledged = trial;
                acknowledged.overridden = true;
                fallback = Some(acknowledged);
            }
        }

        if let Some(fallback) = fallback {
            assigned.push(fallback);
            return Ok(());
        }

        if depth > 0 && !self.budget_spent() {
            if self.backtrack(shift, assigned, depth, shifts) {
                return Ok(());
            }
        }

        Err(last_blocking)
    }

    /// Free one earlier assignment whose employee can take this shift,
    /// then re-cover the displaced shift with someone else. Accepted only
    /// when both end up covered, so the uncovered count strictly drops.
    fn backtrack(
        &mut self,
        shift: &Shift,
        assigned: &mut Vec<Assignment>,
        depth: usize,
        shifts: &[&Shift],
    ) -> bool {
        for index in (0..assigned.len()).rev() {
            if self.budget_spent() {
                return false;
            }

            let prior = assigned[index].clone();
            let prior_shift = match prior
                .shift_id
                .as_deref()
                .and_then(|id| shifts.iter().find(|s| s.id == id))
            {
                Some(prior_shift) => *prior_shift,
                None => continue,
            };
            let employee = match self
                .ctx
                .employees
                .iter()
                .find(|employee| employee.id == prior.employee_id)
            {
                Some(employee) if employee.department == shift.department => employee,
                _ => continue,
            };

            let removed = assigned.remove(index);

            let trial = Assignment::for_shift(&employee.id, self.ctx.schedule_id, shift);
            let trial_id = trial.id.clone();
            let conflicts = self.attempt(&trial, employee, shift, assigned);
            if conflicts.is_empty() {
                assigned.push(trial);
                if self
                    .cover(
                        prior_shift,
                        Some(prior.employee_id.as_str()),
                        assigned,
                        depth - 1,
                        shifts,
                    )
                    .is_ok()
                {
                    debug!(
                        target: "engine::generate",
                        shift_id = %shift.id,
                        displaced_shift = %prior_shift.id,
                        "backtrack displaced an earlier assignment"
                    );
                    return true;
                }
                assigned.retain(|assignment| assignment.id != trial_id);
            }

            // rollback
            assigned.insert(index.min(assigned.len()), removed);
        }
        false
    }
}
