use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EngineResult;
use crate::models::assignment::Assignment;
use crate::models::employee::Employee;
use crate::models::rule::Rule;
use crate::models::schedule::Schedule;
use crate::models::shift::Shift;

/// What a caller wants loaded. Empty filters mean "everything" — small
/// deployments load the world, larger ones scope by employee/department.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotScope {
    #[serde(default)]
    pub employee_ids: Vec<String>,
    #[serde(default)]
    pub schedule_ids: Vec<String>,
    #[serde(default)]
    pub department: Option<String>,
}

/// Read-only view of the world the engine computes against. The engine
/// never mutates a snapshot; commits go back through the repository.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub shifts: Vec<Shift>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    #[serde(default)]
    pub schedules: Vec<Schedule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum CommitOutcome {
    Committed { version: i64 },
    StaleVersion { current: i64 },
}

/// Storage seam. The engine is agnostic to the technology behind it; the
/// only contract is snapshot loads and version-checked commits.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    async fn load_context(&self, scope: &SnapshotScope) -> EngineResult<EngineSnapshot>;

    /// Version-checked write. A new assignment commits against expected
    /// version 0; anything else must match the stored version exactly.
    async fn commit_assignment(
        &self,
        assignment: &Assignment,
        expected_version: i64,
    ) -> EngineResult<CommitOutcome>;

    /// Version-checked removal for the unassign path.
    async fn remove_assignment(
        &self,
        assignment_id: &str,
        expected_version: i64,
    ) -> EngineResult<CommitOutcome>;
}

/// Reference implementation backed by in-process maps. Ships for tests
/// and embedders without a store of their own.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    state: RwLock<InMemoryState>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    employees: Vec<Employee>,
    shifts: Vec<Shift>,
    rules: Vec<Rule>,
    schedules: Vec<Schedule>,
    assignments: HashMap<String, Assignment>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(snapshot: EngineSnapshot) -> Self {
        let repository = Self::new();
        {
            let mut state = repository.state.write().expect("repository lock");
            state.employees = snapshot.employees;
            state.shifts = snapshot.shifts;
            state.rules = snapshot.rules;
            state.schedules = snapshot.schedules;
            state.assignments = snapshot
                .assignments
                .into_iter()
                .map(|assignment| (assignment.id.clone(), assignment))
                .collect();
        }
        repository
    }
}

#[async_trait]
impl SnapshotRepository for InMemoryRepository {
    async fn load_context(&self, scope: &SnapshotScope) -> EngineResult<EngineSnapshot> {
        let state = self.state.read().expect("repository lock");

        let employee_matches = |employee: &Employee| {
            let id_ok =
                scope.employee_ids.is_empty() || scope.employee_ids.contains(&employee.id);
            let department_ok = scope
                .department
                .as_ref()
                .map(|department| department == &employee.department)
                .unwrap_or(true);
            id_ok && department_ok
        };

        let employees: Vec<Employee> = state
            .employees
            .iter()
            .filter(|employee| employee_matches(employee))
            .cloned()
            .collect();

        let rules: Vec<Rule> = state
            .rules
            .iter()
            .filter(|rule| match &rule.employee_id {
                Some(id) => {
                    scope.employee_ids.is_empty() || scope.employee_ids.contains(id)
                }
                None => true,
            })
            .cloned()
            .collect();

        // Assignments load across all active schedules so cross-schedule
        // checks see the full picture.
        let assignments: Vec<Assignment> = state
            .assignments
            .values()
            .filter(|assignment| {
                scope.employee_ids.is_empty()
                    || scope.employee_ids.contains(&assignment.employee_id)
            })
            .cloned()
            .collect();

        let shifts: Vec<Shift> = state
            .shifts
            .iter()
            .filter(|shift| {
                scope
                    .department
                    .as_ref()
                    .map(|department| department == &shift.department)
                    .unwrap_or(true)
            })
            .cloned()
            .collect();

        debug!(
            target: "engine::repository",
            employees = employees.len(),
            assignments = assignments.len(),
            "snapshot loaded"
        );

        Ok(EngineSnapshot {
            employees,
            shifts,
            rules,
            assignments,
            schedules: state.schedules.clone(),
        })
    }

    async fn commit_assignment(
        &self,
        assignment: &Assignment,
        expected_version: i64,
    ) -> EngineResult<CommitOutcome> {
        let mut state = self.state.write().expect("repository lock");

        let current = state
            .assignments
            .get(&assignment.id)
            .map(|existing| existing.version)
            .unwrap_or(0);
        if current != expected_version {
            return Ok(CommitOutcome::StaleVersion { current });
        }

        let version = current + 1;
        let mut stored = assignment.clone();
        stored.version = version;
        state.assignments.insert(stored.id.clone(), stored);
        Ok(CommitOutcome::Committed { version })
    }

    async fn remove_assignment(
        &self,
        assignment_id: &str,
        expected_version: i64,
    ) -> EngineResult<CommitOutcome> {
        let mut state = self.state.write().expect("repository lock");

        let current = match state.assignments.get(assignment_id) {
            Some(existing) => existing.version,
            None => return Err(crate::error::EngineError::not_found()),
        };
        if current != expected_version {
            return Ok(CommitOutcome::StaleVersion { current });
        }

        state.assignments.remove(assignment_id);
        Ok(CommitOutcome::Committed { version: current })
    }
}
