use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::models::assignment::{Assignment, AssignmentStatus};
use crate::models::conflict::Conflict;
use crate::repository::{CommitOutcome, SnapshotRepository, SnapshotScope};
use crate::services::conflict_detector::{self, DetectionContext};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    pub assignment: Assignment,
    pub expected_version: i64,
    /// Explicit manager acknowledgement of overridable conflicts. Never
    /// implied; without it any conflict rejects the commit.
    #[serde(default)]
    pub override_ack: bool,
    #[serde(default)]
    pub override_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommitReceipt {
    pub assignment: Assignment,
    /// Overridable conflicts the caller acknowledged on the way in;
    /// empty for a clean commit.
    #[serde(default)]
    pub acknowledged_conflicts: Vec<Conflict>,
}

/// Validate-then-commit with optimistic concurrency. Detection always
/// runs against a fresh snapshot; a stale version is a terminal result
/// for this attempt — the caller reloads and retries explicitly, the
/// engine never retries on its own.
pub struct CommitService<R> {
    repository: Arc<R>,
}

impl<R: SnapshotRepository> CommitService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub async fn validate_and_commit(&self, request: CommitRequest) -> EngineResult<CommitReceipt> {
        let CommitRequest {
            assignment,
            expected_version,
            override_ack,
            override_reason,
        } = request;

        let scope = SnapshotScope {
            employee_ids: vec![assignment.employee_id.clone()],
            schedule_ids: Vec::new(),
            department: None,
        };
        let snapshot = self.repository.load_context(&scope).await?;

        let employee = snapshot
            .employees
            .iter()
            .find(|employee| employee.id == assignment.employee_id)
            .ok_or_else(EngineError::not_found)?;
        let shift = assignment
            .shift_id
            .as_deref()
            .and_then(|shift_id| snapshot.shifts.iter().find(|shift| shift.id == shift_id));

        let existing: Vec<Assignment> = snapshot
            .assignments
            .iter()
            .filter(|existing| existing.id != assignment.id)
            .cloned()
            .collect();

        let detection = DetectionContext {
            employee,
            rules: &snapshot.rules,
            existing: &existing,
            schedules: &snapshot.schedules,
            shift,
        };
        let conflicts = conflict_detector::detect(&assignment, &detection);

        if conflict_detector::has_blocking(&conflicts) {
            return Err(EngineError::conflict_blocked(conflicts));
        }
        if !conflicts.is_empty() && !override_ack {
            return Err(EngineError::override_required(conflicts));
        }

        let mut committed = assignment;
        committed.status = AssignmentStatus::Confirmed;
        if !conflicts.is_empty() {
            committed.overridden = true;
        }

        match self
            .repository
            .commit_assignment(&committed, expected_version)
            .await?
        {
            CommitOutcome::Committed { version } => {
                committed.version = version;
                info!(
                    target: "engine::commit",
                    assignment_id = %committed.id,
                    employee_id = %committed.employee_id,
                    version,
                    overridden = committed.overridden,
                    reason = override_reason.as_deref().unwrap_or(""),
                    "assignment committed"
                );
                Ok(CommitReceipt {
                    assignment: committed,
                    acknowledged_conflicts: conflicts,
                })
            }
            CommitOutcome::StaleVersion { current } => {
                Err(EngineError::version_conflict(expected_version, current))
            }
        }
    }

    /// Version-checked unassign; the same stale-version contract applies.
    pub async fn remove(&self, assignment_id: &str, expected_version: i64) -> EngineResult<()> {
        match self
            .repository
            .remove_assignment(assignment_id, expected_version)
            .await?
        {
            CommitOutcome::Committed { .. } => {
                info!(
                    target: "engine::commit",
                    assignment_id,
                    "assignment removed"
                );
                Ok(())
            }
            CommitOutcome::StaleVersion { current } => {
                Err(EngineError::version_conflict(expected_version, current))
            }
        }
    }
}
