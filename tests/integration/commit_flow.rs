use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use rostercal_engine::error::EngineError;
use rostercal_engine::models::assignment::{Assignment, AssignmentStatus};
use rostercal_engine::models::conflict::ConflictType;
use rostercal_engine::models::employee::Employee;
use rostercal_engine::models::schedule::{Schedule, ScheduleStatus};
use rostercal_engine::repository::{EngineSnapshot, InMemoryRepository, SnapshotScope, SnapshotRepository};
use rostercal_engine::services::commit_service::{CommitRequest, CommitService};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
}

fn seeded_repository() -> Arc<InMemoryRepository> {
    let snapshot = EngineSnapshot {
        employees: vec![Employee::new("emp-1", "Sarah", "front-of-house")],
        shifts: Vec::new(),
        rules: Vec::new(),
        assignments: Vec::new(),
        schedules: vec![Schedule {
            id: "sched-1".to_string(),
            name: "二月前厅排班".to_string(),
            department: "front-of-house".to_string(),
            start_date: date(2024, 2, 1),
            end_date: date(2024, 2, 29),
            status: ScheduleStatus::Draft,
            assignment_ids: Vec::new(),
        }],
    };
    Arc::new(InMemoryRepository::seed(snapshot))
}

#[tokio::test]
async fn clean_candidate_commits_and_bumps_version() {
    let log_dir = tempfile::tempdir().expect("temp dir");
    rostercal_engine::utils::logger::init_logging(log_dir.path()).expect("logging");

    let repository = seeded_repository();
    let service = CommitService::new(Arc::clone(&repository));

    let candidate = Assignment::proposed(
        "emp-1",
        "sched-1",
        date(2024, 2, 5),
        time(9, 0),
        time(17, 0),
    );
    let receipt = service
        .validate_and_commit(CommitRequest {
            assignment: candidate.clone(),
            expected_version: 0,
            override_ack: false,
            override_reason: None,
        })
        .await
        .expect("commit");

    assert_eq!(receipt.assignment.version, 1);
    assert_eq!(receipt.assignment.status, AssignmentStatus::Confirmed);
    assert!(!receipt.assignment.overridden);
    assert!(receipt.acknowledged_conflicts.is_empty());

    let snapshot = repository
        .load_context(&SnapshotScope::default())
        .await
        .expect("snapshot");
    assert_eq!(snapshot.assignments.len(), 1);
    assert_eq!(snapshot.assignments[0].version, 1);
}

#[tokio::test]
async fn overlapping_candidate_is_blocked_even_with_ack() {
    let repository = seeded_repository();
    let service = CommitService::new(Arc::clone(&repository));
    let day = date(2024, 2, 5);

    service
        .validate_and_commit(CommitRequest {
            assignment: Assignment::proposed("emp-1", "sched-1", day, time(9, 0), time(17, 0)),
            expected_version: 0,
            override_ack: false,
            override_reason: None,
        })
        .await
        .expect("first commit");

    let overlapping = Assignment::proposed("emp-1", "sched-1", day, time(14, 0), time(22, 0));
    let rejection = service
        .validate_and_commit(CommitRequest {
            assignment: overlapping,
            expected_version: 0,
            override_ack: true,
            override_reason: Some("manager insists".to_string()),
        })
        .await
        .expect_err("blocked");

    match rejection {
        EngineError::ConflictBlocked { conflicts } => {
            assert!(conflicts
                .iter()
                .any(|c| c.conflict_type == ConflictType::Overlap));
        }
        other => panic!("expected ConflictBlocked, got {other:?}"),
    }
}

#[tokio::test]
async fn warning_requires_ack_then_commits_as_overridden() {
    let repository = seeded_repository();
    let service = CommitService::new(Arc::clone(&repository));

    service
        .validate_and_commit(CommitRequest {
            assignment: Assignment::proposed(
                "emp-1",
                "sched-1",
                date(2024, 2, 5),
                time(14, 0),
                time(22, 0),
            ),
            expected_version: 0,
            override_ack: false,
            override_reason: None,
        })
        .await
        .expect("first commit");

    // Only eight hours of rest before the next morning shift.
    let candidate = Assignment::proposed(
        "emp-1",
        "sched-1",
        date(2024, 2, 6),
        time(6, 0),
        time(14, 0),
    );

    let rejection = service
        .validate_and_commit(CommitRequest {
            assignment: candidate.clone(),
            expected_version: 0,
            override_ack: false,
            override_reason: None,
        })
        .await
        .expect_err("needs acknowledgement");
    match &rejection {
        EngineError::OverrideRequired { conflicts } => {
            assert!(conflicts
                .iter()
                .any(|c| c.conflict_type == ConflictType::InsufficientRest));
        }
        other => panic!("expected OverrideRequired, got {other:?}"),
    }

    let receipt = service
        .validate_and_commit(CommitRequest {
            assignment: candidate,
            expected_version: 0,
            override_ack: true,
            override_reason: Some("短期人手不足".to_string()),
        })
        .await
        .expect("acknowledged commit");

    assert!(receipt.assignment.overridden);
    assert_eq!(receipt.acknowledged_conflicts.len(), 1);
    assert_eq!(
        receipt.acknowledged_conflicts[0].conflict_type,
        ConflictType::InsufficientRest
    );
}

#[tokio::test]
async fn stale_version_is_terminal_for_the_attempt() {
    let repository = seeded_repository();
    let service = CommitService::new(Arc::clone(&repository));

    let assignment = Assignment::proposed(
        "emp-1",
        "sched-1",
        date(2024, 2, 5),
        time(9, 0),
        time(17, 0),
    );
    service
        .validate_and_commit(CommitRequest {
            assignment: assignment.clone(),
            expected_version: 0,
            override_ack: false,
            override_reason: None,
        })
        .await
        .expect("first commit");

    // A concurrent editor already bumped the version; the stale write is
    // rejected, not retried.
    let mut edited = assignment;
    edited.end = time(18, 0);
    let rejection = service
        .validate_and_commit(CommitRequest {
            assignment: edited,
            expected_version: 0,
            override_ack: false,
            override_reason: None,
        })
        .await
        .expect_err("stale");

    match rejection {
        EngineError::VersionConflict { expected, current } => {
            assert_eq!(expected, 0);
            assert_eq!(current, 1);
        }
        other => panic!("expected VersionConflict, got {other:?}"),
    }
}

#[tokio::test]
async fn remove_uses_the_same_version_contract() {
    let repository = seeded_repository();
    let service = CommitService::new(Arc::clone(&repository));

    let assignment = Assignment::proposed(
        "emp-1",
        "sched-1",
        date(2024, 2, 5),
        time(9, 0),
        time(17, 0),
    );
    let receipt = service
        .validate_and_commit(CommitRequest {
            assignment,
            expected_version: 0,
            override_ack: false,
            override_reason: None,
        })
        .await
        .expect("commit");

    let stale = service.remove(&receipt.assignment.id, 0).await;
    assert!(matches!(stale, Err(EngineError::VersionConflict { .. })));

    service
        .remove(&receipt.assignment.id, receipt.assignment.version)
        .await
        .expect("remove");

    let snapshot = repository
        .load_context(&SnapshotScope::default())
        .await
        .expect("snapshot");
    assert!(snapshot.assignments.is_empty());
}
