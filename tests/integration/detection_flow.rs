use chrono::{NaiveDate, NaiveTime};
use rostercal_engine::models::assignment::Assignment;
use rostercal_engine::models::conflict::{ConflictSeverity, ConflictType, SuggestionKind};
use rostercal_engine::models::employee::Employee;
use rostercal_engine::models::schedule::{Schedule, ScheduleStatus};
use rostercal_engine::services::conflict_detector::{detect, DetectionContext};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
}

fn employee() -> Employee {
    Employee::new("emp-1", "Sarah", "front-of-house")
}

fn context<'a>(
    employee: &'a Employee,
    existing: &'a [Assignment],
    schedules: &'a [Schedule],
) -> DetectionContext<'a> {
    DetectionContext {
        employee,
        rules: &[],
        existing,
        schedules,
        shift: None,
    }
}

#[test]
fn overlapping_candidate_yields_single_overlap_conflict() {
    let employee = employee();
    let day = date(2024, 2, 5);
    let existing = vec![Assignment::proposed(
        "emp-1",
        "sched-1",
        day,
        time(9, 0),
        time(17, 0),
    )];
    let candidate = Assignment::proposed("emp-1", "sched-1", day, time(14, 0), time(22, 0));

    let conflicts = detect(&candidate, &context(&employee, &existing, &[]));

    let overlap: Vec<_> = conflicts
        .iter()
        .filter(|c| c.conflict_type == ConflictType::Overlap)
        .collect();
    assert_eq!(overlap.len(), 1);
    assert_eq!(overlap[0].severity, ConflictSeverity::Critical);
    assert!(!overlap[0].overridable);
    assert_eq!(overlap[0].details.overlap_hours, Some(3.0));
    assert!(!conflicts
        .iter()
        .any(|c| c.conflict_type == ConflictType::DoubleBooking));
}

#[test]
fn identical_window_is_double_booking() {
    let employee = employee();
    let day = date(2024, 2, 5);
    let existing = vec![Assignment::proposed(
        "emp-1",
        "sched-1",
        day,
        time(9, 0),
        time(17, 0),
    )];
    let candidate = Assignment::proposed("emp-1", "sched-1", day, time(9, 0), time(17, 0));

    let conflicts = detect(&candidate, &context(&employee, &existing, &[]));

    let booking = conflicts
        .iter()
        .find(|c| c.conflict_type == ConflictType::DoubleBooking)
        .expect("double booking");
    assert_eq!(booking.severity, ConflictSeverity::Critical);
    assert!(!booking.overridable);
    assert!(!conflicts
        .iter()
        .any(|c| c.conflict_type == ConflictType::Overlap));
}

#[test]
fn short_rest_gap_is_overridable_with_suggested_start() {
    let employee = employee();
    let existing = vec![Assignment::proposed(
        "emp-1",
        "sched-1",
        date(2024, 2, 5),
        time(14, 0),
        time(22, 0),
    )];
    let candidate = Assignment::proposed(
        "emp-1",
        "sched-1",
        date(2024, 2, 6),
        time(6, 0),
        time(14, 0),
    );

    let conflicts = detect(&candidate, &context(&employee, &existing, &[]));

    let rest = conflicts
        .iter()
        .find(|c| c.conflict_type == ConflictType::InsufficientRest)
        .expect("insufficient rest");
    assert_eq!(rest.severity, ConflictSeverity::Warning);
    assert!(rest.overridable);
    assert_eq!(rest.details.actual_rest, Some(8.0));
    assert_eq!(rest.details.required_rest, Some(11.0));

    // Earliest start preserving the 8-hour length: 22:00 + 11h = 09:00.
    let suggestion = rest.suggestions.first().expect("suggested start");
    assert_eq!(suggestion.kind, SuggestionKind::ShiftStart);
    assert_eq!(suggestion.date, Some(date(2024, 2, 6)));
    assert_eq!(suggestion.start, Some(time(9, 0)));
    assert_eq!(suggestion.end, Some(time(17, 0)));
}

#[test]
fn two_extra_hours_past_the_cap_are_blocked() {
    let employee = employee();
    let monday = date(2024, 2, 5);
    let existing: Vec<Assignment> = (0..5)
        .map(|offset| {
            Assignment::proposed(
                "emp-1",
                "sched-1",
                monday + chrono::Duration::days(offset),
                time(9, 0),
                time(17, 0),
            )
        })
        .collect();
    let candidate = Assignment::proposed(
        "emp-1",
        "sched-1",
        date(2024, 2, 10),
        time(12, 0),
        time(14, 0),
    );

    let conflicts = detect(&candidate, &context(&employee, &existing, &[]));

    let cap = conflicts
        .iter()
        .find(|c| c.conflict_type == ConflictType::MaxHoursExceeded)
        .expect("weekly cap conflict");
    assert_eq!(cap.severity, ConflictSeverity::Critical);
    assert!(!cap.overridable);
    assert_eq!(cap.details.total_weekly_hours, Some(42.0));
    assert_eq!(cap.details.max_weekly_hours, Some(40.0));
}

#[test]
fn sixteen_hour_shift_suggests_two_equal_halves() {
    let employee = employee();
    let candidate = Assignment::proposed(
        "emp-1",
        "sched-1",
        date(2024, 2, 5),
        time(6, 0),
        time(22, 0),
    );

    let conflicts = detect(&candidate, &context(&employee, &[], &[]));

    let bounds = conflicts
        .iter()
        .find(|c| c.conflict_type == ConflictType::DurationBounds)
        .expect("duration bounds conflict");
    assert_eq!(bounds.severity, ConflictSeverity::Error);
    assert!(!bounds.overridable);
    assert_eq!(bounds.details.shift_hours, Some(16.0));

    let split = bounds.suggestions.first().expect("split suggestion");
    assert_eq!(split.kind, SuggestionKind::SplitShift);
    assert_eq!(split.segments.len(), 2);
    assert_eq!(split.segments[0].start, time(6, 0));
    assert_eq!(split.segments[0].end, time(14, 0));
    assert_eq!(split.segments[1].start, time(14, 0));
    assert_eq!(split.segments[1].end, time(22, 0));
}

#[test]
fn overlap_in_another_schedule_is_a_warning_with_linkage() {
    let employee = employee();
    let day = date(2024, 2, 5);
    let other_schedule = Schedule {
        id: "sched-2".to_string(),
        name: "后厨二月排班".to_string(),
        department: "front-of-house".to_string(),
        start_date: date(2024, 2, 1),
        end_date: date(2024, 2, 29),
        status: ScheduleStatus::Published,
        assignment_ids: Vec::new(),
    };
    let existing = vec![Assignment::proposed(
        "emp-1",
        "sched-2",
        day,
        time(9, 0),
        time(17, 0),
    )];
    let candidate = Assignment::proposed("emp-1", "sched-1", day, time(14, 0), time(22, 0));

    let schedules = vec![other_schedule];
    let conflicts = detect(&candidate, &context(&employee, &existing, &schedules));

    let cross = conflicts
        .iter()
        .find(|c| c.conflict_type == ConflictType::CrossScheduleOverlap)
        .expect("cross-schedule conflict");
    assert_eq!(cross.severity, ConflictSeverity::Warning);
    assert!(cross.overridable);
    assert_eq!(cross.details.other_schedule_id.as_deref(), Some("sched-2"));
    assert_eq!(
        cross.details.other_schedule_name.as_deref(),
        Some("后厨二月排班")
    );
    assert_eq!(cross.details.overlap_hours, Some(3.0));
    // Same-schedule criticals must not fire for another schedule's window.
    assert!(!conflicts
        .iter()
        .any(|c| c.conflict_type == ConflictType::Overlap));
}

#[test]
fn detection_is_pure_and_repeatable() {
    let employee = employee();
    let day = date(2024, 2, 5);
    let existing = vec![
        Assignment::proposed("emp-1", "sched-1", day, time(9, 0), time(17, 0)),
        Assignment::proposed(
            "emp-1",
            "sched-1",
            date(2024, 2, 6),
            time(9, 0),
            time(17, 0),
        ),
    ];
    let candidate = Assignment::proposed("emp-1", "sched-1", day, time(14, 0), time(22, 0));

    let ctx = context(&employee, &existing, &[]);
    let first = detect(&candidate, &ctx);
    let second = detect(&candidate, &ctx);
    let third = detect(&candidate, &ctx);
    assert_eq!(first, second);
    assert_eq!(second, third);
}
