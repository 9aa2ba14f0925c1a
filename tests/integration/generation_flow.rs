use chrono::{NaiveDate, NaiveTime};
use rostercal_engine::models::employee::Employee;
use rostercal_engine::models::shift::Shift;
use rostercal_engine::services::schedule_generator::{
    generate, GenerationContext, GeneratorConfig,
};
use rostercal_engine::services::schedule_utils;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
}

fn shift(id: &str, day: NaiveDate, start: NaiveTime, end: NaiveTime) -> Shift {
    Shift {
        id: id.to_string(),
        date: day,
        start,
        end,
        position: "server".to_string(),
        department: "front-of-house".to_string(),
        duration_override: false,
    }
}

fn context<'a>(employees: &'a [Employee]) -> GenerationContext<'a> {
    GenerationContext {
        employees,
        rules: &[],
        existing: &[],
        schedules: &[],
        schedule_id: "sched-1",
    }
}

#[test]
fn covers_a_full_week_for_two_employees() {
    let employees = vec![
        Employee::new("emp-a", "Ana", "front-of-house"),
        Employee::new("emp-b", "Ben", "front-of-house"),
    ];
    let monday = date(2024, 2, 5);
    let shifts: Vec<Shift> = (0..5)
        .flat_map(|offset| {
            let day = monday + chrono::Duration::days(offset);
            vec![
                shift(&format!("day-{offset}-am"), day, time(6, 0), time(14, 0)),
                shift(&format!("day-{offset}-pm"), day, time(14, 0), time(22, 0)),
            ]
        })
        .collect();

    let employees_ref = &employees;
    let outcome = generate(&shifts, &GeneratorConfig::default(), &context(employees_ref));

    assert!(outcome.uncovered_shifts.is_empty());
    assert_eq!(outcome.assignments.len(), 10);
    // 40 hours each: exactly at the default cap, never over it.
    for employee in employees_ref {
        let own: Vec<_> = outcome
            .assignments
            .iter()
            .filter(|assignment| assignment.employee_id == employee.id)
            .cloned()
            .collect();
        let hours = schedule_utils::weekly_hours(&own, monday);
        assert!(hours <= employee.max_hours_per_week + 1e-9);
    }
}

#[test]
fn adding_employees_never_increases_uncovered_shifts() {
    let day = date(2024, 2, 5);
    let shifts = vec![
        shift("shift-1", day, time(9, 0), time(17, 0)),
        shift("shift-2", day, time(9, 0), time(17, 0)),
        shift("shift-3", day, time(9, 0), time(17, 0)),
    ];

    let small_pool = vec![Employee::new("emp-a", "Ana", "front-of-house")];
    let large_pool = vec![
        Employee::new("emp-a", "Ana", "front-of-house"),
        Employee::new("emp-b", "Ben", "front-of-house"),
        Employee::new("emp-c", "Cho", "front-of-house"),
    ];

    let small = generate(&shifts, &GeneratorConfig::default(), &context(&small_pool));
    let large = generate(&shifts, &GeneratorConfig::default(), &context(&large_pool));

    assert!(large.uncovered_shifts.len() <= small.uncovered_shifts.len());
    assert_eq!(small.uncovered_shifts.len(), 2);
    assert!(large.uncovered_shifts.is_empty());
}

#[test]
fn backtrack_displaces_an_earlier_assignment_to_cover_both() {
    // Ben can only work 8 hours a week, Ana is unconstrained. Greedy puts
    // Ana on the morning shift; only a displacement covers the long
    // afternoon one.
    let ana = Employee::new("emp-a", "Ana", "front-of-house");
    let mut ben = Employee::new("emp-b", "Ben", "front-of-house");
    ben.max_hours_per_week = 8.0;
    let employees = vec![ana, ben];

    let day = date(2024, 2, 5);
    let shifts = vec![
        shift("morning", day, time(9, 0), time(17, 0)),
        shift("late", day, time(13, 0), time(23, 0)),
    ];

    let outcome = generate(&shifts, &GeneratorConfig::default(), &context(&employees));

    assert!(outcome.uncovered_shifts.is_empty());
    assert_eq!(outcome.assignments.len(), 2);

    let late = outcome
        .assignments
        .iter()
        .find(|assignment| assignment.shift_id.as_deref() == Some("late"))
        .expect("late shift covered");
    assert_eq!(late.employee_id, "emp-a");

    let morning = outcome
        .assignments
        .iter()
        .find(|assignment| assignment.shift_id.as_deref() == Some("morning"))
        .expect("morning shift covered");
    assert_eq!(morning.employee_id, "emp-b");
}

#[test]
fn backtracking_can_be_disabled() {
    let ana = Employee::new("emp-a", "Ana", "front-of-house");
    let mut ben = Employee::new("emp-b", "Ben", "front-of-house");
    ben.max_hours_per_week = 8.0;
    let employees = vec![ana, ben];

    let day = date(2024, 2, 5);
    let shifts = vec![
        shift("morning", day, time(9, 0), time(17, 0)),
        shift("late", day, time(13, 0), time(23, 0)),
    ];

    let config = GeneratorConfig {
        backtrack_depth: 0,
        ..GeneratorConfig::default()
    };
    let outcome = generate(&shifts, &config, &context(&employees));

    assert_eq!(outcome.uncovered_shifts.len(), 1);
    assert_eq!(outcome.uncovered_shifts[0].shift_id, "late");
    assert!(outcome.uncovered_shifts[0].last_conflict.is_some());
}

#[test]
fn department_mismatch_leaves_shifts_uncovered() {
    let employees = vec![Employee::new("emp-a", "Ana", "kitchen")];
    let day = date(2024, 2, 5);
    let shifts = vec![shift("shift-1", day, time(9, 0), time(17, 0))];

    let outcome = generate(&shifts, &GeneratorConfig::default(), &context(&employees));

    assert_eq!(outcome.uncovered_shifts.len(), 1);
    assert!(outcome.uncovered_shifts[0].last_conflict.is_none());
    assert!(outcome.assignments.is_empty());
}
