use super::*;

#[test]
fn test_level_priority() {
    let infeasible = ScheduleScore::of(-1, 0, 0);
    let feasible = ScheduleScore::of(0, -50, -500);
    assert!(feasible > infeasible);
    assert!(!infeasible.is_feasible());
    assert!(feasible.is_feasible());

    assert!(ScheduleScore::of(0, -1, -100) > ScheduleScore::of(0, -2, 0));
    assert!(ScheduleScore::of(0, 0, -1) > ScheduleScore::of(0, 0, -2));
}

#[test]
fn test_arithmetic() {
    let a = ScheduleScore::of(0, -2, -5);
    let b = ScheduleScore::of_soft(-3);
    assert_eq!(a + b, ScheduleScore::of(0, -2, -8));
    assert_eq!(a - b, ScheduleScore::of(0, -2, -2));
    assert_eq!(-a, ScheduleScore::of(0, 2, 5));

    let total: ScheduleScore = [a, b, ScheduleScore::of_medium(-1)].into_iter().sum();
    assert_eq!(total, ScheduleScore::of(0, -3, -8));
}

#[test]
fn test_penalty_levels() {
    assert_eq!(
        ScheduleScore::penalty(ScoreLevel::Medium, 4),
        ScheduleScore::of_medium(-4)
    );
    assert_eq!(ScheduleScore::penalty(ScoreLevel::Soft, 2).level(ScoreLevel::Soft), -2);
}

#[test]
fn test_parse_display() {
    let score: ScheduleScore = "0hard/-3medium/-12soft".parse().unwrap();
    assert_eq!(score, ScheduleScore::of(0, -3, -12));
    assert_eq!(score.to_string(), "0hard/-3medium/-12soft");
}

#[test]
fn test_parse_errors() {
    assert!("0hard/-3soft".parse::<ScheduleScore>().is_err());
    assert!("0hard/xmedium/0soft".parse::<ScheduleScore>().is_err());
    assert!("0/0/0".parse::<ScheduleScore>().is_err());
}
