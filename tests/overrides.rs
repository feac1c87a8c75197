#![forbid(unsafe_code)]
use chrono::{DateTime, Duration, TimeZone, Utc};
use tour_de_garde::{apply_overrides, ScheduleId, Shift, UserId, UserOverride};

fn t(d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2018, 3, d, h, mi, 0).unwrap()
}

fn shift(user: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Shift {
    Shift::new(start, end, UserId::new(user))
}

fn ov(
    add: Option<&str>,
    remove: Option<&str>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> UserOverride {
    UserOverride::new(
        ScheduleId::new("sched"),
        add.map(UserId::new),
        remove.map(UserId::new),
        start,
        end,
    )
    .unwrap()
}

fn two_days_of_a() -> Vec<Shift> {
    vec![
        shift("a", t(1, 9, 0), t(1, 21, 0)),
        shift("a", t(2, 9, 0), t(2, 21, 0)),
    ]
}

#[test]
fn no_overrides_keeps_shifts() {
    assert_eq!(apply_overrides(two_days_of_a(), &[]), two_days_of_a());
}

#[test]
fn removal_drops_an_entire_shift() {
    let res = apply_overrides(
        two_days_of_a(),
        &[ov(None, Some("a"), t(1, 9, 0), t(1, 21, 0))],
    );
    assert_eq!(res, vec![shift("a", t(2, 9, 0), t(2, 21, 0))]);
}

#[test]
fn pure_add_is_independent() {
    let res = apply_overrides(
        two_days_of_a(),
        &[ov(Some("b"), None, t(1, 9, 0), t(1, 21, 0))],
    );
    assert_eq!(
        res,
        vec![
            shift("a", t(1, 9, 0), t(1, 21, 0)),
            shift("b", t(1, 9, 0), t(1, 21, 0)),
            shift("a", t(2, 9, 0), t(2, 21, 0)),
        ]
    );
}

#[test]
fn replacement_splits_the_shift() {
    let res = apply_overrides(
        two_days_of_a(),
        &[ov(Some("b"), Some("a"), t(1, 9, 0), t(1, 9, 5))],
    );
    assert_eq!(
        res,
        vec![
            shift("b", t(1, 9, 0), t(1, 9, 5)),
            shift("a", t(1, 9, 5), t(1, 21, 0)),
            shift("a", t(2, 9, 0), t(2, 21, 0)),
        ]
    );
}

#[test]
fn replacement_in_the_middle_leaves_both_sides() {
    let res = apply_overrides(
        vec![shift("a", t(1, 9, 0), t(1, 21, 0))],
        &[ov(Some("b"), Some("a"), t(1, 12, 0), t(1, 13, 0))],
    );
    assert_eq!(
        res,
        vec![
            shift("a", t(1, 9, 0), t(1, 12, 0)),
            shift("b", t(1, 12, 0), t(1, 13, 0)),
            shift("a", t(1, 13, 0), t(1, 21, 0)),
        ]
    );
}

#[test]
fn overlapping_replacements_compose_by_start_time() {
    // fournis à l'envers : b→c ne s'applique qu'une fois a→b posé
    let res = apply_overrides(
        vec![shift("a", t(1, 9, 0), t(1, 21, 0))],
        &[
            ov(Some("c"), Some("b"), t(1, 10, 0), t(1, 11, 0)),
            ov(Some("b"), Some("a"), t(1, 9, 0), t(1, 12, 0)),
        ],
    );
    assert_eq!(
        res,
        vec![
            shift("b", t(1, 9, 0), t(1, 10, 0)),
            shift("c", t(1, 10, 0), t(1, 11, 0)),
            shift("b", t(1, 11, 0), t(1, 12, 0)),
            shift("a", t(1, 12, 0), t(1, 21, 0)),
        ]
    );
}

#[test]
fn removal_of_someone_else_changes_nothing() {
    let res = apply_overrides(
        two_days_of_a(),
        &[ov(Some("c"), Some("z"), t(1, 9, 0), t(1, 21, 0))],
    );
    assert_eq!(res, two_days_of_a());
}

#[test]
fn twelve_hour_rotation_with_several_replacements() {
    let mut shifts = Vec::new();
    let mut start = t(16, 13, 30);
    for i in 0..12 {
        let user = if i % 2 == 0 { "Joey" } else { "Srilekha" };
        shifts.push(shift(user, start, start + Duration::hours(12)));
        start += Duration::hours(12);
    }
    // volontairement dans le désordre
    let overrides = [
        ov(Some("Tom"), Some("Joey"), t(17, 22, 0), t(18, 1, 30)),
        ov(Some("Dyanne"), Some("Joey"), t(20, 13, 30), t(21, 1, 30)),
        ov(Some("Tom"), Some("Joey"), t(19, 19, 0), t(20, 1, 30)),
    ];

    let res = apply_overrides(shifts, &overrides);
    assert_eq!(
        res,
        vec![
            shift("Joey", t(16, 13, 30), t(17, 1, 30)),
            shift("Srilekha", t(17, 1, 30), t(17, 13, 30)),
            shift("Joey", t(17, 13, 30), t(17, 22, 0)),
            shift("Tom", t(17, 22, 0), t(18, 1, 30)),
            shift("Srilekha", t(18, 1, 30), t(18, 13, 30)),
            shift("Joey", t(18, 13, 30), t(19, 1, 30)),
            shift("Srilekha", t(19, 1, 30), t(19, 13, 30)),
            shift("Joey", t(19, 13, 30), t(19, 19, 0)),
            shift("Tom", t(19, 19, 0), t(20, 1, 30)),
            shift("Srilekha", t(20, 1, 30), t(20, 13, 30)),
            shift("Dyanne", t(20, 13, 30), t(21, 1, 30)),
            shift("Srilekha", t(21, 1, 30), t(21, 13, 30)),
            shift("Joey", t(21, 13, 30), t(22, 1, 30)),
            shift("Srilekha", t(22, 1, 30), t(22, 13, 30)),
        ]
    );
}

#[test]
fn replacements_conserve_covered_time() {
    let shifts = vec![
        shift("a", t(1, 0, 0), t(1, 8, 0)),
        shift("b", t(1, 8, 0), t(1, 16, 0)),
        shift("a", t(1, 16, 0), t(2, 0, 0)),
    ];
    let overrides = [
        ov(Some("c"), Some("a"), t(1, 6, 0), t(1, 18, 0)),
        ov(Some("d"), Some("b"), t(1, 10, 0), t(1, 11, 0)),
    ];
    let total = |s: &[Shift]| s.iter().map(Shift::duration_minutes).sum::<i64>();

    let res = apply_overrides(shifts.clone(), &overrides);
    assert_eq!(total(&res), total(&shifts));
    assert!(res.iter().all(|s| s.start < s.end));
    assert!(res
        .iter()
        .filter(|s| s.user_id == UserId::new("a"))
        .all(|s| s.end <= t(1, 6, 0) || s.start >= t(1, 18, 0)));
}

#[test]
fn invalid_overrides_are_rejected() {
    let s = ScheduleId::new("sched");
    assert!(UserOverride::new(s.clone(), Some(UserId::new("a")), None, t(1, 9, 0), t(1, 9, 0)).is_err());
    assert!(UserOverride::new(s, None, None, t(1, 9, 0), t(1, 10, 0)).is_err());
}
