#![forbid(unsafe_code)]
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use tour_de_garde::{Rule, ScheduleId, Target, UserId, WeekdayFilter};

fn at(m: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2017, m, d, h, mi, 0).unwrap()
}

fn rule(weekdays: WeekdayFilter, start: (u32, u32), end: (u32, u32)) -> Rule {
    Rule::new(
        ScheduleId::new("sched"),
        weekdays,
        NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
        NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        Target::User(UserId::new("u")),
    )
}

fn days(d: &[Weekday]) -> WeekdayFilter {
    WeekdayFilter::from_days(d)
}

const MF: WeekdayFilter = WeekdayFilter::new([false, true, true, true, true, true, false]);

fn check_active(r: &Rule, cases: &[(DateTime<Utc>, bool)]) {
    for (t, expected) in cases {
        assert_eq!(r.is_active(*t, Tz::UTC), *expected, "{r} at {t}");
    }
}

fn check_start(r: &Rule, cases: &[(DateTime<Utc>, DateTime<Utc>)]) {
    for (t, expected) in cases {
        assert_eq!(r.start_time(*t, Tz::UTC), Some(*expected), "{r} from {t}");
    }
}

fn check_end(r: &Rule, cases: &[(DateTime<Utc>, DateTime<Utc>)]) {
    for (t, expected) in cases {
        assert_eq!(r.end_time(*t, Tz::UTC), Some(*expected), "{r} from {t}");
    }
}

// le 24 juillet 2017 est un lundi

#[test]
fn is_active_day_window() {
    let r = rule(days(&[Weekday::Mon]), (8, 0), (20, 0));
    check_active(
        &r,
        &[
            (at(7, 20, 8, 0), false),
            (at(7, 25, 8, 0), false),
            (at(7, 24, 8, 0), true),
            (at(7, 24, 20, 0), false),
            (at(7, 24, 9, 0), true),
        ],
    );
}

#[test]
fn is_active_overnight_window() {
    let r = rule(days(&[Weekday::Mon]), (20, 0), (8, 0));
    check_active(
        &r,
        &[
            (at(7, 20, 8, 0), false),
            (at(7, 26, 8, 0), false),
            (at(7, 24, 20, 0), true),
            (at(7, 25, 8, 0), false),
            (at(7, 24, 9, 0), false),
            (at(7, 24, 21, 0), true),
            (at(7, 25, 7, 0), true),
        ],
    );
}

#[test]
fn is_active_weekdays_only() {
    let r = rule(MF, (8, 0), (20, 0));
    check_active(
        &r,
        &[
            (at(7, 23, 8, 0), false),
            (at(7, 24, 8, 0), true),
            (at(7, 25, 8, 0), true),
            (at(7, 26, 8, 0), true),
            (at(7, 27, 8, 0), true),
            (at(7, 28, 8, 0), true),
            (at(7, 29, 8, 0), false),
        ],
    );
}

#[test]
fn is_active_contiguous_days() {
    let r = rule(MF, (8, 0), (8, 0));
    check_active(
        &r,
        &[
            (at(7, 23, 8, 0), false),
            (at(7, 24, 7, 0), false),
            (at(7, 24, 8, 0), true),
            (at(7, 25, 8, 0), true),
            (at(7, 26, 8, 0), true),
            (at(7, 27, 8, 0), true),
            (at(7, 28, 8, 0), true),
            (at(7, 29, 7, 0), true),
            (at(7, 29, 8, 0), false),
        ],
    );
}

#[test]
fn is_active_weekday_overnight() {
    let r = rule(MF, (20, 0), (8, 0));
    check_active(
        &r,
        &[
            (at(7, 23, 20, 0), false),
            (at(7, 24, 7, 0), false),
            (at(7, 24, 20, 0), true),
            (at(7, 25, 7, 0), true),
            (at(7, 27, 20, 0), true),
            (at(7, 28, 7, 0), true),
            (at(7, 28, 20, 0), true),
            (at(7, 29, 7, 0), true),
            (at(7, 29, 20, 0), false),
            (at(7, 30, 7, 0), false),
        ],
    );
}

#[test]
fn always_and_never() {
    let always = Rule::always(ScheduleId::new("s"), Target::User(UserId::new("u")));
    assert!(always.always_active());
    assert!(always.is_active(at(7, 1, 3, 0), Tz::UTC));
    assert_eq!(always.start_time(at(7, 1, 3, 0), Tz::UTC), None);

    let never = rule(WeekdayFilter::never(), (8, 0), (20, 0));
    assert!(never.never_active());
    assert!(!never.is_active(at(7, 24, 9, 0), Tz::UTC));
    assert_eq!(never.end_time(at(7, 24, 9, 0), Tz::UTC), None);
}

#[test]
fn start_time_single_day() {
    let r = rule(days(&[Weekday::Mon, Weekday::Tue]), (8, 0), (20, 0));
    check_start(&r, &[(at(7, 25, 8, 0), at(7, 25, 8, 0))]);

    let r = rule(days(&[Weekday::Mon]), (8, 0), (20, 0));
    check_start(
        &r,
        &[
            (at(7, 20, 8, 0), at(7, 24, 8, 0)),
            (at(7, 24, 7, 59), at(7, 24, 8, 0)),
            (at(7, 24, 8, 0), at(7, 24, 8, 0)),
            (at(7, 24, 8, 1), at(7, 24, 8, 0)),
            (at(7, 24, 19, 59), at(7, 24, 8, 0)),
            (at(7, 24, 20, 0), at(7, 31, 8, 0)),
            (at(7, 24, 20, 1), at(7, 31, 8, 0)),
        ],
    );
}

#[test]
fn start_time_skips_inactive_days() {
    let r = rule(
        days(&[Weekday::Fri, Weekday::Sat, Weekday::Mon]),
        (8, 0),
        (20, 0),
    );
    check_start(
        &r,
        &[
            (at(7, 21, 20, 0), at(7, 22, 8, 0)),
            (at(7, 22, 20, 0), at(7, 24, 8, 0)),
            (at(7, 24, 20, 0), at(7, 28, 8, 0)),
            (at(7, 25, 20, 0), at(7, 28, 8, 0)),
        ],
    );
}

#[test]
fn start_time_contiguous_run() {
    let r = rule(days(&[Weekday::Mon, Weekday::Tue]), (8, 0), (8, 0));
    check_start(
        &r,
        &[
            (at(7, 20, 8, 0), at(7, 24, 8, 0)),
            (at(7, 24, 7, 59), at(7, 24, 8, 0)),
            (at(7, 24, 8, 0), at(7, 24, 8, 0)),
            (at(7, 24, 19, 59), at(7, 24, 8, 0)),
            (at(7, 24, 20, 0), at(7, 24, 8, 0)),
            (at(7, 25, 20, 1), at(7, 24, 8, 0)),
            (at(7, 26, 7, 59), at(7, 24, 8, 0)),
            (at(7, 26, 20, 0), at(7, 31, 8, 0)),
        ],
    );
}

#[test]
fn start_time_every_day_and_overnight() {
    let r = rule(WeekdayFilter::every_day(), (8, 0), (20, 0));
    check_start(
        &r,
        &[
            (at(7, 20, 8, 0), at(7, 20, 8, 0)),
            (at(7, 24, 7, 59), at(7, 24, 8, 0)),
            (at(7, 24, 19, 59), at(7, 24, 8, 0)),
            (at(7, 24, 20, 0), at(7, 25, 8, 0)),
        ],
    );

    let r = rule(days(&[Weekday::Mon]), (20, 0), (8, 0));
    check_start(
        &r,
        &[
            (at(7, 24, 20, 0), at(7, 24, 20, 0)),
            (at(7, 25, 7, 0), at(7, 24, 20, 0)),
            (at(7, 25, 8, 0), at(7, 31, 20, 0)),
        ],
    );
}

#[test]
fn end_time_cases() {
    let r = rule(days(&[Weekday::Mon]), (8, 0), (20, 0));
    check_end(
        &r,
        &[
            (at(7, 24, 8, 0), at(7, 24, 20, 0)),
            (at(7, 20, 8, 0), at(7, 24, 20, 0)),
            (at(7, 24, 20, 0), at(7, 31, 20, 0)),
        ],
    );

    let r = rule(days(&[Weekday::Mon, Weekday::Tue]), (8, 0), (20, 0));
    check_end(
        &r,
        &[
            (at(7, 24, 20, 0), at(7, 25, 20, 0)),
            (at(7, 25, 8, 0), at(7, 25, 20, 0)),
        ],
    );

    let r = rule(days(&[Weekday::Mon, Weekday::Tue]), (8, 0), (8, 0));
    check_end(
        &r,
        &[
            (at(7, 24, 8, 0), at(7, 26, 8, 0)),
            (at(7, 20, 8, 0), at(7, 26, 8, 0)),
            (at(7, 24, 20, 0), at(7, 26, 8, 0)),
            (at(7, 25, 8, 0), at(7, 26, 8, 0)),
        ],
    );

    let r = rule(days(&[Weekday::Mon]), (20, 0), (8, 0));
    check_end(
        &r,
        &[
            (at(7, 24, 8, 0), at(7, 25, 8, 0)),
            (at(7, 25, 8, 0), at(8, 1, 8, 0)),
            (at(7, 20, 8, 0), at(7, 25, 8, 0)),
        ],
    );

    let r = rule(WeekdayFilter::every_day(), (20, 0), (8, 0));
    check_end(
        &r,
        &[
            (at(7, 20, 8, 0), at(7, 21, 8, 0)),
            (at(7, 24, 20, 0), at(7, 25, 8, 0)),
        ],
    );
}

#[test]
fn times_are_truncated_to_the_minute() {
    let r = rule(days(&[Weekday::Mon]), (8, 0), (20, 0));
    let t = at(7, 24, 19, 59) + chrono::Duration::seconds(59);
    assert!(r.is_active(t, Tz::UTC));

    let precise = Rule::new(
        ScheduleId::new("s"),
        WeekdayFilter::every_day(),
        NaiveTime::from_hms_opt(8, 30, 45).unwrap(),
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        Target::User(UserId::new("u")),
    );
    assert_eq!(precise.start, NaiveTime::from_hms_opt(8, 30, 0).unwrap());
}

#[test]
fn windows_follow_local_wall_clock() {
    let chicago: Tz = chrono_tz::America::Chicago;
    let r = rule(WeekdayFilter::every_day(), (9, 0), (17, 0));
    // 9h locales = 15h UTC en hiver, 14h UTC en été
    let winter = Utc.with_ymd_and_hms(2017, 3, 10, 12, 0, 0).unwrap();
    let summer = Utc.with_ymd_and_hms(2017, 3, 13, 12, 0, 0).unwrap();
    assert_eq!(
        r.start_time(winter, chicago),
        Some(Utc.with_ymd_and_hms(2017, 3, 10, 15, 0, 0).unwrap())
    );
    assert_eq!(
        r.start_time(summer, chicago),
        Some(Utc.with_ymd_and_hms(2017, 3, 13, 14, 0, 0).unwrap())
    );
}

#[test]
fn weekday_filter_run_start_and_next_inactive() {
    let f = WeekdayFilter::new([true, true, false, true, true, true, true]);
    let d = |m, day| NaiveDate::from_ymd_opt(2020, m, day).unwrap();

    assert_eq!(f.run_start(d(10, 30)), Some(d(10, 28)));
    assert_eq!(f.run_start(d(11, 1)), Some(d(10, 28)));
    assert_eq!(f.run_start(d(11, 3)), Some(d(11, 4)));

    assert_eq!(f.next_inactive(d(11, 1)), Some(d(11, 3)));
    assert_eq!(f.next_inactive(d(11, 3)), Some(d(11, 10)));
    assert_eq!(f.next_inactive(d(11, 4)), Some(d(11, 10)));

    assert_eq!(WeekdayFilter::every_day().next_inactive(d(11, 4)), None);
    assert_eq!(WeekdayFilter::never().next_active(d(11, 4)), None);
}

#[test]
fn weekday_filter_display() {
    let f = |days: [bool; 7]| WeekdayFilter::new(days).to_string();
    assert_eq!(WeekdayFilter::every_day().to_string(), "every day");
    assert_eq!(WeekdayFilter::never().to_string(), "never");
    assert_eq!(f([true, false, false, false, false, false, true]), "weekends");
    assert_eq!(MF.to_string(), "M-F");
    assert_eq!(f([true, true, false, false, false, true, false]), "Sun,Mon,Fri");
    assert_eq!(f([false, true, true, true, false, true, false]), "Mon-Wed,Fri");
}

#[test]
fn rule_display() {
    assert_eq!(rule(MF, (8, 0), (20, 0)).to_string(), "8am-8pm M-F");
    assert_eq!(
        rule(WeekdayFilter::every_day(), (9, 30), (17, 0)).to_string(),
        "9:30am-5pm every day"
    );
    assert_eq!(
        rule(WeekdayFilter::never(), (8, 0), (20, 0)).to_string(),
        "Never"
    );
    assert_eq!(
        Rule::always(ScheduleId::new("s"), Target::User(UserId::new("u"))).to_string(),
        "Always"
    );
}

#[test]
fn rule_round_trips_through_json() {
    let r = rule(MF, (20, 0), (8, 0));
    let json = serde_json::to_string(&r).unwrap();
    let back: Rule = serde_json::from_str(&json).unwrap();
    assert_eq!(back, r);
}
