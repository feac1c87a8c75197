#![forbid(unsafe_code)]
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::fs;
use tempfile::tempdir;
use tour_de_garde::storage::ScheduleStore;
use tour_de_garde::{
    io, Dataset, EngineOptions, JsonStorage, MemoryStore, Rotation, RotationState, RotationType,
    Rule, Schedule, ScheduleId, Shift, Storage, Target, UserId, UserOverride, WeekdayFilter,
};

fn jan(d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap()
}

fn sample() -> Dataset {
    let schedule = Schedule::new("primary", chrono_tz::Europe::Paris);
    let anchor = chrono_tz::Europe::Paris
        .with_ymd_and_hms(2024, 1, 1, 9, 0, 0)
        .unwrap();
    let rot = Rotation::new("ops", RotationType::Weekly, anchor, 1);
    let rule = Rule::new(
        schedule.id.clone(),
        WeekdayFilter::new([false, true, true, true, true, true, false]),
        NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        Target::Rotation(rot.id.clone()),
    );
    let state = RotationState {
        rotation_id: rot.id.clone(),
        shift_start: jan(1, 8),
        position: 0,
        version: 3,
    };
    Dataset {
        schedules: vec![schedule],
        rotations: vec![rot],
        rules: vec![rule],
        states: vec![state],
        ..Dataset::default()
    }
}

#[test]
fn json_storage_roundtrip() {
    let dir = tempdir().unwrap();
    let storage = JsonStorage::open(dir.path().join("dataset.json")).unwrap();
    let data = sample();
    storage.save(&data).unwrap();

    let loaded = storage.load().unwrap();
    assert_eq!(loaded, data);
    assert_eq!(loaded.rotations[0].time_zone, chrono_tz::Europe::Paris);
}

#[test]
fn missing_sections_default_to_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dataset.json");
    fs::write(&path, r#"{"schedules": []}"#).unwrap();
    let loaded = JsonStorage::open(&path).unwrap().load().unwrap();
    assert_eq!(loaded, Dataset::default());
}

#[test]
fn engine_options_defaults_and_validation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("engine.json");

    fs::write(&path, r#"{"sweep_batch_size": 10}"#).unwrap();
    let opts = EngineOptions::load(&path).unwrap();
    assert_eq!(opts.sweep_batch_size, 10);
    assert_eq!(opts.max_iterations, EngineOptions::default().max_iterations);
    assert_eq!(opts.legacy_boundaries_before, None);

    fs::write(&path, r#"{"max_iterations": 0}"#).unwrap();
    assert!(EngineOptions::load(&path).is_err());

    assert!(EngineOptions::load(dir.path().join("absent.json")).is_err());
}

#[test]
fn overrides_are_filtered_by_schedule_and_overlap() {
    let data = sample();
    let schedule = data.schedules[0].id.clone();
    let store = MemoryStore::from_dataset(data);
    let mk = |sched: &ScheduleId, start, end| {
        UserOverride::new(sched.clone(), Some(UserId::new("x")), None, start, end).unwrap()
    };
    store.update(|d| {
        d.overrides.push(mk(&schedule, jan(1, 0), jan(2, 0)));
        d.overrides.push(mk(&schedule, jan(2, 0), jan(3, 0)));
        d.overrides.push(mk(&schedule, jan(5, 0), jan(6, 0)));
        d.overrides.push(mk(&ScheduleId::new("other"), jan(1, 0), jan(9, 0)));
    });

    // bornes exclusives : [1j, 2j) ne chevauche pas [2j, 5j)
    let found = store.user_overrides(&schedule, jan(2, 0), jan(5, 0)).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].start, jan(2, 0));
}

#[test]
fn schedule_data_keeps_only_targeted_rotations() {
    let mut data = sample();
    let anchor = Tz::UTC.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    data.rotations
        .push(Rotation::new("unrelated", RotationType::Daily, anchor, 1));
    let id = data.schedules[0].id.clone();

    let sd = data.schedule_data(&id).unwrap();
    assert_eq!(sd.rotations.len(), 1);
    assert_eq!(sd.rotations[0].name, "ops");
    assert_eq!(sd.states.len(), 1);
    assert!(data.schedule_data(&ScheduleId::new("nope")).is_none());
}

#[test]
fn override_csv_import() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("overrides.csv");
    fs::write(
        &path,
        "add_user,remove_user,start,end\n\
         bob,alice,2024-01-02T12:00:00Z,2024-01-02T14:00:00Z\n\
         ,carol,2024-01-05,2024-01-05\n",
    )
    .unwrap();
    let sched = ScheduleId::new("s");
    let overrides = io::import_overrides_csv(&path, &sched).unwrap();

    assert_eq!(overrides.len(), 2);
    assert_eq!(overrides[0].add_user, Some(UserId::new("bob")));
    assert_eq!(overrides[0].remove_user, Some(UserId::new("alice")));
    assert_eq!(overrides[1].add_user, None);
    // une date de fin couvre toute la journée
    assert_eq!((overrides[1].start, overrides[1].end), (jan(5, 0), jan(6, 0)));
    assert!(overrides.iter().all(|o| o.schedule_id == sched));

    fs::write(&path, "add_user,remove_user,start,end\n,,2024-01-05,2024-01-06\n").unwrap();
    assert!(io::import_overrides_csv(&path, &sched).is_err());
}

#[test]
fn shifts_csv_export() {
    let shifts = vec![
        Shift::new(jan(1, 0), jan(1, 9), UserId::new("alice")),
        Shift::new(jan(1, 9), jan(2, 9), UserId::new("bob")),
    ];
    let mut out = Vec::new();
    io::write_shifts_csv(&mut out, &shifts).unwrap();
    let text = String::from_utf8(out).unwrap();
    insta::assert_snapshot!(text.trim_end(), @r###"
    start,end,user_id,minutes
    2024-01-01T00:00:00+00:00,2024-01-01T09:00:00+00:00,alice,540
    2024-01-01T09:00:00+00:00,2024-01-02T09:00:00+00:00,bob,1440
    "###);
}
