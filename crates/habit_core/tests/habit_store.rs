use chrono::NaiveDate;
use habit_core::db::{open_db, open_db_in_memory};
use habit_core::{
    start_of_week, DayBucket, FixedClock, HabitCategory, HabitStore, HabitStoreError, NewHabit,
    ProgressStatus, SqliteHabitRepository, MAX_HABITS_PER_WEEK,
};
use rusqlite::Connection;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn jan(d: u32) -> NaiveDate {
    date(2024, 1, d)
}

fn store_at(
    conn: &Connection,
    today: NaiveDate,
) -> HabitStore<SqliteHabitRepository<'_>, FixedClock> {
    let repo = SqliteHabitRepository::try_new(conn).unwrap();
    HabitStore::load(repo, FixedClock::new(today)).unwrap()
}

#[test]
fn weekly_capacity_scenario() {
    let conn = open_db_in_memory().unwrap();
    let mut store = store_at(&conn, jan(3));

    let read = store
        .add_habit(
            NewHabit::new("Read", "Read 10 pages").with_category(HabitCategory::Learning),
            jan(3),
        )
        .unwrap();
    assert_eq!(read.week_of.monday(), jan(1));

    let habits = store.habits_for_week(jan(5));
    assert_eq!(habits.len(), 1);
    assert_eq!(habits[0].title, "Read");
    assert_eq!(habits[0].category, HabitCategory::Learning);
    assert_eq!(habits[0].sub_habits.len(), 1);
    assert_eq!(habits[0].sub_habits[0].target, 1);

    store
        .add_habit(NewHabit::new("Run", "5k").with_category(HabitCategory::BodySport), jan(1))
        .unwrap();
    store.add_habit(NewHabit::new("Tidy", "Desk"), jan(7)).unwrap();
    assert_eq!(store.remaining_capacity(jan(2)), 0);

    let err = store
        .add_habit(NewHabit::new("Cook", "Dinner"), jan(4))
        .unwrap_err();
    assert!(matches!(
        err,
        HabitStoreError::CapacityExceeded { week, limit }
            if week == start_of_week(jan(4)) && limit == MAX_HABITS_PER_WEEK
    ));

    let titles: Vec<_> = store
        .habits_for_week(jan(2))
        .iter()
        .map(|habit| habit.title.as_str())
        .collect();
    assert_eq!(titles, ["Read", "Run", "Tidy"]);

    let persisted: i64 = conn
        .query_row("SELECT COUNT(*) FROM habits;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(persisted, 3);
}

#[test]
fn next_week_starts_with_fresh_capacity() {
    let conn = open_db_in_memory().unwrap();
    let mut store = store_at(&conn, jan(3));
    for title in ["A", "B", "C"] {
        store.add_habit(NewHabit::new(title, "step"), jan(3)).unwrap();
    }

    assert!(store.habits_for_week(jan(8)).is_empty());
    assert_eq!(store.remaining_capacity(jan(8)), MAX_HABITS_PER_WEEK);
    store.add_habit(NewHabit::new("D", "step"), jan(8)).unwrap();
    assert_eq!(store.habits_for_week(jan(14)).len(), 1);
    assert_eq!(store.habits_for_week(jan(7)).len(), 3);
}

#[test]
fn increment_past_target_keeps_counting() {
    let conn = open_db_in_memory().unwrap();
    let mut store = store_at(&conn, jan(3));
    let habit = store
        .add_habit(NewHabit::new("Water", "Glasses").with_target(3), jan(3))
        .unwrap();
    let sub_id = habit.sub_habits[0].id;

    store.increment(sub_id, jan(3)).unwrap();
    store.increment(sub_id, jan(3)).unwrap();
    assert_eq!(
        store.sub_habit_status(sub_id, jan(3)).unwrap(),
        ProgressStatus::InProgress
    );
    store.increment(sub_id, jan(3)).unwrap();
    assert_eq!(
        store.sub_habit_status(sub_id, jan(3)).unwrap(),
        ProgressStatus::Completed
    );

    let record = store.increment(sub_id, jan(3)).unwrap();
    assert_eq!(record.count, 4);
    assert_eq!(store.sub_habit_progress(sub_id, jan(3)), 4);
    assert_eq!(
        store.sub_habit_status(sub_id, jan(3)).unwrap(),
        ProgressStatus::Completed
    );
}

#[test]
fn set_progress_overwrites_instead_of_adding() {
    let conn = open_db_in_memory().unwrap();
    let mut store = store_at(&conn, jan(3));
    let habit = store.add_habit(NewHabit::new("Read", "Pages"), jan(3)).unwrap();
    let sub_id = habit.sub_habits[0].id;

    let first = store.set_progress(sub_id, jan(3), 5).unwrap();
    assert_eq!(store.sub_habit_progress(sub_id, jan(3)), 5);
    let second = store.set_progress(sub_id, jan(3), 2).unwrap();
    assert_eq!(store.sub_habit_progress(sub_id, jan(3)), 2);
    assert_eq!(first.id, second.id);

    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM habit_progress;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn progress_is_bucketed_per_day() {
    let conn = open_db_in_memory().unwrap();
    let mut store = store_at(&conn, jan(3));
    let habit = store.add_habit(NewHabit::new("Read", "Pages"), jan(3)).unwrap();
    let sub_id = habit.sub_habits[0].id;

    let morning = jan(3).and_hms_opt(7, 0, 0).unwrap();
    let evening = jan(3).and_hms_opt(22, 30, 0).unwrap();
    store.increment(sub_id, morning).unwrap();
    store.increment(sub_id, evening).unwrap();

    assert_eq!(store.sub_habit_progress(sub_id, jan(3)), 2);
    assert_eq!(store.sub_habit_progress(sub_id, jan(4)), 0);
    assert_eq!(store.sub_habit_progress(Uuid::new_v4(), jan(3)), 0);
}

#[test]
fn missed_day_flips_to_completed_after_backfill() {
    let conn = open_db_in_memory().unwrap();
    let mut store = store_at(&conn, jan(5));
    let habit = store.add_habit(NewHabit::new("Read", "Pages"), jan(2)).unwrap();
    let sub_id = habit.sub_habits[0].id;

    assert_eq!(
        store.sub_habit_status(sub_id, jan(2)).unwrap(),
        ProgressStatus::Missed
    );
    assert_eq!(
        store.habit_status(habit.id, jan(2)).unwrap(),
        ProgressStatus::Missed
    );
    assert_eq!(
        store.sub_habit_status(sub_id, jan(5)).unwrap(),
        ProgressStatus::InProgress
    );
    assert_eq!(
        store.sub_habit_status(sub_id, jan(6)).unwrap(),
        ProgressStatus::InProgress
    );

    store.set_progress(sub_id, jan(2), 1).unwrap();
    assert_eq!(
        store.sub_habit_status(sub_id, jan(2)).unwrap(),
        ProgressStatus::Completed
    );
    assert_eq!(
        store.habit_status(habit.id, jan(2)).unwrap(),
        ProgressStatus::Completed
    );
}

#[test]
fn habit_status_and_progress_aggregate_sub_habits() {
    let conn = open_db_in_memory().unwrap();
    let mut store = store_at(&conn, jan(3));
    let habit = store
        .add_habit(NewHabit::new("Fitness", "Push-ups").with_target(2), jan(3))
        .unwrap();
    let push_ups = habit.sub_habits[0].id;
    let squats = store.add_sub_habit(habit.id, "Squats", 3, jan(3)).unwrap().id;
    let plank = store.add_sub_habit(habit.id, "Plank", 1, jan(4)).unwrap().id;

    let habit = store.habit(habit.id).unwrap().clone();
    let order: Vec<_> = habit.sub_habits.iter().map(|sub| sub.id).collect();
    assert_eq!(order, [push_ups, squats, plank]);

    store.set_progress(push_ups, jan(3), 2).unwrap();
    store.set_progress(squats, jan(3), 3).unwrap();
    assert_eq!(store.habit_progress(habit.id, jan(3)).unwrap(), 5);
    assert_eq!(
        store.habit_status(habit.id, jan(3)).unwrap(),
        ProgressStatus::InProgress
    );
    assert!(!store.day_completed(jan(3)));

    store.increment(plank, jan(3)).unwrap();
    let expected: u32 = habit
        .sub_habits
        .iter()
        .map(|sub| store.sub_habit_progress(sub.id, jan(3)))
        .sum();
    assert_eq!(store.habit_progress(habit.id, jan(3)).unwrap(), expected);
    assert_eq!(
        store.habit_status(habit.id, jan(3)).unwrap(),
        ProgressStatus::Completed
    );
    assert!(store.day_completed(jan(3)));
    assert!(!store.day_completed(jan(4)));
}

#[test]
fn rename_and_add_sub_habit_are_scoped_to_the_week() {
    let conn = open_db_in_memory().unwrap();
    let mut store = store_at(&conn, jan(3));
    let habit = store.add_habit(NewHabit::new("Read", "Pages"), jan(3)).unwrap();

    store.rename_habit(habit.id, "  Study   hard ", jan(6)).unwrap();
    assert_eq!(store.habit(habit.id).unwrap().title, "Study hard");

    assert!(matches!(
        store.rename_habit(habit.id, "Later", jan(10)),
        Err(HabitStoreError::HabitNotFound(id)) if id == habit.id
    ));
    assert!(matches!(
        store.add_sub_habit(Uuid::new_v4(), "Notes", 1, jan(3)),
        Err(HabitStoreError::HabitNotFound(_))
    ));
    assert!(matches!(
        store.rename_habit(habit.id, "   ", jan(3)),
        Err(HabitStoreError::Validation(_))
    ));
    assert!(matches!(
        store.add_sub_habit(habit.id, "Notes", 0, jan(3)),
        Err(HabitStoreError::Validation(_))
    ));
    assert_eq!(store.habit(habit.id).unwrap().title, "Study hard");
    assert_eq!(store.habit(habit.id).unwrap().sub_habits.len(), 1);
}

#[test]
fn unknown_ids_are_reported() {
    let conn = open_db_in_memory().unwrap();
    let mut store = store_at(&conn, jan(3));
    let missing = Uuid::new_v4();

    assert!(matches!(
        store.set_progress(missing, jan(3), 1),
        Err(HabitStoreError::SubHabitNotFound(id)) if id == missing
    ));
    assert!(matches!(
        store.sub_habit_status(missing, jan(3)),
        Err(HabitStoreError::SubHabitNotFound(_))
    ));
    assert!(matches!(
        store.habit_status(missing, jan(3)),
        Err(HabitStoreError::HabitNotFound(_))
    ));
    assert!(matches!(
        store.habit_progress(missing, jan(3)),
        Err(HabitStoreError::HabitNotFound(_))
    ));
}

#[test]
fn month_overview_marks_completed_days() {
    let conn = open_db_in_memory().unwrap();
    let mut store = store_at(&conn, date(2024, 2, 20));
    let habit = store
        .add_habit(NewHabit::new("Read", "Pages"), date(2024, 1, 31))
        .unwrap();
    let sub_id = habit.sub_habits[0].id;
    store.increment(sub_id, date(2024, 2, 1)).unwrap();
    store.increment(sub_id, date(2024, 2, 3)).unwrap();

    let overview = store.month_overview(date(2024, 2, 14));
    assert_eq!(overview.len(), 29);
    let completed: Vec<DayBucket> = overview
        .iter()
        .filter(|day| day.completed)
        .map(|day| day.day)
        .collect();
    assert_eq!(
        completed,
        [DayBucket::from(date(2024, 2, 1)), DayBucket::from(date(2024, 2, 3))]
    );
}

#[test]
fn reload_restores_habits_order_and_progress() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("habits.db");

    let (read_id, pages_id, notes_id) = {
        let conn = open_db(&path).unwrap();
        let mut store = store_at(&conn, jan(3));
        let read = store
            .add_habit(NewHabit::new("Read", "Pages").with_target(2), jan(3))
            .unwrap();
        store.add_habit(NewHabit::new("Run", "5k"), jan(3)).unwrap();
        let notes = store.add_sub_habit(read.id, "Notes", 1, jan(3)).unwrap();
        store.rename_habit(read.id, "Deep reading", jan(3)).unwrap();
        store.set_progress(read.sub_habits[0].id, jan(3), 2).unwrap();
        store.increment(notes.id, jan(3)).unwrap();
        (read.id, read.sub_habits[0].id, notes.id)
    };

    let conn = open_db(&path).unwrap();
    let store = store_at(&conn, jan(3));
    let habits = store.habits_for_week(jan(3));
    assert_eq!(habits.len(), 2);
    assert_eq!(habits[0].id, read_id);
    assert_eq!(habits[0].title, "Deep reading");
    assert_eq!(habits[1].title, "Run");
    let sub_ids: Vec<_> = habits[0].sub_habits.iter().map(|sub| sub.id).collect();
    assert_eq!(sub_ids, [pages_id, notes_id]);
    assert_eq!(store.sub_habit_progress(pages_id, jan(3)), 2);
    assert_eq!(store.habit_progress(read_id, jan(3)).unwrap(), 3);
    assert_eq!(
        store.habit_status(read_id, jan(3)).unwrap(),
        ProgressStatus::Completed
    );
}
