use habit_core::db::migrations::latest_version;
use habit_core::db::{open_db, open_db_in_memory, DbError};
use habit_core::{RepoError, SqliteDiaryRepository, SqliteHabitRepository};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in ["habits", "sub_habits", "habit_progress", "diary_entries"] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("habits.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "habits");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn repositories_refuse_unmigrated_connections() {
    let conn = Connection::open_in_memory().unwrap();

    assert!(matches!(
        SqliteHabitRepository::try_new(&conn),
        Err(RepoError::MissingRequiredTable("habits"))
    ));
    assert!(matches!(
        SqliteDiaryRepository::try_new(&conn),
        Err(RepoError::MissingRequiredTable("diary_entries"))
    ));
}

#[test]
fn progress_rows_are_unique_per_sub_habit_and_day() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO habits (uuid, title, category, week_of, sort_order)
         VALUES ('h1', 'Read', 'learning', '2024-01-01', 0);
         INSERT INTO sub_habits (uuid, habit_uuid, title, target, position)
         VALUES ('s1', 'h1', 'Pages', 1, 0);
         INSERT INTO habit_progress (uuid, habit_uuid, sub_habit_uuid, day, count)
         VALUES ('p1', 'h1', 's1', '2024-01-03', 1);",
    )
    .unwrap();

    let duplicate = conn.execute(
        "INSERT INTO habit_progress (uuid, habit_uuid, sub_habit_uuid, day, count)
         VALUES ('p2', 'h1', 's1', '2024-01-03', 2);",
        [],
    );
    assert!(duplicate.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
