use chrono::{NaiveDate, NaiveDateTime};
use reminders::database::SCHEMA_VERSION;
use reminders::repository::{FixedClock, RepositoryError};
use reminders::{Database, Task, TaskRepository, TimeCategory};
use rusqlite::Connection;

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

fn task(title: &str, date: Option<&str>, timestamp: i64) -> Task {
    let mut task = Task::new(title.to_string());
    task.date = date.map(str::to_string);
    task.timestamp = timestamp;
    task
}

#[test]
fn save_and_get_roundtrip() {
    let clock = FixedClock::new(at(2024, 3, 15, 9, 0));
    let repo = TaskRepository::with_clock(Database::open_in_memory().unwrap(), &clock, 12);

    let mut original = task("Call mom", Some("2024-03-15"), 1);
    original.notes = Some("about the weekend".to_string());
    original.time = Some("18:30".to_string());
    original.refresh_time_category();
    original.flag = true;
    let id = repo.save_task(&original).unwrap();

    let loaded = repo.get(id).unwrap().unwrap();
    assert_eq!(loaded.id, id);
    assert_eq!(loaded.title, "Call mom");
    assert_eq!(loaded.notes.as_deref(), Some("about the weekend"));
    assert_eq!(loaded.time_category, Some(TimeCategory::Tonight));
    assert!(loaded.flag);
    assert!(!loaded.is_completed);
}

#[test]
fn explicit_duplicate_id_is_rejected() {
    let repo = TaskRepository::new(Database::open_in_memory().unwrap(), 12);
    let id = repo.save_task(&task("first", None, 1)).unwrap();

    let mut clash = task("second", None, 2);
    clash.id = id;
    let err = repo.save_task(&clash).unwrap_err();
    assert!(matches!(err, RepositoryError::DuplicateId(dup) if dup == id));
    assert_eq!(repo.all().unwrap().len(), 1);
}

#[test]
fn completion_sets_and_clears_completed_date() {
    let clock = FixedClock::new(at(2024, 3, 15, 9, 5));
    let repo = TaskRepository::with_clock(Database::open_in_memory().unwrap(), &clock, 12);
    let id = repo.save_task(&task("Pay rent", None, 1)).unwrap();

    repo.set_completion(id, true).unwrap();
    let done = repo.get(id).unwrap().unwrap();
    assert!(done.is_completed);
    assert_eq!(done.date_completed.as_deref(), Some("2024-03-15 09:05:00"));

    repo.set_completion(id, false).unwrap();
    let reopened = repo.get(id).unwrap().unwrap();
    assert!(!reopened.is_completed);
    assert_eq!(reopened.date_completed, None);
}

#[test]
fn missing_ids_report_not_found() {
    let repo = TaskRepository::new(Database::open_in_memory().unwrap(), 12);
    assert!(matches!(repo.set_completion(42, true), Err(RepositoryError::NotFound(42))));
    assert!(matches!(repo.delete_task(42), Err(RepositoryError::NotFound(42))));
    let mut ghost = task("ghost", None, 1);
    ghost.id = 42;
    assert!(matches!(repo.update_task(&ghost), Err(RepositoryError::NotFound(42))));
    assert!(repo.get(42).unwrap().is_none());
}

#[test]
fn lists_are_ordered_by_creation_timestamp() {
    let repo = TaskRepository::new(Database::open_in_memory().unwrap(), 12);
    repo.save_task(&task("third", None, 300)).unwrap();
    repo.save_task(&task("first", None, 100)).unwrap();
    repo.save_task(&task("second", None, 200)).unwrap();

    let titles: Vec<String> = repo.incomplete().unwrap().into_iter().map(|t| t.title).collect();
    assert_eq!(titles, vec!["first", "second", "third"]);
}

#[test]
fn delete_completed_keeps_open_tasks() {
    let repo = TaskRepository::new(Database::open_in_memory().unwrap(), 12);
    let done = repo.save_task(&task("done", None, 1)).unwrap();
    repo.save_task(&task("open", None, 2)).unwrap();
    repo.set_completion(done, true).unwrap();

    assert_eq!(repo.delete_completed().unwrap(), 1);
    let remaining = repo.all().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].title, "open");
    assert_eq!(repo.delete_all().unwrap(), 1);
    assert!(repo.all().unwrap().is_empty());
}

#[test]
fn title_search_is_case_insensitive_and_literal() {
    let repo = TaskRepository::new(Database::open_in_memory().unwrap(), 12);
    repo.save_task(&task("Buy Milk", None, 1)).unwrap();
    repo.save_task(&task("100% done", None, 2)).unwrap();
    repo.save_task(&task("walk dog", None, 3)).unwrap();

    assert_eq!(repo.by_title("milk").unwrap().len(), 1);
    assert_eq!(repo.by_title("%").unwrap().len(), 1);
    assert_eq!(repo.count_by_title("").unwrap(), 3);
}

#[test]
fn counts_follow_the_clock() {
    let clock = FixedClock::new(at(2024, 3, 15, 9, 0));
    let repo = TaskRepository::with_clock(Database::open_in_memory().unwrap(), &clock, 2);
    repo.save_task(&task("today", Some("2024-03-15"), 1)).unwrap();
    repo.save_task(&task("next month", Some("2024-04-20"), 2)).unwrap();
    repo.save_task(&task("too far", Some("2024-09-01"), 3)).unwrap();
    let mut flagged = task("flagged", None, 4);
    flagged.flag = true;
    repo.save_task(&flagged).unwrap();
    let done = repo.save_task(&task("done today", Some("2024-03-15"), 5)).unwrap();
    repo.set_completion(done, true).unwrap();

    let counts = repo.counts().unwrap();
    assert_eq!(counts.today, 1);
    assert_eq!(counts.scheduled, 2);
    assert_eq!(counts.flagged, 1);
    assert_eq!(counts.incomplete, 4);
    assert_eq!(counts.completed, 1);
    assert_eq!(counts.total, 5);

    clock.set(at(2024, 4, 20, 8, 0));
    let counts = repo.counts().unwrap();
    assert_eq!(counts.today, 1);
    assert_eq!(repo.today().unwrap()[0].title, "next month");
}

#[test]
fn subscribers_get_a_snapshot_per_mutation() {
    let repo = TaskRepository::new(Database::open_in_memory().unwrap(), 12);
    let rx = repo.subscribe().unwrap();
    assert_eq!(rx.try_recv().unwrap().total, 0);

    let id = repo.save_task(&task("one", None, 1)).unwrap();
    assert_eq!(rx.try_recv().unwrap().incomplete, 1);

    repo.set_completion(id, true).unwrap();
    let counts = rx.try_recv().unwrap();
    assert_eq!(counts.incomplete, 0);
    assert_eq!(counts.completed, 1);
    assert!(rx.try_recv().is_err());
}

#[test]
fn dropped_subscribers_do_not_block_publishing() {
    let repo = TaskRepository::new(Database::open_in_memory().unwrap(), 12);
    let dropped = repo.subscribe().unwrap();
    drop(dropped);
    let live = repo.subscribe().unwrap();
    let _ = live.try_recv();

    repo.save_task(&task("one", None, 1)).unwrap();
    assert_eq!(live.try_recv().unwrap().total, 1);
}

#[test]
fn outdated_schema_is_reset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reminders.db");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE tasks (id INTEGER PRIMARY KEY, name TEXT);
             INSERT INTO tasks (name) VALUES ('legacy');
             PRAGMA user_version = 1;",
        )
        .unwrap();
    }

    let db = Database::new(&path).unwrap();
    let version: i64 = db
        .conn()
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, SCHEMA_VERSION);

    let repo = TaskRepository::new(db, 12);
    assert!(repo.all().unwrap().is_empty());
    repo.save_task(&task("fresh", None, 1)).unwrap();
    assert_eq!(repo.all().unwrap().len(), 1);
}

#[test]
fn database_file_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("reminders.db");
    let id = {
        let repo = TaskRepository::new(Database::new(&path).unwrap(), 12);
        repo.save_task(&task("persisted", Some("2030-01-01"), 1)).unwrap()
    };

    let repo = TaskRepository::new(Database::new(&path).unwrap(), 12);
    let loaded = repo.get(id).unwrap().unwrap();
    assert_eq!(loaded.title, "persisted");
}
