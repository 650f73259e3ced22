use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use reminders::alarm::AlarmScheduler;
use reminders::notification::{CollectingNotifier, NOTIFICATION_HEADING};
use reminders::repository::FixedClock;
use reminders::{Database, NewTask, ServiceError, TaskRepository, TaskService, TimeCategory};

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

fn service(clock: &FixedClock) -> TaskService<&FixedClock> {
    let repo = TaskRepository::with_clock(Database::open_in_memory().unwrap(), clock, 12);
    TaskService::new(repo, NaiveTime::from_hms_opt(11, 0, 0).unwrap())
}

fn new_task(title: &str, date: Option<&str>, time: Option<&str>) -> NewTask {
    NewTask {
        title: title.to_string(),
        date: date.map(str::to_string),
        time: time.map(str::to_string),
        ..NewTask::default()
    }
}

#[test]
fn save_trims_title_and_derives_category() {
    let clock = FixedClock::new(at(2024, 3, 15, 8, 0));
    let mut svc = service(&clock);

    let task = svc
        .save_task(NewTask {
            title: "  Standup  ".to_string(),
            notes: Some("   ".to_string()),
            date: Some("2024-03-15".to_string()),
            time: Some("09:30".to_string()),
            flag: true,
        })
        .unwrap();

    assert!(task.id > 0);
    assert_eq!(task.title, "Standup");
    assert_eq!(task.notes, None);
    assert_eq!(task.time_category, Some(TimeCategory::Morning));
    let local = Local.from_local_datetime(&at(2024, 3, 15, 8, 0)).earliest().unwrap();
    assert_eq!(task.timestamp, local.timestamp_millis());
    assert_eq!(svc.get(task.id).unwrap(), task);
}

#[test]
fn invalid_input_is_rejected_before_storing() {
    let clock = FixedClock::new(at(2024, 3, 15, 8, 0));
    let mut svc = service(&clock);

    assert!(matches!(svc.save_task(new_task("   ", None, None)), Err(ServiceError::EmptyTitle)));
    assert!(matches!(
        svc.save_task(new_task("x", Some("2024-02-30"), None)),
        Err(ServiceError::InvalidDate(_))
    ));
    assert!(matches!(
        svc.save_task(new_task("x", Some("2024-03-16"), Some("25:00"))),
        Err(ServiceError::InvalidTime(_))
    ));
    assert_eq!(svc.counts().unwrap().total, 0);
    assert!(svc.alarms().is_empty());
}

#[test]
fn dated_tasks_get_an_alarm() {
    let clock = FixedClock::new(at(2024, 3, 15, 8, 0));
    let mut svc = service(&clock);

    let timed = svc.save_task(new_task("dentist", Some("2024-03-15"), Some("14:45"))).unwrap();
    let untimed = svc.save_task(new_task("bins", Some("2024-03-16"), None)).unwrap();
    svc.save_task(new_task("someday", None, None)).unwrap();

    let pending = svc.alarms().pending();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].task_id, timed.id);
    assert_eq!(pending[0].at, at(2024, 3, 15, 14, 45));
    assert_eq!(pending[1].task_id, untimed.id);
    assert_eq!(pending[1].at, at(2024, 3, 16, 11, 0));
}

#[test]
fn past_triggers_are_not_queued() {
    let clock = FixedClock::new(at(2024, 3, 15, 12, 0));
    let mut svc = service(&clock);

    svc.save_task(new_task("earlier today", Some("2024-03-15"), Some("09:00"))).unwrap();
    svc.save_task(new_task("exactly now", Some("2024-03-15"), Some("12:00"))).unwrap();
    svc.save_task(new_task("yesterday", Some("2024-03-14"), None)).unwrap();

    assert!(svc.alarms().is_empty());
}

#[test]
fn completion_cancels_and_reopen_restores_alarm() {
    let clock = FixedClock::new(at(2024, 3, 15, 8, 0));
    let mut svc = service(&clock);
    let task = svc.save_task(new_task("call", Some("2024-03-20"), Some("10:00"))).unwrap();

    let done = svc.toggle_completion(task.id, true).unwrap();
    assert!(done.is_completed);
    assert!(done.date_completed.is_some());
    assert!(!svc.alarms().contains(task.id));

    let reopened = svc.toggle_completion(task.id, false).unwrap();
    assert!(!reopened.is_completed);
    assert!(svc.alarms().contains(task.id));
}

#[test]
fn flag_toggles_back_and_forth() {
    let clock = FixedClock::new(at(2024, 3, 15, 8, 0));
    let mut svc = service(&clock);
    let task = svc.save_task(new_task("groceries", None, None)).unwrap();

    assert!(svc.toggle_flag(task.id).unwrap().flag);
    assert_eq!(svc.flagged().unwrap().len(), 1);
    assert!(!svc.toggle_flag(task.id).unwrap().flag);
    assert!(svc.flagged().unwrap().is_empty());
    assert!(matches!(svc.toggle_flag(999), Err(ServiceError::NotFound(999))));
}

#[test]
fn update_rederives_category_and_moves_alarm() {
    let clock = FixedClock::new(at(2024, 3, 15, 8, 0));
    let mut svc = service(&clock);
    let mut task = svc.save_task(new_task("gym", Some("2024-03-15"), Some("07:00"))).unwrap();
    assert!(svc.alarms().is_empty());

    task.time = Some("19:15".to_string());
    let updated = svc.update_task(task).unwrap();
    assert_eq!(updated.time_category, Some(TimeCategory::Tonight));
    assert_eq!(svc.alarms().pending()[0].at, at(2024, 3, 15, 19, 15));
}

#[test]
fn update_rejects_malformed_date_and_time() {
    let clock = FixedClock::new(at(2024, 3, 15, 8, 0));
    let mut svc = service(&clock);
    let task = svc.save_task(new_task("dentist", Some("2024-03-20"), Some("10:00"))).unwrap();

    let mut bad_date = task.clone();
    bad_date.date = Some("2024-13-01".to_string());
    assert!(matches!(svc.update_task(bad_date), Err(ServiceError::InvalidDate(_))));

    let mut bad_time = task.clone();
    bad_time.time = Some("noon".to_string());
    assert!(matches!(svc.update_task(bad_time), Err(ServiceError::InvalidTime(_))));

    assert_eq!(svc.get(task.id).unwrap(), task);
    assert_eq!(svc.alarms().pending()[0].at, at(2024, 3, 20, 10, 0));

    let mut cleared = task.clone();
    cleared.time = Some("  ".to_string());
    let updated = svc.update_task(cleared).unwrap();
    assert_eq!(updated.time, None);
    assert_eq!(svc.alarms().pending()[0].at, at(2024, 3, 20, 11, 0));
}

#[test]
fn delete_then_undo_restores_same_task() {
    let clock = FixedClock::new(at(2024, 3, 15, 8, 0));
    let mut svc = service(&clock);
    let task = svc.save_task(new_task("renew passport", Some("2024-04-01"), None)).unwrap();

    let deleted = svc.delete_task(task.id).unwrap();
    assert!(!svc.alarms().contains(task.id));
    assert!(matches!(svc.get(task.id), Err(ServiceError::NotFound(_))));

    let restored = svc.undo_delete(deleted).unwrap();
    assert_eq!(restored, task);
    assert_eq!(svc.get(task.id).unwrap(), task);
    assert!(svc.alarms().contains(task.id));

    let again = svc.get(task.id).unwrap();
    assert!(matches!(svc.undo_delete(again), Err(ServiceError::DuplicateId(_))));
}

#[test]
fn due_alarms_fire_once() {
    let clock = FixedClock::new(at(2024, 3, 15, 8, 0));
    let mut svc = service(&clock);
    svc.save_task(new_task("water plants", Some("2024-03-15"), Some("08:30"))).unwrap();
    svc.save_task(new_task("later", Some("2024-03-15"), Some("17:00"))).unwrap();
    let mut notifier = CollectingNotifier::default();

    assert!(svc.fire_due(&mut notifier).is_empty());

    clock.set(at(2024, 3, 15, 8, 30));
    let fired = svc.fire_due(&mut notifier);
    assert_eq!(fired.len(), 1);
    assert_eq!(notifier.delivered.len(), 1);
    assert_eq!(notifier.delivered[0].title, NOTIFICATION_HEADING);
    assert_eq!(notifier.delivered[0].body, "water plants");

    assert!(svc.fire_due(&mut notifier).is_empty());
    assert_eq!(svc.alarms().len(), 1);
}

#[test]
fn resync_drops_alarms_for_tasks_finished_elsewhere() {
    let clock = FixedClock::new(at(2024, 3, 15, 8, 0));
    let mut svc = service(&clock);
    let a = svc.save_task(new_task("a", Some("2024-03-16"), None)).unwrap();
    let b = svc.save_task(new_task("b", Some("2024-03-17"), None)).unwrap();

    svc.repository().set_completion(a.id, true).unwrap();
    assert_eq!(svc.resync_alarms().unwrap(), 1);
    assert!(!svc.alarms().contains(a.id));
    assert!(svc.alarms().contains(b.id));
}

#[test]
fn resync_keeps_alarm_that_came_due_before_firing() {
    let clock = FixedClock::new(at(2024, 3, 15, 11, 59));
    let mut svc = service(&clock);
    let lunch = svc.save_task(new_task("lunch", Some("2024-03-15"), Some("12:00"))).unwrap();
    let moved = svc.save_task(new_task("call", Some("2024-03-15"), Some("12:00"))).unwrap();

    // Rescheduled from another process before its old trigger fired
    let mut later = moved.clone();
    later.date = Some("2024-03-16".to_string());
    svc.repository().update_task(&later).unwrap();

    clock.set(at(2024, 3, 15, 12, 0));
    assert_eq!(svc.resync_alarms().unwrap(), 2);

    let mut notifier = CollectingNotifier::default();
    let fired = svc.fire_due(&mut notifier);
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].task_id, lunch.id);
    assert_eq!(svc.alarms().pending()[0].at, at(2024, 3, 16, 12, 0));
}

#[test]
fn resync_only_queues_future_open_tasks() {
    let clock = FixedClock::new(at(2024, 3, 15, 8, 0));
    let repo = TaskRepository::with_clock(Database::open_in_memory().unwrap(), &clock, 12);
    let mut svc = TaskService::new(repo, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    svc.save_task(new_task("future", Some("2024-03-15"), None)).unwrap();
    svc.save_task(new_task("past", Some("2024-03-01"), None)).unwrap();
    svc.save_task(new_task("undated", None, None)).unwrap();

    assert_eq!(svc.resync_alarms().unwrap(), 1);
    assert_eq!(svc.alarms().pending()[0].at, at(2024, 3, 15, 9, 0));
}

#[test]
fn today_splits_by_time_of_day() {
    let clock = FixedClock::new(at(2024, 3, 15, 6, 0));
    let mut svc = service(&clock);
    svc.save_task(new_task("breakfast", Some("2024-03-15"), Some("08:00"))).unwrap();
    svc.save_task(new_task("lunch", Some("2024-03-15"), Some("12:00"))).unwrap();
    svc.save_task(new_task("dinner", Some("2024-03-15"), Some("19:00"))).unwrap();
    svc.save_task(new_task("whenever", Some("2024-03-15"), None)).unwrap();
    svc.save_task(new_task("tomorrow", Some("2024-03-16"), Some("08:00"))).unwrap();

    let parts = svc.today().unwrap();
    let titles = |cat| -> Vec<String> {
        parts.get(cat).iter().map(|t| t.title.clone()).collect()
    };
    assert_eq!(titles(TimeCategory::Morning), vec!["breakfast", "whenever"]);
    assert_eq!(titles(TimeCategory::Afternoon), vec!["lunch"]);
    assert_eq!(titles(TimeCategory::Tonight), vec!["dinner"]);
    assert_eq!(parts.len(), 4);
}

#[test]
fn scheduled_has_a_bucket_per_month() {
    let clock = FixedClock::new(at(2024, 11, 20, 6, 0));
    let mut svc = service(&clock);
    svc.save_task(new_task("thanksgiving", Some("2024-11-28"), None)).unwrap();
    svc.save_task(new_task("new year", Some("2025-01-01"), None)).unwrap();
    svc.save_task(new_task("last week", Some("2024-11-10"), None)).unwrap();

    let buckets = svc.scheduled().unwrap();
    assert_eq!(buckets.len(), 12);
    assert_eq!(buckets[0].label, "November 2024");
    assert_eq!(buckets[0].tasks.len(), 1);
    assert_eq!(buckets[1].label, "December 2024");
    assert!(buckets[1].tasks.is_empty());
    assert_eq!(buckets[2].label, "January 2025");
    assert_eq!(buckets[2].tasks[0].title, "new year");
}

#[test]
fn clear_all_empties_store_and_queue() {
    let clock = FixedClock::new(at(2024, 3, 15, 8, 0));
    let mut svc = service(&clock);
    svc.save_task(new_task("a", Some("2024-03-20"), None)).unwrap();
    let b = svc.save_task(new_task("b", None, None)).unwrap();
    svc.toggle_completion(b.id, true).unwrap();

    assert_eq!(svc.delete_completed().unwrap(), 1);
    assert_eq!(svc.clear_all().unwrap(), 1);
    assert!(svc.alarms().is_empty());
    assert_eq!(svc.counts().unwrap().total, 0);
}

#[test]
fn search_matches_title_substring() {
    let clock = FixedClock::new(at(2024, 3, 15, 8, 0));
    let mut svc = service(&clock);
    svc.save_task(new_task("Book flights", None, None)).unwrap();
    svc.save_task(new_task("Return library book", None, None)).unwrap();
    svc.save_task(new_task("Call plumber", None, None)).unwrap();

    assert_eq!(svc.search("  book ").unwrap().len(), 2);
    assert!(svc.search("xyz").unwrap().is_empty());
}
