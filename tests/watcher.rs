use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use reminders::notification::CollectingNotifier;
use reminders::repository::FixedClock;
use reminders::watcher::Watcher;
use reminders::{Database, NewTask, TaskRepository, TaskService};
use std::time::{Duration, Instant};

fn at(h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 15)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

#[test]
fn tick_fires_due_reminders_and_resyncs() {
    let clock = FixedClock::new(at(8, 0));
    let repo = TaskRepository::with_clock(Database::open_in_memory().unwrap(), &clock, 12);
    let mut svc = TaskService::new(repo, NaiveTime::from_hms_opt(11, 0, 0).unwrap());
    let first = svc
        .save_task(NewTask {
            title: "stretch".to_string(),
            date: Some("2024-03-15".to_string()),
            time: Some("08:05".to_string()),
            ..NewTask::default()
        })
        .unwrap();
    let second = svc
        .save_task(NewTask {
            title: "lunch".to_string(),
            date: Some("2024-03-15".to_string()),
            time: Some("12:00".to_string()),
            ..NewTask::default()
        })
        .unwrap();

    let mut notifier = CollectingNotifier::default();
    {
        let start = Instant::now();
        let mut watcher = Watcher::new(svc, &mut notifier, Duration::from_secs(1), Duration::from_secs(30));
        assert!(watcher.tick(start).unwrap().is_empty());

        clock.set(at(8, 5));
        let fired = watcher.tick(start + Duration::from_secs(1)).unwrap();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].task_id, first.id);

        // Completed from another process; picked up on the next resync
        watcher.service().repository().set_completion(second.id, true).unwrap();
        clock.set(at(12, 0));
        assert!(watcher.tick(start + Duration::from_secs(31)).unwrap().is_empty());
        assert!(watcher.service().alarms().is_empty());
    }
    assert_eq!(notifier.delivered.len(), 1);
    assert_eq!(notifier.delivered[0].body, "stretch");
}

#[test]
fn run_until_stops_when_asked() {
    let clock = FixedClock::new(at(8, 0));
    let repo = TaskRepository::with_clock(Database::open_in_memory().unwrap(), &clock, 12);
    let svc = TaskService::new(repo, NaiveTime::from_hms_opt(11, 0, 0).unwrap());
    let mut notifier = CollectingNotifier::default();
    let mut watcher = Watcher::new(svc, &mut notifier, Duration::ZERO, Duration::from_secs(30));

    let mut polls = 0;
    watcher
        .run_until(|| {
            polls += 1;
            polls > 2
        })
        .unwrap();
    assert_eq!(polls, 3);
}

#[test]
fn reminder_due_on_a_resync_tick_still_fires() {
    let clock = FixedClock::new(at(11, 59));
    let repo = TaskRepository::with_clock(Database::open_in_memory().unwrap(), &clock, 12);
    let mut svc = TaskService::new(repo, NaiveTime::from_hms_opt(11, 0, 0).unwrap());
    svc.save_task(NewTask {
        title: "lunch".to_string(),
        date: Some("2024-03-15".to_string()),
        time: Some("12:00".to_string()),
        ..NewTask::default()
    })
    .unwrap();

    let mut notifier = CollectingNotifier::default();
    {
        let start = Instant::now();
        let mut watcher = Watcher::new(svc, &mut notifier, Duration::from_secs(1), Duration::from_secs(30));
        assert!(watcher.tick(start).unwrap().is_empty());
        assert_eq!(watcher.service().alarms().len(), 1);

        clock.set(at(12, 0));
        let fired = watcher.tick(start + Duration::from_secs(30)).unwrap();
        assert_eq!(fired.len(), 1);
        assert!(watcher.tick(start + Duration::from_secs(31)).unwrap().is_empty());
    }
    assert_eq!(notifier.delivered.len(), 1);
    assert_eq!(notifier.delivered[0].body, "lunch");
}
