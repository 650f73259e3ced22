//! Reminder alarms: when a task should fire and the queue that holds them.

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use std::collections::HashMap;

use crate::models::Task;
use crate::utils::{parse_date, parse_time};

/// A pending reminder for one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alarm {
    pub task_id: i64,
    pub title: String,
    pub at: NaiveDateTime,
}

/// Result of asking for a task's alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Scheduled(NaiveDateTime),
    NoDate,
    InPast,
    Unparseable,
}

/// Anything that can hold alarms until they come due
pub trait AlarmScheduler {
    /// Add or replace the alarm for `alarm.task_id`
    fn schedule(&mut self, alarm: Alarm);

    /// Remove the alarm for a task, returns whether one existed
    fn cancel(&mut self, task_id: i64) -> bool;

    /// Remove and return every alarm at or before `now`, earliest first
    fn due(&mut self, now: NaiveDateTime) -> Vec<Alarm>;

    /// Pending alarms, earliest first
    fn pending(&self) -> Vec<Alarm>;
}

/// In-memory alarm queue keyed by task id
#[derive(Debug, Clone, Default)]
pub struct ReminderQueue {
    alarms: HashMap<i64, Alarm>,
}

impl ReminderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    pub fn contains(&self, task_id: i64) -> bool {
        self.alarms.contains_key(&task_id)
    }
}

fn sort_alarms(alarms: &mut [Alarm]) {
    alarms.sort_by(|a, b| a.at.cmp(&b.at).then(a.task_id.cmp(&b.task_id)));
}

impl AlarmScheduler for ReminderQueue {
    fn schedule(&mut self, alarm: Alarm) {
        self.alarms.insert(alarm.task_id, alarm);
    }

    fn cancel(&mut self, task_id: i64) -> bool {
        self.alarms.remove(&task_id).is_some()
    }

    fn due(&mut self, now: NaiveDateTime) -> Vec<Alarm> {
        let ids: Vec<i64> = self
            .alarms
            .values()
            .filter(|a| a.at <= now)
            .map(|a| a.task_id)
            .collect();
        let mut fired: Vec<Alarm> = ids
            .into_iter()
            .filter_map(|id| self.alarms.remove(&id))
            .collect();
        sort_alarms(&mut fired);
        fired
    }

    fn pending(&self) -> Vec<Alarm> {
        let mut alarms: Vec<Alarm> = self.alarms.values().cloned().collect();
        sort_alarms(&mut alarms);
        alarms
    }
}

/// When a task's reminder should fire: its date at its time, or at
/// `default_time` when it has none. Seconds are always zero.
pub fn trigger_instant(task: &Task, default_time: NaiveTime) -> Option<NaiveDateTime> {
    let date = match task.date.as_deref() {
        Some(d) if !d.trim().is_empty() => d,
        _ => return None,
    };
    let date = match parse_date(date) {
        Ok(date) => date,
        Err(e) => {
            log::warn!(
                "event=alarm_parse status=error task_id={} date={:?} error={}",
                task.id,
                date,
                e
            );
            return None;
        }
    };
    let time = match task.time.as_deref() {
        Some(t) if !t.trim().is_empty() => match parse_time(t) {
            Ok(time) => time,
            Err(e) => {
                log::warn!(
                    "event=alarm_parse status=error task_id={} time={:?} error={}",
                    task.id,
                    t,
                    e
                );
                return None;
            }
        },
        _ => default_time,
    };
    let time = time.with_second(0).unwrap_or(time);
    Some(date.and_time(time))
}

/// Queue an alarm for `task` if it has a trigger after `now`
pub fn schedule_for_task<S: AlarmScheduler + ?Sized>(
    scheduler: &mut S,
    task: &Task,
    now: NaiveDateTime,
    default_time: NaiveTime,
) -> ScheduleOutcome {
    let has_date = task.date.as_deref().is_some_and(|d| !d.trim().is_empty());
    if !has_date {
        return ScheduleOutcome::NoDate;
    }
    let Some(at) = trigger_instant(task, default_time) else {
        return ScheduleOutcome::Unparseable;
    };
    if at <= now {
        log::debug!("event=alarm_skip reason=in_past task_id={} at={}", task.id, at);
        return ScheduleOutcome::InPast;
    }
    scheduler.schedule(Alarm {
        task_id: task.id,
        title: task.title.clone(),
        at,
    });
    log::info!("event=alarm_scheduled task_id={} at={}", task.id, at);
    ScheduleOutcome::Scheduled(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn eleven() -> NaiveTime {
        NaiveTime::from_hms_opt(11, 0, 0).unwrap()
    }

    fn task(id: i64, date: Option<&str>, time: Option<&str>) -> Task {
        let mut t = Task::new(format!("task {}", id));
        t.id = id;
        t.date = date.map(str::to_string);
        t.time = time.map(str::to_string);
        t
    }

    #[test]
    fn untimed_task_fires_at_default_time() {
        let t = task(1, Some("2024-03-15"), None);
        assert_eq!(trigger_instant(&t, eleven()), Some(at(2024, 3, 15, 11, 0)));
    }

    #[test]
    fn timed_task_uses_its_time() {
        let t = task(1, Some("2024-03-15"), Some("18:45"));
        assert_eq!(trigger_instant(&t, eleven()), Some(at(2024, 3, 15, 18, 45)));
    }

    #[test]
    fn no_date_or_garbage_yields_none() {
        assert_eq!(trigger_instant(&task(1, None, Some("10:00")), eleven()), None);
        assert_eq!(trigger_instant(&task(1, Some("soon"), None), eleven()), None);
        assert_eq!(trigger_instant(&task(1, Some("2024-03-15"), Some("7pm")), eleven()), None);
    }

    #[test]
    fn schedule_skips_past_and_replaces_existing() {
        let mut queue = ReminderQueue::new();
        let now = at(2024, 3, 15, 12, 0);

        let past = task(1, Some("2024-03-15"), Some("09:00"));
        assert_eq!(schedule_for_task(&mut queue, &past, now, eleven()), ScheduleOutcome::InPast);
        assert!(queue.is_empty());

        let mut future = task(2, Some("2024-03-15"), Some("13:00"));
        assert_eq!(
            schedule_for_task(&mut queue, &future, now, eleven()),
            ScheduleOutcome::Scheduled(at(2024, 3, 15, 13, 0))
        );
        future.time = Some("14:00".to_string());
        schedule_for_task(&mut queue, &future, now, eleven());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pending()[0].at, at(2024, 3, 15, 14, 0));

        assert_eq!(
            schedule_for_task(&mut queue, &task(3, None, None), now, eleven()),
            ScheduleOutcome::NoDate
        );
        assert_eq!(
            schedule_for_task(&mut queue, &task(4, Some("x"), None), now, eleven()),
            ScheduleOutcome::Unparseable
        );
    }

    #[test]
    fn due_drains_only_expired_alarms_in_order() {
        let mut queue = ReminderQueue::new();
        for (id, h) in [(1, 15), (2, 13), (3, 20)] {
            queue.schedule(Alarm {
                task_id: id,
                title: format!("t{}", id),
                at: at(2024, 3, 15, h, 0),
            });
        }
        let fired = queue.due(at(2024, 3, 15, 15, 0));
        assert_eq!(fired.iter().map(|a| a.task_id).collect::<Vec<_>>(), vec![2, 1]);
        assert!(queue.due(at(2024, 3, 15, 15, 0)).is_empty());
        assert!(queue.cancel(3));
        assert!(!queue.cancel(3));
        assert!(queue.is_empty());
    }
}
