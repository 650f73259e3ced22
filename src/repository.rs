//! Task repository: CRUD over [`Database`] plus live count snapshots.
//!
//! Every mutation recomputes [`TaskCounts`] and pushes the snapshot to each
//! subscriber returned by [`TaskRepository::subscribe`]. Receivers that have
//! been dropped are pruned on the next push.

use chrono::{Local, Months, NaiveDate, NaiveDateTime, TimeZone};
use std::cell::RefCell;
use std::sync::mpsc::{self, Receiver, Sender};
use thiserror::Error;

use crate::database::{Database, DatabaseError};
use crate::models::{COMPLETED_AT_FORMAT, Task, TaskCounts};
use crate::utils::format_date;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("Task with ID {0} not found")]
    NotFound(i64),
    #[error("Task with ID {0} already exists")]
    DuplicateId(i64),
}

/// Source of "now"; lets tests pin the date
pub trait Clock {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Milliseconds since the Unix epoch, reading `now` as local time
    fn timestamp_millis(&self) -> i64 {
        let now = self.now();
        Local
            .from_local_datetime(&now)
            .earliest()
            .map(|dt| dt.timestamp_millis())
            .unwrap_or_else(|| now.and_utc().timestamp_millis())
    }
}

/// Local wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn timestamp_millis(&self) -> i64 {
        Local::now().timestamp_millis()
    }
}

/// A clock stuck at one instant
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: RefCell<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now: RefCell::new(now) }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.borrow_mut() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.borrow()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }

    fn timestamp_millis(&self) -> i64 {
        (**self).timestamp_millis()
    }
}

/// Receiving end of the live counts stream
pub type CountsSubscription = Receiver<TaskCounts>;

/// Inclusive `[today, today + months]` window used by the Scheduled view
pub fn scheduled_window(today: NaiveDate, months: u32) -> (String, String) {
    let end = today
        .checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX);
    (format_date(today), format_date(end))
}

pub struct TaskRepository<C: Clock = SystemClock> {
    db: Database,
    clock: C,
    scheduled_months: u32,
    subscribers: RefCell<Vec<Sender<TaskCounts>>>,
}

impl TaskRepository<SystemClock> {
    pub fn new(db: Database, scheduled_months: u32) -> Self {
        Self::with_clock(db, SystemClock, scheduled_months)
    }
}

impl<C: Clock> TaskRepository<C> {
    pub fn with_clock(db: Database, clock: C, scheduled_months: u32) -> Self {
        Self {
            db,
            clock,
            scheduled_months,
            subscribers: RefCell::new(Vec::new()),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn scheduled_months(&self) -> u32 {
        self.scheduled_months
    }

    fn today_string(&self) -> String {
        format_date(self.clock.today())
    }

    /// Store a new task; fails when its id is already taken
    pub fn save_task(&self, task: &Task) -> Result<i64, RepositoryError> {
        let id = self.db.insert_task(task).map_err(classify)?;
        log::debug!("event=task_saved id={}", id);
        self.publish();
        Ok(id)
    }

    /// Replace a stored task wholesale
    pub fn update_task(&self, task: &Task) -> Result<(), RepositoryError> {
        self.db.update_task(task).map_err(classify)?;
        self.publish();
        Ok(())
    }

    /// Set completion and keep `date_completed` in step with it
    pub fn set_completion(&self, id: i64, is_completed: bool) -> Result<(), RepositoryError> {
        let date_completed = if is_completed {
            Some(self.clock.now().format(COMPLETED_AT_FORMAT).to_string())
        } else {
            None
        };
        self.db
            .update_task_completion(id, is_completed, date_completed.as_deref())
            .map_err(classify)?;
        log::info!(
            "event=task_completion id={} is_completed={} date_completed={:?}",
            id,
            is_completed,
            date_completed
        );
        self.publish();
        Ok(())
    }

    pub fn delete_task(&self, id: i64) -> Result<(), RepositoryError> {
        if !self.db.delete_task(id)? {
            return Err(RepositoryError::NotFound(id));
        }
        self.publish();
        Ok(())
    }

    pub fn delete_completed(&self) -> Result<usize, RepositoryError> {
        let removed = self.db.delete_completed_tasks()?;
        self.publish();
        Ok(removed)
    }

    pub fn delete_all(&self) -> Result<usize, RepositoryError> {
        let removed = self.db.delete_all_tasks()?;
        self.publish();
        Ok(removed)
    }

    pub fn get(&self, id: i64) -> Result<Option<Task>, RepositoryError> {
        Ok(self.db.get_task(id)?)
    }

    pub fn by_title(&self, title: &str) -> Result<Vec<Task>, RepositoryError> {
        Ok(self.db.tasks_by_title(title)?)
    }

    pub fn incomplete(&self) -> Result<Vec<Task>, RepositoryError> {
        Ok(self.db.incomplete_tasks()?)
    }

    pub fn completed(&self) -> Result<Vec<Task>, RepositoryError> {
        Ok(self.db.completed_tasks()?)
    }

    pub fn all(&self) -> Result<Vec<Task>, RepositoryError> {
        Ok(self.db.all_tasks()?)
    }

    pub fn for_date(&self, date: &str) -> Result<Vec<Task>, RepositoryError> {
        Ok(self.db.tasks_for_date(date)?)
    }

    pub fn today(&self) -> Result<Vec<Task>, RepositoryError> {
        self.for_date(&self.today_string())
    }

    pub fn in_date_range(&self, start: &str, end: &str) -> Result<Vec<Task>, RepositoryError> {
        Ok(self.db.tasks_in_date_range(start, end)?)
    }

    /// Incomplete tasks from today through the configured number of months
    pub fn scheduled(&self) -> Result<Vec<Task>, RepositoryError> {
        let (start, end) = scheduled_window(self.clock.today(), self.scheduled_months);
        self.in_date_range(&start, &end)
    }

    pub fn flagged(&self) -> Result<Vec<Task>, RepositoryError> {
        Ok(self.db.flagged_tasks()?)
    }

    pub fn dated_incomplete(&self) -> Result<Vec<Task>, RepositoryError> {
        Ok(self.db.dated_incomplete_tasks()?)
    }

    pub fn count_by_title(&self, title: &str) -> Result<i64, RepositoryError> {
        Ok(self.db.count_by_title(title)?)
    }

    /// Current snapshot of every counter
    pub fn counts(&self) -> Result<TaskCounts, RepositoryError> {
        let today = self.today_string();
        let (start, end) = scheduled_window(self.clock.today(), self.scheduled_months);
        Ok(TaskCounts {
            today: self.db.count_for_date(&today)?,
            scheduled: self.db.count_in_date_range(&start, &end)?,
            flagged: self.db.count_flagged()?,
            incomplete: self.db.count_incomplete()?,
            completed: self.db.count_completed()?,
            total: self.db.count_all()?,
        })
    }

    /// Subscribe to count snapshots; the current one is delivered immediately
    pub fn subscribe(&self) -> Result<CountsSubscription, RepositoryError> {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(self.counts()?);
        self.subscribers.borrow_mut().push(tx);
        Ok(rx)
    }

    fn publish(&self) {
        let mut subscribers = self.subscribers.borrow_mut();
        if subscribers.is_empty() {
            return;
        }
        match self.counts() {
            Ok(counts) => subscribers.retain(|tx| tx.send(counts).is_ok()),
            Err(e) => log::error!("event=counts_refresh status=error error={}", e),
        }
    }
}

fn classify(err: DatabaseError) -> RepositoryError {
    match err {
        DatabaseError::NotFound(id) => RepositoryError::NotFound(id),
        DatabaseError::DuplicateId(id) => RepositoryError::DuplicateId(id),
        other => RepositoryError::Database(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduled_window_clamps_to_month_end() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(
            scheduled_window(today, 1),
            ("2024-01-31".to_string(), "2024-02-29".to_string())
        );
        assert_eq!(scheduled_window(today, 12).1, "2025-01-31");
    }

    #[test]
    fn timestamp_reads_clock_as_local_time() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let clock = FixedClock::new(now);
        let expected = Local.from_local_datetime(&now).earliest().unwrap().timestamp_millis();
        assert_eq!(clock.timestamp_millis(), expected);
        assert_eq!((&clock).timestamp_millis(), expected);
    }
}
