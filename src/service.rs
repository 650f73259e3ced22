//! View-model layer: every user action goes through [`TaskService`], which
//! keeps the store and the reminder queue in step.

use chrono::{NaiveDateTime, NaiveTime};
use thiserror::Error;

use crate::aggregate::{DayParts, MonthBucket, categorize_by_time, scheduled_buckets};
use crate::alarm::{
    Alarm, AlarmScheduler, ReminderQueue, ScheduleOutcome, schedule_for_task, trigger_instant,
};
use crate::models::{NewTask, Task, TaskCounts};
use crate::notification::{Notification, Notifier};
use crate::repository::{Clock, CountsSubscription, RepositoryError, SystemClock, TaskRepository};
use crate::utils::{parse_date, parse_time};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Title cannot be empty")]
    EmptyTitle,
    #[error("Invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("Invalid time '{0}' (expected HH:MM)")]
    InvalidTime(String),
    #[error("Task with ID {0} not found")]
    NotFound(i64),
    #[error("Task with ID {0} already exists")]
    DuplicateId(i64),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => ServiceError::NotFound(id),
            RepositoryError::DuplicateId(id) => ServiceError::DuplicateId(id),
            other => ServiceError::Repository(other),
        }
    }
}

pub struct TaskService<C: Clock = SystemClock> {
    repo: TaskRepository<C>,
    alarms: ReminderQueue,
    default_time: NaiveTime,
}

impl<C: Clock> TaskService<C> {
    pub fn new(repo: TaskRepository<C>, default_time: NaiveTime) -> Self {
        Self {
            repo,
            alarms: ReminderQueue::new(),
            default_time,
        }
    }

    pub fn repository(&self) -> &TaskRepository<C> {
        &self.repo
    }

    pub fn alarms(&self) -> &ReminderQueue {
        &self.alarms
    }

    pub fn default_time(&self) -> NaiveTime {
        self.default_time
    }

    /// Validate and store a new task, then queue its reminder
    pub fn save_task(&mut self, input: NewTask) -> Result<Task, ServiceError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(ServiceError::EmptyTitle);
        }
        let date = validated_date(input.date)?;
        let time = validated_time(input.time)?;

        let mut task = Task::new(title.to_string());
        task.notes = non_blank(input.notes);
        task.date = date;
        task.time = time;
        task.flag = input.flag;
        task.timestamp = self.repo.clock().timestamp_millis();
        task.refresh_time_category();

        task.id = self.repo.save_task(&task)?;
        log::info!("event=task_created id={} date={:?} time={:?}", task.id, task.date, task.time);
        self.reschedule(&task);
        Ok(task)
    }

    pub fn get(&self, id: i64) -> Result<Task, ServiceError> {
        self.repo.get(id)?.ok_or(ServiceError::NotFound(id))
    }

    /// Today's incomplete tasks split by time of day
    pub fn today(&self) -> Result<DayParts, ServiceError> {
        Ok(categorize_by_time(self.repo.today()?))
    }

    /// Incomplete tasks in the fixed month sections starting this month
    pub fn scheduled(&self) -> Result<Vec<MonthBucket>, ServiceError> {
        let tasks = self.repo.scheduled()?;
        Ok(scheduled_buckets(
            self.repo.clock().today(),
            tasks,
            self.repo.scheduled_months(),
        ))
    }

    pub fn flagged(&self) -> Result<Vec<Task>, ServiceError> {
        Ok(self.repo.flagged()?)
    }

    pub fn incomplete(&self) -> Result<Vec<Task>, ServiceError> {
        Ok(self.repo.incomplete()?)
    }

    pub fn completed(&self) -> Result<Vec<Task>, ServiceError> {
        Ok(self.repo.completed()?)
    }

    pub fn all(&self) -> Result<Vec<Task>, ServiceError> {
        Ok(self.repo.all()?)
    }

    pub fn search(&self, query: &str) -> Result<Vec<Task>, ServiceError> {
        Ok(self.repo.by_title(query.trim())?)
    }

    pub fn counts(&self) -> Result<TaskCounts, ServiceError> {
        Ok(self.repo.counts()?)
    }

    pub fn subscribe(&self) -> Result<CountsSubscription, ServiceError> {
        Ok(self.repo.subscribe()?)
    }

    /// Mark a task done or not done; completed tasks lose their alarm
    pub fn toggle_completion(&mut self, id: i64, completed: bool) -> Result<Task, ServiceError> {
        self.repo.set_completion(id, completed)?;
        let task = self.get(id)?;
        self.reschedule(&task);
        Ok(task)
    }

    pub fn toggle_flag(&mut self, id: i64) -> Result<Task, ServiceError> {
        let mut task = self.get(id)?;
        task.flag = !task.flag;
        self.repo.update_task(&task)?;
        Ok(task)
    }

    /// Replace a stored task; the category is re-derived from its time
    pub fn update_task(&mut self, mut task: Task) -> Result<Task, ServiceError> {
        if task.title.trim().is_empty() {
            return Err(ServiceError::EmptyTitle);
        }
        task.date = validated_date(task.date.take())?;
        task.time = validated_time(task.time.take())?;
        task.refresh_time_category();
        self.repo.update_task(&task)?;
        self.reschedule(&task);
        Ok(task)
    }

    /// Delete a task and hand it back so the caller can offer undo
    pub fn delete_task(&mut self, id: i64) -> Result<Task, ServiceError> {
        let task = self.get(id)?;
        self.repo.delete_task(id)?;
        self.alarms.cancel(id);
        log::info!("event=task_deleted id={}", id);
        Ok(task)
    }

    /// Put back a task returned by [`TaskService::delete_task`]
    pub fn undo_delete(&mut self, task: Task) -> Result<Task, ServiceError> {
        self.repo.save_task(&task)?;
        log::info!("event=task_restored id={}", task.id);
        self.reschedule(&task);
        Ok(task)
    }

    pub fn delete_completed(&mut self) -> Result<usize, ServiceError> {
        let removed = self.repo.delete_completed()?;
        log::info!("event=completed_cleared removed={}", removed);
        Ok(removed)
    }

    /// Remove every task and every pending alarm
    pub fn clear_all(&mut self) -> Result<usize, ServiceError> {
        let removed = self.repo.delete_all()?;
        self.alarms = ReminderQueue::new();
        log::warn!("event=all_cleared removed={}", removed);
        Ok(removed)
    }

    /// Queue alarms for every stored incomplete dated task
    pub fn load_alarms(&mut self) -> Result<usize, ServiceError> {
        let now = self.repo.clock().now();
        let tasks = self.repo.dated_incomplete()?;
        Ok(self.queue_tasks(&tasks, now))
    }

    /// Rebuild the queue from the store, dropping alarms for tasks that were
    /// deleted, completed or moved elsewhere. Alarms already due and not yet
    /// fired survive when their task still triggers at the same instant.
    pub fn resync_alarms(&mut self) -> Result<usize, ServiceError> {
        let now = self.repo.clock().now();
        let tasks = self.repo.dated_incomplete()?;
        let overdue = self.alarms.due(now);

        self.alarms = ReminderQueue::new();
        let mut queued = self.queue_tasks(&tasks, now);
        for alarm in overdue {
            let still_open = tasks.iter().any(|t| {
                t.id == alarm.task_id && trigger_instant(t, self.default_time) == Some(alarm.at)
            });
            if still_open {
                self.alarms.schedule(alarm);
                queued += 1;
            } else {
                log::debug!("event=alarm_dropped task_id={} at={}", alarm.task_id, alarm.at);
            }
        }
        Ok(queued)
    }

    fn queue_tasks(&mut self, tasks: &[Task], now: NaiveDateTime) -> usize {
        let mut queued = 0;
        for task in tasks {
            if let ScheduleOutcome::Scheduled(_) =
                schedule_for_task(&mut self.alarms, task, now, self.default_time)
            {
                queued += 1;
            }
        }
        queued
    }

    /// Fire every alarm that has come due
    pub fn fire_due(&mut self, notifier: &mut dyn Notifier) -> Vec<Alarm> {
        let fired = self.alarms.due(self.repo.clock().now());
        for alarm in &fired {
            notifier.notify(&Notification::for_alarm(alarm));
        }
        fired
    }

    fn reschedule(&mut self, task: &Task) {
        self.alarms.cancel(task.id);
        if task.is_completed {
            return;
        }
        let now = self.repo.clock().now();
        schedule_for_task(&mut self.alarms, task, now, self.default_time);
    }
}

fn validated_date(value: Option<String>) -> Result<Option<String>, ServiceError> {
    let date = non_blank(value);
    if let Some(d) = date.as_deref() {
        parse_date(d).map_err(|_| ServiceError::InvalidDate(d.to_string()))?;
    }
    Ok(date)
}

fn validated_time(value: Option<String>) -> Result<Option<String>, ServiceError> {
    let time = non_blank(value);
    if let Some(t) = time.as_deref() {
        parse_time(t).map_err(|_| ServiceError::InvalidTime(t.to_string()))?;
    }
    Ok(time)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
