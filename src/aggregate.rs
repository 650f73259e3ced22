//! Grouping helpers behind the Today and Scheduled views.

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use crate::models::{Task, TimeCategory};
use crate::utils::parse_date;

/// Label for tasks whose date is missing or does not parse
pub const UNKNOWN_MONTH: &str = "Unknown";

/// Hour used for untimed tasks; matches the default reminder time
pub const UNTIMED_HOUR: u32 = 11;

/// Today's tasks split by time of day
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DayParts {
    pub morning: Vec<Task>,
    pub afternoon: Vec<Task>,
    pub tonight: Vec<Task>,
}

impl DayParts {
    pub fn get(&self, category: TimeCategory) -> &[Task] {
        match category {
            TimeCategory::Morning => &self.morning,
            TimeCategory::Afternoon => &self.afternoon,
            TimeCategory::Tonight => &self.tonight,
        }
    }

    pub fn sections(&self) -> [(TimeCategory, &[Task]); 3] {
        [
            (TimeCategory::Morning, self.morning.as_slice()),
            (TimeCategory::Afternoon, self.afternoon.as_slice()),
            (TimeCategory::Tonight, self.tonight.as_slice()),
        ]
    }

    pub fn len(&self) -> usize {
        self.morning.len() + self.afternoon.len() + self.tonight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One month section of the Scheduled view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthBucket {
    pub label: String,
    pub tasks: Vec<Task>,
}

/// Split tasks into morning/afternoon/tonight by the hour of their time.
/// Input order is preserved inside each bucket.
pub fn categorize_by_time(tasks: Vec<Task>) -> DayParts {
    let mut parts = DayParts::default();
    for task in tasks {
        let hour = match (task.hour(), task.time.as_deref()) {
            (Some(hour), _) => hour,
            (None, Some(raw)) if !raw.trim().is_empty() => {
                log::debug!(
                    "event=categorize_fallback task_id={} time={:?} bucket=morning",
                    task.id,
                    raw
                );
                UNTIMED_HOUR
            }
            (None, _) => UNTIMED_HOUR,
        };
        match TimeCategory::from_hour(hour) {
            TimeCategory::Morning => parts.morning.push(task),
            TimeCategory::Afternoon => parts.afternoon.push(task),
            TimeCategory::Tonight => parts.tonight.push(task),
        }
    }
    parts
}

pub fn month_label_for(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

/// "2024-03-15" -> "March 2024"
pub fn month_label(date_str: &str) -> Option<String> {
    parse_date(date_str).ok().map(month_label_for)
}

/// Group tasks under month-year labels, in order of first appearance.
/// Missing or unparseable dates are grouped under [`UNKNOWN_MONTH`].
pub fn group_by_month(tasks: Vec<Task>) -> Vec<MonthBucket> {
    let mut groups: Vec<MonthBucket> = Vec::new();
    for task in tasks {
        let label = match task.date.as_deref() {
            Some(date) => month_label(date).unwrap_or_else(|| {
                log::debug!(
                    "event=date_parse status=fallback task_id={} date={:?}",
                    task.id,
                    date
                );
                UNKNOWN_MONTH.to_string()
            }),
            None => UNKNOWN_MONTH.to_string(),
        };
        match groups.iter_mut().find(|g| g.label == label) {
            Some(group) => group.tasks.push(task),
            None => groups.push(MonthBucket { label, tasks: vec![task] }),
        }
    }
    groups
}

/// The `count` month labels starting at `today`'s month
pub fn scheduled_months(today: NaiveDate, count: u32) -> Vec<String> {
    let first = today.with_day(1).unwrap_or(today);
    (0..count)
        .filter_map(|i| first.checked_add_months(Months::new(i)))
        .map(month_label_for)
        .collect()
}

/// Fixed month buckets for the Scheduled view; tasks outside them, including
/// the Unknown group, are dropped
pub fn scheduled_buckets(today: NaiveDate, tasks: Vec<Task>, count: u32) -> Vec<MonthBucket> {
    let mut grouped = group_by_month(tasks);
    scheduled_months(today, count)
        .into_iter()
        .map(|label| {
            let tasks = grouped
                .iter_mut()
                .find(|g| g.label == label)
                .map(|g| std::mem::take(&mut g.tasks))
                .unwrap_or_default();
            MonthBucket { label, tasks }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: i64, date: Option<&str>, time: Option<&str>) -> Task {
        let mut t = Task::new(format!("task {}", id));
        t.id = id;
        t.date = date.map(str::to_string);
        t.time = time.map(str::to_string);
        t
    }

    #[test]
    fn seventeen_hundred_is_afternoon() {
        let parts = categorize_by_time(vec![
            task(1, None, Some("05:00")),
            task(2, None, Some("11:59")),
            task(3, None, Some("12:00")),
            task(4, None, Some("17:30")),
            task(5, None, Some("18:00")),
            task(6, None, Some("04:59")),
        ]);
        let ids = |v: &[Task]| v.iter().map(|t| t.id).collect::<Vec<_>>();
        assert_eq!(ids(&parts.morning), vec![1, 2]);
        assert_eq!(ids(&parts.afternoon), vec![3, 4]);
        assert_eq!(ids(&parts.tonight), vec![5, 6]);
    }

    #[test]
    fn untimed_tasks_go_to_morning() {
        let parts = categorize_by_time(vec![task(1, None, None), task(2, None, Some("later"))]);
        assert_eq!(parts.morning.len(), 2);
        assert!(parts.afternoon.is_empty() && parts.tonight.is_empty());
    }

    #[test]
    fn month_labels() {
        assert_eq!(month_label("2024-03-15").as_deref(), Some("March 2024"));
        assert_eq!(month_label("2024-13-01"), None);
    }

    #[test]
    fn groups_keep_first_seen_order_and_unknown() {
        let groups = group_by_month(vec![
            task(1, Some("2024-04-02"), None),
            task(2, Some("bogus"), None),
            task(3, Some("2024-03-15"), None),
            task(4, Some("2024-04-30"), None),
            task(5, None, None),
        ]);
        let labels: Vec<_> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["April 2024", "Unknown", "March 2024"]);
        assert_eq!(groups[0].tasks.len(), 2);
        assert_eq!(groups[1].tasks.len(), 2);
    }

    #[test]
    fn scheduled_months_wrap_year() {
        let today = NaiveDate::from_ymd_opt(2024, 11, 30).unwrap();
        let months = scheduled_months(today, 12);
        assert_eq!(months.len(), 12);
        assert_eq!(months[0], "November 2024");
        assert_eq!(months[2], "January 2025");
        assert_eq!(months[11], "October 2025");
    }

    #[test]
    fn scheduled_buckets_drop_unknown_and_out_of_range() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let buckets = scheduled_buckets(
            today,
            vec![
                task(1, Some("2024-03-15"), None),
                task(2, Some("nope"), None),
                task(3, Some("2026-01-01"), None),
                task(4, Some("2024-05-01"), None),
            ],
            12,
        );
        assert_eq!(buckets.len(), 12);
        assert_eq!(buckets[0].label, "March 2024");
        assert_eq!(buckets[0].tasks.len(), 1);
        assert_eq!(buckets[2].tasks[0].id, 4);
        let total: usize = buckets.iter().map(|b| b.tasks.len()).sum();
        assert_eq!(total, 2);
    }
}
