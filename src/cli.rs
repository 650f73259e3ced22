use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::aggregate::{DayParts, MonthBucket};
use crate::config::ConfigError;
use crate::models::{NewTask, Task, TaskCounts};
use crate::notification::TerminalNotifier;
use crate::repository::Clock;
use crate::service::{ServiceError, TaskService};
use crate::utils::{normalize_date_input, normalize_time_input};
use crate::watcher::Watcher;

#[derive(Parser)]
#[command(name = "rmd")]
#[command(about = "Reminders - local tasks with dates, times, flags and alarms")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long, global = true)]
    pub dev: bool,

    /// Override the configured log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch interactive TUI (default if no subcommand)
    Tui,
    /// Add a new reminder
    Add {
        /// Reminder title
        title: String,
        #[arg(long)]
        notes: Option<String>,
        /// Date (YYYY-MM-DD, "today" or "tomorrow")
        #[arg(long)]
        date: Option<String>,
        /// Time (HH:MM, 24h)
        #[arg(long)]
        time: Option<String>,
        /// Flag the reminder
        #[arg(long)]
        flag: bool,
    },
    /// List reminders in one view
    List {
        #[arg(value_enum, default_value_t = ListView::Incomplete)]
        view: ListView,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Find reminders whose title contains the query
    Search {
        query: String,
        #[arg(long)]
        json: bool,
    },
    /// Show one reminder
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Mark a reminder completed
    Complete { id: i64 },
    /// Mark a completed reminder as not done
    Reopen { id: i64 },
    /// Toggle the flag on a reminder
    Flag { id: i64 },
    /// Delete a reminder
    Delete { id: i64 },
    /// Delete every completed reminder
    ClearCompleted,
    /// Delete every reminder
    Nuke {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Print the per-view counters
    Counts {
        #[arg(long)]
        json: bool,
    },
    /// Stay in the foreground and fire reminders as they come due
    Watch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListView {
    Today,
    Scheduled,
    Flagged,
    Completed,
    /// Every stored reminder, done or not
    All,
    /// Reminders not yet done
    Incomplete,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    ServiceError(#[from] ServiceError),
    #[error(transparent)]
    ConfigError(#[from] ConfigError),
    #[error("{0}")]
    InputError(String),
    #[error("Failed to encode JSON: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Refusing to delete every reminder without --yes")]
    ConfirmationRequired,
}

/// Handle the add command
pub fn handle_add<C: Clock>(
    service: &mut TaskService<C>,
    title: String,
    notes: Option<String>,
    date: Option<String>,
    time: Option<String>,
    flag: bool,
) -> Result<Task, CliError> {
    let today = service.repository().clock().today();
    let date = date
        .map(|d| normalize_date_input(&d, today))
        .transpose()
        .map_err(CliError::InputError)?;
    let time = time
        .map(|t| normalize_time_input(&t))
        .transpose()
        .map_err(CliError::InputError)?;

    let task = service.save_task(NewTask { title, notes, date, time, flag })?;
    println!("Task created successfully (ID: {})", task.id);
    if let Some(alarm) = service.alarms().pending().iter().find(|a| a.task_id == task.id) {
        println!(
            "Reminder at {} (keep `rmd watch` or the TUI running to receive it)",
            alarm.at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(task)
}

/// Handle the list command
pub fn handle_list<C: Clock>(
    service: &TaskService<C>,
    view: ListView,
    json: bool,
) -> Result<(), CliError> {
    match view {
        ListView::Today => {
            let parts = service.today()?;
            if json {
                return print_json(&parts);
            }
            print!("{}", format_day_parts(&parts));
        }
        ListView::Scheduled => {
            let buckets = service.scheduled()?;
            if json {
                return print_json(&buckets);
            }
            print!("{}", format_month_buckets(&buckets));
        }
        ListView::Flagged => print_tasks(&service.flagged()?, json)?,
        ListView::Completed => print_tasks(&service.completed()?, json)?,
        ListView::All => print_tasks(&service.all()?, json)?,
        ListView::Incomplete => print_tasks(&service.incomplete()?, json)?,
    }
    Ok(())
}

pub fn handle_search<C: Clock>(
    service: &TaskService<C>,
    query: &str,
    json: bool,
) -> Result<(), CliError> {
    print_tasks(&service.search(query)?, json)
}

pub fn handle_show<C: Clock>(service: &TaskService<C>, id: i64, json: bool) -> Result<(), CliError> {
    let task = service.get(id)?;
    if json {
        return print_json(&task);
    }
    print!("{}", format_task_detail(&task));
    Ok(())
}

pub fn handle_set_completion<C: Clock>(
    service: &mut TaskService<C>,
    id: i64,
    completed: bool,
) -> Result<(), CliError> {
    let task = service.toggle_completion(id, completed)?;
    if completed {
        println!("Completed: {}", task.title);
    } else {
        println!("Reopened: {}", task.title);
    }
    Ok(())
}

pub fn handle_flag<C: Clock>(service: &mut TaskService<C>, id: i64) -> Result<(), CliError> {
    let task = service.toggle_flag(id)?;
    let state = if task.flag { "Flagged" } else { "Unflagged" };
    println!("{}: {}", state, task.title);
    Ok(())
}

pub fn handle_delete<C: Clock>(service: &mut TaskService<C>, id: i64) -> Result<(), CliError> {
    let task = service.delete_task(id)?;
    println!("Deleted: {}", task.title);
    Ok(())
}

pub fn handle_clear_completed<C: Clock>(service: &mut TaskService<C>) -> Result<(), CliError> {
    let removed = service.delete_completed()?;
    println!("Removed {} completed reminder(s)", removed);
    Ok(())
}

pub fn handle_nuke<C: Clock>(service: &mut TaskService<C>, yes: bool) -> Result<(), CliError> {
    if !yes {
        return Err(CliError::ConfirmationRequired);
    }
    let removed = service.clear_all()?;
    println!("Removed {} reminder(s)", removed);
    Ok(())
}

pub fn handle_counts<C: Clock>(service: &TaskService<C>, json: bool) -> Result<(), CliError> {
    let counts = service.counts()?;
    if json {
        return print_json(&counts);
    }
    print!("{}", format_counts(&counts));
    Ok(())
}

/// Run the reminder loop until the process is interrupted
pub fn handle_watch<C: Clock>(
    service: TaskService<C>,
    poll_interval: Duration,
    resync_interval: Duration,
) -> Result<(), CliError> {
    let mut notifier = TerminalNotifier::stdout();
    let mut watcher = Watcher::new(service, &mut notifier, poll_interval, resync_interval);
    println!("Watching for reminders (Ctrl+C to stop)");
    watcher.run_until(|| false)?;
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_tasks(tasks: &[Task], json: bool) -> Result<(), CliError> {
    if json {
        return print_json(tasks);
    }
    if tasks.is_empty() {
        println!("No reminders");
    }
    for task in tasks {
        println!("{}", format_task_line(task));
    }
    Ok(())
}

/// One-line summary: `[x] #3 Title  2024-03-15 09:30 ⚑`
pub fn format_task_line(task: &Task) -> String {
    let check = if task.is_completed { "[x]" } else { "[ ]" };
    let mut line = format!("{} #{} {}", check, task.id, task.title);
    let when: Vec<&str> = [task.date.as_deref(), task.time.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if !when.is_empty() {
        line.push_str("  ");
        line.push_str(&when.join(" "));
    }
    if task.flag {
        line.push_str(" ⚑");
    }
    line
}

pub fn format_task_detail(task: &Task) -> String {
    let mut out = format!("#{} {}\n", task.id, task.title);
    out.push_str(&format!("  date:      {}\n", task.date.as_deref().unwrap_or("-")));
    out.push_str(&format!("  time:      {}\n", task.time.as_deref().unwrap_or("-")));
    if let Some(category) = task.time_category {
        out.push_str(&format!("  category:  {}\n", category));
    }
    out.push_str(&format!("  flagged:   {}\n", if task.flag { "yes" } else { "no" }));
    match task.date_completed.as_deref() {
        Some(done) => out.push_str(&format!("  completed: {}\n", done)),
        None => out.push_str("  completed: no\n"),
    }
    if let Some(notes) = task.notes.as_deref() {
        out.push('\n');
        out.push_str(notes);
        out.push('\n');
    }
    out
}

pub fn format_day_parts(parts: &DayParts) -> String {
    let mut out = String::new();
    for (category, tasks) in parts.sections() {
        out.push_str(&format!("{} ({})\n", category.heading(), tasks.len()));
        for task in tasks {
            out.push_str(&format!("  {}\n", format_task_line(task)));
        }
    }
    out
}

pub fn format_month_buckets(buckets: &[MonthBucket]) -> String {
    let mut out = String::new();
    for bucket in buckets {
        out.push_str(&format!("{} ({})\n", bucket.label, bucket.tasks.len()));
        for task in &bucket.tasks {
            out.push_str(&format!("  {}\n", format_task_line(task)));
        }
    }
    out
}

pub fn format_counts(counts: &TaskCounts) -> String {
    format!(
        "Today:     {}\nScheduled: {}\nFlagged:   {}\nAll:       {}\nCompleted: {}\nTotal:     {}\n",
        counts.today,
        counts.scheduled,
        counts.flagged,
        counts.incomplete,
        counts.completed,
        counts.total
    )
}
