use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Write;

use crate::alarm::Alarm;

/// Heading shown on every reminder
pub const NOTIFICATION_HEADING: &str = "Task Reminder";

/// Body used when the task has an empty title
pub const DEFAULT_BODY: &str = "Pending Task Reminder";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Derived from the body, so the same title replaces an earlier notification
    pub id: u64,
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(body: &str) -> Self {
        let body = if body.trim().is_empty() {
            DEFAULT_BODY.to_string()
        } else {
            body.to_string()
        };
        Self {
            id: notification_id(&body),
            title: NOTIFICATION_HEADING.to_string(),
            body,
        }
    }

    pub fn for_alarm(alarm: &Alarm) -> Self {
        Self::new(&alarm.title)
    }
}

fn notification_id(body: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    hasher.finish()
}

pub trait Notifier {
    fn notify(&mut self, notification: &Notification);
}

/// Prints reminders to a writer (stdout by default) with a terminal bell
pub struct TerminalNotifier<W: Write = std::io::Stdout> {
    out: W,
    bell: bool,
}

impl TerminalNotifier {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout(), true)
    }
}

impl<W: Write> TerminalNotifier<W> {
    pub fn new(out: W, bell: bool) -> Self {
        Self { out, bell }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Notifier for TerminalNotifier<W> {
    fn notify(&mut self, notification: &Notification) {
        let bell = if self.bell { "\x07" } else { "" };
        let stamp = chrono::Local::now().format("%H:%M");
        let result = writeln!(
            self.out,
            "{}[{}] {}: {}",
            bell, stamp, notification.title, notification.body
        )
        .and_then(|_| self.out.flush());
        match result {
            Ok(()) => log::info!("event=notification_fired id={}", notification.id),
            Err(e) => log::error!("event=notification_fired status=error error={}", e),
        }
    }
}

/// Keeps notifications in memory; used by the TUI and tests
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    pub delivered: Vec<Notification>,
}

impl Notifier for CollectingNotifier {
    fn notify(&mut self, notification: &Notification) {
        self.delivered.push(notification.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_title_uses_default_body() {
        let n = Notification::new("   ");
        assert_eq!(n.body, DEFAULT_BODY);
        assert_eq!(n.title, NOTIFICATION_HEADING);
    }

    #[test]
    fn same_title_same_id() {
        assert_eq!(Notification::new("Buy milk").id, Notification::new("Buy milk").id);
        assert_ne!(Notification::new("Buy milk").id, Notification::new("Buy eggs").id);
    }

    #[test]
    fn terminal_notifier_writes_heading_and_body() {
        let mut notifier = TerminalNotifier::new(Vec::new(), false);
        notifier.notify(&Notification::new("Call mom"));
        let out = String::from_utf8(notifier.into_inner()).unwrap();
        assert!(out.contains("Task Reminder: Call mom"));
        assert!(!out.contains('\x07'));
    }
}
