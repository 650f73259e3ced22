use crate::Config;
use crate::models::{NewTask, Task, TaskCounts};
use crate::notification::CollectingNotifier;
use crate::repository::{Clock, CountsSubscription, SystemClock};
use crate::service::{ServiceError, TaskService};
use crate::tui::error::TuiError;
use crate::tui::widgets::editor::Editor;
use crate::tui::widgets::item_view::get_content_string;
use crate::utils::{normalize_date_input, normalize_time_input};
use ratatui::widgets::ListState;
use chrono::NaiveDate;
use std::time::{Duration, Instant};

/// One screen per task view, plus the home overview
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Today,
    Scheduled,
    Flagged,
    Completed,
    All,
}

impl Screen {
    pub const ALL: [Screen; 6] = [
        Screen::Home,
        Screen::Today,
        Screen::Scheduled,
        Screen::Flagged,
        Screen::Completed,
        Screen::All,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Screen::Home => "Home",
            Screen::Today => "Today",
            Screen::Scheduled => "Scheduled",
            Screen::Flagged => "Flagged",
            Screen::Completed => "Completed",
            Screen::All => "All",
        }
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    /// Counter shown next to the screen name
    pub fn count(self, counts: &TaskCounts) -> Option<i64> {
        match self {
            Screen::Home => None,
            Screen::Today => Some(counts.today),
            Screen::Scheduled => Some(counts.scheduled),
            Screen::Flagged => Some(counts.flagged),
            Screen::Completed => Some(counts.completed),
            Screen::All => Some(counts.incomplete),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    View,
    Detail,
    Search,
    Help,
    Create,
}

/// A line in the list pane
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Header(String),
    Entry(Screen, i64),
    Task(Task),
}

impl Row {
    pub fn is_selectable(&self) -> bool {
        !matches!(self, Row::Header(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Notes,
    Date,
    Time,
    Flag,
}

impl FormField {
    const ORDER: [FormField; 5] = [
        FormField::Title,
        FormField::Notes,
        FormField::Date,
        FormField::Time,
        FormField::Flag,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormField::Title => "Title",
            FormField::Notes => "Notes",
            FormField::Date => "Date (YYYY-MM-DD, today, tomorrow)",
            FormField::Time => "Time (HH:MM)",
            FormField::Flag => "Flag",
        }
    }

    fn step(self, forward: bool) -> Self {
        let len = Self::ORDER.len();
        let i = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        let next = if forward { (i + 1) % len } else { (i + len - 1) % len };
        Self::ORDER[next]
    }
}

#[derive(Debug, Clone)]
pub struct ReminderForm {
    pub current_field: FormField,
    pub title: Editor,
    pub notes: Editor,
    pub date: Editor,
    pub time: Editor,
    pub flag: bool,
}

impl ReminderForm {
    /// Screens that imply a date or flag pre-fill the form with it
    pub fn for_screen(screen: Screen) -> Self {
        let date = match screen {
            Screen::Today => Editor::from_string("today".to_string()),
            _ => Editor::new(),
        };
        Self {
            current_field: FormField::Title,
            title: Editor::new(),
            notes: Editor::new(),
            date,
            time: Editor::new(),
            flag: screen == Screen::Flagged,
        }
    }

    pub fn current_editor(&mut self) -> Option<&mut Editor> {
        match self.current_field {
            FormField::Title => Some(&mut self.title),
            FormField::Notes => Some(&mut self.notes),
            FormField::Date => Some(&mut self.date),
            FormField::Time => Some(&mut self.time),
            FormField::Flag => None,
        }
    }

    pub fn navigate(&mut self, forward: bool) {
        self.current_field = self.current_field.step(forward);
    }
}

#[derive(Debug, Clone)]
pub struct UiState {
    pub screen: Screen,
    pub mode: Mode,
    pub selected_index: usize,
    pub list_state: ListState,
    pub item_view_scroll: usize,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            screen: Screen::Home,
            mode: Mode::View,
            selected_index: 0,
            list_state: ListState::default(),
            item_view_scroll: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModalState {
    pub delete_confirmation: Option<Task>,
    /// 0 = Delete, 1 = Cancel
    pub delete_modal_selection: usize,
}

#[derive(Debug, Clone, Default)]
pub struct StatusState {
    pub message: Option<String>,
    pub message_time: Option<Instant>,
}

pub struct App<C: Clock = SystemClock> {
    pub config: Config,
    pub service: TaskService<C>,

    pub rows: Vec<Row>,
    pub counts: TaskCounts,
    counts_rx: CountsSubscription,
    /// Last deleted task, restorable with undo
    pub last_deleted: Option<Task>,
    fired: CollectingNotifier,
    last_sync: Instant,
    synced_day: NaiveDate,

    pub ui: UiState,
    pub modals: ModalState,
    pub status: StatusState,
    pub search_query: String,
    pub form: Option<ReminderForm>,
}

impl<C: Clock> App<C> {
    pub fn new(config: Config, mut service: TaskService<C>) -> Result<Self, TuiError> {
        let counts_rx = service.subscribe()?;
        let queued = service.load_alarms()?;
        log::info!("event=tui_start alarms_queued={}", queued);
        let synced_day = service.repository().clock().today();

        let mut app = Self {
            config,
            service,
            rows: Vec::new(),
            counts: TaskCounts::default(),
            counts_rx,
            last_deleted: None,
            fired: CollectingNotifier::default(),
            last_sync: Instant::now(),
            synced_day,
            ui: UiState::default(),
            modals: ModalState::default(),
            status: StatusState::default(),
            search_query: String::new(),
            form: None,
        };
        app.poll_counts();
        app.reload()?;
        Ok(app)
    }

    /// Rebuild the list pane for the current screen
    pub fn reload(&mut self) -> Result<(), ServiceError> {
        self.rows = match self.ui.screen {
            Screen::Home if !self.search_query.trim().is_empty() => self
                .service
                .search(&self.search_query)?
                .into_iter()
                .map(Row::Task)
                .collect(),
            Screen::Home => Screen::ALL[1..]
                .iter()
                .map(|s| Row::Entry(*s, s.count(&self.counts).unwrap_or(0)))
                .collect(),
            Screen::Today => {
                let parts = self.service.today()?;
                let mut rows = Vec::new();
                for (category, tasks) in parts.sections() {
                    rows.push(Row::Header(format!("{} ({})", category.heading(), tasks.len())));
                    rows.extend(tasks.iter().cloned().map(Row::Task));
                }
                rows
            }
            Screen::Scheduled => {
                let mut rows = Vec::new();
                for bucket in self.service.scheduled()? {
                    rows.push(Row::Header(format!("{} ({})", bucket.label, bucket.tasks.len())));
                    rows.extend(bucket.tasks.into_iter().map(Row::Task));
                }
                rows
            }
            Screen::Flagged => self.service.flagged()?.into_iter().map(Row::Task).collect(),
            Screen::Completed => self.service.completed()?.into_iter().map(Row::Task).collect(),
            Screen::All => self.service.incomplete()?.into_iter().map(Row::Task).collect(),
        };
        self.adjust_selected_index();
        Ok(())
    }

    fn reload_or_report(&mut self) {
        if let Err(e) = self.reload() {
            self.set_status_message(format!("Failed to reload: {}", e));
        }
    }

    /// Drain count snapshots; the latest one wins
    pub fn poll_counts(&mut self) -> bool {
        let mut changed = false;
        while let Ok(counts) = self.counts_rx.try_recv() {
            changed |= counts != self.counts;
            self.counts = counts;
        }
        changed
    }

    /// Per-frame housekeeping: counts, store resync, due alarms, status timeout
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    pub fn tick_at(&mut self, now: Instant) {
        let interval = Duration::from_secs(self.config.resync_interval_secs);
        let today = self.service.repository().clock().today();
        if now.saturating_duration_since(self.last_sync) >= interval || today != self.synced_day {
            self.resync(now, today);
        }

        if self.poll_counts() && self.ui.screen == Screen::Home && self.search_query.is_empty() {
            self.reload_or_report();
        }

        self.service.fire_due(&mut self.fired);
        if let Some(last) = self.fired.delivered.last().cloned() {
            let message = if self.fired.delivered.len() > 1 {
                format!("{}: {} (+{} more)", last.title, last.body, self.fired.delivered.len() - 1)
            } else {
                format!("{}: {}", last.title, last.body)
            };
            self.fired.delivered.clear();
            self.set_status_message(message);
        }

        self.check_status_message_timeout();
    }

    /// Pick up changes made outside this session and roll the date-based views
    fn resync(&mut self, now: Instant, today: NaiveDate) {
        match self.service.resync_alarms() {
            Ok(queued) => log::debug!("event=tui_resync queued={}", queued),
            Err(e) => log::error!("event=tui_resync status=error error={}", e),
        }
        match self.service.counts() {
            Ok(counts) => self.counts = counts,
            Err(e) => log::error!("event=tui_counts status=error error={}", e),
        }
        self.last_sync = now;
        self.synced_day = today;
        self.reload_or_report();
    }

    pub fn selected_row(&self) -> Option<&Row> {
        self.rows.get(self.ui.selected_index)
    }

    pub fn selected_task(&self) -> Option<&Task> {
        match self.selected_row() {
            Some(Row::Task(task)) => Some(task),
            _ => None,
        }
    }

    pub fn sync_list_state(&mut self) {
        self.ui.list_state.select(if self.rows.is_empty() {
            None
        } else {
            Some(self.ui.selected_index)
        });
    }

    /// Clamp the selection and move it off headers
    pub fn adjust_selected_index(&mut self) {
        if self.rows.is_empty() {
            self.ui.selected_index = 0;
        } else {
            self.ui.selected_index = self.ui.selected_index.min(self.rows.len() - 1);
            if !self.rows[self.ui.selected_index].is_selectable() {
                let forward = (self.ui.selected_index..self.rows.len())
                    .find(|i| self.rows[*i].is_selectable());
                let backward = (0..self.ui.selected_index)
                    .rev()
                    .find(|i| self.rows[*i].is_selectable());
                if let Some(i) = forward.or(backward) {
                    self.ui.selected_index = i;
                }
            }
        }
        self.ui.item_view_scroll = 0;
        self.sync_list_state();
    }

    pub fn move_selection_up(&mut self) {
        if let Some(i) = (0..self.ui.selected_index)
            .rev()
            .find(|i| self.rows[*i].is_selectable())
        {
            self.ui.selected_index = i;
            self.ui.item_view_scroll = 0;
            self.sync_list_state();
        }
    }

    pub fn move_selection_down(&mut self) {
        if let Some(i) = (self.ui.selected_index + 1..self.rows.len())
            .find(|i| self.rows[*i].is_selectable())
        {
            self.ui.selected_index = i;
            self.ui.item_view_scroll = 0;
            self.sync_list_state();
        }
    }

    pub fn switch_screen(&mut self, screen: Screen) {
        self.ui.screen = screen;
        self.ui.mode = Mode::View;
        self.ui.selected_index = 0;
        if screen != Screen::Home {
            self.search_query.clear();
        }
        self.reload_or_report();
    }

    pub fn next_screen(&mut self, forward: bool) {
        let len = Screen::ALL.len();
        let i = self.ui.screen.index();
        let next = if forward { (i + 1) % len } else { (i + len - 1) % len };
        self.switch_screen(Screen::ALL[next]);
    }

    /// Enter: open a home entry, or focus the detail pane for a task
    pub fn activate_selected(&mut self) {
        match self.selected_row().cloned() {
            Some(Row::Entry(screen, _)) => self.switch_screen(screen),
            Some(Row::Task(_)) => self.ui.mode = Mode::Detail,
            _ => {}
        }
    }

    pub fn set_status_message(&mut self, message: String) {
        self.status.message = Some(message);
        self.status.message_time = Some(Instant::now());
    }

    pub fn clear_status_message(&mut self) {
        self.status.message = None;
        self.status.message_time = None;
    }

    /// Auto-clear the status message after a few seconds
    pub fn check_status_message_timeout(&mut self) {
        const STATUS_MESSAGE_TIMEOUT_SECS: u64 = 4;
        if let Some(time) = self.status.message_time {
            if time.elapsed().as_secs() >= STATUS_MESSAGE_TIMEOUT_SECS {
                self.clear_status_message();
            }
        }
    }

    pub fn enter_search_mode(&mut self) {
        if self.ui.screen != Screen::Home {
            self.ui.screen = Screen::Home;
        }
        self.ui.mode = Mode::Search;
        self.search_query.clear();
        self.reload_or_report();
    }

    pub fn exit_search_mode(&mut self, keep_results: bool) {
        self.ui.mode = Mode::View;
        if !keep_results {
            self.search_query.clear();
        }
        self.reload_or_report();
    }

    pub fn add_to_search(&mut self, ch: char) {
        self.search_query.push(ch);
        self.ui.selected_index = 0;
        self.reload_or_report();
    }

    pub fn remove_from_search(&mut self) {
        self.search_query.pop();
        self.ui.selected_index = 0;
        self.reload_or_report();
    }

    pub fn enter_help_mode(&mut self) {
        self.ui.mode = Mode::Help;
    }

    pub fn exit_to_view(&mut self) {
        self.ui.mode = Mode::View;
    }

    pub fn enter_create_mode(&mut self) {
        self.form = Some(ReminderForm::for_screen(self.ui.screen));
        self.ui.mode = Mode::Create;
    }

    pub fn exit_create_mode(&mut self) {
        self.form = None;
        self.ui.mode = Mode::View;
    }

    /// Validate the form and store the reminder; the form stays open on error
    pub fn save_form(&mut self) {
        let Some(form) = self.form.as_ref() else {
            return;
        };
        let title = form.title.to_string();
        let notes = Some(form.notes.to_string());
        let date_input = form.date.to_string();
        let time_input = form.time.to_string();
        let flag = form.flag;
        let today = self.service.repository().clock().today();

        let date = if date_input.trim().is_empty() {
            None
        } else {
            match normalize_date_input(&date_input, today) {
                Ok(d) => Some(d),
                Err(e) => return self.set_status_message(e),
            }
        };
        let time = if time_input.trim().is_empty() {
            None
        } else {
            match normalize_time_input(&time_input) {
                Ok(t) => Some(t),
                Err(e) => return self.set_status_message(e),
            }
        };
        let input = NewTask { title, notes, date, time, flag };

        match self.service.save_task(input) {
            Ok(task) => {
                self.exit_create_mode();
                self.reload_or_report();
                self.set_status_message(format!("Reminder saved: {}", task.title));
            }
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    pub fn toggle_selected_completion(&mut self) {
        let Some(task) = self.selected_task().cloned() else {
            return;
        };
        match self.service.toggle_completion(task.id, !task.is_completed) {
            Ok(updated) => {
                self.reload_or_report();
                let verb = if updated.is_completed { "Completed" } else { "Reopened" };
                self.set_status_message(format!("{}: {}", verb, updated.title));
            }
            Err(e) => self.set_status_message(format!("Failed to update reminder: {}", e)),
        }
    }

    pub fn toggle_selected_flag(&mut self) {
        let Some(id) = self.selected_task().map(|t| t.id) else {
            return;
        };
        match self.service.toggle_flag(id) {
            Ok(updated) => {
                self.reload_or_report();
                let verb = if updated.flag { "Flagged" } else { "Unflagged" };
                self.set_status_message(format!("{}: {}", verb, updated.title));
            }
            Err(e) => self.set_status_message(format!("Failed to update reminder: {}", e)),
        }
    }

    pub fn request_delete(&mut self) {
        if let Some(task) = self.selected_task().cloned() {
            self.modals.delete_confirmation = Some(task);
            self.modals.delete_modal_selection = 0;
        }
    }

    pub fn confirm_delete(&mut self) {
        let Some(task) = self.modals.delete_confirmation.take() else {
            return;
        };
        if self.modals.delete_modal_selection != 0 {
            return;
        }
        match self.service.delete_task(task.id) {
            Ok(deleted) => {
                let undo = crate::utils::format_key_binding_for_display(&self.config.key_bindings.undo);
                self.set_status_message(format!("Deleted: {} ({} to undo)", deleted.title, undo));
                self.last_deleted = Some(deleted);
                self.reload_or_report();
            }
            Err(e) => self.set_status_message(format!("Failed to delete reminder: {}", e)),
        }
    }

    pub fn undo_delete(&mut self) {
        let Some(task) = self.last_deleted.take() else {
            self.set_status_message("Nothing to undo".to_string());
            return;
        };
        match self.service.undo_delete(task) {
            Ok(restored) => {
                self.reload_or_report();
                self.set_status_message(format!("Restored: {}", restored.title));
            }
            Err(e) => self.set_status_message(format!("Failed to restore reminder: {}", e)),
        }
    }

    pub fn clear_completed(&mut self) {
        if self.ui.screen != Screen::Completed {
            return;
        }
        match self.service.delete_completed() {
            Ok(removed) => {
                self.reload_or_report();
                self.set_status_message(format!("Removed {} completed reminder(s)", removed));
            }
            Err(e) => self.set_status_message(format!("Failed to clear completed: {}", e)),
        }
    }

    /// Copy the selected task as markdown to the system clipboard
    pub fn copy_selected(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        let content = get_content_string(task);
        let result = arboard::Clipboard::new().and_then(|mut cb| cb.set_text(content));
        match result {
            Ok(()) => self.set_status_message("Copied to clipboard".to_string()),
            Err(e) => {
                log::warn!("event=clipboard_copy status=error error={}", e);
                self.set_status_message(format!("Clipboard unavailable: {}", e));
            }
        }
    }

    pub fn scroll_item_view_up(&mut self) {
        self.ui.item_view_scroll = self.ui.item_view_scroll.saturating_sub(1);
    }

    pub fn scroll_item_view_down(&mut self) {
        self.ui.item_view_scroll = self.ui.item_view_scroll.saturating_add(1);
    }
}
