use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, size as terminal_size};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::Terminal;
use std::io;
use std::time::Duration;
use crate::config::KeyBindings;
use crate::repository::Clock;
use crate::tui::App;
use crate::tui::app::{FormField, Mode, Screen};
use crate::tui::error::TuiError;
use crate::tui::layout::Layout;
use crate::tui::widgets::confirm_delete::DELETE_OPTIONS;
use crate::utils::{has_primary_modifier, parse_key_binding, ParsedKeyBinding};

/// Restores the terminal on drop, including during a panic unwind
struct TerminalGuard {
    raw_mode_enabled: bool,
    alternate_screen_enabled: bool,
}

impl TerminalGuard {
    fn new() -> Result<Self, TuiError> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        Ok(Self {
            raw_mode_enabled: true,
            alternate_screen_enabled: true,
        })
    }

    /// Restore on normal exit; drop is a no-op afterwards
    fn restore(&mut self) -> Result<(), TuiError> {
        if self.raw_mode_enabled {
            disable_raw_mode()?;
            self.raw_mode_enabled = false;
        }
        if self.alternate_screen_enabled {
            execute!(io::stdout(), LeaveAlternateScreen)?;
            self.alternate_screen_enabled = false;
        }
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.raw_mode_enabled {
            let _ = disable_raw_mode();
        }
        if self.alternate_screen_enabled {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        }
    }
}

/// Parsed form of every configured binding
pub struct KeyMap {
    pub quit: ParsedKeyBinding,
    pub new: ParsedKeyBinding,
    pub delete: ParsedKeyBinding,
    pub search: ParsedKeyBinding,
    pub select: ParsedKeyBinding,
    pub back: ParsedKeyBinding,
    pub list_up: ParsedKeyBinding,
    pub list_down: ParsedKeyBinding,
    pub tab_left: ParsedKeyBinding,
    pub tab_right: ParsedKeyBinding,
    pub help: ParsedKeyBinding,
    pub undo: ParsedKeyBinding,
    pub toggle_complete: ParsedKeyBinding,
    pub toggle_flag: ParsedKeyBinding,
    pub copy: ParsedKeyBinding,
    pub clear_completed: ParsedKeyBinding,
    pub save: ParsedKeyBinding,
}

impl KeyMap {
    pub fn from_bindings(kb: &KeyBindings) -> Result<Self, TuiError> {
        let parse = |s: &str| parse_key_binding(s).map_err(TuiError::KeyBindingError);
        Ok(Self {
            quit: parse(&kb.quit)?,
            new: parse(&kb.new)?,
            delete: parse(&kb.delete)?,
            search: parse(&kb.search)?,
            select: parse(&kb.select)?,
            back: parse(&kb.back)?,
            list_up: parse(&kb.list_up)?,
            list_down: parse(&kb.list_down)?,
            tab_left: parse(&kb.tab_left)?,
            tab_right: parse(&kb.tab_right)?,
            help: parse(&kb.help)?,
            undo: parse(&kb.undo)?,
            toggle_complete: parse(&kb.toggle_complete)?,
            toggle_flag: parse(&kb.toggle_flag)?,
            copy: parse(&kb.copy)?,
            clear_completed: parse(&kb.clear_completed)?,
            save: parse(&kb.save)?,
        })
    }
}

pub fn run_event_loop<C: Clock>(mut app: App<C>) -> Result<(), TuiError> {
    // Checked before entering the alternate screen so the message stays visible
    let (width, height) = terminal_size()?;
    let min_width_with_border = Layout::MIN_WIDTH + 2;
    let min_height_with_border = Layout::MIN_HEIGHT + 2;
    if width < min_width_with_border || height < min_height_with_border {
        return Err(TuiError::RenderError(format!(
            "Terminal size too small. Current: {}x{}, Minimum required: {}x{}. Please resize your terminal window.",
            width, height, min_width_with_border, min_height_with_border
        )));
    }

    let keys = KeyMap::from_bindings(&app.config.key_bindings)?;

    let mut guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;
    log::info!("event=tui_loop status=started");

    loop {
        app.tick();

        let terminal_size = terminal.size()?;
        let terminal_rect = Rect::new(0, 0, terminal_size.width, terminal_size.height);
        terminal.draw(|f| {
            let layout = Layout::calculate(terminal_rect, app.config.sidebar_width_percent);
            crate::tui::render::render(f, &mut app, &layout);
        })?;

        // Alarms are checked on every tick, so the poll timeout bounds their latency
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key_event) = event::read()? {
                // Windows reports both press and release
                if key_event.kind == KeyEventKind::Press && handle_key_event(&mut app, &keys, key_event) {
                    break;
                }
            }
        }
    }

    guard.restore()?;
    log::info!("event=tui_loop status=stopped");
    Ok(())
}

/// Dispatch one key press; returns true when the user asked to quit
pub fn handle_key_event<C: Clock>(app: &mut App<C>, keys: &KeyMap, key_event: KeyEvent) -> bool {
    if app.modals.delete_confirmation.is_some() {
        handle_delete_confirmation_modal(app, key_event);
        return false;
    }

    match app.ui.mode {
        Mode::Create => handle_create_mode(app, keys, key_event),
        Mode::Help => {
            if key_event.code == KeyCode::Esc || matches_key_event(key_event, &keys.help) {
                app.exit_to_view();
            }
        }
        Mode::Search => handle_search_mode(app, key_event),
        Mode::Detail => handle_detail_mode(app, keys, key_event),
        Mode::View => return handle_view_mode(app, keys, key_event),
    }
    false
}

fn handle_delete_confirmation_modal<C: Clock>(app: &mut App<C>, key_event: KeyEvent) {
    let options = DELETE_OPTIONS.len();
    match key_event.code {
        KeyCode::Up => {
            app.modals.delete_modal_selection = (app.modals.delete_modal_selection + options - 1) % options;
        }
        KeyCode::Down | KeyCode::Tab => {
            app.modals.delete_modal_selection = (app.modals.delete_modal_selection + 1) % options;
        }
        KeyCode::Enter => app.confirm_delete(),
        KeyCode::Esc => {
            app.modals.delete_confirmation = None;
            app.modals.delete_modal_selection = 0;
        }
        _ => {}
    }
}

fn handle_view_mode<C: Clock>(app: &mut App<C>, keys: &KeyMap, key_event: KeyEvent) -> bool {
    if matches_key_event(key_event, &keys.quit) {
        return true;
    }

    if matches_key_event(key_event, &keys.help) {
        app.enter_help_mode();
    } else if matches_key_event(key_event, &keys.new) {
        app.enter_create_mode();
    } else if matches_key_event(key_event, &keys.search) {
        app.enter_search_mode();
    } else if matches_key_event(key_event, &keys.select) {
        app.activate_selected();
    } else if matches_key_event(key_event, &keys.back) {
        if app.ui.screen != Screen::Home || !app.search_query.is_empty() {
            app.search_query.clear();
            app.switch_screen(Screen::Home);
        }
    } else if matches_key_event(key_event, &keys.list_up) || key_event.code == KeyCode::Up {
        app.move_selection_up();
    } else if matches_key_event(key_event, &keys.list_down) || key_event.code == KeyCode::Down {
        app.move_selection_down();
    } else if matches_key_event(key_event, &keys.tab_left) {
        app.next_screen(false);
    } else if matches_key_event(key_event, &keys.tab_right) {
        app.next_screen(true);
    } else if matches_key_event(key_event, &keys.toggle_complete) {
        app.toggle_selected_completion();
    } else if matches_key_event(key_event, &keys.toggle_flag) {
        app.toggle_selected_flag();
    } else if matches_key_event(key_event, &keys.delete) {
        app.request_delete();
    } else if matches_key_event(key_event, &keys.undo) {
        app.undo_delete();
    } else if matches_key_event(key_event, &keys.copy) {
        app.copy_selected();
    } else if matches_key_event(key_event, &keys.clear_completed) {
        app.clear_completed();
    }
    false
}

fn handle_detail_mode<C: Clock>(app: &mut App<C>, keys: &KeyMap, key_event: KeyEvent) {
    if key_event.code == KeyCode::Esc || matches_key_event(key_event, &keys.back) {
        app.exit_to_view();
    } else if matches_key_event(key_event, &keys.list_up) || key_event.code == KeyCode::Up {
        app.scroll_item_view_up();
    } else if matches_key_event(key_event, &keys.list_down) || key_event.code == KeyCode::Down {
        app.scroll_item_view_down();
    } else if matches_key_event(key_event, &keys.copy) {
        app.copy_selected();
    } else if matches_key_event(key_event, &keys.toggle_complete) {
        app.toggle_selected_completion();
        app.exit_to_view();
    } else if matches_key_event(key_event, &keys.toggle_flag) {
        app.toggle_selected_flag();
    }
}

fn handle_search_mode<C: Clock>(app: &mut App<C>, key_event: KeyEvent) {
    match key_event.code {
        KeyCode::Esc => app.exit_search_mode(false),
        KeyCode::Enter => app.exit_search_mode(true),
        KeyCode::Backspace => app.remove_from_search(),
        KeyCode::Up => app.move_selection_up(),
        KeyCode::Down => app.move_selection_down(),
        KeyCode::Char(c) if !has_primary_modifier(key_event.modifiers) => app.add_to_search(c),
        _ => {}
    }
}

fn handle_create_mode<C: Clock>(app: &mut App<C>, keys: &KeyMap, key_event: KeyEvent) {
    if key_event.code == KeyCode::Esc {
        app.exit_create_mode();
        return;
    }
    if matches_key_event(key_event, &keys.save) {
        app.save_form();
        return;
    }

    let Some(form) = app.form.as_mut() else {
        return;
    };
    match key_event.code {
        KeyCode::Tab => return form.navigate(true),
        KeyCode::BackTab => return form.navigate(false),
        _ => {}
    }

    let field = form.current_field;
    if field == FormField::Flag {
        match key_event.code {
            KeyCode::Char(' ') | KeyCode::Enter => form.flag = !form.flag,
            KeyCode::Up => form.navigate(false),
            KeyCode::Down => form.navigate(true),
            _ => {}
        }
        return;
    }

    let multi_line = field == FormField::Notes;
    // Enter only breaks lines in notes; elsewhere it advances
    if key_event.code == KeyCode::Enter && !multi_line {
        form.navigate(true);
        return;
    }
    let Some(editor) = form.current_editor() else {
        return;
    };
    match key_event.code {
        KeyCode::Char(c) if !has_primary_modifier(key_event.modifiers) => editor.insert_char(c),
        KeyCode::Backspace => editor.delete_char(),
        KeyCode::Enter => editor.insert_newline(),
        KeyCode::Left => editor.move_cursor_left(),
        KeyCode::Right => editor.move_cursor_right(),
        KeyCode::Up if multi_line => editor.move_cursor_up(),
        KeyCode::Down if multi_line => editor.move_cursor_down(),
        KeyCode::Up => form.navigate(false),
        KeyCode::Down => form.navigate(true),
        KeyCode::Home => editor.move_cursor_home(),
        KeyCode::End => editor.move_cursor_end(),
        _ => {}
    }
}

fn matches_key_event(key_event: KeyEvent, binding: &ParsedKeyBinding) -> bool {
    // Ctrl on Windows/Linux, Option/Alt on macOS
    if binding.requires_ctrl != has_primary_modifier(key_event.modifiers) {
        return false;
    }
    binding.key_code == key_event.code
}
