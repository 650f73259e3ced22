use ratatui::Frame;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use crate::repository::Clock;
use crate::utils::format_key_binding_for_display as key;
use crate::tui::{App, Layout};
use crate::tui::app::{Mode, Row, Screen};
use crate::tui::widgets::{
    tabs::render_tabs,
    task_list::render_task_list,
    item_view::render_item_view,
    status_bar::render_status_bar,
    help::render_help,
    form::render_reminder_form,
    color::parse_color,
    confirm_delete::render_confirm_delete,
};

pub fn render<C: Clock>(f: &mut Frame, app: &mut App<C>, layout: &Layout) {
    let active_theme = app.config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title("Reminders")
        .title_alignment(ratatui::layout::Alignment::Center)
        .style(Style::default().fg(fg_color).bg(bg_color));
    f.render_widget(outer_block, f.area());

    render_tabs(f, layout.tabs_area, app.ui.screen, &app.counts, &app.config);

    let list_title = list_title(app);
    render_task_list(f, layout.sidebar_area, &list_title, &app.rows, &mut app.ui.list_state, &app.config);

    match app.ui.mode {
        Mode::Create => {
            if let Some(form) = app.form.as_mut() {
                render_reminder_form(f, layout.main_area, form, &app.config);
            }
        }
        Mode::Search => render_placeholder(f, layout.main_area, fg_color, "Search", format!("Search: {}", app.search_query)),
        Mode::View | Mode::Detail | Mode::Help => match app.selected_row() {
            Some(Row::Task(task)) => render_item_view(
                f,
                layout.main_area,
                task,
                &app.config,
                app.ui.item_view_scroll,
                app.ui.mode == Mode::Detail,
            ),
            Some(Row::Entry(screen, count)) => render_placeholder(
                f,
                layout.main_area,
                fg_color,
                "Overview",
                format!("{}: {} reminder(s)\n\nPress {} to open", screen.title(), count, key(&app.config.key_bindings.select)),
            ),
            _ => render_placeholder(f, layout.main_area, fg_color, "Reminder", empty_text(app.ui.screen).to_string()),
        },
    }

    if app.ui.mode == Mode::Help {
        render_help(f, f.area(), &app.config);
    }

    if let Some(ref task) = app.modals.delete_confirmation {
        render_confirm_delete(f, f.area(), task, app.modals.delete_modal_selection, &app.config);
    }

    let key_hints = get_key_hints(app);
    render_status_bar(f, layout.status_area, app.status.message.as_ref(), &key_hints, &app.config);
}

fn render_placeholder(f: &mut Frame, area: Rect, fg: Color, title: &str, text: String) {
    let paragraph = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .style(Style::default().fg(fg));
    f.render_widget(paragraph, area);
}

fn list_title<C: Clock>(app: &App<C>) -> String {
    if app.ui.screen == Screen::Home && !app.search_query.is_empty() {
        return format!("Results for \"{}\"", app.search_query);
    }
    match app.ui.screen.count(&app.counts) {
        Some(n) => format!("{} ({})", app.ui.screen.title(), n),
        None => app.ui.screen.title().to_string(),
    }
}

fn empty_text(screen: Screen) -> &'static str {
    match screen {
        Screen::Home => "No matching reminders",
        Screen::Today => "Nothing due today",
        Screen::Scheduled => "No scheduled reminders",
        Screen::Flagged => "No flagged reminders",
        Screen::Completed => "No completed reminders",
        Screen::All => "No reminders yet",
    }
}

pub fn get_key_hints<C: Clock>(app: &App<C>) -> Vec<String> {
    let kb = &app.config.key_bindings;
    if app.modals.delete_confirmation.is_some() {
        return vec!["↑/↓: Choose".to_string(), "Enter: Confirm".to_string(), "Esc: Cancel".to_string()];
    }
    match app.ui.mode {
        Mode::Help => vec![format!("Esc or {}: Exit help", key(&kb.help))],
        Mode::Search => vec![
            "Enter: Keep results".to_string(),
            "Esc: Exit search".to_string(),
        ],
        Mode::Create => vec![
            "Tab: Next field".to_string(),
            "Shift+Tab: Previous field".to_string(),
            format!("{}: Save", key(&kb.save)),
            "Esc: Cancel".to_string(),
        ],
        Mode::Detail => vec![
            "↑/↓: Scroll".to_string(),
            format!("{}: Back", key(&kb.back)),
            format!("{}: Copy", key(&kb.copy)),
        ],
        Mode::View => {
            let mut hints = vec![
                format!("{}: Quit", key(&kb.quit)),
                format!("{}: New", key(&kb.new)),
                format!("{}: Done", key(&kb.toggle_complete)),
                format!("{}: Flag", key(&kb.toggle_flag)),
                format!("{}: Delete", key(&kb.delete)),
                format!("{}: Search", key(&kb.search)),
            ];
            if app.ui.screen == Screen::Completed {
                hints.push(format!("{}: Clear completed", key(&kb.clear_completed)));
            }
            if app.last_deleted.is_some() {
                hints.push(format!("{}: Undo", key(&kb.undo)));
            }
            hints.push(format!("{}: Help", key(&kb.help)));
            hints
        }
    }
}
