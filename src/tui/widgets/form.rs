use ratatui::widgets::{Block, Borders, Paragraph, Clear};
use ratatui::style::{Style, Modifier};
use ratatui::Frame;
use ratatui::layout::{Rect, Constraint, Layout, Direction};
use ratatui::text::{Line, Span};
use crate::Config;
use crate::tui::app::{FormField, ReminderForm};
use crate::tui::widgets::editor::Editor;
use crate::tui::widgets::color::{parse_color, get_contrast_text_color};

struct FieldStyles {
    base: Style,
    focused_border: Style,
    border: Style,
}

fn field_block(title: &'static str, focused: bool, styles: &FieldStyles) -> Block<'static> {
    let (border_style, title_style) = if focused {
        (styles.focused_border, styles.focused_border.add_modifier(Modifier::BOLD))
    } else {
        (styles.border, styles.border)
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled(title, title_style))
        .style(styles.base)
}

/// Draw one editor inside its bordered area; returns the cursor position when focused
fn render_editor_field(
    f: &mut Frame,
    area: Rect,
    field: FormField,
    editor: &mut Editor,
    focused: bool,
    styles: &FieldStyles,
) -> Option<(u16, u16)> {
    let viewport_height = area.height.saturating_sub(2) as usize;
    editor.update_scroll(viewport_height);

    let lines: Vec<Line> = editor
        .visible_lines(viewport_height)
        .iter()
        .map(|l| Line::from(l.clone()))
        .collect();
    let paragraph = Paragraph::new(lines).block(field_block(field.label(), focused, styles));
    f.render_widget(paragraph, area);

    if focused {
        editor.cursor_screen_pos(area)
    } else {
        None
    }
}

pub fn render_reminder_form(f: &mut Frame, area: Rect, form: &mut ReminderForm, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let styles = FieldStyles {
        base: Style::default().fg(fg_color).bg(bg_color),
        focused_border: Style::default().fg(highlight_bg),
        border: Style::default().fg(fg_color),
    };

    f.render_widget(Clear, area);
    let outer = Block::default()
        .borders(Borders::ALL)
        .title("New Reminder")
        .style(styles.base);
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(3),    // Notes
            Constraint::Length(3), // Date
            Constraint::Length(3), // Time
            Constraint::Length(3), // Flag
        ])
        .split(inner);

    let current = form.current_field;
    let mut cursor = None;
    let editors = [
        (FormField::Title, chunks[0]),
        (FormField::Notes, chunks[1]),
        (FormField::Date, chunks[2]),
        (FormField::Time, chunks[3]),
    ];
    for (field, field_area) in editors {
        let editor = match field {
            FormField::Title => &mut form.title,
            FormField::Notes => &mut form.notes,
            FormField::Date => &mut form.date,
            _ => &mut form.time,
        };
        if let Some(pos) = render_editor_field(f, field_area, field, editor, current == field, &styles) {
            cursor = Some(pos);
        }
    }

    let flag_focused = current == FormField::Flag;
    let checkbox = if form.flag { "[x] Flagged" } else { "[ ] Flagged" };
    let checkbox_style = if flag_focused {
        Style::default().fg(get_contrast_text_color(highlight_bg)).bg(highlight_bg)
    } else {
        styles.base
    };
    let flag = Paragraph::new(Line::from(Span::styled(checkbox, checkbox_style)))
        .block(field_block(FormField::Flag.label(), flag_focused, &styles));
    f.render_widget(flag, chunks[4]);

    if let Some((x, y)) = cursor {
        f.set_cursor_position((x, y));
    }
}
