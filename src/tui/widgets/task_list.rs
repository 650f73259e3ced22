use ratatui::widgets::{Block, Borders, List, ListItem, StatefulWidget, Scrollbar, ScrollbarState, ScrollbarOrientation};
use ratatui::style::{Modifier, Style};
use ratatui::Frame;
use ratatui::layout::{Rect, Layout, Direction, Constraint};
use ratatui::widgets::ListState;
use ratatui::text::{Line, Span};
use crate::models::Task;
use crate::Config;
use crate::tui::app::Row;
use crate::tui::widgets::color::{parse_color, get_contrast_text_color};

fn truncate(text: String, max_width: usize) -> String {
    if text.chars().count() > max_width {
        text.chars().take(max_width.saturating_sub(3)).collect::<String>() + "..."
    } else {
        text
    }
}

/// "○ Title [2024-03-15 09:30]"
pub fn task_label(task: &Task) -> String {
    let status_indicator = if task.is_completed { "✓" } else { "○" };
    let when: Vec<&str> = [task.date.as_deref(), task.time.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if when.is_empty() {
        format!("{} {}", status_indicator, task.title)
    } else {
        format!("{} {} [{}]", status_indicator, task.title, when.join(" "))
    }
}

pub fn render_task_list(
    f: &mut Frame,
    area: Rect,
    title: &str,
    rows: &[Row],
    list_state: &mut ListState,
    config: &Config,
) {
    // borders + padding
    let max_width = area.width.saturating_sub(4) as usize;

    let active_theme = config.get_active_theme();
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let highlight_fg = if active_theme.highlight_fg.is_empty() {
        get_contrast_text_color(highlight_bg)
    } else {
        parse_color(&active_theme.highlight_fg)
    };
    let header_style = Style::default()
        .fg(parse_color(&active_theme.tab_bg))
        .add_modifier(Modifier::BOLD);
    let flag_style = Style::default().fg(parse_color(&active_theme.flag_fg));

    let items: Vec<ListItem> = rows
        .iter()
        .map(|row| match row {
            Row::Header(label) => ListItem::new(truncate(label.clone(), max_width)).style(header_style),
            Row::Entry(screen, count) => {
                let name = screen.title();
                let pad = max_width.saturating_sub(name.chars().count() + count.to_string().len()).max(1);
                ListItem::new(format!("{}{}{}", name, " ".repeat(pad), count))
            }
            Row::Task(task) => {
                let label = truncate(task_label(task), max_width.saturating_sub(2));
                let mut spans = vec![Span::raw(label)];
                if task.flag {
                    spans.push(Span::styled(" ⚑", flag_style));
                }
                ListItem::new(Line::from(spans))
            }
        })
        .collect();

    let list_areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1), // Scrollbar
        ])
        .split(area);

    let list_area = list_areas[0];
    let scrollbar_area = list_areas[1];

    let total_items = items.len();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .style(Style::default().fg(parse_color(&active_theme.fg)))
        .highlight_style(
            Style::default()
                .fg(highlight_fg)
                .bg(highlight_bg)
        );

    StatefulWidget::render(list, list_area, f.buffer_mut(), list_state);

    let visible_items = list_area.height.saturating_sub(2) as usize;
    if total_items > visible_items && scrollbar_area.width > 0 && list_area.height > 2 {
        let scrollbar_inner_area = Rect::new(
            scrollbar_area.x,
            list_area.y + 1, // Start after top border
            scrollbar_area.width,
            list_area.height.saturating_sub(2),
        );

        let selected_index = list_state.selected().unwrap_or(0);
        let scroll_position = selected_index.saturating_sub(visible_items.saturating_sub(1));

        let mut scrollbar_state = ScrollbarState::new(total_items)
            .viewport_content_length(visible_items)
            .position(scroll_position);

        let scrollbar = Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"))
            .track_symbol(Some("│"))
            .thumb_symbol("█");

        f.render_stateful_widget(scrollbar, scrollbar_inner_area, &mut scrollbar_state);
    }
}
