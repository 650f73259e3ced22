use ratatui::widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarState};
use ratatui::style::Style;
use ratatui::Frame;
use ratatui::layout::{Rect, Layout as RatLayout, Direction, Constraint};
use ratatui::text::{Text, Line, Span};
use crate::models::Task;
use crate::Config;
use crate::tui::widgets::color::parse_color;
use ratskin::RatSkin;
use termimad::minimad::Text as MinimadText;
use std::cmp;

/// Task as markdown; used for the detail pane and clipboard copy
pub fn get_content_string(task: &Task) -> String {
    let mut content = format!("**Title:** {}\n", task.title);
    let status = if task.is_completed { "done" } else { "open" };
    content.push_str(&format!("**Status:** {}\n", status));

    if let Some(ref date) = task.date {
        content.push_str(&format!("**Date:** {}\n", date));
    }
    if let Some(ref time) = task.time {
        content.push_str(&format!("**Time:** {}", time));
        if let Some(category) = task.time_category {
            content.push_str(&format!(" ({})", category.heading()));
        }
        content.push('\n');
    }
    if task.flag {
        content.push_str("**Flagged**\n");
    }
    if let Some(ref completed) = task.date_completed {
        content.push_str(&format!("**Completed:** {}\n", completed));
    }
    if let Some(ref notes) = task.notes {
        content.push_str("\n**Notes:**\n\n");
        content.push_str(notes);
        content.push('\n');
    }

    content
}

pub fn render_item_view(f: &mut Frame, area: Rect, task: &Task, config: &Config, scroll_offset: usize, focused: bool) {
    if area.width < 2 || area.height < 2 {
        return;
    }

    let horizontal = RatLayout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1), // Scrollbar
        ])
        .split(area);

    let content_area = horizontal[0];
    let scrollbar_area = horizontal[1];

    let viewport_height = (area.height - 2) as usize; // Account for borders
    let text_width = content_area.width.saturating_sub(2);

    // ratskin needs the width up front for wrapping
    let content_string = get_content_string(task);
    let content_lines = RatSkin::default().parse(MinimadText::from(content_string.as_str()), text_width);

    let ratatui_lines: Vec<Line> = content_lines.into_iter().map(|line| {
        let spans: Vec<Span> = line.spans.into_iter().map(|span| {
            Span::styled(span.content.to_string(), span.style)
        }).collect();
        Line::from(spans)
    }).collect();
    let total_lines = ratatui_lines.len();

    let max_scroll = total_lines.saturating_sub(viewport_height);
    let scroll_offset = cmp::min(scroll_offset, max_scroll);
    let end_line = cmp::min(scroll_offset + viewport_height, total_lines);
    let visible_text = if scroll_offset < total_lines {
        Text::from(ratatui_lines[scroll_offset..end_line].to_vec())
    } else {
        Text::default()
    };

    let title = if focused { "Reminder (Esc to return)" } else { "Reminder" };
    // trim: false keeps list indentation
    let base_style = Style::default().fg(parse_color(&config.get_active_theme().fg));
    let paragraph = Paragraph::new(visible_text)
        .block(Block::default().borders(Borders::ALL).title(title))
        .style(base_style)
        .wrap(ratatui::widgets::Wrap { trim: false });

    f.render_widget(paragraph, content_area);

    if total_lines > viewport_height {
        let scrollbar_inner_area = Rect::new(
            scrollbar_area.x,
            content_area.y + 1,
            scrollbar_area.width,
            content_area.height.saturating_sub(2),
        );

        let mut scrollbar_state = ScrollbarState::new(total_lines)
            .viewport_content_length(viewport_height)
            .position(scroll_offset);

        let scrollbar = Scrollbar::default()
            .orientation(ratatui::widgets::ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"))
            .track_symbol(Some("│"))
            .thumb_symbol("█");

        f.render_stateful_widget(scrollbar, scrollbar_inner_area, &mut scrollbar_state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeCategory;

    #[test]
    fn content_lists_present_fields_only() {
        let mut task = Task::new("Dentist".to_string());
        let bare = get_content_string(&task);
        assert!(bare.contains("**Title:** Dentist"));
        assert!(!bare.contains("**Date:**"));

        task.date = Some("2024-03-15".to_string());
        task.time = Some("14:30".to_string());
        task.time_category = Some(TimeCategory::Afternoon);
        task.flag = true;
        task.notes = Some("- bring card".to_string());
        let full = get_content_string(&task);
        assert!(full.contains("**Time:** 14:30 (Afternoon)"));
        assert!(full.contains("**Flagged**"));
        assert!(full.ends_with("- bring card\n"));
    }
}
