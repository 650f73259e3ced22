use ratatui::widgets::Tabs;
use ratatui::style::{Style, Modifier};
use ratatui::text::{Line, Span};
use ratatui::Frame;
use ratatui::layout::Rect;
use crate::models::TaskCounts;
use crate::tui::app::Screen;
use crate::Config;
use crate::tui::widgets::color::{parse_color, get_contrast_text_color};

/// "Today 3"; Home carries no counter
pub fn tab_label(screen: Screen, counts: &TaskCounts) -> String {
    match screen.count(counts) {
        Some(n) => format!("{} {}", screen.title(), n),
        None => screen.title().to_string(),
    }
}

pub fn render_tabs(f: &mut Frame, area: Rect, current: Screen, counts: &TaskCounts, config: &Config) {
    let active_theme = config.get_active_theme();
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let tab_bg = parse_color(&active_theme.tab_bg);
    let tab_fg = get_contrast_text_color(tab_bg);

    // Each title is padded with tab_bg so it reads as a box
    let titles: Vec<Line> = Screen::ALL
        .iter()
        .map(|screen| {
            Line::from(vec![
                Span::styled(" ", Style::default().bg(tab_bg)),
                Span::styled(tab_label(*screen, counts), Style::default().fg(tab_fg).bg(tab_bg)),
                Span::styled(" ", Style::default().bg(tab_bg)),
            ])
        })
        .collect();

    let highlight_fg = get_contrast_text_color(highlight_bg);

    let tabs = Tabs::new(titles)
        .select(current.index())
        .style(Style::default().fg(fg_color).bg(bg_color))
        .highlight_style(
            Style::default()
                .fg(highlight_fg)
                .bg(highlight_bg)
                .add_modifier(Modifier::BOLD)
        )
        .divider(" ")
        .padding("", "");

    f.render_widget(tabs, area);
}
