use ratatui::widgets::{Block, Borders, Paragraph, Clear};
use ratatui::style::Style;
use ratatui::Frame;
use ratatui::layout::{Rect, Alignment};
use crate::Config;
use crate::utils::format_key_binding_for_display as key;
use crate::tui::widgets::color::parse_color;
use crate::tui::widgets::popup_area;

pub fn render_help(f: &mut Frame, area: Rect, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);

    let popup_area = popup_area(area, 60, 70);
    f.render_widget(Clear, popup_area);

    let paragraph = Paragraph::new(build_help_text(config))
        .block(Block::default()
            .borders(Borders::ALL)
            .title("Help - Key Bindings")
            .title_alignment(Alignment::Center)
            .style(Style::default().fg(fg_color).bg(bg_color)))
        .style(Style::default().fg(fg_color).bg(bg_color))
        .wrap(ratatui::widgets::Wrap { trim: true });

    f.render_widget(paragraph, popup_area);
}

pub fn build_help_text(config: &Config) -> String {
    let kb = &config.key_bindings;
    let mut text = String::new();

    text.push_str("Navigation:\n");
    text.push_str(&format!("  {} / {}: Switch screens\n", key(&kb.tab_left), key(&kb.tab_right)));
    text.push_str(&format!("  {} / {}: Move up/down\n", key(&kb.list_up), key(&kb.list_down)));
    text.push_str(&format!("  {}: Open screen or reminder\n", key(&kb.select)));
    text.push_str(&format!("  {}: Back\n", key(&kb.back)));
    text.push('\n');

    text.push_str("Reminders:\n");
    text.push_str(&format!("  {}: New reminder\n", key(&kb.new)));
    text.push_str(&format!("  {}: Toggle completed\n", key(&kb.toggle_complete)));
    text.push_str(&format!("  {}: Toggle flag\n", key(&kb.toggle_flag)));
    text.push_str(&format!("  {}: Delete\n", key(&kb.delete)));
    text.push_str(&format!("  {}: Undo delete\n", key(&kb.undo)));
    text.push_str(&format!("  {}: Clear completed (Completed screen)\n", key(&kb.clear_completed)));
    text.push_str(&format!("  {}: Copy to clipboard\n", key(&kb.copy)));
    text.push_str(&format!("  {}: Search by title\n", key(&kb.search)));
    text.push('\n');

    text.push_str("New Reminder:\n");
    text.push_str("  Tab / Shift+Tab: Next/previous field\n");
    text.push_str("  Space: Toggle flag (Flag field)\n");
    text.push_str("  Enter: Newline in notes\n");
    text.push_str(&format!("  {}: Save\n", key(&kb.save)));
    text.push_str("  Esc: Cancel\n");
    text.push('\n');

    text.push_str("General:\n");
    text.push_str(&format!("  {}: Quit\n", key(&kb.quit)));
    text.push_str(&format!("  {}: Show/hide help\n", key(&kb.help)));

    text
}
