use ratatui::widgets::Paragraph;
use ratatui::style::{Style, Modifier};
use ratatui::Frame;
use ratatui::layout::Rect;
use crate::Config;
use crate::tui::widgets::color::{parse_color, get_contrast_text_color};

const SEPARATOR: &str = " • ";
const ELLIPSIS: &str = "...";

/// Join as many hints as fit in `max_width`, ending with "..." when some were dropped
pub fn fit_hints(key_hints: &[String], max_width: usize) -> String {
    let mut hints_text = String::new();
    for (i, hint) in key_hints.iter().enumerate() {
        let sep = if i == 0 { "" } else { SEPARATOR };
        let would_be_len = hints_text.chars().count() + sep.chars().count() + hint.chars().count();
        if would_be_len > max_width {
            if hints_text.is_empty() {
                hints_text = hint.chars().take(max_width.saturating_sub(ELLIPSIS.len())).collect();
            } else if hints_text.chars().count() + ELLIPSIS.len() > max_width {
                let keep = max_width.saturating_sub(ELLIPSIS.len());
                hints_text = hints_text.chars().take(keep).collect();
            }
            hints_text.push_str(ELLIPSIS);
            break;
        }
        hints_text.push_str(sep);
        hints_text.push_str(hint);
    }
    hints_text
}

pub fn render_status_bar(
    f: &mut Frame,
    area: Rect,
    message: Option<&String>,
    key_hints: &[String],
    config: &Config,
) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let max_width = area.width as usize;

    let (content, style) = if let Some(msg) = message {
        let msg_fg = get_contrast_text_color(highlight_bg);
        let content = if msg.chars().count() > max_width {
            msg.chars().take(max_width.saturating_sub(ELLIPSIS.len())).collect::<String>() + ELLIPSIS
        } else {
            msg.clone()
        };
        (content, Style::default().fg(msg_fg).bg(highlight_bg).add_modifier(Modifier::BOLD))
    } else {
        (fit_hints(key_hints, max_width), Style::default().fg(fg_color).bg(bg_color))
    };

    let paragraph = Paragraph::new(content).style(style);
    f.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hints() -> Vec<String> {
        vec!["q: Quit".to_string(), "n: New".to_string(), "F1: Help".to_string()]
    }

    #[test]
    fn all_hints_fit() {
        assert_eq!(fit_hints(&hints(), 80), "q: Quit • n: New • F1: Help");
    }

    #[test]
    fn overflow_ends_with_ellipsis() {
        let text = fit_hints(&hints(), 18);
        assert_eq!(text, "q: Quit • n: New...");
        assert!(fit_hints(&hints(), 5).ends_with("..."));
    }
}
