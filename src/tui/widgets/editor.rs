use ratatui::layout::Rect;
use std::cmp;

/// Small text buffer behind form fields. Single-line fields simply never
/// receive a newline.
#[derive(Debug, Clone)]
pub struct Editor {
    pub lines: Vec<String>,
    pub cursor_line: usize,
    pub cursor_col: usize,
    pub scroll_offset: usize,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    pub fn new() -> Self {
        Self {
            lines: vec![String::new()],
            cursor_line: 0,
            cursor_col: 0,
            scroll_offset: 0,
        }
    }

    pub fn from_string(content: String) -> Self {
        let lines: Vec<String> = if content.is_empty() {
            vec![String::new()]
        } else {
            content.lines().map(|s| s.to_string()).collect()
        };
        let cursor_line = lines.len().saturating_sub(1);
        // chars, not bytes
        let cursor_col = lines.last().map(|l| l.chars().count()).unwrap_or(0);
        Self {
            lines,
            cursor_line,
            cursor_col,
            scroll_offset: 0,
        }
    }

    fn line_len(&self, line: usize) -> usize {
        self.lines.get(line).map(|l| l.chars().count()).unwrap_or(0)
    }

    fn byte_index(line: &str, col: usize) -> usize {
        line.char_indices().nth(col).map(|(i, _)| i).unwrap_or(line.len())
    }

    pub fn insert_char(&mut self, ch: char) {
        if let Some(line) = self.lines.get_mut(self.cursor_line) {
            let idx = Self::byte_index(line, self.cursor_col);
            line.insert(idx, ch);
            self.cursor_col += 1;
        }
    }

    /// Backspace
    pub fn delete_char(&mut self) {
        if self.cursor_col > 0 {
            if let Some(line) = self.lines.get_mut(self.cursor_line) {
                let idx = Self::byte_index(line, self.cursor_col - 1);
                line.remove(idx);
                self.cursor_col -= 1;
            }
        } else if self.cursor_line > 0 {
            let current = self.lines.remove(self.cursor_line);
            self.cursor_line -= 1;
            self.cursor_col = self.line_len(self.cursor_line);
            if let Some(prev) = self.lines.get_mut(self.cursor_line) {
                prev.push_str(&current);
            }
        }
    }

    pub fn insert_newline(&mut self) {
        let Some(line) = self.lines.get_mut(self.cursor_line) else {
            return;
        };
        let idx = Self::byte_index(line, self.cursor_col);
        let rest = line.split_off(idx);
        self.cursor_line += 1;
        self.lines.insert(self.cursor_line, rest);
        self.cursor_col = 0;
    }

    pub fn move_cursor_left(&mut self) {
        if self.cursor_col > 0 {
            self.cursor_col -= 1;
        } else if self.cursor_line > 0 {
            self.cursor_line -= 1;
            self.cursor_col = self.line_len(self.cursor_line);
        }
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor_col < self.line_len(self.cursor_line) {
            self.cursor_col += 1;
        } else if self.cursor_line + 1 < self.lines.len() {
            self.cursor_line += 1;
            self.cursor_col = 0;
        }
    }

    pub fn move_cursor_up(&mut self) {
        if self.cursor_line > 0 {
            self.cursor_line -= 1;
            self.cursor_col = cmp::min(self.cursor_col, self.line_len(self.cursor_line));
        }
    }

    pub fn move_cursor_down(&mut self) {
        if self.cursor_line + 1 < self.lines.len() {
            self.cursor_line += 1;
            self.cursor_col = cmp::min(self.cursor_col, self.line_len(self.cursor_line));
        }
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor_col = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor_col = self.line_len(self.cursor_line);
    }

    /// Keep the cursor line inside a viewport of `viewport_height` lines
    pub fn update_scroll(&mut self, viewport_height: usize) {
        if viewport_height == 0 {
            return;
        }
        if self.cursor_line < self.scroll_offset {
            self.scroll_offset = self.cursor_line;
        } else if self.cursor_line >= self.scroll_offset + viewport_height {
            self.scroll_offset = self.cursor_line + 1 - viewport_height;
        }
    }

    pub fn visible_lines(&self, viewport_height: usize) -> &[String] {
        let start = cmp::min(self.scroll_offset, self.lines.len());
        let end = cmp::min(start + viewport_height, self.lines.len());
        &self.lines[start..end]
    }

    /// Cursor position on screen for an editor drawn inside `area` with a border
    pub fn cursor_screen_pos(&self, area: Rect) -> Option<(u16, u16)> {
        let row = self.cursor_line.checked_sub(self.scroll_offset)?;
        let x = area.x + 1 + u16::try_from(self.cursor_col).ok()?;
        let y = area.y + 1 + u16::try_from(row).ok()?;
        if x >= area.x + area.width.saturating_sub(1) || y >= area.y + area.height.saturating_sub(1) {
            return None;
        }
        Some((x, y))
    }
}

impl std::fmt::Display for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_and_backspace_handle_multibyte_chars() {
        let mut editor = Editor::new();
        for ch in "café".chars() {
            editor.insert_char(ch);
        }
        editor.delete_char();
        assert_eq!(editor.to_string(), "caf");
        editor.move_cursor_left();
        editor.insert_char('é');
        assert_eq!(editor.to_string(), "caéf");
    }

    #[test]
    fn newline_splits_and_backspace_joins() {
        let mut editor = Editor::from_string("milk eggs".to_string());
        editor.move_cursor_home();
        for _ in 0..4 {
            editor.move_cursor_right();
        }
        editor.insert_newline();
        assert_eq!(editor.lines, vec!["milk".to_string(), " eggs".to_string()]);
        editor.delete_char();
        assert_eq!(editor.to_string(), "milk eggs");
    }

    #[test]
    fn scroll_follows_cursor() {
        let mut editor = Editor::from_string("a\nb\nc\nd\ne".to_string());
        editor.update_scroll(2);
        assert_eq!(editor.scroll_offset, 3);
        assert_eq!(editor.visible_lines(2), &["d".to_string(), "e".to_string()]);
    }
}
