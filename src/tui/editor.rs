use std::cmp::min;

use crate::cloze::Selection;

/// Plain-text buffer for one card with a caret and an optional selection
/// anchor. Rows and columns count chars; `selection()` flattens them to char
/// offsets into `content()`.
pub struct Editor {
    lines: Vec<String>,
    cursor_row: usize,
    cursor_col: usize,
    anchor: Option<(usize, usize)>,
    scroll_top: usize,
}

impl Editor {
    pub fn new() -> Self {
        Self::from_content("")
    }

    pub fn from_content(content: &str) -> Self {
        let lines: Vec<String> = content.split('\n').map(str::to_string).collect();
        let cursor_row = lines.len() - 1;
        let cursor_col = lines[cursor_row].chars().count();
        Self {
            lines,
            cursor_row,
            cursor_col,
            anchor: None,
            scroll_top: 0,
        }
    }

    pub fn content(&self) -> String {
        self.lines.join("\n")
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.cursor_row, self.cursor_col)
    }

    pub fn scroll_top(&self) -> usize {
        self.scroll_top
    }

    pub fn ensure_cursor_visible(&mut self, view_height: usize) {
        if view_height == 0 {
            self.scroll_top = 0;
            return;
        }

        if self.cursor_row < self.scroll_top {
            self.scroll_top = self.cursor_row;
        } else {
            let bottom = self.scroll_top + view_height - 1;
            if self.cursor_row > bottom {
                self.scroll_top = self.cursor_row + 1 - view_height;
            }
        }
    }

    pub fn selection(&self) -> Selection {
        let caret = self.offset_of(self.cursor_row, self.cursor_col);
        match self.anchor {
            Some((row, col)) => {
                let anchor = self.offset_of(row, col);
                Selection::new(anchor.min(caret), anchor.max(caret))
            }
            None => Selection::caret(caret),
        }
    }

    pub fn selected_text(&self) -> String {
        let sel = self.selection();
        self.content()
            .chars()
            .skip(sel.start)
            .take(sel.end - sel.start)
            .collect()
    }

    /// Replaces the whole buffer and collapses the caret at `caret` (a char
    /// offset), as after a cloze insertion.
    pub fn set_content(&mut self, content: &str, caret: usize) {
        self.lines = content.split('\n').map(str::to_string).collect();
        let (row, col) = self.position_of(caret);
        self.cursor_row = row;
        self.cursor_col = col;
        self.anchor = None;
    }

    pub fn insert_char(&mut self, ch: char) {
        self.delete_selection();
        let column = self.cursor_col;
        let line = self.current_line_mut();
        let idx = Self::char_to_byte_index(line, column);
        line.insert(idx, ch);
        self.cursor_col += 1;
    }

    pub fn insert_newline(&mut self) {
        self.delete_selection();
        let column = self.cursor_col;
        let line = self.current_line_mut();
        let idx = Self::char_to_byte_index(line, column);
        let remainder = line.split_off(idx);
        self.lines.insert(self.cursor_row + 1, remainder);
        self.cursor_row += 1;
        self.cursor_col = 0;
    }

    pub fn backspace(&mut self) {
        if self.delete_selection() {
            return;
        }
        if self.cursor_col > 0 {
            let column = self.cursor_col;
            let line = self.current_line_mut();
            let end = Self::char_to_byte_index(line, column);
            let start = Self::char_to_byte_index(line, column - 1);
            line.drain(start..end);
            self.cursor_col -= 1;
            return;
        }

        if self.cursor_row == 0 {
            return;
        }

        let current_line = self.lines.remove(self.cursor_row);
        self.cursor_row -= 1;
        self.cursor_col = self.line_len(self.cursor_row);
        let prev_line = self.current_line_mut();
        prev_line.push_str(&current_line);
    }

    pub fn delete(&mut self) {
        if self.delete_selection() {
            return;
        }
        let line_len = self.line_len(self.cursor_row);
        if self.cursor_col < line_len {
            let column = self.cursor_col;
            let line = self.current_line_mut();
            let start = Self::char_to_byte_index(line, column);
            let end = Self::char_to_byte_index(line, column + 1);
            line.drain(start..end);
            return;
        }

        if self.cursor_row + 1 >= self.lines.len() {
            return;
        }

        let next_line = self.lines.remove(self.cursor_row + 1);
        let line = self.current_line_mut();
        line.push_str(&next_line);
    }

    pub fn move_left(&mut self, extend: bool) {
        self.begin_move(extend);
        if self.cursor_col > 0 {
            self.cursor_col -= 1;
        } else if self.cursor_row > 0 {
            self.cursor_row -= 1;
            self.cursor_col = self.line_len(self.cursor_row);
        }
    }

    pub fn move_right(&mut self, extend: bool) {
        self.begin_move(extend);
        let line_len = self.line_len(self.cursor_row);
        if self.cursor_col < line_len {
            self.cursor_col += 1;
        } else if self.cursor_row + 1 < self.lines.len() {
            self.cursor_row += 1;
            self.cursor_col = 0;
        }
    }

    pub fn move_up(&mut self, extend: bool) {
        self.begin_move(extend);
        if self.cursor_row == 0 {
            return;
        }
        self.cursor_row -= 1;
        self.cursor_col = min(self.cursor_col, self.line_len(self.cursor_row));
    }

    pub fn move_down(&mut self, extend: bool) {
        self.begin_move(extend);
        if self.cursor_row + 1 >= self.lines.len() {
            return;
        }
        self.cursor_row += 1;
        self.cursor_col = min(self.cursor_col, self.line_len(self.cursor_row));
    }

    pub fn move_home(&mut self, extend: bool) {
        self.begin_move(extend);
        self.cursor_col = 0;
    }

    pub fn move_end(&mut self, extend: bool) {
        self.begin_move(extend);
        self.cursor_col = self.line_len(self.cursor_row);
    }

    /// Shift-moves keep (or drop) the anchor; plain moves clear it.
    fn begin_move(&mut self, extend: bool) {
        if !extend {
            self.anchor = None;
        } else if self.anchor.is_none() {
            self.anchor = Some((self.cursor_row, self.cursor_col));
        }
    }

    fn delete_selection(&mut self) -> bool {
        let sel = self.selection();
        self.anchor = None;
        if sel.is_empty() {
            return false;
        }
        let content = self.content();
        let start = Self::char_to_byte_index(&content, sel.start);
        let end = Self::char_to_byte_index(&content, sel.end);
        let mut remaining = String::with_capacity(content.len() - (end - start));
        remaining.push_str(&content[..start]);
        remaining.push_str(&content[end..]);
        self.set_content(&remaining, sel.start);
        true
    }

    fn offset_of(&self, row: usize, col: usize) -> usize {
        let before: usize = self
            .lines
            .iter()
            .take(row)
            .map(|line| line.chars().count() + 1)
            .sum();
        before + col
    }

    fn position_of(&self, offset: usize) -> (usize, usize) {
        let mut remaining = offset;
        for (row, line) in self.lines.iter().enumerate() {
            let len = line.chars().count();
            if remaining <= len {
                return (row, remaining);
            }
            remaining -= len + 1;
        }
        let last = self.lines.len() - 1;
        (last, self.line_len(last))
    }

    fn current_line_mut(&mut self) -> &mut String {
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
        &mut self.lines[self.cursor_row]
    }

    fn line_len(&self, row: usize) -> usize {
        self.lines
            .get(row)
            .map(|line| line.chars().count())
            .unwrap_or(0)
    }

    fn char_to_byte_index(line: &str, column: usize) -> usize {
        line.char_indices()
            .nth(column)
            .map(|(idx, _)| idx)
            .unwrap_or_else(|| line.len())
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloze::wrap_selection;

    #[test]
    fn opens_with_caret_at_end() {
        let editor = Editor::from_content("first\nsecond");
        assert_eq!(editor.cursor(), (1, 6));
        assert_eq!(editor.selection(), Selection::caret(12));
    }

    #[test]
    fn shift_moves_build_a_selection() {
        let mut editor = Editor::from_content("Barbara Hepworth");
        editor.move_home(false);
        for _ in 0..7 {
            editor.move_right(true);
        }
        assert_eq!(editor.selection(), Selection::new(0, 7));
        assert_eq!(editor.selected_text(), "Barbara");

        editor.move_right(false);
        assert!(editor.selection().is_empty());
    }

    #[test]
    fn selection_spans_lines_in_char_offsets() {
        let mut editor = Editor::from_content("日本\n東京");
        editor.move_left(true);
        editor.move_left(true);
        editor.move_left(true);
        assert_eq!(editor.selection(), Selection::new(2, 5));
        assert_eq!(editor.selected_text(), "\n東京");
    }

    #[test]
    fn cloze_insertion_round_trips_through_editor() {
        let mut editor = Editor::from_content("made Single Form");
        editor.move_home(false);
        for _ in 0..5 {
            editor.move_right(false);
        }
        editor.move_end(true);

        let result = wrap_selection(&editor.content(), editor.selection(), 1);
        editor.set_content(&result.content, result.caret);

        assert_eq!(editor.content(), "made {{c1::Single Form}}");
        assert_eq!(editor.selection(), Selection::caret(24));
        assert_eq!(editor.cursor(), (0, 24));
    }

    #[test]
    fn typing_replaces_selection() {
        let mut editor = Editor::from_content("abc");
        editor.move_left(true);
        editor.move_left(true);
        editor.insert_char('X');
        assert_eq!(editor.content(), "aX");
        assert_eq!(editor.cursor(), (0, 2));
    }

    #[test]
    fn backspace_joins_lines() {
        let mut editor = Editor::from_content("one\ntwo");
        editor.move_home(false);
        editor.backspace();
        assert_eq!(editor.content(), "onetwo");
        assert_eq!(editor.cursor(), (0, 3));
    }

    #[test]
    fn newline_splits_line_at_caret() {
        let mut editor = Editor::from_content("onetwo");
        editor.move_left(false);
        editor.move_left(false);
        editor.move_left(false);
        editor.insert_newline();
        assert_eq!(editor.content(), "one\ntwo");
        assert_eq!(editor.cursor(), (1, 0));
    }
}
