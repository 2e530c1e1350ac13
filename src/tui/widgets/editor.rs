use std::cmp;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditOperation {
    InsertChar { col: usize, ch: char },
    DeleteChar { col: usize, ch: char },
    Replace { before: String },
}

/// A single-line text field with a character cursor and undo history.
/// Columns count chars, never bytes.
#[derive(Debug, Clone, Default)]
pub struct LineEditor {
    text: String,
    pub cursor: usize,
    pub scroll: usize,
    undo_stack: Vec<EditOperation>,
}

const MAX_HISTORY: usize = 100;

impl LineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_string(text: impl Into<String>) -> Self {
        let text: String = text.into();
        let text = text.replace(['\r', '\n'], " ");
        let cursor = text.chars().count();
        Self {
            text,
            cursor,
            ..Default::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    fn len(&self) -> usize {
        self.text.chars().count()
    }

    fn byte_index(&self, col: usize) -> usize {
        self.text
            .char_indices()
            .nth(col)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    fn push_undo(&mut self, op: EditOperation) {
        self.undo_stack.push(op);
        if self.undo_stack.len() > MAX_HISTORY {
            self.undo_stack.remove(0);
        }
    }

    pub fn insert_char(&mut self, ch: char) {
        if ch == '\n' || ch == '\r' {
            return;
        }
        let col = cmp::min(self.cursor, self.len());
        let at = self.byte_index(col);
        self.text.insert(at, ch);
        self.cursor = col + 1;
        self.push_undo(EditOperation::InsertChar { col, ch });
    }

    /// Backspace
    pub fn delete_char(&mut self) {
        let col = cmp::min(self.cursor, self.len());
        if col == 0 {
            return;
        }
        let at = self.byte_index(col - 1);
        let ch = self.text.remove(at);
        self.cursor = col - 1;
        self.push_undo(EditOperation::DeleteChar { col: col - 1, ch });
    }

    /// Delete key
    pub fn delete_forward(&mut self) {
        let col = cmp::min(self.cursor, self.len());
        if col >= self.len() {
            return;
        }
        let at = self.byte_index(col);
        let ch = self.text.remove(at);
        self.push_undo(EditOperation::DeleteChar { col, ch });
    }

    /// Replace the whole line, e.g. with a voice transcript
    pub fn set_text(&mut self, text: &str) {
        let before = std::mem::replace(&mut self.text, text.replace(['\r', '\n'], " "));
        self.cursor = self.len();
        self.push_undo(EditOperation::Replace { before });
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
        self.scroll = 0;
        self.undo_stack.clear();
    }

    pub fn undo(&mut self) -> bool {
        let Some(op) = self.undo_stack.pop() else {
            return false;
        };
        match op {
            EditOperation::InsertChar { col, .. } => {
                let at = self.byte_index(col);
                self.text.remove(at);
                self.cursor = col;
            }
            EditOperation::DeleteChar { col, ch } => {
                let at = self.byte_index(col);
                self.text.insert(at, ch);
                self.cursor = col + 1;
            }
            EditOperation::Replace { before } => {
                self.text = before;
                self.cursor = self.len();
            }
        }
        true
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.cursor = cmp::min(self.cursor + 1, self.len());
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor = self.len();
    }

    pub fn move_cursor_word_left(&mut self) {
        let chars: Vec<char> = self.text.chars().collect();
        let mut col = cmp::min(self.cursor, chars.len());
        while col > 0 && chars[col - 1].is_whitespace() {
            col -= 1;
        }
        while col > 0 && !chars[col - 1].is_whitespace() {
            col -= 1;
        }
        self.cursor = col;
    }

    pub fn move_cursor_word_right(&mut self) {
        let chars: Vec<char> = self.text.chars().collect();
        let mut col = cmp::min(self.cursor, chars.len());
        while col < chars.len() && !chars[col].is_whitespace() {
            col += 1;
        }
        while col < chars.len() && chars[col].is_whitespace() {
            col += 1;
        }
        self.cursor = col;
    }

    /// Keep the cursor inside a viewport `width` columns wide
    pub fn update_scroll(&mut self, width: usize) {
        if width == 0 {
            return;
        }
        if self.cursor < self.scroll {
            self.scroll = self.cursor;
        } else if self.cursor >= self.scroll + width {
            self.scroll = self.cursor + 1 - width;
        }
    }

    /// The slice of text visible at the current scroll offset
    pub fn visible_text(&self, width: usize) -> String {
        self.text.chars().skip(self.scroll).take(width).collect()
    }

    /// Cursor column relative to the visible slice
    pub fn visible_cursor(&self) -> usize {
        self.cursor.saturating_sub(self.scroll)
    }
}
