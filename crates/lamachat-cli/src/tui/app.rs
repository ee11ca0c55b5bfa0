use super::types::ChatMsg;

// ── chat screen state ────────────────────────────────────────────────────────

pub(super) struct App {
    pub(super) model: String,
    pub(super) chat: Vec<ChatMsg>,
    pub(super) input: String,
    pub(super) cursor: usize,
    pub(super) scroll: u16,
    pub(super) auto_scroll: bool,
    pub(super) history: Vec<String>,
    pub(super) history_idx: Option<usize>,
    pub(super) spin_i: usize,
}

impl App {
    pub(super) fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            chat: Vec::new(),
            input: String::new(),
            cursor: 0,
            scroll: 0,
            auto_scroll: true,
            history: Vec::new(),
            history_idx: None,
            spin_i: 0,
        }
    }

    pub(super) fn push(&mut self, msg: ChatMsg) {
        self.chat.push(msg);
        if self.auto_scroll {
            self.scroll = u16::MAX;
        }
    }

    pub(super) fn insert_char(&mut self, c: char) {
        self.input.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub(super) fn backspace(&mut self) {
        if self.cursor > 0 {
            let i = self.input[..self.cursor]
                .char_indices()
                .last()
                .map(|(i, _)| i)
                .unwrap_or(0);
            self.input.drain(i..self.cursor);
            self.cursor = i;
        }
    }

    pub(super) fn cursor_left(&mut self) {
        if self.cursor > 0 {
            self.cursor = self.input[..self.cursor]
                .char_indices()
                .last()
                .map(|(i, _)| i)
                .unwrap_or(0);
        }
    }

    pub(super) fn cursor_right(&mut self) {
        if self.cursor < self.input.len() {
            let n = self.input[self.cursor..]
                .chars()
                .next()
                .map(|c| c.len_utf8())
                .unwrap_or(0);
            self.cursor += n;
        }
    }

    /// Clears the input line after a dispatched prompt and records it for
    /// Ctrl+P recall.
    pub(super) fn commit_input(&mut self) {
        let text = std::mem::take(&mut self.input);
        if !text.trim().is_empty() && self.history.last() != Some(&text) {
            self.history.push(text);
        }
        self.cursor = 0;
        self.history_idx = None;
    }

    pub(super) fn clear_input(&mut self) {
        self.input.clear();
        self.cursor = 0;
        self.history_idx = None;
    }

    pub(super) fn history_prev(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let idx = self
            .history_idx
            .map(|i| i.saturating_sub(1))
            .unwrap_or(self.history.len() - 1);
        self.history_idx = Some(idx);
        self.input = self.history[idx].clone();
        self.cursor = self.input.len();
    }

    pub(super) fn history_next(&mut self) {
        if let Some(idx) = self.history_idx {
            if idx + 1 < self.history.len() {
                self.history_idx = Some(idx + 1);
                self.input = self.history[idx + 1].clone();
            } else {
                self.history_idx = None;
                self.input.clear();
            }
            self.cursor = self.input.len();
        }
    }

    pub(super) fn scroll_up(&mut self, lines: u16) {
        self.auto_scroll = false;
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub(super) fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines);
        if self.scroll == u16::MAX {
            self.auto_scroll = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> App {
        let mut app = App::new("llama3");
        for c in text.chars() {
            app.insert_char(c);
        }
        app
    }

    #[test]
    fn editing_respects_multibyte_chars() {
        let mut app = typed("héllo");
        app.cursor_left();
        app.cursor_left();
        app.cursor_left();
        app.backspace();
        assert_eq!(app.input, "hllo");
        assert_eq!(app.cursor, 1);

        app.cursor_right();
        app.insert_char('ü');
        assert_eq!(app.input, "hlülo");
        assert_eq!(app.cursor, 4);
    }

    #[test]
    fn backspace_at_start_is_a_no_op() {
        let mut app = typed("ab");
        app.cursor = 0;
        app.backspace();
        assert_eq!(app.input, "ab");
    }

    #[test]
    fn commit_records_history_without_duplicates() {
        let mut app = typed("hi");
        app.commit_input();
        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);

        for c in "hi".chars() {
            app.insert_char(c);
        }
        app.commit_input();
        assert_eq!(app.history, vec!["hi".to_string()]);
    }

    #[test]
    fn history_walks_back_and_forward() {
        let mut app = App::new("llama3");
        app.history = vec!["first".into(), "second".into()];

        app.history_prev();
        assert_eq!(app.input, "second");
        app.history_prev();
        assert_eq!(app.input, "first");
        app.history_prev();
        assert_eq!(app.input, "first");

        app.history_next();
        assert_eq!(app.input, "second");
        app.history_next();
        assert!(app.input.is_empty());
        assert_eq!(app.history_idx, None);
    }

    #[test]
    fn scrolling_up_pauses_auto_scroll() {
        let mut app = App::new("llama3");
        app.push(ChatMsg::Info("welcome".into()));
        assert_eq!(app.scroll, u16::MAX);

        app.scroll_up(3);
        assert!(!app.auto_scroll);
        app.push(ChatMsg::Info("more".into()));
        assert_eq!(app.scroll, u16::MAX - 3);

        app.scroll_down(3);
        assert!(app.auto_scroll);
    }
}
