use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, PartialEq, Eq)]
pub(super) enum PickerAction {
    Stay,
    Choose(usize),
    Quit,
}

/// Cursor over a non-empty list of models.
pub(super) struct Picker {
    len: usize,
    selected: usize,
}

impl Picker {
    pub(super) fn new(len: usize) -> Self {
        Self { len, selected: 0 }
    }

    pub(super) fn selected(&self) -> usize {
        self.selected
    }

    fn up(&mut self) {
        self.selected = match self.selected {
            0 => self.len.saturating_sub(1),
            i => i - 1,
        };
    }

    fn down(&mut self) {
        if self.len > 0 {
            self.selected = (self.selected + 1) % self.len;
        }
    }

    pub(super) fn handle_key(&mut self, key: KeyEvent) -> PickerAction {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                PickerAction::Quit
            }
            KeyCode::Char('q') | KeyCode::Esc => PickerAction::Quit,
            KeyCode::Up | KeyCode::Char('k') => {
                self.up();
                PickerAction::Stay
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.down();
                PickerAction::Stay
            }
            KeyCode::Home => {
                self.selected = 0;
                PickerAction::Stay
            }
            KeyCode::End => {
                self.selected = self.len.saturating_sub(1);
                PickerAction::Stay
            }
            KeyCode::Enter if self.len > 0 => PickerAction::Choose(self.selected),
            _ => PickerAction::Stay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn enter_chooses_highlighted_model() {
        let mut p = Picker::new(3);
        p.handle_key(key(KeyCode::Down));
        assert_eq!(p.handle_key(key(KeyCode::Enter)), PickerAction::Choose(1));
    }

    #[test]
    fn movement_wraps_around() {
        let mut p = Picker::new(2);
        p.handle_key(key(KeyCode::Up));
        assert_eq!(p.selected(), 1);
        p.handle_key(key(KeyCode::Down));
        assert_eq!(p.selected(), 0);
    }

    #[test]
    fn q_esc_and_ctrl_c_quit() {
        let mut p = Picker::new(1);
        assert_eq!(p.handle_key(key(KeyCode::Char('q'))), PickerAction::Quit);
        assert_eq!(p.handle_key(key(KeyCode::Esc)), PickerAction::Quit);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(p.handle_key(ctrl_c), PickerAction::Quit);
    }

    #[test]
    fn plain_c_does_not_quit() {
        let mut p = Picker::new(1);
        assert_eq!(p.handle_key(key(KeyCode::Char('c'))), PickerAction::Stay);
    }
}
