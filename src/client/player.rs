//! Presenter-side state: the latest session snapshot plus the option cursor.

use crossterm::event::KeyCode;

use super::state::SessionState;

/// What a key press asks the session to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Select(i64),
    Quit,
}

pub struct PlayerApp {
    pub snapshot: SessionState,
    cursor: usize,
}

impl PlayerApp {
    pub fn new(snapshot: SessionState) -> Self {
        Self {
            snapshot,
            cursor: 0,
        }
    }

    /// Take a newer snapshot. The cursor goes back to the top on a new question.
    pub fn sync(&mut self, snapshot: SessionState) {
        if snapshot.current_index != self.snapshot.current_index {
            self.cursor = 0;
        }
        self.snapshot = snapshot;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn option_count(&self) -> usize {
        self.snapshot
            .current_question()
            .map_or(0, |q| q.options.len())
    }

    pub fn select_next_option(&mut self) {
        let count = self.option_count();
        if count > 0 {
            self.cursor = (self.cursor + 1) % count;
        }
    }

    pub fn select_previous_option(&mut self) {
        let count = self.option_count();
        if count > 0 {
            self.cursor = (self.cursor + count - 1) % count;
        }
    }

    /// Option id under the cursor, if selection is currently allowed.
    pub fn cursor_option_id(&self) -> Option<i64> {
        if self.snapshot.is_option_disabled() {
            return None;
        }
        self.snapshot
            .current_question()
            .and_then(|q| q.options.get(self.cursor))
            .map(|o| o.id)
    }

    pub fn handle_key(&mut self, key: KeyCode) -> Action {
        match key {
            KeyCode::Up | KeyCode::Char('k') => {
                self.select_previous_option();
                Action::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.select_next_option();
                Action::None
            }
            KeyCode::Enter | KeyCode::Char(' ') => match self.cursor_option_id() {
                Some(option_id) => Action::Select(option_id),
                None => Action::None,
            },
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Action::Quit,
            _ => Action::None,
        }
    }
}
