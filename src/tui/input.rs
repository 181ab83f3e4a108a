//! Keyboard mapping.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// What a key press means to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// Leave the application.
    Quit,
    /// Append a character to the input line.
    Char(char),
    /// Delete the last character.
    Backspace,
    /// Submit the input line.
    Submit,
    /// Close the popup or clear the input line.
    Cancel,
}

/// Maps a terminal key event. Releases and repeats are ignored.
pub fn map_key(key: KeyEvent) -> Option<Input> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), m) | (KeyCode::Char('c'), m) if m.contains(KeyModifiers::CONTROL) => {
            Some(Input::Quit)
        }
        (KeyCode::Char(c), _) => Some(Input::Char(c)),
        (KeyCode::Backspace, _) => Some(Input::Backspace),
        (KeyCode::Enter, _) => Some(Input::Submit),
        (KeyCode::Esc, _) => Some(Input::Cancel),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctrl_q_quits_plain_q_types() {
        let ctrl_q = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert_eq!(map_key(ctrl_q), Some(Input::Quit));
        let q = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(map_key(q), Some(Input::Char('q')));
    }

    #[test]
    fn test_release_is_ignored() {
        let mut key = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert_eq!(map_key(key), None);
    }
}
