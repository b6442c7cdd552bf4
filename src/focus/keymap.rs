use crossterm::event::{KeyCode, KeyEvent};

/// Logical input roles. The numeric keypad doubles for the arrow/menu/select
/// keys, so several physical keys map onto one role and both must behave
/// identically.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyRole {
    Up,
    Down,
    Left,
    Right,
    Select,
    Menu,
    Top,
    Home,
    Option1,
    Option2,
    Option3,
    Cancel,
}

/// Keypad layout of the original device: 8/5/4/6 are the directional pad,
/// 7 opens the menu, 1-3 pick options (with y/n aliases inside popups).
pub fn role_for(key: &KeyEvent) -> Option<KeyRole> {
    match key.code {
        KeyCode::Char('8') | KeyCode::Up => Some(KeyRole::Up),
        KeyCode::Char('5') | KeyCode::Down => Some(KeyRole::Down),
        KeyCode::Char('4') | KeyCode::Left => Some(KeyRole::Left),
        KeyCode::Char('6') | KeyCode::Right => Some(KeyRole::Right),
        KeyCode::Enter | KeyCode::Char(' ') => Some(KeyRole::Select),
        KeyCode::Char('7') => Some(KeyRole::Menu),
        KeyCode::Char('*') => Some(KeyRole::Top),
        KeyCode::Char('-') => Some(KeyRole::Home),
        KeyCode::Char('1') | KeyCode::Char('y') => Some(KeyRole::Option1),
        KeyCode::Char('2') => Some(KeyRole::Option2),
        KeyCode::Char('3') | KeyCode::Char('n') => Some(KeyRole::Option3),
        KeyCode::Esc => Some(KeyRole::Cancel),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventKind, KeyEventState, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn test_digit_and_arrow_share_a_role() {
        assert_eq!(role_for(&key(KeyCode::Char('8'))), Some(KeyRole::Up));
        assert_eq!(role_for(&key(KeyCode::Up)), Some(KeyRole::Up));
        assert_eq!(role_for(&key(KeyCode::Char('5'))), Some(KeyRole::Down));
        assert_eq!(role_for(&key(KeyCode::Down)), Some(KeyRole::Down));
    }

    #[test]
    fn test_yes_no_aliases() {
        assert_eq!(role_for(&key(KeyCode::Char('y'))), Some(KeyRole::Option1));
        assert_eq!(role_for(&key(KeyCode::Char('n'))), Some(KeyRole::Option3));
    }

    #[test]
    fn test_unmapped_key() {
        assert_eq!(role_for(&key(KeyCode::Char('x'))), None);
    }
}
