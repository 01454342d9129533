use crossterm::event::{KeyCode, KeyEvent};

pub(crate) fn is_back(key: KeyEvent) -> bool {
    matches!(key.code, KeyCode::Esc)
}

pub(crate) fn is_confirm(key: KeyEvent) -> bool {
    matches!(key.code, KeyCode::Enter)
}

pub(crate) fn is_up(key: KeyEvent) -> bool {
    matches!(key.code, KeyCode::Up | KeyCode::Char('k'))
}

pub(crate) fn is_down(key: KeyEvent) -> bool {
    matches!(key.code, KeyCode::Down | KeyCode::Char('j'))
}

pub(crate) fn is_left(key: KeyEvent) -> bool {
    matches!(key.code, KeyCode::Left | KeyCode::Char('h'))
}

pub(crate) fn is_right(key: KeyEvent) -> bool {
    matches!(key.code, KeyCode::Right | KeyCode::Char('l'))
}

pub(crate) fn is_toggle(key: KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char(' '))
}

pub(crate) fn is_next_field(key: KeyEvent) -> bool {
    matches!(key.code, KeyCode::Tab)
}

pub(crate) fn is_prev_field(key: KeyEvent) -> bool {
    matches!(key.code, KeyCode::BackTab)
}

pub(crate) fn is_sidebar(key: KeyEvent) -> bool {
    matches!(key.code, KeyCode::F(2))
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    use super::{
        is_back, is_confirm, is_down, is_left, is_next_field, is_prev_field, is_right, is_sidebar,
        is_toggle, is_up,
    };

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn up_keys_match_arrows_and_vim() {
        assert!(is_up(key(KeyCode::Up)));
        assert!(is_up(key(KeyCode::Char('k'))));
        assert!(!is_up(key(KeyCode::Char('j'))));
    }

    #[test]
    fn down_keys_match_arrows_and_vim() {
        assert!(is_down(key(KeyCode::Down)));
        assert!(is_down(key(KeyCode::Char('j'))));
        assert!(!is_down(key(KeyCode::Char('k'))));
    }

    #[test]
    fn slider_keys_match_arrows_and_vim() {
        assert!(is_left(key(KeyCode::Left)));
        assert!(is_left(key(KeyCode::Char('h'))));
        assert!(is_right(key(KeyCode::Right)));
        assert!(is_right(key(KeyCode::Char('l'))));
        assert!(!is_right(key(KeyCode::Char('h'))));
    }

    #[test]
    fn confirm_back_toggle_and_focus_keys_match_contract() {
        assert!(is_confirm(key(KeyCode::Enter)));
        assert!(is_back(key(KeyCode::Esc)));
        assert!(is_toggle(key(KeyCode::Char(' '))));
        assert!(is_next_field(key(KeyCode::Tab)));
        assert!(is_prev_field(key(KeyCode::BackTab)));
        assert!(is_sidebar(key(KeyCode::F(2))));
        assert!(!is_toggle(key(KeyCode::Char('y'))));
        assert!(!is_back(key(KeyCode::Enter)));
    }
}
