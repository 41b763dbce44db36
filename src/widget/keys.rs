//! Key presses delivered to the widget.

/// A key as reported by the input field (`KeyboardEvent.key` naming).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Enter,
    Character(char),
    Named(String),
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            _ if name == "Enter" => Self::Enter,
            (Some(c), None) => Self::Character(c),
            _ => Self::Named(name.to_string()),
        }
    }
}

impl From<char> for Key {
    fn from(c: char) -> Self {
        match c {
            '\n' | '\r' => Self::Enter,
            c => Self::Character(c),
        }
    }
}
