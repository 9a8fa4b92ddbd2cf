//! Keys the mouse-area service may forward into an open menu

/// Navigation keys accepted while a menu holds the keyboard grab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKey {
    /// Lowercase ASCII letter, used for item mnemonics
    Letter(char),
    Up,
    Down,
    Left,
    Right,
    Enter,
    Escape,
}

impl MenuKey {
    /// Map a key name as reported by the mouse-area service.
    /// Anything outside a-z and the six control keys is rejected.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "enter" => Some(Self::Enter),
            "escape" => Some(Self::Escape),
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_lowercase() => Some(Self::Letter(c)),
                    _ => None,
                }
            }
        }
    }
}
