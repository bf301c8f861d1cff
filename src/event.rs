//! Keystroke events and native key normalization
//!
//! Converts crossterm key events into the token strings the rest of the
//! engine works with ("a", "G", "<C-w>", "<Esc>", ...).

use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// A normalized keystroke: one physical key press plus modifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeystrokeEvent {
    /// Normalized token ("a", "<C-r>", "<Esc>", ...)
    pub token: String,
    /// Modifier flags active when the key was pressed
    pub modifiers: KeyModifiers,
    /// True when the event came from key auto-repeat
    pub is_repeat: bool,
    /// When the key was pressed
    pub timestamp: Instant,
}

impl KeystrokeEvent {
    /// Create an event stamped with the current time
    pub fn new(token: impl Into<String>) -> Self {
        Self::at(token, Instant::now())
    }

    /// Create an event with an explicit timestamp (replay, tests)
    pub fn at(token: impl Into<String>, timestamp: Instant) -> Self {
        Self {
            token: token.into(),
            modifiers: KeyModifiers::NONE,
            is_repeat: false,
            timestamp,
        }
    }

    pub fn with_modifiers(mut self, modifiers: KeyModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn repeated(mut self) -> Self {
        self.is_repeat = true;
        self
    }
}

/// Normalize a native crossterm key event into a keystroke token
///
/// Returns None for events that carry no token (key releases, bare
/// modifier presses, media keys).
pub fn normalize_key_event(key: KeyEvent) -> Option<KeystrokeEvent> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    let token = key_event_token(&key)?;
    let mut event = KeystrokeEvent::new(token).with_modifiers(key.modifiers);
    if key.kind == KeyEventKind::Repeat {
        event = event.repeated();
    }
    Some(event)
}

/// Token string for a key event, or None if it has no token form
fn key_event_token(key: &KeyEvent) -> Option<String> {
    // Control and alt chords use the <C-x> / <A-x> notation
    if let KeyCode::Char(c) = key.code {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(format!("<C-{}>", c.to_ascii_lowercase()));
        }
        if key.modifiers.contains(KeyModifiers::ALT) {
            return Some(format!("<A-{}>", c.to_ascii_lowercase()));
        }
        // Shift is already folded into the char by the terminal
        return Some(c.to_string());
    }

    let token = match key.code {
        KeyCode::Enter => "<CR>",
        KeyCode::Esc => "<Esc>",
        KeyCode::Tab => "<Tab>",
        KeyCode::BackTab => "<S-Tab>",
        KeyCode::Backspace => "<BS>",
        KeyCode::Delete => "<Del>",
        KeyCode::Up => "<Up>",
        KeyCode::Down => "<Down>",
        KeyCode::Left => "<Left>",
        KeyCode::Right => "<Right>",
        KeyCode::Home => "<Home>",
        KeyCode::End => "<End>",
        KeyCode::PageUp => "<PageUp>",
        KeyCode::PageDown => "<PageDown>",
        KeyCode::Insert => "<Insert>",
        KeyCode::F(n) => return Some(format!("<F{}>", n)),
        _ => return None,
    };
    Some(token.to_string())
}
