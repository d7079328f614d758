use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Swallows developer-tool shortcuts when enabled (`--lock-keys`).
///
/// Blocked: F12, Ctrl+Shift+I, Ctrl+Shift+J, Ctrl+Shift+C and Ctrl+U (with or without Shift).
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyGuard {
  enabled: bool,
}

impl KeyGuard {
  pub fn new(enabled: bool) -> Self {
    Self { enabled }
  }

  pub fn is_enabled(&self) -> bool {
    self.enabled
  }

  pub fn blocks(&self, key: &KeyEvent) -> bool {
    if !self.enabled {
      return false;
    }
    if key.code == KeyCode::F(12) {
      return true;
    }
    if !key.modifiers.contains(KeyModifiers::CONTROL) {
      return false;
    }
    let KeyCode::Char(c) = key.code else {
      return false;
    };
    // Terminals report Ctrl+Shift+letter either as an uppercase char or with SHIFT set.
    let shifted = key.modifiers.contains(KeyModifiers::SHIFT) || c.is_ascii_uppercase();
    match c.to_ascii_lowercase() {
      'i' | 'j' | 'c' => shifted,
      'u' => true,
      _ => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
    KeyEvent::new(code, modifiers)
  }

  #[test]
  fn disabled_guard_blocks_nothing() {
    let guard = KeyGuard::new(false);
    assert!(!guard.blocks(&key(KeyCode::F(12), KeyModifiers::NONE)));
  }

  #[test]
  fn blocks_devtools_shortcuts() {
    let guard = KeyGuard::new(true);
    let ctrl_shift = KeyModifiers::CONTROL | KeyModifiers::SHIFT;
    assert!(guard.blocks(&key(KeyCode::F(12), KeyModifiers::NONE)));
    assert!(guard.blocks(&key(KeyCode::Char('I'), ctrl_shift)));
    assert!(guard.blocks(&key(KeyCode::Char('j'), ctrl_shift)));
    assert!(guard.blocks(&key(KeyCode::Char('C'), KeyModifiers::CONTROL)));
    assert!(guard.blocks(&key(KeyCode::Char('u'), KeyModifiers::CONTROL)));
    assert!(guard.blocks(&key(KeyCode::Char('U'), ctrl_shift)));
    assert!(guard.blocks(&key(KeyCode::Char('U'), KeyModifiers::CONTROL)));
  }

  #[test]
  fn leaves_ordinary_keys_alone() {
    let guard = KeyGuard::new(true);
    assert!(!guard.blocks(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)));
    assert!(!guard.blocks(&key(KeyCode::Char('i'), KeyModifiers::NONE)));
    assert!(!guard.blocks(&key(KeyCode::F(5), KeyModifiers::NONE)));
    assert!(!guard.blocks(&key(KeyCode::Char('a'), KeyModifiers::CONTROL)));
  }
}
