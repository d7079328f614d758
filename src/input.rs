use anyhow::Result;
use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};
use tracing::debug;

use crate::app::{App, AppMode, ViewMode};
use crate::filters::FilterField;

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

/// Single-line text field with a char-indexed cursor.
#[derive(Debug, Clone, Default)]
pub struct LineEditor {
  text: String,
  cursor: usize,
  /// Horizontal scroll offset in display columns, maintained by the renderer.
  pub scroll: usize,
}

impl LineEditor {
  pub fn with_text(text: &str) -> Self {
    Self { text: text.to_string(), cursor: text.chars().count(), scroll: 0 }
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  pub fn cursor(&self) -> usize {
    self.cursor
  }

  pub fn is_empty(&self) -> bool {
    self.text.is_empty()
  }

  pub fn clear(&mut self) {
    self.text.clear();
    self.cursor = 0;
    self.scroll = 0;
  }

  /// Apply an editing key. Returns whether the text changed.
  pub fn handle_key(&mut self, code: KeyCode) -> bool {
    match code {
      KeyCode::Char(c) => {
        let byte_idx = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_idx, c);
        self.cursor += 1;
        true
      }
      KeyCode::Backspace => {
        if self.cursor == 0 {
          return false;
        }
        self.cursor -= 1;
        let byte_idx = char_to_byte_index(&self.text, self.cursor);
        self.text.remove(byte_idx);
        true
      }
      KeyCode::Delete => {
        if self.cursor >= self.text.chars().count() {
          return false;
        }
        let byte_idx = char_to_byte_index(&self.text, self.cursor);
        self.text.remove(byte_idx);
        true
      }
      KeyCode::Left => {
        self.cursor = self.cursor.saturating_sub(1);
        false
      }
      KeyCode::Right => {
        if self.cursor < self.text.chars().count() {
          self.cursor += 1;
        }
        false
      }
      KeyCode::Home => {
        self.cursor = 0;
        false
      }
      KeyCode::End => {
        self.cursor = self.text.chars().count();
        false
      }
      _ => false,
    }
  }
}

// --- Event Handling ---

pub async fn handle_key_event(app: &mut App, key: event::KeyEvent) -> Result<()> {
  if app.keyguard.blocks(&key) {
    debug!(code = ?key.code, "keyguard: swallowed key");
    return Ok(());
  }

  let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

  if ctrl && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return Ok(());
  }

  if ctrl && key.code == KeyCode::Char('t') {
    app.next_theme();
    return Ok(());
  }

  if ctrl && key.code == KeyCode::Char('a') {
    if app.mode == AppMode::Chat { app.close_chat() } else { app.open_chat() }
    return Ok(());
  }

  if ctrl && key.code == KeyCode::Char('f') && matches!(app.mode, AppMode::Browse | AppMode::Search) {
    app.toggle_view();
    app.mode = AppMode::Browse;
    return Ok(());
  }

  match app.mode {
    AppMode::Browse => handle_browse_key(app, key),
    AppMode::Search => handle_search_key(app, key),
    AppMode::Filters => handle_filter_key(app, key),
    AppMode::Player => handle_player_key(app, key),
    AppMode::Chat => handle_chat_key(app, key),
  }
  Ok(())
}

fn handle_browse_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter => app.open_selected(),
    KeyCode::Char(' ') | KeyCode::Char('s') => app.toggle_favorite_selected(),
    KeyCode::Char('/') => {
      app.clear_error();
      app.mode = AppMode::Search;
    }
    KeyCode::Char('f') if app.view == ViewMode::Search => app.open_filters(),
    KeyCode::Char('y') => {
      if let Some(video) = app.selected_video().cloned() {
        app.copy_link(&video);
      }
    }
    KeyCode::Char('o') => {
      if let Some(video) = app.selected_video().cloned() {
        app.open_in_browser(&video);
      }
    }
    KeyCode::Down | KeyCode::Char('j') => app.select_next(),
    KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
    KeyCode::Esc => {
      if app.view == ViewMode::Favorites {
        app.toggle_view();
      } else {
        app.clear_error();
      }
    }
    _ => {}
  }
}

fn handle_search_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter => app.submit_search(),
    KeyCode::Esc | KeyCode::Down => app.mode = AppMode::Browse,
    _ if key.modifiers.contains(KeyModifiers::CONTROL) => {}
    code => {
      if app.search.handle_key(code) {
        app.search_edited();
      }
    }
  }
}

fn handle_filter_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Esc => return app.close_filters(),
    KeyCode::Char('a') | KeyCode::Enter => return app.apply_filters(),
    _ => {}
  }
  let panel = &mut app.filters;
  match key.code {
    KeyCode::Char('r') => panel.reset(),
    KeyCode::Tab | KeyCode::Down => panel.focus = panel.focus.cycle(true),
    KeyCode::BackTab | KeyCode::Up => panel.focus = panel.focus.cycle(false),
    KeyCode::Left | KeyCode::Right => {
      let forward = key.code == KeyCode::Right;
      match panel.focus {
        FilterField::Order => panel.cycle_order(forward),
        FilterField::Category => panel.cycle_category(forward),
        FilterField::MinDuration | FilterField::MaxDuration => {}
      }
    }
    KeyCode::Char(c) if c.is_ascii_digit() => panel.push_digit(c.to_digit(10).unwrap_or(0)),
    KeyCode::Backspace => panel.pop_digit(),
    _ => {}
  }
}

fn handle_player_key(app: &mut App, key: event::KeyEvent) {
  let Some(video) = app.player.as_ref().map(|m| m.video.clone()) else {
    app.mode = AppMode::Browse;
    return;
  };
  match key.code {
    KeyCode::Esc | KeyCode::Char('q') => app.close_player(),
    KeyCode::Char(' ') | KeyCode::Char('s') => app.toggle_favorite(&video),
    KeyCode::Char('y') => app.copy_link(&video),
    KeyCode::Char('o') => app.open_in_browser(&video),
    KeyCode::Enter => app.open_related(),
    KeyCode::Down | KeyCode::Char('j') => {
      if let Some(modal) = app.player.as_mut()
        && !modal.related.is_empty()
      {
        let i = modal.related_state.selected().map_or(0, |i| (i + 1).min(modal.related.len() - 1));
        modal.related_state.select(Some(i));
      }
    }
    KeyCode::Up | KeyCode::Char('k') => {
      if let Some(modal) = app.player.as_mut()
        && !modal.related.is_empty()
      {
        let i = modal.related_state.selected().map_or(0, |i| i.saturating_sub(1));
        modal.related_state.select(Some(i));
      }
    }
    _ => {}
  }
}

fn handle_chat_key(app: &mut App, key: event::KeyEvent) {
  if key.modifiers.contains(KeyModifiers::CONTROL) {
    if key.code == KeyCode::Char('l') {
      app.clear_chat();
    }
    return;
  }
  match key.code {
    KeyCode::Esc => app.close_chat(),
    KeyCode::Enter => app.send_chat(),
    KeyCode::Tab => app.conversation.toggle_mode(),
    code => {
      app.chat_input.handle_key(code);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  // --- char_to_byte_index ---

  #[test]
  fn char_to_byte_ascii() {
    assert_eq!(char_to_byte_index("hello", 0), 0);
    assert_eq!(char_to_byte_index("hello", 3), 3);
    assert_eq!(char_to_byte_index("hello", 5), 5); // past end
  }

  #[test]
  fn char_to_byte_multibyte() {
    let s = "aé日"; // a=1 byte, é=2 bytes, 日=3 bytes
    assert_eq!(char_to_byte_index(s, 0), 0);
    assert_eq!(char_to_byte_index(s, 1), 1);
    assert_eq!(char_to_byte_index(s, 2), 3);
    assert_eq!(char_to_byte_index(s, 3), 6); // past end
  }

  #[test]
  fn char_to_byte_empty() {
    assert_eq!(char_to_byte_index("", 0), 0);
    assert_eq!(char_to_byte_index("", 5), 0);
  }

  // --- LineEditor ---

  #[test]
  fn editor_inserts_at_cursor() {
    let mut ed = LineEditor::with_text("ac");
    ed.handle_key(KeyCode::Left);
    assert!(ed.handle_key(KeyCode::Char('b')));
    assert_eq!(ed.text(), "abc");
    assert_eq!(ed.cursor(), 2);
  }

  #[test]
  fn editor_backspace_and_delete_handle_multibyte() {
    let mut ed = LineEditor::with_text("日本語");
    assert!(ed.handle_key(KeyCode::Backspace));
    assert_eq!(ed.text(), "日本");
    ed.handle_key(KeyCode::Home);
    assert!(ed.handle_key(KeyCode::Delete));
    assert_eq!(ed.text(), "本");
    assert!(!ed.handle_key(KeyCode::Home));
    assert!(!ed.handle_key(KeyCode::Backspace));
  }

  #[test]
  fn editor_cursor_movement_is_clamped() {
    let mut ed = LineEditor::with_text("ab");
    ed.handle_key(KeyCode::Right);
    assert_eq!(ed.cursor(), 2);
    ed.handle_key(KeyCode::Home);
    ed.handle_key(KeyCode::Left);
    assert_eq!(ed.cursor(), 0);
    ed.handle_key(KeyCode::End);
    assert_eq!(ed.cursor(), 2);
    ed.clear();
    assert!(ed.is_empty());
    assert_eq!(ed.cursor(), 0);
  }
}
