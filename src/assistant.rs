//! Chat conversation state.
//!
//! A send appends the user message plus an empty model placeholder, then the
//! streamed fragments are folded into that placeholder. Each exchange has an id;
//! events carrying an older id (a stream still running after a clear) are ignored.

use futures::StreamExt;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::chat::{ChatMode, TextStream};
use crate::constants::constants;
use crate::model::{ChatMessage, ChatRole};

/// Everything needed to start one streamed reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
  pub exchange: u64,
  /// Messages before the new user turn.
  pub history: Vec<ChatMessage>,
  pub message: String,
  pub mode: ChatMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
  Chunk { exchange: u64, text: String },
  Done { exchange: u64 },
  Failed { exchange: u64, message: String },
}

#[derive(Debug, Default)]
pub struct Conversation {
  messages: Vec<ChatMessage>,
  loading: bool,
  mode: ChatMode,
  exchange: u64,
  next_id: u64,
}

impl Conversation {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn messages(&self) -> &[ChatMessage] {
    &self.messages
  }

  pub fn is_loading(&self) -> bool {
    self.loading
  }

  pub fn mode(&self) -> ChatMode {
    self.mode
  }

  pub fn toggle_mode(&mut self) {
    self.mode = self.mode.toggle();
    debug!(mode = self.mode.label(), "chat: mode toggled");
  }

  /// Loading with nothing received yet; the UI shows a typing indicator.
  pub fn awaiting_first_token(&self) -> bool {
    self.loading && self.messages.last().is_some_and(|m| m.role == ChatRole::Model && m.text().is_empty())
  }

  /// Start an exchange. Blank input or a reply still streaming means nothing is sent.
  pub fn submit(&mut self, text: &str) -> Option<ChatRequest> {
    let message = text.trim();
    if message.is_empty() || self.loading {
      return None;
    }
    let history = self.messages.clone();
    self.exchange += 1;
    let user = self.alloc_id();
    let model = self.alloc_id();
    self.messages.push(ChatMessage::new(user, ChatRole::User, message));
    self.messages.push(ChatMessage::new(model, ChatRole::Model, ""));
    self.loading = true;
    info!(exchange = self.exchange, mode = self.mode.label(), "chat: message submitted");
    Some(ChatRequest { exchange: self.exchange, history, message: message.to_string(), mode: self.mode })
  }

  pub fn apply(&mut self, event: ChatEvent) {
    match event {
      ChatEvent::Chunk { exchange, text } => self.push_chunk(exchange, &text),
      ChatEvent::Done { exchange } => self.finish(exchange),
      ChatEvent::Failed { exchange, message } => self.fail(exchange, &message),
    }
  }

  pub fn push_chunk(&mut self, exchange: u64, chunk: &str) {
    if !self.is_current(exchange) {
      return;
    }
    if let Some(last) = self.messages.last_mut() {
      *last = last.appended(chunk);
    }
  }

  pub fn finish(&mut self, exchange: u64) {
    if self.is_current(exchange) {
      self.loading = false;
    }
  }

  /// Replace the placeholder, including any partial text, with the apology.
  pub fn fail(&mut self, exchange: u64, message: &str) {
    if !self.is_current(exchange) {
      return;
    }
    warn!(exchange, err = %message, "chat: stream failed");
    if let Some(last) = self.messages.last_mut() {
      *last = ChatMessage::new(last.id, ChatRole::Model, constants().chat_apology.clone());
    }
    self.loading = false;
  }

  /// Drop every message. A stream still running for the old exchange is ignored from now on.
  pub fn clear(&mut self) {
    self.messages.clear();
    self.loading = false;
    self.exchange += 1;
  }

  fn is_current(&self, exchange: u64) -> bool {
    self.loading && exchange == self.exchange
  }

  fn alloc_id(&mut self) -> u64 {
    self.next_id += 1;
    self.next_id
  }
}

/// Drive a reply stream to completion, forwarding each fragment as an event.
pub async fn forward_reply(mut stream: TextStream, exchange: u64, tx: UnboundedSender<ChatEvent>) {
  while let Some(item) = stream.next().await {
    let event = match item {
      Ok(text) => ChatEvent::Chunk { exchange, text },
      Err(e) => {
        let _ = tx.send(ChatEvent::Failed { exchange, message: format!("{:#}", e) });
        return;
      }
    };
    if tx.send(event).is_err() {
      return;
    }
  }
  let _ = tx.send(ChatEvent::Done { exchange });
}

#[cfg(test)]
mod tests {
  use super::*;
  use anyhow::anyhow;
  use futures::stream;
  use tokio::sync::mpsc;

  async fn run(conv: &mut Conversation, exchange: u64, items: Vec<anyhow::Result<String>>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    forward_reply(Box::pin(stream::iter(items)), exchange, tx).await;
    while let Ok(event) = rx.try_recv() {
      conv.apply(event);
    }
  }

  #[test]
  fn submit_appends_user_and_placeholder() {
    let mut conv = Conversation::new();
    let req = conv.submit("  hi there ").unwrap();
    assert_eq!(req.message, "hi there");
    assert!(req.history.is_empty());
    assert_eq!(conv.messages().len(), 2);
    assert_eq!(conv.messages()[0].role, ChatRole::User);
    assert_eq!(conv.messages()[1].text(), "");
    assert!(conv.is_loading());
    assert!(conv.awaiting_first_token());
  }

  #[test]
  fn blank_or_busy_submit_is_ignored() {
    let mut conv = Conversation::new();
    assert!(conv.submit("   ").is_none());
    assert!(conv.messages().is_empty());
    conv.submit("first").unwrap();
    assert!(conv.submit("second").is_none());
    assert_eq!(conv.messages().len(), 2);
  }

  #[test]
  fn history_excludes_new_turn() {
    let mut conv = Conversation::new();
    let first = conv.submit("one").unwrap();
    conv.push_chunk(first.exchange, "reply");
    conv.finish(first.exchange);
    let second = conv.submit("two").unwrap();
    assert_eq!(second.history.len(), 2);
    assert_eq!(second.history[1].text(), "reply");
  }

  #[tokio::test]
  async fn fragments_accumulate_in_order() {
    let mut conv = Conversation::new();
    let req = conv.submit("hello").unwrap();
    run(&mut conv, req.exchange, vec![Ok("Hel".into()), Ok("lo".into()), Ok(" world".into())]).await;
    assert_eq!(conv.messages()[1].text(), "Hello world");
    assert!(!conv.is_loading());
  }

  #[tokio::test]
  async fn failure_replaces_partial_reply_with_apology() {
    let mut conv = Conversation::new();
    let req = conv.submit("hello").unwrap();
    run(&mut conv, req.exchange, vec![Ok("Par".into()), Err(anyhow!("reset"))]).await;
    assert_eq!(conv.messages()[1].text(), constants().chat_apology);
    assert!(!conv.is_loading());
  }

  #[test]
  fn events_after_clear_are_ignored() {
    let mut conv = Conversation::new();
    let req = conv.submit("hello").unwrap();
    conv.clear();
    conv.push_chunk(req.exchange, "late");
    conv.fail(req.exchange, "late");
    assert!(conv.messages().is_empty());
    assert!(!conv.is_loading());
  }

  #[test]
  fn toggle_mode_flows_into_request() {
    let mut conv = Conversation::new();
    conv.toggle_mode();
    assert_eq!(conv.submit("deep").unwrap().mode, ChatMode::Thinking);
  }
}
