//! Streaming client for the generative-AI chat backend.
//!
//! Replies arrive as server-sent events. The body is decoded incrementally:
//! bytes are split into lines, `data:` lines are collected into event payloads,
//! and every payload's text parts are yielded in the order received.

use anyhow::{Context, Result, anyhow};
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use reqwest::Client;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::pin::Pin;
use tracing::{debug, info, warn};

use crate::constants::constants;
use crate::model::ChatMessage;

pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Backend configuration for one exchange. The accumulation protocol is the same for both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChatMode {
  /// Default model with web search grounding.
  #[default]
  Standard,
  /// Higher-capability model with a thinking budget.
  Thinking,
}

impl ChatMode {
  pub fn toggle(self) -> Self {
    match self {
      ChatMode::Standard => ChatMode::Thinking,
      ChatMode::Thinking => ChatMode::Standard,
    }
  }

  pub fn model(self) -> &'static str {
    match self {
      ChatMode::Standard => &constants().chat_model,
      ChatMode::Thinking => &constants().chat_thinking_model,
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      ChatMode::Standard => "standard",
      ChatMode::Thinking => "think more",
    }
  }
}

/// JSON body for `streamGenerateContent`: prior history, then the new user turn.
pub fn request_body(history: &[ChatMessage], message: &str, mode: ChatMode) -> Value {
  let mut contents: Vec<Value> = history.iter().map(|m| json!({ "role": m.role, "parts": m.parts })).collect();
  contents.push(json!({ "role": "user", "parts": [{ "text": message }] }));
  match mode {
    ChatMode::Thinking => json!({
      "contents": contents,
      "generationConfig": { "thinkingConfig": { "thinkingBudget": constants().thinking_budget } },
    }),
    ChatMode::Standard => json!({
      "contents": contents,
      "tools": [{ "googleSearch": {} }],
    }),
  }
}

// --- SSE decoding ---

/// Incremental server-sent-events decoder. Feed raw bytes, get complete `data` payloads back.
#[derive(Debug, Default)]
pub struct SseDecoder {
  line: Vec<u8>,
  data: Vec<String>,
}

impl SseDecoder {
  pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
    let mut events = Vec::new();
    for &b in bytes {
      if b == b'\n' {
        let raw = std::mem::take(&mut self.line);
        let line = String::from_utf8_lossy(&raw);
        let line = line.strip_suffix('\r').unwrap_or(&line);
        if let Some(event) = self.take_line(line) {
          events.push(event);
        }
      } else {
        self.line.push(b);
      }
    }
    events
  }

  /// Flush whatever is buffered once the body ends.
  pub fn finish(&mut self) -> Option<String> {
    if !self.line.is_empty() {
      let raw = std::mem::take(&mut self.line);
      let line = String::from_utf8_lossy(&raw).trim_end_matches('\r').to_string();
      if let Some(event) = self.take_line(&line) {
        return Some(event);
      }
    }
    self.dispatch()
  }

  fn take_line(&mut self, line: &str) -> Option<String> {
    if line.is_empty() {
      return self.dispatch();
    }
    if let Some(value) = line.strip_prefix("data:") {
      self.data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
    }
    // Comments, `event:`, `id:` and `retry:` lines carry nothing we use.
    None
  }

  fn dispatch(&mut self) -> Option<String> {
    if self.data.is_empty() {
      return None;
    }
    Some(std::mem::take(&mut self.data).join("\n"))
  }
}

/// Text fragments of one streamed response payload. Thought summaries and empty parts are skipped.
pub fn fragments_from_payload(payload: &str) -> Result<Vec<String>> {
  let value: Value = serde_json::from_str(payload).context("Malformed chat stream payload")?;
  if let Some(err) = value.get("error") {
    let message = err.get("message").and_then(Value::as_str).unwrap_or("unknown error");
    return Err(anyhow!("Chat backend error: {}", message));
  }
  let parts = value
    .pointer("/candidates/0/content/parts")
    .and_then(Value::as_array)
    .map(Vec::as_slice)
    .unwrap_or_default();
  Ok(
    parts
      .iter()
      .filter(|p| !p.get("thought").and_then(Value::as_bool).unwrap_or(false))
      .filter_map(|p| p.get("text").and_then(Value::as_str))
      .filter(|t| !t.is_empty())
      .map(str::to_string)
      .collect(),
  )
}

struct Decoding<S> {
  bytes: Pin<Box<S>>,
  sse: SseDecoder,
  ready: VecDeque<String>,
  finished: bool,
}

/// Turn a raw SSE byte stream into text fragments. The first error ends the stream.
pub fn decode_stream<S, B, E>(bytes: S) -> impl Stream<Item = Result<String>> + Send
where
  S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
  B: AsRef<[u8]> + Send,
  E: Into<anyhow::Error> + Send,
{
  let state = Decoding { bytes: Box::pin(bytes), sse: SseDecoder::default(), ready: VecDeque::new(), finished: false };
  stream::unfold(state, |mut st| async move {
    loop {
      if let Some(text) = st.ready.pop_front() {
        return Some((Ok(text), st));
      }
      if st.finished {
        return None;
      }
      let payloads = match st.bytes.next().await {
        Some(Ok(chunk)) => st.sse.push(chunk.as_ref()),
        Some(Err(e)) => {
          st.finished = true;
          let err: anyhow::Error = e.into();
          return Some((Err(err.context("Chat stream interrupted")), st));
        }
        None => {
          st.finished = true;
          st.sse.finish().into_iter().collect()
        }
      };
      for payload in payloads {
        match fragments_from_payload(&payload) {
          Ok(fragments) => st.ready.extend(fragments),
          Err(e) => {
            st.finished = true;
            st.ready.clear();
            return Some((Err(e), st));
          }
        }
      }
    }
  })
}

// --- Client ---

#[derive(Debug, Clone)]
pub struct ChatClient {
  client: Client,
  api_key: Option<String>,
  endpoint: String,
}

impl ChatClient {
  pub fn new(client: Client, api_key: Option<String>) -> Self {
    if api_key.is_none() {
      warn!("chat: no API key configured; set GEMINI_API_KEY to enable the assistant");
    }
    Self { client, api_key, endpoint: constants().chat_endpoint.trim_end_matches('/').to_string() }
  }

  pub fn is_configured(&self) -> bool {
    self.api_key.is_some()
  }

  /// Open a reply stream for `message` following `history`.
  ///
  /// Without a credential this yields a single explanatory fragment instead of failing.
  pub fn stream_reply(&self, history: &[ChatMessage], message: &str, mode: ChatMode) -> TextStream {
    let Some(api_key) = self.api_key.clone() else {
      return Box::pin(stream::iter([Ok(constants().chat_unavailable.clone())]));
    };
    let url = format!("{}/{}:streamGenerateContent?alt=sse", self.endpoint, mode.model());
    let body = request_body(history, message, mode);
    let client = self.client.clone();
    info!(model = mode.model(), turns = history.len(), "chat: opening stream");

    let open = async move {
      let response = client
        .post(&url)
        .header("x-goog-api-key", api_key)
        .json(&body)
        .send()
        .await
        .context("Failed to reach the chat backend")?;
      let status = response.status();
      if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), body = %detail, "chat: request rejected");
        return Err(anyhow!("Chat request failed with status {}", status.as_u16()));
      }
      Ok(decode_stream(response.bytes_stream()))
    };
    Box::pin(stream::once(open).try_flatten())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::ChatRole;

  fn payload(text: &str) -> String {
    json!({ "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }] }).to_string()
  }

  #[test]
  fn sse_decoder_handles_split_lines() {
    let mut sse = SseDecoder::default();
    let body = format!("data: {}\r\n\r\ndata: {}\r\n\r\n", payload("Hel"), payload("lo"));
    let (a, b) = body.as_bytes().split_at(17);
    let mut events = sse.push(a);
    assert!(events.is_empty());
    events.extend(sse.push(b));
    assert_eq!(events.len(), 2);
    assert_eq!(fragments_from_payload(&events[0]).unwrap(), vec!["Hel"]);
    assert_eq!(fragments_from_payload(&events[1]).unwrap(), vec!["lo"]);
  }

  #[test]
  fn sse_decoder_keeps_multibyte_chars_split_across_chunks() {
    let mut sse = SseDecoder::default();
    let body = format!("data: {}\n\n", payload("héllo"));
    let bytes = body.as_bytes();
    let cut = body.find('é').unwrap() + 1;
    let mut events = sse.push(&bytes[..cut]);
    events.extend(sse.push(&bytes[cut..]));
    assert_eq!(fragments_from_payload(&events[0]).unwrap(), vec!["héllo"]);
  }

  #[test]
  fn sse_decoder_joins_multiline_data_and_skips_comments() {
    let mut sse = SseDecoder::default();
    let events = sse.push(b": keepalive\nevent: message\ndata: a\ndata: b\n\n");
    assert_eq!(events, vec!["a\nb".to_string()]);
  }

  #[test]
  fn sse_decoder_flushes_unterminated_event() {
    let mut sse = SseDecoder::default();
    assert!(sse.push(b"data: tail").is_empty());
    assert_eq!(sse.finish().as_deref(), Some("tail"));
    assert_eq!(sse.finish(), None);
  }

  #[test]
  fn payload_skips_thoughts_and_empty_parts() {
    let p = json!({ "candidates": [{ "content": { "parts": [
      { "text": "planning", "thought": true },
      { "text": "" },
      { "text": "Answer" }
    ] } }] })
    .to_string();
    assert_eq!(fragments_from_payload(&p).unwrap(), vec!["Answer"]);
  }

  #[test]
  fn payload_without_candidates_is_empty() {
    assert!(fragments_from_payload(r#"{"usageMetadata": {}}"#).unwrap().is_empty());
  }

  #[test]
  fn payload_error_object_is_error() {
    let err = fragments_from_payload(r#"{"error": {"code": 429, "message": "quota"}}"#).unwrap_err();
    assert!(format!("{}", err).contains("quota"));
  }

  #[test]
  fn request_body_per_mode() {
    let history = vec![ChatMessage::new(1, ChatRole::User, "hi"), ChatMessage::new(2, ChatRole::Model, "hello")];
    let standard = request_body(&history, "next", ChatMode::Standard);
    assert_eq!(standard["contents"].as_array().unwrap().len(), 3);
    assert_eq!(standard["contents"][1]["role"], "model");
    assert_eq!(standard["contents"][2], json!({ "role": "user", "parts": [{ "text": "next" }] }));
    assert!(standard["tools"][0].get("googleSearch").is_some());
    assert!(standard.get("generationConfig").is_none());

    let thinking = request_body(&[], "deep", ChatMode::Thinking);
    assert_eq!(thinking["generationConfig"]["thinkingConfig"]["thinkingBudget"], 32768);
    assert!(thinking.get("tools").is_none());
  }

  #[test]
  fn mode_selects_model() {
    assert_eq!(ChatMode::Standard.model(), "gemini-2.5-flash");
    assert_eq!(ChatMode::Thinking.model(), "gemini-2.5-pro");
    assert_eq!(ChatMode::Standard.toggle(), ChatMode::Thinking);
  }

  #[tokio::test]
  async fn decode_stream_yields_fragments_in_order() {
    let body = format!("data: {}\n\ndata: {}\n\ndata: {}\n\n", payload("Hel"), payload("lo"), payload(" world"));
    let chunks: Vec<std::result::Result<Vec<u8>, anyhow::Error>> =
      body.as_bytes().chunks(7).map(|c| Ok(c.to_vec())).collect();
    let out: Vec<String> = decode_stream(stream::iter(chunks)).try_collect().await.unwrap();
    assert_eq!(out, vec!["Hel", "lo", " world"]);
  }

  #[tokio::test]
  async fn decode_stream_surfaces_transport_errors() {
    let chunks: Vec<std::result::Result<Vec<u8>, anyhow::Error>> =
      vec![Ok(format!("data: {}\n\n", payload("partial")).into_bytes()), Err(anyhow!("connection reset"))];
    let items: Vec<Result<String>> = decode_stream(stream::iter(chunks)).collect().await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), "partial");
    assert!(items[1].is_err());
  }

  #[tokio::test]
  async fn missing_key_yields_single_explanation() {
    let client = ChatClient::new(Client::new(), None);
    assert!(!client.is_configured());
    let out: Vec<String> = client.stream_reply(&[], "hello", ChatMode::Standard).try_collect().await.unwrap();
    assert_eq!(out, vec![constants().chat_unavailable.clone()]);
  }
}
