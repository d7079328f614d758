//! Records exchanged with the video API, the favorites file, and the chat backend.

use chrono::{Local, TimeZone};
use serde::{Deserialize, Deserializer, Serialize};

// --- Videos ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thumbnail {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub size: Option<String>,
  #[serde(deserialize_with = "lenient_string")]
  pub src: String,
  #[serde(deserialize_with = "lenient_u64")]
  pub width: u64,
  #[serde(deserialize_with = "lenient_u64")]
  pub height: u64,
}

/// A single search result. Never mutated after it arrives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoRecord {
  #[serde(deserialize_with = "lenient_string")]
  pub id: String,
  #[serde(deserialize_with = "lenient_string")]
  pub title: String,
  #[serde(deserialize_with = "lenient_string")]
  pub keywords: String,
  #[serde(deserialize_with = "lenient_u64")]
  pub views: u64,
  #[serde(deserialize_with = "lenient_string")]
  pub rate: String,
  #[serde(deserialize_with = "lenient_string")]
  pub url: String,
  #[serde(deserialize_with = "lenient_string")]
  pub added: String,
  #[serde(deserialize_with = "lenient_u64")]
  pub length_sec: u64,
  #[serde(deserialize_with = "lenient_string")]
  pub length_min: String,
  #[serde(deserialize_with = "lenient_string")]
  pub embed: String,
  #[serde(deserialize_with = "null_default")]
  pub default_thumb: Thumbnail,
  #[serde(deserialize_with = "null_default")]
  pub thumbs: Vec<Thumbnail>,
}

impl VideoRecord {
  /// First whitespace-separated word of the title, used as the related-videos query.
  pub fn title_lead(&self) -> &str {
    self.title.split_whitespace().next().unwrap_or("")
  }
}

/// Accept numbers, numeric strings, and null for count-like fields.
fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Raw {
    Int(u64),
    Float(f64),
    Text(String),
    Null,
  }
  Ok(match Option::<Raw>::deserialize(deserializer)? {
    Some(Raw::Int(n)) => n,
    Some(Raw::Float(f)) if f.is_finite() && f >= 0.0 => f as u64,
    Some(Raw::Text(s)) => s.trim().parse().unwrap_or(0),
    _ => 0,
  })
}

/// Accept strings, bare numbers, and null for text fields.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Raw {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
  }
  Ok(match Option::<Raw>::deserialize(deserializer)? {
    Some(Raw::Text(s)) => s,
    Some(Raw::Int(n)) => n.to_string(),
    Some(Raw::Float(f)) => f.to_string(),
    Some(Raw::Bool(b)) => b.to_string(),
    None => String::new(),
  })
}

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de> + Default,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A favorited video plus the moment it was favorited (epoch milliseconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteRecord {
  #[serde(flatten)]
  pub video: VideoRecord,
  #[serde(rename = "favoritedAt")]
  pub favorited_at: i64,
}

impl FavoriteRecord {
  pub fn new(video: VideoRecord) -> Self {
    Self { video, favorited_at: chrono::Utc::now().timestamp_millis() }
  }

  pub fn favorited_label(&self) -> String {
    match Local.timestamp_millis_opt(self.favorited_at).single() {
      Some(t) => t.format("%Y-%m-%d").to_string(),
      None => String::new(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
  pub id: String,
  pub name: String,
}

// --- Filters ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
  #[default]
  Latest,
  TopRated,
  MostViewed,
  Longest,
  Shortest,
}

impl SortOrder {
  pub const ALL: [SortOrder; 5] =
    [SortOrder::Latest, SortOrder::TopRated, SortOrder::MostViewed, SortOrder::Longest, SortOrder::Shortest];

  /// Value sent as the `order` query parameter.
  pub fn wire_name(self) -> &'static str {
    match self {
      SortOrder::Latest => "latest",
      SortOrder::TopRated => "top-rated",
      SortOrder::MostViewed => "most-viewed",
      SortOrder::Longest => "longest",
      SortOrder::Shortest => "shortest",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      SortOrder::Latest => "Latest",
      SortOrder::TopRated => "Top Rated",
      SortOrder::MostViewed => "Most Viewed",
      SortOrder::Longest => "Longest",
      SortOrder::Shortest => "Shortest",
    }
  }

  pub fn cycle(self, forward: bool) -> Self {
    let idx = SortOrder::ALL.iter().position(|o| *o == self).unwrap_or(0);
    let len = SortOrder::ALL.len();
    SortOrder::ALL[if forward { (idx + 1) % len } else { (idx + len - 1) % len }]
  }
}

/// Sort order, category, and duration bounds in minutes (0 = unbounded).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterState {
  pub order: SortOrder,
  pub category: String,
  pub duration: (u32, u32),
}

// --- Chat ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
  User,
  Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPart {
  pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
  #[serde(skip)]
  pub id: u64,
  pub role: ChatRole,
  pub parts: Vec<ChatPart>,
}

impl ChatMessage {
  pub fn new(id: u64, role: ChatRole, text: impl Into<String>) -> Self {
    Self { id, role, parts: vec![ChatPart { text: text.into() }] }
  }

  pub fn text(&self) -> &str {
    self.parts.first().map_or("", |p| p.text.as_str())
  }

  /// A copy of this message with `chunk` appended to its text.
  pub fn appended(&self, chunk: &str) -> Self {
    Self::new(self.id, self.role, format!("{}{}", self.text(), chunk))
  }
}

// --- Formatting ---

/// Compact view counter: `950`, `1.2K`, `3.4M`.
pub fn format_views(views: u64) -> String {
  match views {
    0..=999 => views.to_string(),
    // 999_950 and up would round to "1000.0K".
    1_000..=999_949 => format!("{:.1}K", views as f64 / 1_000.0),
    _ => format!("{:.1}M", views as f64 / 1_000_000.0),
  }
}

/// `m:ss` or `h:mm:ss` from a length in seconds.
pub fn format_length(secs: u64) -> String {
  let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
  if h > 0 { format!("{}:{:02}:{:02}", h, m, s) } else { format!("{}:{:02}", m, s) }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = r#"{
    "id": "AbC123",
    "title": "Sunset timelapse over the bay",
    "keywords": "sunset, timelapse",
    "views": 15234,
    "rate": "4.52",
    "url": "https://videos.test/video-AbC123/",
    "added": "2024-03-01 10:00:00",
    "length_sec": 754,
    "length_min": "12:34",
    "embed": "https://videos.test/embed/AbC123",
    "default_thumb": {"size": "medium", "width": 427, "height": 240, "src": "https://img.test/1.jpg"},
    "thumbs": [{"size": "small", "width": "190", "height": "152", "src": "https://img.test/s.jpg"}]
  }"#;

  #[test]
  fn video_record_parses_api_shape() {
    let v: VideoRecord = serde_json::from_str(SAMPLE).unwrap();
    assert_eq!(v.id, "AbC123");
    assert_eq!(v.views, 15234);
    assert_eq!(v.length_sec, 754);
    assert_eq!(v.default_thumb.width, 427);
    assert_eq!(v.thumbs[0].width, 190);
    assert_eq!(v.title_lead(), "Sunset");
  }

  #[test]
  fn video_record_tolerates_missing_and_null_fields() {
    let v: VideoRecord = serde_json::from_str(r#"{"id": "x", "views": null}"#).unwrap();
    assert_eq!(v.id, "x");
    assert_eq!(v.views, 0);
    assert!(v.thumbs.is_empty());
    assert_eq!(v.title_lead(), "");
  }

  #[test]
  fn video_record_tolerates_null_and_numeric_text_fields() {
    let raw = r#"{
      "id": 42, "title": null, "keywords": null, "rate": 4.5, "added": null,
      "length_min": null, "url": null, "embed": null,
      "default_thumb": {"src": null, "width": 10}, "thumbs": null
    }"#;
    let v: VideoRecord = serde_json::from_str(raw).unwrap();
    assert_eq!(v.id, "42");
    assert_eq!(v.title, "");
    assert_eq!(v.keywords, "");
    assert_eq!(v.rate, "4.5");
    assert_eq!(v.default_thumb.src, "");
    assert_eq!(v.default_thumb.width, 10);
    assert!(v.thumbs.is_empty());
  }

  #[test]
  fn favorite_record_flattens_with_timestamp_key() {
    let video: VideoRecord = serde_json::from_str(SAMPLE).unwrap();
    let fav = FavoriteRecord { video, favorited_at: 1_700_000_000_000 };
    let json = serde_json::to_value(&fav).unwrap();
    assert_eq!(json["id"], "AbC123");
    assert_eq!(json["favoritedAt"], 1_700_000_000_000i64);
    let back: FavoriteRecord = serde_json::from_value(json).unwrap();
    assert_eq!(back, fav);
  }

  #[test]
  fn sort_order_cycles_both_ways() {
    assert_eq!(SortOrder::Latest.cycle(true), SortOrder::TopRated);
    assert_eq!(SortOrder::Shortest.cycle(true), SortOrder::Latest);
    assert_eq!(SortOrder::Latest.cycle(false), SortOrder::Shortest);
  }

  #[test]
  fn chat_message_serializes_as_content() {
    let msg = ChatMessage::new(7, ChatRole::Model, "hi");
    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json, serde_json::json!({"role": "model", "parts": [{"text": "hi"}]}));
  }

  #[test]
  fn appended_keeps_identity() {
    let msg = ChatMessage::new(3, ChatRole::Model, "Hel");
    let next = msg.appended("lo");
    assert_eq!(next.id, 3);
    assert_eq!(next.text(), "Hello");
    assert_eq!(msg.text(), "Hel");
  }

  #[test]
  fn views_formatting() {
    assert_eq!(format_views(950), "950");
    assert_eq!(format_views(1_234), "1.2K");
    assert_eq!(format_views(3_400_000), "3.4M");
  }

  #[test]
  fn views_switch_to_millions_before_rounding_up_to_1000k() {
    assert_eq!(format_views(999_949), "999.9K");
    assert_eq!(format_views(999_950), "1.0M");
    assert_eq!(format_views(999_999), "1.0M");
  }

  #[test]
  fn length_formatting() {
    assert_eq!(format_length(59), "0:59");
    assert_eq!(format_length(754), "12:34");
    assert_eq!(format_length(3_725), "1:02:05");
  }
}
