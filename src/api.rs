use anyhow::{Context, Result, anyhow};
use image::DynamicImage;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::constants::constants;
use crate::model::{Category, FilterState, VideoRecord};

/// Parameters for one search page.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
  pub query: String,
  pub page: usize,
  pub per_page: usize,
  pub filters: FilterState,
}

impl SearchParams {
  /// Related videos for `video`: first word of its title, newest first, no category.
  pub fn related_to(video: &VideoRecord) -> Self {
    Self {
      query: video.title_lead().to_string(),
      page: 1,
      per_page: constants().related_page_size,
      filters: FilterState::default(),
    }
  }

  /// Query-string pairs. Optional parameters are only sent when set.
  pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
    let mut pairs = vec![
      ("page", self.page.to_string()),
      ("per_page", self.per_page.to_string()),
      ("order", self.filters.order.wire_name().to_string()),
    ];
    let query = self.query.trim();
    if !query.is_empty() {
      pairs.push(("query", query.to_string()));
    }
    if !self.filters.category.is_empty() {
      pairs.push(("category", self.filters.category.clone()));
    }
    let (min, max) = self.filters.duration;
    if min > 0 {
      pairs.push(("duration_min", min.to_string()));
    }
    if max > 0 {
      pairs.push(("duration_max", max.to_string()));
    }
    pairs
  }
}

#[derive(Deserialize)]
struct SearchBody {
  #[serde(default)]
  videos: Option<Vec<VideoRecord>>,
}

/// Decode a search response body. An empty body is an empty page; a missing `videos` key too.
pub fn parse_search_body(body: &str) -> Result<Vec<VideoRecord>> {
  if body.trim().is_empty() {
    return Ok(Vec::new());
  }
  let parsed: SearchBody = serde_json::from_str(body).context("Malformed search response")?;
  Ok(parsed.videos.unwrap_or_default())
}

/// Decode a categories response: `{categories: [...]}`, `{list: [...]}`, or a bare array.
pub fn parse_categories_body(body: &str) -> Result<Vec<Category>> {
  if body.trim().is_empty() {
    return Ok(Vec::new());
  }
  let value: Value = serde_json::from_str(body).context("Malformed categories response")?;
  let items: &[Value] = match &value {
    Value::Array(items) => items,
    Value::Object(map) => match map.get("categories").or_else(|| map.get("list")) {
      Some(Value::Array(items)) => items,
      _ => &[],
    },
    _ => &[],
  };
  Ok(items.iter().filter_map(category_from_value).collect())
}

fn category_from_value(value: &Value) -> Option<Category> {
  let text = |v: &Value| match v {
    Value::String(s) => Some(s.trim().to_string()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  };
  let (id, name) = match value {
    Value::String(s) => (s.trim().to_string(), s.trim().to_string()),
    Value::Object(map) => {
      let name = map.get("name").or_else(|| map.get("title")).and_then(text)?;
      let id = map.get("id").and_then(text).unwrap_or_else(|| name.clone());
      (id, name)
    }
    _ => return None,
  };
  if name.is_empty() { None } else { Some(Category { id, name }) }
}

/// The built-in category list used when the API gives nothing back.
pub fn default_categories() -> Vec<Category> {
  constants().default_categories.iter().map(|name| Category { id: name.clone(), name: name.clone() }).collect()
}

/// Fall back to the built-in categories on failure or an empty list.
pub fn categories_or_default(result: Result<Vec<Category>>) -> Vec<Category> {
  match result {
    Ok(categories) if !categories.is_empty() => categories,
    Ok(_) => {
      debug!("categories: empty response, using defaults");
      default_categories()
    }
    Err(e) => {
      warn!(err = %format!("{:#}", e), "categories: fetch failed, using defaults");
      default_categories()
    }
  }
}

/// Thin client over the video search API.
#[derive(Debug, Clone)]
pub struct VideoApi {
  client: Client,
  base_url: String,
}

impl VideoApi {
  pub fn new(client: Client, base_url: impl Into<String>) -> Self {
    Self { client, base_url: base_url.into().trim_end_matches('/').to_string() }
  }

  pub fn client(&self) -> &Client {
    &self.client
  }

  async fn get_text(&self, endpoint: &str, query: &[(&str, String)]) -> Result<String> {
    let url = Url::parse_with_params(&format!("{}{}", self.base_url, endpoint), query)
      .with_context(|| format!("Invalid API URL for {}", endpoint))?;
    let response = self
      .client
      .get(url)
      .send()
      .await
      .with_context(|| format!("Request to {} failed", endpoint))?;
    let status = response.status();
    if !status.is_success() {
      return Err(anyhow!("API request failed with status {}", status.as_u16()));
    }
    response.text().await.with_context(|| format!("Failed to read response body from {}", endpoint))
  }

  pub async fn search(&self, params: &SearchParams) -> Result<Vec<VideoRecord>> {
    debug!(page = params.page, query = %params.query, "api: search");
    let body = self.get_text("/video/search/", &params.query_pairs()).await?;
    parse_search_body(&body)
  }

  pub async fn categories(&self) -> Result<Vec<Category>> {
    let body = self.get_text("/video/categories/", &[]).await?;
    parse_categories_body(&body)
  }
}

/// Download and decode a thumbnail image.
pub async fn fetch_thumbnail(client: &Client, url: &str) -> Result<DynamicImage> {
  if url.is_empty() {
    return Err(anyhow!("Video has no thumbnail"));
  }
  let response = client.get(url).send().await.with_context(|| format!("Failed to fetch thumbnail {}", url))?;
  if !response.status().is_success() {
    return Err(anyhow!("Thumbnail request failed with status {}", response.status().as_u16()));
  }
  let bytes = response.bytes().await.with_context(|| format!("Failed to read image bytes from {}", url))?;
  image::load_from_memory(&bytes).with_context(|| format!("Failed to decode image from memory (URL: {})", url))
}
