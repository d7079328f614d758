//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` and parsed once on first access.

use serde::Deserialize;
use std::sync::LazyLock;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  // Video API
  pub api_base_url: String,
  pub permalink_template: String,
  pub embed_template: String,
  pub page_size: usize,
  pub related_page_size: usize,
  pub default_categories: Vec<String>,

  // Search/pagination
  pub search_debounce_ms: u64,
  pub near_end_threshold: usize,

  // Chat assistant
  pub chat_endpoint: String,
  pub chat_model: String,
  pub chat_thinking_model: String,
  pub thinking_budget: u32,
  pub chat_apology: String,
  pub chat_unavailable: String,

  // UI
  pub error_ttl_secs: u64,
  pub toast_ttl_secs: u64,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed the first test run catches it.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}

/// Substitute `{id}` in one of the URL templates.
pub fn expand_template(template: &str, id: &str) -> String {
  template.replace("{id}", id)
}
