//! Search/pagination controller.
//!
//! Owns the result list, the page cursor and the loading/error/has-more flags.
//! Three triggers produce fetches:
//!
//! - the one-shot initial load,
//! - query or filter edits, debounced so only the last edit inside the window fetches,
//! - the "near end of list" signal, which fetches the next page immediately.
//!
//! The controller never performs I/O. It hands out [`FetchRequest`]s and takes
//! the results back through [`Feed::apply_response`]. Every request carries a
//! sequence number and only the most recently issued one may change state, so a
//! slow page fetch that lands after a reset is dropped instead of appended.

use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::api::SearchParams;
use crate::model::{FilterState, VideoRecord};

/// A fetch the caller should run and report back with the same `seq`.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
  pub seq: u64,
  pub params: SearchParams,
}

/// Outcome of feeding a response back into the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
  Accepted,
  /// A newer request was issued since; the response was ignored.
  Stale,
}

/// Deadline-based debounce: re-arming replaces the pending deadline.
#[derive(Debug, Clone)]
pub struct Debouncer {
  window: Duration,
  deadline: Option<Instant>,
}

impl Debouncer {
  pub fn new(window: Duration) -> Self {
    Self { window, deadline: None }
  }

  pub fn arm(&mut self, now: Instant) {
    self.deadline = Some(now + self.window);
  }

  pub fn cancel(&mut self) {
    self.deadline = None;
  }

  pub fn is_pending(&self) -> bool {
    self.deadline.is_some()
  }

  /// True exactly once when the window has elapsed.
  pub fn fire(&mut self, now: Instant) -> bool {
    match self.deadline {
      Some(deadline) if now >= deadline => {
        self.deadline = None;
        true
      }
      _ => false,
    }
  }
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
  seq: u64,
  page: usize,
}

#[derive(Debug, Clone)]
pub struct Feed {
  items: Vec<VideoRecord>,
  /// Last page whose results were committed (1 after a reset).
  page: usize,
  has_more: bool,
  error: Option<String>,
  in_flight: Option<InFlight>,
  last_seq: u64,
  query: String,
  filters: FilterState,
  debounce: Debouncer,
  started: bool,
  page_size: usize,
}

impl Feed {
  pub fn new(page_size: usize, debounce: Duration) -> Self {
    Self {
      items: Vec::new(),
      page: 1,
      has_more: true,
      error: None,
      in_flight: None,
      last_seq: 0,
      query: String::new(),
      filters: FilterState::default(),
      debounce: Debouncer::new(debounce),
      started: false,
      page_size,
    }
  }

  pub fn items(&self) -> &[VideoRecord] {
    &self.items
  }

  pub fn page(&self) -> usize {
    self.page
  }

  pub fn has_more(&self) -> bool {
    self.has_more
  }

  pub fn is_loading(&self) -> bool {
    self.in_flight.is_some()
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  pub fn clear_error(&mut self) {
    self.error = None;
  }

  pub fn query(&self) -> &str {
    &self.query
  }

  pub fn filters(&self) -> &FilterState {
    &self.filters
  }

  pub fn is_debouncing(&self) -> bool {
    self.debounce.is_pending()
  }

  // --- Triggers ---

  /// First fetch after startup. Only ever returns a request once.
  pub fn initial_load(&mut self) -> Option<FetchRequest> {
    if self.started {
      return None;
    }
    self.started = true;
    info!("feed: initial load");
    Some(self.restart())
  }

  pub fn query_changed(&mut self, query: &str, now: Instant) {
    if self.query == query {
      return;
    }
    self.query = query.to_string();
    self.debounce.arm(now);
  }

  pub fn filters_changed(&mut self, filters: FilterState, now: Instant) {
    if self.filters == filters {
      return;
    }
    self.filters = filters;
    self.debounce.arm(now);
  }

  /// Schedule a page-1 refetch with the current query and filters.
  pub fn refresh(&mut self, now: Instant) {
    self.debounce.arm(now);
  }

  /// Fire the pending debounced reset if its window has elapsed.
  pub fn poll_debounce(&mut self, now: Instant) -> Option<FetchRequest> {
    if self.debounce.fire(now) { Some(self.restart()) } else { None }
  }

  /// Skip the rest of the debounce window (explicit submit).
  pub fn flush(&mut self) -> Option<FetchRequest> {
    if !self.debounce.is_pending() {
      return None;
    }
    self.debounce.cancel();
    Some(self.restart())
  }

  /// The last rendered item came into view: fetch the next page right away.
  pub fn near_end(&mut self) -> Option<FetchRequest> {
    if self.is_loading() || !self.has_more || self.items.is_empty() {
      return None;
    }
    let page = self.page + 1;
    debug!(page, "feed: loading next page");
    Some(self.issue(page))
  }

  // --- Responses ---

  pub fn apply_response(&mut self, seq: u64, result: Result<Vec<VideoRecord>, String>) -> Applied {
    let Some(flight) = self.in_flight.filter(|f| f.seq == seq) else {
      debug!(seq, latest = self.last_seq, "feed: dropping stale response");
      return Applied::Stale;
    };
    self.in_flight = None;

    match result {
      Ok(videos) => {
        let count = videos.len();
        if flight.page == 1 {
          self.items = videos;
        } else {
          self.items.extend(videos);
        }
        self.page = flight.page;
        self.has_more = count >= self.page_size;
        debug!(page = flight.page, count, total = self.items.len(), has_more = self.has_more, "feed: page applied");
      }
      Err(message) => {
        info!(page = flight.page, err = %message, "feed: fetch failed");
        self.error = Some(message);
      }
    }
    Applied::Accepted
  }

  // --- Internals ---

  fn restart(&mut self) -> FetchRequest {
    self.page = 1;
    self.items.clear();
    self.has_more = true;
    self.error = None;
    info!(query = %self.query, filters = ?self.filters, "feed: restarting at page 1");
    self.issue(1)
  }

  fn issue(&mut self, page: usize) -> FetchRequest {
    self.last_seq += 1;
    self.in_flight = Some(InFlight { seq: self.last_seq, page });
    self.error = None;
    FetchRequest {
      seq: self.last_seq,
      params: SearchParams {
        query: self.query.clone(),
        page,
        per_page: self.page_size,
        filters: self.filters.clone(),
      },
    }
  }
}
