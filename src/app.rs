use anyhow::Result;
use image::DynamicImage;
use ratatui::widgets::ListState;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::{self, SearchParams, VideoApi};
use crate::assistant::{ChatEvent, Conversation, forward_reply};
use crate::chat::ChatClient;
use crate::clipboard::{self, CopyMethod};
use crate::config::Config;
use crate::constants::{constants, expand_template};
use crate::display::DisplayMode;
use crate::favorites::{FavoritesStore, Toggled};
use crate::feed::{Applied, FetchRequest, Feed};
use crate::filters::FilterPanel;
use crate::input::LineEditor;
use crate::keyguard::KeyGuard;
use crate::model::{Category, VideoRecord};
use crate::theme::{self, THEMES};

// --- Types ---

pub type FeedResult = (u64, std::result::Result<Vec<VideoRecord>, String>);
pub type RelatedResult = (String, Result<Vec<VideoRecord>>);
pub type ThumbResult = (String, Result<DynamicImage>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  Browse,
  Search,
  Filters,
  Player,
  Chat,
}

/// Which list the main pane shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
  Search,
  Favorites,
}

/// Startup settings resolved from the CLI, prefs and constants.
#[derive(Debug, Clone)]
pub struct AppOptions {
  pub display_mode: DisplayMode,
  pub api_base: String,
  pub favorites_path: PathBuf,
  pub lock_keys: bool,
  pub config: Config,
}

/// The open video modal: details, thumbnail and related suggestions.
pub struct PlayerModal {
  pub video: VideoRecord,
  pub related: Vec<VideoRecord>,
  pub related_loading: bool,
  pub related_error: Option<String>,
  pub related_state: ListState,
  pub thumbnail: Option<DynamicImage>,
}

impl PlayerModal {
  fn new(video: VideoRecord) -> Self {
    Self {
      video,
      related: Vec::new(),
      related_loading: true,
      related_error: None,
      related_state: ListState::default(),
      thumbnail: None,
    }
  }

  pub fn selected_related(&self) -> Option<&VideoRecord> {
    self.related_state.selected().and_then(|i| self.related.get(i))
  }
}

/// In-flight async task receivers and handles.
pub(crate) struct AsyncTasks {
  feed_tx: mpsc::UnboundedSender<FeedResult>,
  feed_rx: mpsc::UnboundedReceiver<FeedResult>,
  chat_tx: mpsc::UnboundedSender<ChatEvent>,
  chat_rx: mpsc::UnboundedReceiver<ChatEvent>,
  chat_handle: Option<JoinHandle<()>>,
  categories_rx: Option<oneshot::Receiver<Vec<Category>>>,
  related_rx: Option<oneshot::Receiver<RelatedResult>>,
  thumb_rx: Option<oneshot::Receiver<ThumbResult>>,
  thumb_handle: Option<JoinHandle<()>>,
  copy_rx: Option<oneshot::Receiver<Result<CopyMethod>>>,
}

impl AsyncTasks {
  fn new() -> Self {
    let (feed_tx, feed_rx) = mpsc::unbounded_channel();
    let (chat_tx, chat_rx) = mpsc::unbounded_channel();
    Self {
      feed_tx,
      feed_rx,
      chat_tx,
      chat_rx,
      chat_handle: None,
      categories_rx: None,
      related_rx: None,
      thumb_rx: None,
      thumb_handle: None,
      copy_rx: None,
    }
  }
}

pub struct App {
  pub mode: AppMode,
  pub view: ViewMode,
  pub theme_index: usize,
  pub display_mode: DisplayMode,
  pub search: LineEditor,
  pub chat_input: LineEditor,
  pub feed: Feed,
  pub filters: FilterPanel,
  pub favorites: FavoritesStore,
  pub conversation: Conversation,
  pub player: Option<PlayerModal>,
  pub list_state: ListState,
  pub keyguard: KeyGuard,
  pub last_error: Option<String>,
  /// Short-lived confirmation ("Link copied"), lower priority than errors.
  pub toast: Option<String>,
  pub should_quit: bool,
  /// App start instant, used to drive the typing indicator animation.
  pub started_at: Instant,
  config: Config,
  api: VideoApi,
  chat: ChatClient,
  error_time: Option<Instant>,
  toast_time: Option<Instant>,
  pub(crate) tasks: AsyncTasks,
}

impl App {
  pub fn new(options: AppOptions) -> Self {
    let theme_index = options.config.theme_name.as_deref().map_or(0, theme::index_of);
    let client = reqwest::Client::new();
    let chat = ChatClient::new(client.clone(), options.config.resolve_api_key());
    info!(api_base = %options.api_base, lock_keys = options.lock_keys, "app: starting");

    Self {
      mode: AppMode::Browse,
      view: ViewMode::Search,
      theme_index,
      display_mode: options.display_mode,
      search: LineEditor::default(),
      chat_input: LineEditor::default(),
      feed: Feed::new(constants().page_size, Duration::from_millis(constants().search_debounce_ms)),
      filters: FilterPanel::new(),
      favorites: FavoritesStore::load(options.favorites_path),
      conversation: Conversation::new(),
      player: None,
      list_state: ListState::default(),
      keyguard: KeyGuard::new(options.lock_keys),
      last_error: None,
      toast: None,
      should_quit: false,
      started_at: Instant::now(),
      config: options.config,
      api: VideoApi::new(client, options.api_base),
      chat,
      error_time: None,
      toast_time: None,
      tasks: AsyncTasks::new(),
    }
  }

  pub fn theme(&self) -> &'static theme::Theme {
    // theme_index is kept in bounds by next_theme() and index_of().
    &THEMES[self.theme_index]
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    self.config.theme_name = Some(self.theme().name.to_string());
    self.config.save();
  }

  pub fn chat_configured(&self) -> bool {
    self.chat.is_configured()
  }

  // --- Messages ---

  /// Set an error message with auto-dismiss tracking.
  pub fn set_error(&mut self, msg: String) {
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  pub fn show_toast(&mut self, msg: impl Into<String>) {
    self.toast = Some(msg.into());
    self.toast_time = Some(Instant::now());
  }

  /// Drop errors and toasts that outlived their lifetime.
  pub fn expire_messages(&mut self, now: Instant) {
    if let Some(t) = self.error_time
      && now.duration_since(t) >= Duration::from_secs(constants().error_ttl_secs)
    {
      self.clear_error();
    }
    if let Some(t) = self.toast_time
      && now.duration_since(t) >= Duration::from_secs(constants().toast_ttl_secs)
    {
      self.toast = None;
      self.toast_time = None;
    }
  }

  // --- Lists ---

  /// Videos shown in the main pane for the current view.
  pub fn visible_videos(&self) -> Vec<&VideoRecord> {
    match self.view {
      ViewMode::Search => self.feed.items().iter().collect(),
      ViewMode::Favorites => self.favorites.favorites().iter().map(|f| &f.video).collect(),
    }
  }

  pub fn selected_video(&self) -> Option<&VideoRecord> {
    let idx = self.list_state.selected()?;
    match self.view {
      ViewMode::Search => self.feed.items().get(idx),
      ViewMode::Favorites => self.favorites.favorites().get(idx).map(|f| &f.video),
    }
  }

  /// Keep the selection inside the visible list.
  pub fn clamp_selection(&mut self) {
    let len = self.visible_videos().len();
    match self.list_state.selected() {
      _ if len == 0 => self.list_state.select(None),
      None => self.list_state.select(Some(0)),
      Some(i) if i >= len => self.list_state.select(Some(len - 1)),
      Some(_) => {}
    }
  }

  pub fn select_next(&mut self) {
    let count = self.visible_videos().len();
    if count == 0 {
      return;
    }
    let i = self.list_state.selected().map_or(0, |i| (i + 1).min(count - 1));
    self.list_state.select(Some(i));
    self.check_near_end();
  }

  pub fn select_prev(&mut self) {
    if self.visible_videos().is_empty() {
      return;
    }
    let i = self.list_state.selected().map_or(0, |i| i.saturating_sub(1));
    self.list_state.select(Some(i));
  }

  /// Ask for the next page when the selection gets close to the end of the results.
  pub fn check_near_end(&mut self) {
    if self.view != ViewMode::Search {
      return;
    }
    let Some(selected) = self.list_state.selected() else { return };
    if selected + constants().near_end_threshold >= self.feed.items().len()
      && let Some(request) = self.feed.near_end()
    {
      self.spawn_fetch(request);
    }
  }

  pub fn toggle_view(&mut self) {
    self.view = match self.view {
      ViewMode::Search => ViewMode::Favorites,
      ViewMode::Favorites => {
        self.feed.refresh(Instant::now());
        ViewMode::Search
      }
    };
    info!(view = ?self.view, "app: view switched");
    self.list_state.select(None);
    self.clamp_selection();
  }

  // --- Feed ---

  /// Kick off the first page and the category list.
  pub fn start(&mut self) {
    if let Some(request) = self.feed.initial_load() {
      self.spawn_fetch(request);
    }
    let api = self.api.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(api::categories_or_default(api.categories().await));
    });
    self.tasks.categories_rx = Some(rx);
  }

  /// Per-frame timers: debounced fetches and message expiry.
  pub fn tick(&mut self, now: Instant) {
    if self.view == ViewMode::Search
      && let Some(request) = self.feed.poll_debounce(now)
    {
      self.list_state.select(None);
      self.spawn_fetch(request);
    }
    self.expire_messages(now);
  }

  fn spawn_fetch(&mut self, request: FetchRequest) {
    let api = self.api.clone();
    let tx = self.tasks.feed_tx.clone();
    info!(seq = request.seq, page = request.params.page, query = %request.params.query, "feed: fetching");
    tokio::spawn(async move {
      let result = api.search(&request.params).await.map_err(|e| format!("{:#}", e));
      let _ = tx.send((request.seq, result));
    });
  }

  /// A query edit always shows search results.
  pub fn search_edited(&mut self) {
    let query = self.search.text().to_string();
    if query == self.feed.query() {
      return;
    }
    if self.view == ViewMode::Favorites {
      info!("app: query edited, back to search view");
      self.view = ViewMode::Search;
      self.list_state.select(None);
    }
    self.feed.query_changed(&query, Instant::now());
  }

  /// Enter in the search box: skip the remaining debounce window.
  pub fn submit_search(&mut self) {
    self.search_edited();
    if self.view == ViewMode::Favorites {
      self.toggle_view();
    }
    if let Some(request) = self.feed.flush() {
      self.list_state.select(None);
      self.spawn_fetch(request);
    }
    self.mode = AppMode::Browse;
  }

  pub fn open_filters(&mut self) {
    self.filters.open();
    self.mode = AppMode::Filters;
  }

  pub fn close_filters(&mut self) {
    self.filters.close();
    self.mode = AppMode::Browse;
  }

  pub fn apply_filters(&mut self) {
    if let Some(filters) = self.filters.apply() {
      self.feed.filters_changed(filters, Instant::now());
    }
    self.mode = AppMode::Browse;
  }

  // --- Favorites, clipboard, browser ---

  pub fn toggle_favorite(&mut self, video: &VideoRecord) {
    match self.favorites.toggle(video) {
      Ok(Toggled::Added) => self.show_toast("Added to favorites"),
      Ok(Toggled::Removed) => {
        self.show_toast("Removed from favorites");
        if self.view == ViewMode::Favorites {
          self.clamp_selection();
        }
      }
      Err(e) => self.set_error(format!("Could not save favorites: {:#}", e)),
    }
  }

  pub fn toggle_favorite_selected(&mut self) {
    if let Some(video) = self.selected_video().cloned() {
      self.toggle_favorite(&video);
    }
  }

  pub fn copy_link(&mut self, video: &VideoRecord) {
    let link = expand_template(&constants().permalink_template, &video.id);
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(clipboard::copy(&link).await);
    });
    self.tasks.copy_rx = Some(rx);
  }

  pub fn open_in_browser(&mut self, video: &VideoRecord) {
    let url = expand_template(&constants().embed_template, &video.id);
    #[cfg(target_os = "macos")]
    let cmd = "open";
    #[cfg(not(target_os = "macos"))]
    let cmd = "xdg-open";
    match std::process::Command::new(cmd)
      .arg(&url)
      .stdin(std::process::Stdio::null())
      .stdout(std::process::Stdio::null())
      .stderr(std::process::Stdio::null())
      .spawn()
    {
      Ok(mut child) => {
        info!(url = %url, "app: opened in browser");
        // Reap the child in a background thread to avoid zombie processes.
        std::thread::spawn(move || {
          let _ = child.wait();
        });
      }
      Err(e) => self.set_error(format!("Failed to open browser: {}", e)),
    }
  }

  // --- Player modal ---

  pub fn open_selected(&mut self) {
    if let Some(video) = self.selected_video().cloned() {
      self.open_player(video);
    }
  }

  /// Open the modal for `video`, fetching related videos and its thumbnail in the background.
  pub fn open_player(&mut self, video: VideoRecord) {
    self.abort_thumbnail();
    info!(id = %video.id, title = %video.title, "player: opening");

    let params = SearchParams::related_to(&video);
    let api = self.api.clone();
    let id = video.id.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send((id, api.search(&params).await));
    });
    self.tasks.related_rx = Some(rx);

    if self.display_mode.shows_thumbnails() && !video.default_thumb.src.is_empty() {
      let client = self.api.client().clone();
      let id = video.id.clone();
      let url = video.default_thumb.src.clone();
      let (tx, rx) = oneshot::channel();
      let handle = tokio::spawn(async move {
        let _ = tx.send((id, api::fetch_thumbnail(&client, &url).await));
      });
      self.tasks.thumb_rx = Some(rx);
      self.tasks.thumb_handle = Some(handle);
    }

    self.player = Some(PlayerModal::new(video));
    self.mode = AppMode::Player;
  }

  pub fn open_related(&mut self) {
    if let Some(video) = self.player.as_ref().and_then(PlayerModal::selected_related).cloned() {
      self.open_player(video);
    }
  }

  pub fn close_player(&mut self) {
    self.abort_thumbnail();
    self.tasks.related_rx = None;
    self.player = None;
    self.mode = AppMode::Browse;
  }

  fn abort_thumbnail(&mut self) {
    if let Some(handle) = self.tasks.thumb_handle.take() {
      handle.abort();
    }
    self.tasks.thumb_rx = None;
  }

  // --- Chat ---

  pub fn open_chat(&mut self) {
    self.mode = AppMode::Chat;
  }

  pub fn close_chat(&mut self) {
    self.mode = if self.player.is_some() { AppMode::Player } else { AppMode::Browse };
  }

  pub fn send_chat(&mut self) {
    let Some(request) = self.conversation.submit(self.chat_input.text()) else { return };
    self.chat_input.clear();
    let stream = self.chat.stream_reply(&request.history, &request.message, request.mode);
    let tx = self.tasks.chat_tx.clone();
    self.tasks.chat_handle = Some(tokio::spawn(forward_reply(stream, request.exchange, tx)));
  }

  /// Start a new conversation; a reply still streaming is abandoned.
  pub fn clear_chat(&mut self) {
    if let Some(handle) = self.tasks.chat_handle.take() {
      handle.abort();
    }
    self.conversation.clear();
  }

  // --- Background results ---

  pub async fn check_pending(&mut self) -> Result<()> {
    let mut feed_changed = false;
    while let Ok((seq, result)) = self.tasks.feed_rx.try_recv() {
      if self.feed.apply_response(seq, result) == Applied::Accepted {
        feed_changed = true;
      }
    }
    if feed_changed {
      if let Some(err) = self.feed.error().map(str::to_string) {
        self.set_error(err);
      }
      if self.view == ViewMode::Search {
        self.clamp_selection();
      }
    }

    while let Ok(event) = self.tasks.chat_rx.try_recv() {
      self.conversation.apply(event);
    }

    if let Some(mut rx) = self.tasks.categories_rx.take() {
      match rx.try_recv() {
        Ok(categories) => {
          debug!(count = categories.len(), "categories: loaded");
          self.filters.categories = categories;
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.categories_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          error!("categories: task failed");
          self.filters.categories = api::default_categories();
        }
      }
    }

    if let Some(mut rx) = self.tasks.related_rx.take() {
      match rx.try_recv() {
        Ok((id, result)) => self.apply_related(&id, result),
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.related_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          error!("related: task failed");
          if let Some(modal) = self.player.as_mut() {
            modal.related_loading = false;
          }
        }
      }
    }

    if let Some(mut rx) = self.tasks.thumb_rx.take() {
      match rx.try_recv() {
        Ok((id, result)) => {
          self.tasks.thumb_handle = None;
          match result {
            Ok(image) => {
              if let Some(modal) = self.player.as_mut().filter(|m| m.video.id == id) {
                modal.thumbnail = Some(image);
              }
            }
            // The card still works without a picture.
            Err(e) => debug!(id = %id, err = %format!("{:#}", e), "player: thumbnail unavailable"),
          }
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.thumb_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          self.tasks.thumb_handle = None;
        }
      }
    }

    if let Some(mut rx) = self.tasks.copy_rx.take() {
      match rx.try_recv() {
        Ok(Ok(CopyMethod::Command(_))) => self.show_toast("Link copied"),
        Ok(Ok(CopyMethod::Osc52(sequence))) => match clipboard::write_to_terminal(&sequence) {
          Ok(()) => self.show_toast("Link copied"),
          Err(e) => self.set_error(format!("Copy failed: {:#}", e)),
        },
        Ok(Err(e)) => self.set_error(format!("Copy failed: {:#}", e)),
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.copy_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          self.set_error("Copy task failed.".to_string());
        }
      }
    }

    Ok(())
  }

  fn apply_related(&mut self, id: &str, result: Result<Vec<VideoRecord>>) {
    let Some(modal) = self.player.as_mut().filter(|m| m.video.id == id) else {
      debug!(id = %id, "related: dropping result for a closed modal");
      return;
    };
    modal.related_loading = false;
    match result {
      Ok(videos) => {
        modal.related = related_excluding(videos, id);
        modal.related_state.select(if modal.related.is_empty() { None } else { Some(0) });
      }
      Err(e) => {
        warn!(id = %id, err = %format!("{:#}", e), "related: fetch failed");
        modal.related_error = Some(format!("{:#}", e));
      }
    }
  }

  /// Abort background work that would otherwise outlive the UI.
  pub fn shutdown(&mut self) {
    self.abort_thumbnail();
    if let Some(handle) = self.tasks.chat_handle.take() {
      handle.abort();
    }
    info!("app: shutting down");
  }
}

/// Related suggestions never include the video they were fetched for.
pub fn related_excluding(videos: Vec<VideoRecord>, id: &str) -> Vec<VideoRecord> {
  videos.into_iter().filter(|v| v.id != id).collect()
}
