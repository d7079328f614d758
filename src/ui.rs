use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, BorderType, Clear, List, ListItem, Padding, Paragraph, Wrap},
};

use crate::app::{App, AppMode, PlayerModal, ViewMode};
use crate::filters::FilterField;
use crate::input::LineEditor;
use crate::model::{ChatRole, VideoRecord, format_length, format_views};
use crate::preview::ThumbnailWidget;
use crate::theme::Theme;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

/// A rectangle of the given percentage size centered in `area`.
fn centered(area: Rect, pct_x: u16, pct_y: u16) -> Rect {
  let [_, mid, _] = Layout::vertical([
    Constraint::Percentage((100 - pct_y) / 2),
    Constraint::Percentage(pct_y),
    Constraint::Percentage((100 - pct_y) / 2),
  ])
  .areas(area);
  let [_, center, _] = Layout::horizontal([
    Constraint::Percentage((100 - pct_x) / 2),
    Constraint::Percentage(pct_x),
    Constraint::Percentage((100 - pct_x) / 2),
  ])
  .areas(mid);
  center
}

fn panel<'a>(theme: &Theme, title: impl Into<Line<'a>>, focused: bool) -> Block<'a> {
  let color = if focused { theme.accent } else { theme.border };
  Block::bordered()
    .title(title)
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(color))
    .style(Style::default().bg(theme.bg))
}

/// Metadata line shared by list rows: `12:34 · 1.2K views · ★ 4.5`.
fn video_meta(video: &VideoRecord) -> String {
  let mut parts = vec![format_length(video.length_sec), format!("{} views", format_views(video.views))];
  if !video.rate.is_empty() {
    parts.push(format!("★ {}", video.rate));
  }
  parts.join(" · ")
}

/// Rows `lines` occupy when wrapped at `width` columns.
fn wrapped_height(lines: &[Line], width: u16) -> u16 {
  let width = usize::from(width.max(1));
  let rows: usize = lines.iter().map(|l| l.width().div_ceil(width).max(1)).sum();
  rows.min(usize::from(u16::MAX)) as u16
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, main_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(3),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, app, header_area);
  render_results(frame, app, main_area);
  render_status(frame, app, status_area);
  let focused = app.mode == AppMode::Search;
  render_editor(frame, theme, &mut app.search, " Search ", focused, input_area);
  render_footer(frame, app, footer_area);

  match app.mode {
    AppMode::Filters => render_filters(frame, app, main_area),
    AppMode::Player => render_player(frame, app, main_area),
    AppMode::Chat => render_chat(frame, app, main_area),
    AppMode::Browse | AppMode::Search => {}
  }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let view = match app.view {
    ViewMode::Search => "Search",
    ViewMode::Favorites => "Favorites",
  };
  let left = Line::from(vec![
    Span::styled(" ▶ vidscout ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
    Span::styled(format!("· {} ", view), Style::default().fg(theme.muted)),
  ]);
  frame.render_widget(left, area);

  let version = format!("v{} ", env!("CARGO_PKG_VERSION"));
  let right = Line::from(Span::styled(&version, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(version.len() as u16), width: version.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

fn render_results(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let block = panel(theme, results_title(app), app.mode == AppMode::Browse);

  let videos = app.visible_videos();
  if videos.is_empty() {
    let message = match app.view {
      ViewMode::Favorites => "No favorites yet",
      ViewMode::Search if app.feed.is_loading() || app.feed.is_debouncing() => "Loading…",
      ViewMode::Search => "No videos found",
    };
    let text = vec![Line::from(""), Line::from(Span::styled(message, Style::default().fg(theme.muted)))];
    frame.render_widget(Paragraph::new(text).alignment(Alignment::Center).block(block), area);
    return;
  }

  // Inner width: area minus 2 borders minus 2 chars for highlight symbol ("▶ ")
  let inner_w = area.width.saturating_sub(4) as usize;
  let selected = app.list_state.selected();

  let items: Vec<ListItem> = videos
    .iter()
    .enumerate()
    .map(|(i, video)| {
      let bg = if Some(i) == selected {
        theme.highlight_bg
      } else if i % 2 == 1 {
        theme.stripe_bg
      } else {
        theme.bg
      };
      let fg = if Some(i) == selected { theme.highlight_fg } else { theme.fg };

      let star = if app.favorites.is_favorite(&video.id) { "♥ " } else { "  " };
      let right = match app.view {
        ViewMode::Favorites => app
          .favorites
          .favorites()
          .get(i)
          .map(|f| format!("{}  {}", video_meta(video), f.favorited_label()))
          .unwrap_or_default(),
        ViewMode::Search => video_meta(video),
      };
      let right_w = right.chars().count();
      let title_max = inner_w.saturating_sub(right_w + 4);
      let title = truncate_str(&video.title, title_max);
      let gap = inner_w.saturating_sub(title.chars().count() + right_w + 2);

      ListItem::new(Line::from(vec![
        Span::styled(star, Style::default().fg(theme.favorite)),
        Span::styled(title, Style::default().fg(fg)),
        Span::raw(" ".repeat(gap)),
        Span::styled(right, Style::default().fg(theme.muted)),
      ]))
      .bg(bg)
    })
    .collect();

  let list = List::new(items)
    .block(block)
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));

  frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn results_title(app: &App) -> String {
  match app.view {
    ViewMode::Favorites => format!(" Favorites ({}) ", app.favorites.len()),
    ViewMode::Search => {
      let count = app.feed.items().len();
      let suffix = if app.feed.is_loading() && count > 0 {
        " (loading more…)"
      } else if !app.feed.has_more() && count > 0 {
        " (end)"
      } else {
        ""
      };
      let query = app.feed.query().trim();
      if query.is_empty() {
        format!(" Latest — {} videos{} ", count, suffix)
      } else {
        format!(" '{}' — {} videos{} ", query, count, suffix)
      }
    }
  }
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(err) = &app.last_error {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if let Some(toast) = &app.toast {
    (format!(" ✓ {}", toast), Style::default().fg(theme.status))
  } else if app.view == ViewMode::Search && app.feed.is_loading() {
    (" ⏳ Loading…".to_string(), Style::default().fg(theme.status))
  } else {
    let filters = app.filters.applied();
    let mut summary = format!(" Ready · {}", filters.order.label());
    if !filters.category.is_empty() {
      summary.push_str(&format!(" · {}", filters.category));
    }
    (summary, Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_editor(frame: &mut Frame, theme: &Theme, editor: &mut LineEditor, title: &str, focused: bool, area: Rect) {
  let block = panel(theme, title.to_string(), focused).padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  if inner_w == 0 {
    frame.render_widget(block, area);
    return;
  }
  let cursor_col = display_width(editor.text(), editor.cursor());

  if cursor_col < editor.scroll {
    editor.scroll = cursor_col;
  } else if cursor_col >= editor.scroll + inner_w {
    editor.scroll = cursor_col.saturating_sub(inner_w) + 1;
  }
  let scroll = editor.scroll;

  let visible: String = editor
    .text()
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= scroll)
    .take_while(|(start, _, _)| *start < scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  frame.render_widget(Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(block), area);

  if focused {
    let cursor_x = area.x + 2 + (cursor_col - scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

// --- Overlays ---

fn render_filters(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let popup = centered(area, 60, 70);
  frame.render_widget(Clear, popup);

  let staged = app.filters.staged();
  let category = if staged.category.is_empty() { "All" } else { staged.category.as_str() };
  let bound = |v: u32| if v == 0 { "any".to_string() } else { format!("{} min", v) };
  let rows = [
    (FilterField::Order, "Sort by", staged.order.label().to_string()),
    (FilterField::Category, "Category", category.to_string()),
    (FilterField::MinDuration, "Min length", bound(staged.duration.0)),
    (FilterField::MaxDuration, "Max length", bound(staged.duration.1)),
  ];

  let mut lines = vec![Line::from("")];
  for (field, label, value) in rows {
    let focused = app.filters.focus == field;
    let marker = if focused { "▶ " } else { "  " };
    let value_style = if focused {
      Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD)
    } else {
      Style::default().fg(theme.fg)
    };
    lines.push(Line::from(vec![
      Span::styled(marker, Style::default().fg(theme.accent)),
      Span::styled(format!("{:<12}", label), Style::default().fg(theme.muted)),
      Span::styled(format!(" ‹ {} › ", value), value_style),
    ]));
    lines.push(Line::from(""));
  }
  if staged != app.filters.applied() {
    lines.push(Line::from(Span::styled("  Unapplied changes", Style::default().fg(theme.status))));
  }

  let block = panel(theme, " Filters ", true).padding(Padding::horizontal(1));
  frame.render_widget(Paragraph::new(lines).block(block), popup);
}

fn render_player(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let display_mode = app.display_mode;
  let is_favorite = app.player.as_ref().is_some_and(|m| app.favorites.is_favorite(&m.video.id));
  let Some(modal) = app.player.as_mut() else { return };

  let popup = centered(area, 90, 90);
  frame.render_widget(Clear, popup);
  let outer = panel(theme, format!(" {} ", truncate_str(&modal.video.title, popup.width as usize / 2)), true);
  let inner = outer.inner(popup);
  frame.render_widget(outer, popup);

  let [top_area, related_area] =
    Layout::vertical([Constraint::Percentage(55), Constraint::Percentage(45)]).areas(inner);
  let [thumb_area, info_area] = if display_mode.shows_thumbnails() {
    Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(top_area)
  } else {
    [Rect { width: 0, ..top_area }, top_area]
  };

  if let Some(image) = &modal.thumbnail {
    frame.render_widget(ThumbnailWidget { image, display_mode }, thumb_area);
  } else if !thumb_area.is_empty() {
    let placeholder =
      Paragraph::new(Span::styled("…", Style::default().fg(theme.muted))).alignment(Alignment::Center);
    frame.render_widget(placeholder, thumb_area);
  }

  render_player_info(frame, theme, modal, is_favorite, info_area);
  render_related(frame, theme, modal, related_area);
}

fn render_player_info(frame: &mut Frame, theme: &Theme, modal: &PlayerModal, is_favorite: bool, area: Rect) {
  let video = &modal.video;
  let inner_w = area.width.saturating_sub(4) as usize;
  let row = |label: &'static str, value: String| {
    Line::from(vec![
      Span::styled(format!("{:<10}", label), Style::default().fg(theme.muted)),
      Span::styled(truncate_str(&value, inner_w.saturating_sub(10)), Style::default().fg(theme.fg)),
    ])
  };

  let mut lines = vec![
    Line::from(Span::styled(video.title.clone(), Style::default().fg(theme.fg).add_modifier(Modifier::BOLD))),
    Line::from(""),
    row("Length", format_length(video.length_sec)),
    row("Views", format_views(video.views)),
  ];
  if !video.rate.is_empty() {
    lines.push(row("Rating", video.rate.clone()));
  }
  if !video.added.is_empty() {
    lines.push(row("Added", video.added.clone()));
  }
  if !video.keywords.is_empty() {
    lines.push(row("Keywords", video.keywords.clone()));
  }
  lines.push(Line::from(""));
  let (heart, heart_style) = if is_favorite {
    ("♥ In favorites", Style::default().fg(theme.favorite).add_modifier(Modifier::BOLD))
  } else {
    ("♡ Not in favorites", Style::default().fg(theme.muted))
  };
  lines.push(Line::from(Span::styled(heart, heart_style)));

  let paragraph =
    Paragraph::new(lines).wrap(Wrap { trim: true }).block(Block::default().padding(Padding::horizontal(1)));
  frame.render_widget(paragraph, area);
}

fn render_related(frame: &mut Frame, theme: &Theme, modal: &mut PlayerModal, area: Rect) {
  let block = Block::default()
    .title(Span::styled(" Related ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)))
    .borders(ratatui::widgets::Borders::TOP)
    .border_style(Style::default().fg(theme.border));

  let message = if modal.related_loading {
    Some("Loading related videos…".to_string())
  } else if let Some(err) = &modal.related_error {
    Some(format!("Could not load related videos: {}", err))
  } else if modal.related.is_empty() {
    Some("No related videos".to_string())
  } else {
    None
  };
  if let Some(message) = message {
    frame.render_widget(Paragraph::new(Span::styled(message, Style::default().fg(theme.muted))).block(block), area);
    return;
  }

  let inner_w = area.width.saturating_sub(2) as usize;
  let items: Vec<ListItem> = modal
    .related
    .iter()
    .map(|v| {
      let meta = format_length(v.length_sec);
      let title = truncate_str(&v.title, inner_w.saturating_sub(meta.len() + 3));
      let gap = inner_w.saturating_sub(title.chars().count() + meta.len() + 2);
      ListItem::new(Line::from(vec![
        Span::styled(title, Style::default().fg(theme.fg)),
        Span::raw(" ".repeat(gap)),
        Span::styled(meta, Style::default().fg(theme.muted)),
      ]))
    })
    .collect();
  let list = List::new(items)
    .block(block)
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg));
  frame.render_stateful_widget(list, area, &mut modal.related_state);
}

fn render_chat(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let popup = centered(area, 80, 90);
  frame.render_widget(Clear, popup);

  let mode = app.conversation.mode();
  let title = Line::from(vec![
    Span::styled(" Assistant ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
    Span::styled(format!("[{}] ", mode.label()), Style::default().fg(theme.muted)),
  ]);
  let outer = panel(theme, title, true);
  let inner = outer.inner(popup);
  frame.render_widget(outer, popup);

  let [history_area, input_area] = Layout::vertical([Constraint::Min(3), Constraint::Length(3)]).areas(inner);

  let mut lines: Vec<Line> = Vec::new();
  if app.conversation.messages().is_empty() {
    let hint = if app.chat_configured() {
      "Ask about videos, topics or what to watch next."
    } else {
      "No API key configured; set GEMINI_API_KEY to enable the assistant."
    };
    lines.push(Line::from(Span::styled(hint, Style::default().fg(theme.muted))));
  }
  for message in app.conversation.messages() {
    let (who, color) = match message.role {
      ChatRole::User => ("You", theme.accent),
      ChatRole::Model => ("Assistant", theme.status),
    };
    lines.push(Line::from(Span::styled(who, Style::default().fg(color).add_modifier(Modifier::BOLD))));
    for text_line in message.text().lines() {
      lines.push(Line::from(Span::styled(text_line.to_string(), Style::default().fg(theme.fg))));
    }
    lines.push(Line::from(""));
  }
  if app.conversation.awaiting_first_token() {
    let dots = ".".repeat((app.started_at.elapsed().as_millis() / 300 % 4) as usize);
    lines.push(Line::from(Span::styled(format!("typing{}", dots), Style::default().fg(theme.muted))));
  }

  // Keep the newest lines in view.
  let text_w = history_area.width.saturating_sub(2);
  let total = wrapped_height(&lines, text_w);
  let scroll = total.saturating_sub(history_area.height);
  let paragraph =
    Paragraph::new(lines).wrap(Wrap { trim: false }).block(Block::default().padding(Padding::horizontal(1)));
  frame.render_widget(paragraph.scroll((scroll, 0)), history_area);

  let input_title = if app.conversation.is_loading() { " Waiting for reply… " } else { " Message " };
  render_editor(frame, theme, &mut app.chat_input, input_title, true, input_area);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let keys: Vec<(&str, &str)> = match app.mode {
    AppMode::Browse => {
      let mut k =
        vec![("Enter", "Open"), ("j/k", "Navigate"), ("Space", "Favorite"), ("y", "Copy link"), ("/", "Search")];
      if app.view == ViewMode::Search {
        k.push(("f", "Filters"));
      }
      let view_label = if app.view == ViewMode::Search { "Favorites" } else { "Search" };
      k.push(("^f", view_label));
      k.push(("^a", "Chat"));
      k.push(("^c", "Quit"));
      k
    }
    AppMode::Search => vec![("Enter", "Search"), ("Esc", "Results"), ("^f", "Favorites"), ("^t", "Theme")],
    AppMode::Filters => {
      vec![("Tab", "Field"), ("←/→", "Change"), ("0-9", "Minutes"), ("a", "Apply"), ("r", "Reset"), ("Esc", "Back")]
    }
    AppMode::Player => {
      vec![("Enter", "Open related"), ("Space", "Favorite"), ("y", "Copy link"), ("o", "Browser"), ("Esc", "Close")]
    }
    AppMode::Chat => vec![("Enter", "Send"), ("Tab", "Think more"), ("^l", "New chat"), ("Esc", "Close")],
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw("  "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let theme_label = format!("{} ", theme.name);
  let right = Line::from(Span::styled(&theme_label, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(theme_label.len() as u16), width: theme_label.len() as u16, ..area };
  frame.render_widget(right, right_area);
}
