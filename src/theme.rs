use ratatui::style::Color;

pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub accent: Color,
  pub muted: Color,
  pub border: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  pub status: Color,
  pub error: Color,
  pub favorite: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

pub static THEMES: [Theme; 3] = [
  Theme {
    name: "Midnight",
    bg: Color::Rgb(10, 10, 12),
    fg: Color::Rgb(228, 228, 231),
    accent: Color::Rgb(167, 139, 250),
    muted: Color::Rgb(113, 113, 122),
    border: Color::Rgb(63, 63, 70),
    highlight_fg: Color::Rgb(250, 250, 250),
    highlight_bg: Color::Rgb(49, 46, 129),
    stripe_bg: Color::Rgb(20, 20, 24),
    status: Color::Rgb(96, 165, 250),
    error: Color::Rgb(248, 113, 113),
    favorite: Color::Rgb(244, 63, 94),
    key_fg: Color::Rgb(10, 10, 12),
    key_bg: Color::Rgb(161, 161, 170),
  },
  Theme {
    name: "Paper",
    bg: Color::Rgb(250, 248, 243),
    fg: Color::Rgb(41, 37, 36),
    accent: Color::Rgb(194, 65, 12),
    muted: Color::Rgb(120, 113, 108),
    border: Color::Rgb(214, 211, 209),
    highlight_fg: Color::Rgb(255, 255, 255),
    highlight_bg: Color::Rgb(194, 65, 12),
    stripe_bg: Color::Rgb(241, 238, 231),
    status: Color::Rgb(29, 78, 216),
    error: Color::Rgb(185, 28, 28),
    favorite: Color::Rgb(225, 29, 72),
    key_fg: Color::Rgb(250, 248, 243),
    key_bg: Color::Rgb(87, 83, 78),
  },
  Theme {
    name: "Terminal",
    bg: Color::Reset,
    fg: Color::White,
    accent: Color::Cyan,
    muted: Color::DarkGray,
    border: Color::Gray,
    highlight_fg: Color::Black,
    highlight_bg: Color::Cyan,
    stripe_bg: Color::Reset,
    status: Color::Blue,
    error: Color::Red,
    favorite: Color::Magenta,
    key_fg: Color::Black,
    key_bg: Color::Gray,
  },
];

/// Position of a theme by name, falling back to the first palette.
pub fn index_of(name: &str) -> usize {
  THEMES.iter().position(|t| t.name == name).unwrap_or(0)
}
