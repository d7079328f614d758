use clap::ValueEnum;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliDisplayMode {
  Auto,
  Direct,
  Ascii,
  Off,
}

/// How thumbnails are drawn inside the player card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
  /// True-color half blocks, two pixels per cell.
  Direct,
  /// Grayscale ramp of ASCII characters.
  Ascii,
  /// No thumbnail; nothing is downloaded.
  Off,
}

impl DisplayMode {
  pub fn label(self) -> &'static str {
    match self {
      DisplayMode::Direct => "Half-block",
      DisplayMode::Ascii => "ASCII",
      DisplayMode::Off => "Off",
    }
  }

  pub fn shows_thumbnails(self) -> bool {
    self != DisplayMode::Off
  }
}

/// Half blocks need 24-bit color; everything else gets ASCII.
pub fn detect_display_mode() -> DisplayMode {
  detect_with(std::env::var("COLORTERM").ok().as_deref())
}

fn detect_with(colorterm: Option<&str>) -> DisplayMode {
  match colorterm.map(str::to_lowercase).as_deref() {
    Some("truecolor" | "24bit") => DisplayMode::Direct,
    _ => DisplayMode::Ascii,
  }
}

pub fn resolve_display_mode(cli: CliDisplayMode) -> DisplayMode {
  match cli {
    CliDisplayMode::Auto => detect_display_mode(),
    CliDisplayMode::Direct => DisplayMode::Direct,
    CliDisplayMode::Ascii => DisplayMode::Ascii,
    CliDisplayMode::Off => DisplayMode::Off,
  }
}
