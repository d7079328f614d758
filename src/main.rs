mod api;
mod app;
mod assistant;
mod chat;
mod clipboard;
mod config;
mod constants;
mod display;
mod favorites;
mod feed;
mod filters;
mod input;
mod keyguard;
mod logging;
mod model;
mod preview;
mod theme;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info};

use app::{App, AppOptions};
use config::Config;
use constants::constants;
use display::CliDisplayMode;

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Thumbnail mode: 'auto', 'direct', 'ascii', or 'off' (default: auto-detect)
  #[arg(short, long, default_value = "auto")]
  display_mode: CliDisplayMode,

  /// Video API base URL (overrides prefs.toml and the built-in default)
  #[arg(long, value_name = "URL")]
  api_base: Option<String>,

  /// Favorites file (default: favorites.json in the platform data directory)
  #[arg(long, value_name = "PATH")]
  favorites: Option<PathBuf>,

  /// Swallow developer-tool shortcuts (F12, Ctrl+Shift+I/J/C, Ctrl+U)
  #[arg(long)]
  lock_keys: bool,

  /// Log at debug level unless VIDSCOUT_LOG or RUST_LOG says otherwise
  #[arg(short, long)]
  verbose: bool,

  /// Print shell completions and exit
  #[arg(long, value_name = "SHELL")]
  completions: Option<clap_complete::Shell>,
}

fn resolve_options(args: &Args, config: Config) -> AppOptions {
  let api_base =
    args.api_base.clone().or_else(|| config.api_base.clone()).unwrap_or_else(|| constants().api_base_url.clone());
  let favorites_path =
    args.favorites.clone().or_else(config::favorites_path).unwrap_or_else(|| PathBuf::from("favorites.json"));
  AppOptions {
    display_mode: display::resolve_display_mode(args.display_mode),
    api_base,
    favorites_path,
    lock_keys: args.lock_keys || config.lock_keys,
    config,
  }
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(shell) = args.completions {
    clap_complete::generate(shell, &mut Args::command(), env!("CARGO_PKG_NAME"), &mut std::io::stdout());
    return Ok(());
  }

  let _log_guard = match logging::init(args.verbose) {
    Ok(guard) => Some(guard),
    Err(e) => {
      eprintln!("warning: file logging disabled: {:#}", e);
      None
    }
  };

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    error!(panic = %info, "app: panicked");
    default_hook(info);
  }));

  let options = resolve_options(&args, Config::load());
  let mut terminal = ratatui::init();
  let result = run(&mut terminal, options).await;
  ratatui::restore();
  if let Err(ref e) = result {
    error!(err = %format!("{:#}", e), "app: exited with error");
  }
  result
}

async fn run(terminal: &mut DefaultTerminal, options: AppOptions) -> Result<()> {
  let mut app = App::new(options);
  app.start();

  loop {
    app.check_pending().await?;
    app.tick(Instant::now());

    terminal.draw(|frame| ui::ui(frame, &mut app))?;

    if event::poll(Duration::from_millis(100))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
          input::handle_key_event(&mut app, key).await?;
        }
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  app.shutdown();
  info!("app: bye");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cli_overrides_prefs() {
    let args = Args::parse_from(["vidscout", "--api-base", "http://cli", "--favorites", "/tmp/f.json"]);
    let config = Config { api_base: Some("http://prefs".into()), ..Default::default() };
    let options = resolve_options(&args, config);
    assert_eq!(options.api_base, "http://cli");
    assert_eq!(options.favorites_path, PathBuf::from("/tmp/f.json"));
    assert!(!options.lock_keys);
  }

  #[test]
  fn prefs_then_constants_for_api_base() {
    let args = Args::parse_from(["vidscout"]);
    let from_prefs = resolve_options(&args, Config { api_base: Some("http://prefs".into()), ..Default::default() });
    assert_eq!(from_prefs.api_base, "http://prefs");
    let builtin = resolve_options(&args, Config::default());
    assert_eq!(builtin.api_base, constants().api_base_url);
  }

  #[test]
  fn lock_keys_from_either_source() {
    let args = Args::parse_from(["vidscout"]);
    assert!(resolve_options(&args, Config { lock_keys: true, ..Default::default() }).lock_keys);
    let args = Args::parse_from(["vidscout", "--lock-keys"]);
    assert!(resolve_options(&args, Config::default()).lock_keys);
  }

  #[test]
  fn cli_definition_is_valid() {
    Args::command().debug_assert();
  }
}
