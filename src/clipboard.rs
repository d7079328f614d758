//! Copy text to the system clipboard.
//!
//! Platform clipboard tools are tried in turn. When none is available the caller gets
//! an OSC 52 escape to write to the terminal between frames.

use anyhow::{Context, Result, anyhow};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use std::io::Write;
use std::process::Stdio;
use std::time::Duration;
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyMethod {
  Command(&'static str),
  /// No tool worked; the escape still has to reach the terminal.
  Osc52(String),
}

const COMMANDS: [(&str, &[&str]); 4] = [
  ("pbcopy", &[]),
  ("wl-copy", &[]),
  ("xclip", &["-selection", "clipboard"]),
  ("xsel", &["--clipboard", "--input"]),
];

const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// OSC 52 "set clipboard" escape for `text`.
pub fn osc52_sequence(text: &str) -> String {
  format!("\x1b]52;c;{}\x07", BASE64.encode(text))
}

pub async fn copy(text: &str) -> Result<CopyMethod> {
  copy_with(&COMMANDS, text).await
}

async fn copy_with(commands: &[(&'static str, &[&str])], text: &str) -> Result<CopyMethod> {
  for &(program, args) in commands {
    match pipe_to(program, args, text).await {
      Ok(()) => {
        info!(program, "clipboard: copied");
        return Ok(CopyMethod::Command(program));
      }
      Err(e) => debug!(program, err = %format!("{:#}", e), "clipboard: tool unavailable"),
    }
  }
  debug!("clipboard: falling back to OSC 52");
  Ok(CopyMethod::Osc52(osc52_sequence(text)))
}

/// Send an escape straight to the terminal. Call from the UI thread, never mid-draw.
pub fn write_to_terminal(sequence: &str) -> Result<()> {
  let mut stdout = std::io::stdout();
  stdout.write_all(sequence.as_bytes()).context("Failed to write clipboard escape")?;
  stdout.flush().context("Failed to flush clipboard escape")?;
  info!("clipboard: copied via OSC 52");
  Ok(())
}

async fn pipe_to(program: &str, args: &[&str], text: &str) -> Result<()> {
  let mut child = Command::new(program)
    .args(args)
    .stdin(Stdio::piped())
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .kill_on_drop(true)
    .spawn()
    .with_context(|| format!("Failed to start {}", program))?;
  let mut stdin = child.stdin.take().ok_or_else(|| anyhow!("{} has no stdin", program))?;
  stdin.write_all(text.as_bytes()).await.with_context(|| format!("Failed to write to {}", program))?;
  drop(stdin);
  let status = tokio::time::timeout(COMMAND_TIMEOUT, child.wait())
    .await
    .with_context(|| format!("{} timed out", program))?
    .with_context(|| format!("Failed to wait for {}", program))?;
  if !status.success() {
    return Err(anyhow!("{} exited with {}", program, status));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn osc52_encodes_payload_as_base64() {
    assert_eq!(osc52_sequence("https://x/video-1/"), "\x1b]52;c;aHR0cHM6Ly94L3ZpZGVvLTEv\x07");
  }

  #[test]
  fn osc52_empty_text() {
    assert_eq!(osc52_sequence(""), "\x1b]52;c;\x07");
  }

  #[tokio::test]
  async fn no_tools_returns_escape_for_the_caller() {
    let commands: [(&str, &[&str]); 1] = [("definitely-not-a-clipboard-tool", &[])];
    let method = copy_with(&commands, "https://x/video-1/").await.unwrap();
    assert_eq!(method, CopyMethod::Osc52("\x1b]52;c;aHR0cHM6Ly94L3ZpZGVvLTEv\x07".to_string()));
  }

  #[tokio::test]
  async fn missing_tool_is_an_error() {
    assert!(pipe_to("definitely-not-a-clipboard-tool", &[], "x").await.is_err());
  }
}
