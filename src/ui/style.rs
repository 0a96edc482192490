//! Terminal colors
//!
//! Same `anstyle` palette as the CLI help theme. Plain text when stdout isn't a
//! terminal or `NO_COLOR` is set.

use anstyle::{AnsiColor, Color, Style};
use std::fmt::Display;
use std::io::IsTerminal;
use std::sync::OnceLock;

fn colors_enabled() -> bool {
  static ENABLED: OnceLock<bool> = OnceLock::new();
  *ENABLED.get_or_init(|| std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal())
}

fn fg(color: AnsiColor) -> Style {
  Style::new().fg_color(Some(Color::Ansi(color)))
}

/// Render `text` in `style`
pub fn paint(style: Style, text: impl Display) -> String {
  if colors_enabled() {
    format!("{}{}{}", style.render(), text, style.render_reset())
  } else {
    text.to_string()
  }
}

/// Package names
pub fn green(text: impl Display) -> String {
  paint(fg(AnsiColor::Green).bold(), text)
}

/// Versions and counts
pub fn cyan(text: impl Display) -> String {
  paint(fg(AnsiColor::Cyan).bold(), text)
}

/// Tags, keys and list bullets
pub fn yellow(text: impl Display) -> String {
  paint(fg(AnsiColor::Yellow), text)
}

/// Section labels and file names
pub fn magenta(text: impl Display) -> String {
  paint(fg(AnsiColor::Magenta).bold(), text)
}

pub fn red(text: impl Display) -> String {
  paint(fg(AnsiColor::Red).bold(), text)
}

pub fn gray(text: impl Display) -> String {
  paint(fg(AnsiColor::BrightBlack), text)
}

/// List bullet used under section headers
pub fn bullet() -> String {
  yellow(" >")
}
