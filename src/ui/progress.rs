//! Progress indicators for long-running operations
//!
//! Uses `linya`, which is safe to drive from rayon workers behind a mutex.
//! Bars are only drawn when stderr is a terminal.

use linya::{Bar, Progress};
use std::io::IsTerminal;
use std::sync::{Arc, Mutex};

/// Thread-safe single progress bar
#[derive(Clone)]
pub struct SharedProgress {
  inner: Option<Arc<(Mutex<Progress>, Bar)>>,
}

impl SharedProgress {
  /// Create a bar with `total` steps; a no-op outside a terminal
  pub fn new(total: usize, label: impl Into<String>) -> Self {
    if total == 0 || !std::io::stderr().is_terminal() {
      return Self::hidden();
    }

    let mut progress = Progress::new();
    let bar = progress.bar(total, label.into());
    Self {
      inner: Some(Arc::new((Mutex::new(progress), bar))),
    }
  }

  /// A bar that never draws
  pub fn hidden() -> Self {
    Self { inner: None }
  }

  /// Increment by 1 (thread-safe)
  pub fn inc(&self) {
    if let Some(inner) = &self.inner {
      let (progress, bar) = inner.as_ref();
      if let Ok(mut progress) = progress.lock() {
        progress.inc_and_draw(bar, 1);
      }
    }
  }
}
