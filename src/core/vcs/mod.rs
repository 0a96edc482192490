//! Version-control abstraction
//!
//! The pipeline only talks to [`Vcs`]; [`SystemGit`] is the production backend.

pub mod system_git;

use crate::core::error::RailResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use system_git::SystemGit;

/// Hash of git's empty tree, used as the lower bound when a package was never released
pub const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// Commit range `from..to`; `from = None` means the whole history up to `to`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRange {
  pub from: Option<String>,
  pub to: String,
}

impl CommitRange {
  pub fn new(from: Option<String>, to: impl Into<String>) -> Self {
    Self { from, to: to.into() }
  }

  /// Revision argument for `git log`
  pub fn log_spec(&self) -> String {
    match &self.from {
      Some(from) => format!("{}..{}", from, self.to),
      None => self.to.clone(),
    }
  }
}

/// A commit touching a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitLog {
  pub hash: String,
  pub parent: Option<String>,
  pub title: String,
  pub author_name: String,
  pub author_email: String,
  /// ISO 8601
  pub author_date: String,
  /// Human-readable age, e.g. `3 days ago`
  pub relative_date: String,
}

/// Kind of change git reports for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
  Added,
  Modified,
  Deleted,
  Copy,
  Rename,
  TypeChanged,
  Unmerged,
  Unknown,
}

impl FileStatus {
  /// Parse the status letter of `git diff --name-status`
  pub fn from_letter(letter: &str) -> Self {
    match letter.chars().next() {
      Some('A') => FileStatus::Added,
      Some('M') => FileStatus::Modified,
      Some('C') => FileStatus::Copy,
      Some('R') => FileStatus::Rename,
      Some('D') => FileStatus::Deleted,
      Some('T') => FileStatus::TypeChanged,
      Some('U') => FileStatus::Unmerged,
      _ => FileStatus::Unknown,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      FileStatus::Added => "added",
      FileStatus::Modified => "modified",
      FileStatus::Deleted => "deleted",
      FileStatus::Copy => "copied",
      FileStatus::Rename => "renamed",
      FileStatus::TypeChanged => "type changed",
      FileStatus::Unmerged => "unmerged",
      FileStatus::Unknown => "unknown",
    }
  }
}

/// A changed file; for renames and copies, the new path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileLog {
  /// Relative to the repository root
  pub path: String,
  /// Relative to the package directory
  pub relative_path: String,
  pub status: FileStatus,
}

/// Repository operations the release workflow relies on
pub trait Vcs: Send + Sync {
  /// Current branch name (`HEAD` when detached)
  fn current_branch(&self) -> RailResult<String>;

  /// Full hash of the current `HEAD` commit
  fn head_commit(&self) -> RailResult<String>;

  /// Commits in `range` touching `path`, newest first
  fn log(&self, path: &Path, range: &CommitRange) -> RailResult<Vec<CommitLog>>;

  /// Files under `path` changed in `range`
  fn file_log(&self, path: &Path, range: &CommitRange) -> RailResult<Vec<FileLog>>;

  /// Add paths to the index
  fn stage(&self, paths: &[PathBuf]) -> RailResult<()>;

  /// Commit the index; each message becomes a paragraph
  fn commit(&self, messages: &[String]) -> RailResult<()>;

  /// Whether tracked files have modifications not yet staged
  fn has_unstaged_changes(&self) -> RailResult<bool>;

  /// Create a branch at `from` and check it out
  fn create_branch(&self, name: &str, from: &str) -> RailResult<()>;
}
