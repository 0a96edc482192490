//! Package changelogs
//!
//! Each package keeps a `CHANGELOG.md` with an `## Unpublished` section on top
//! where entries accumulate between releases:
//!
//! ```markdown
//! # Changelog
//!
//! ## Unpublished
//!
//! ### 🛠 Breaking changes
//!
//! ### 🎉 New features
//!
//! - Added zoom support.
//!
//! ### 🐛 Bug fixes
//!
//! ## 1.2.0 — 2024-05-01
//! ```
//!
//! Releasing renames the unpublished heading to the new version and puts an
//! empty unpublished section back on top.

use crate::core::error::{RailResult, ResultExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Headings treated as the unreleased section
const UNPUBLISHED_HEADINGS: &[&str] = &["unpublished", "master"];

/// Changelog entry categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
  BreakingChanges,
  NewFeatures,
  BugFixes,
  Others,
}

impl ChangeKind {
  pub const ALL: [ChangeKind; 4] = [
    ChangeKind::BreakingChanges,
    ChangeKind::NewFeatures,
    ChangeKind::BugFixes,
    ChangeKind::Others,
  ];

  /// Heading text, without the `### ` prefix
  pub fn heading(&self) -> &'static str {
    match self {
      ChangeKind::BreakingChanges => "🛠 Breaking changes",
      ChangeKind::NewFeatures => "🎉 New features",
      ChangeKind::BugFixes => "🐛 Bug fixes",
      ChangeKind::Others => "💡 Others",
    }
  }

  pub fn display_name(&self) -> &'static str {
    match self {
      ChangeKind::BreakingChanges => "Breaking changes",
      ChangeKind::NewFeatures => "New features",
      ChangeKind::BugFixes => "Bug fixes",
      ChangeKind::Others => "Others",
    }
  }

  /// Match a `###` heading, ignoring emoji and case
  fn from_heading(heading: &str) -> Option<Self> {
    let text: String = heading
      .trim_start_matches(|c: char| !c.is_ascii_alphanumeric())
      .trim()
      .to_lowercase();
    ChangeKind::ALL
      .into_iter()
      .find(|kind| kind.display_name().to_lowercase() == text)
  }
}

impl fmt::Display for ChangeKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.display_name())
  }
}

/// Entries of the unreleased section, grouped by kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogChanges {
  pub entries: BTreeMap<ChangeKind, Vec<String>>,
}

impl ChangelogChanges {
  pub fn push(&mut self, kind: ChangeKind, entry: impl Into<String>) {
    self.entries.entry(kind).or_default().push(entry.into());
  }

  pub fn total_count(&self) -> usize {
    self.entries.values().map(Vec::len).sum()
  }

  pub fn breaking_changes(&self) -> &[String] {
    self
      .entries
      .get(&ChangeKind::BreakingChanges)
      .map(Vec::as_slice)
      .unwrap_or_default()
  }

  pub fn is_empty(&self) -> bool {
    self.total_count() == 0
  }
}

/// Handle to a package's `CHANGELOG.md`
///
/// A missing file reads as an empty changelog.
#[derive(Debug, Clone)]
pub struct Changelog {
  path: PathBuf,
}

impl Changelog {
  pub fn load_from(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn read(&self) -> RailResult<Option<String>> {
    if !self.path.exists() {
      return Ok(None);
    }
    let content =
      fs::read_to_string(&self.path).with_context(|| format!("Failed to read {}", self.path.display()))?;
    Ok(Some(content))
  }

  /// Entries listed under the unpublished heading
  pub fn changes(&self) -> RailResult<ChangelogChanges> {
    Ok(self.read()?.map(|content| parse_changes(&content)).unwrap_or_default())
  }

  /// Version of the newest released section, if any
  pub fn last_published_version(&self) -> RailResult<Option<String>> {
    Ok(self.read()?.and_then(|content| last_published_version(&content)))
  }

  /// Turn the unpublished section into a `## {version} — {date}` section
  pub fn cut_off(&self, version: &str, date: &str) -> RailResult<()> {
    let content = self.read()?.unwrap_or_default();
    let updated = cut_off(&content, version, date);

    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::write(&self.path, updated).with_context(|| format!("Failed to write {}", self.path.display()))?;
    Ok(())
  }
}

fn version_heading(line: &str) -> Option<&str> {
  line.strip_prefix("## ").map(str::trim)
}

fn is_unpublished_heading(heading: &str) -> bool {
  let lower = heading.to_lowercase();
  UNPUBLISHED_HEADINGS.contains(&lower.as_str())
}

fn parse_changes(content: &str) -> ChangelogChanges {
  let mut changes = ChangelogChanges::default();
  let mut in_unpublished = false;
  let mut current: Option<ChangeKind> = None;

  for line in content.lines() {
    if let Some(heading) = version_heading(line) {
      in_unpublished = is_unpublished_heading(heading);
      current = None;
      continue;
    }
    if !in_unpublished {
      continue;
    }
    if let Some(heading) = line.strip_prefix("### ") {
      current = ChangeKind::from_heading(heading);
      continue;
    }

    let entry = line.strip_prefix("- ").or_else(|| line.strip_prefix("* "));
    match (current, entry) {
      (Some(kind), Some(entry)) if !entry.trim().is_empty() => changes.push(kind, entry.trim()),
      (None, Some(entry)) if !entry.trim().is_empty() => changes.push(ChangeKind::Others, entry.trim()),
      _ => {}
    }
  }

  changes
}

fn last_published_version(content: &str) -> Option<String> {
  content
    .lines()
    .filter_map(version_heading)
    .filter(|heading| !is_unpublished_heading(heading))
    .find_map(|heading| {
      let token = heading.split_whitespace().next()?;
      semver::Version::parse(token).ok().map(|v| v.to_string())
    })
}

fn unpublished_template() -> Vec<String> {
  let mut lines = vec!["## Unpublished".to_string(), String::new()];
  for kind in [ChangeKind::BreakingChanges, ChangeKind::NewFeatures, ChangeKind::BugFixes] {
    lines.push(format!("### {}", kind.heading()));
    lines.push(String::new());
  }
  lines
}

/// Drop `###` subsections that have no entries
fn drop_empty_subsections(section: &[String]) -> Vec<String> {
  let mut out: Vec<String> = Vec::new();
  let mut pending: Vec<String> = Vec::new();
  let mut pending_has_content = false;

  let flush = |out: &mut Vec<String>, pending: &mut Vec<String>, has_content: bool| {
    if has_content {
      out.append(pending);
    } else {
      pending.clear();
    }
  };

  for line in section {
    if line.starts_with("### ") {
      flush(&mut out, &mut pending, pending_has_content);
      pending.push(line.clone());
      pending_has_content = false;
    } else if pending.is_empty() {
      out.push(line.clone());
    } else {
      if !line.trim().is_empty() {
        pending_has_content = true;
      }
      pending.push(line.clone());
    }
  }
  flush(&mut out, &mut pending, pending_has_content);

  // Collapse runs of blank lines left behind by removed subsections
  let mut collapsed: Vec<String> = Vec::with_capacity(out.len());
  for line in out {
    if line.trim().is_empty() && collapsed.last().is_some_and(|l: &String| l.trim().is_empty()) {
      continue;
    }
    collapsed.push(line);
  }
  collapsed
}

fn cut_off(content: &str, version: &str, date: &str) -> String {
  let lines: Vec<String> = content.lines().map(str::to_string).collect();
  let released_heading = format!("## {} — {}", version, date);

  let unpublished_at = lines
    .iter()
    .position(|line| version_heading(line).is_some_and(is_unpublished_heading));

  let mut out: Vec<String> = Vec::with_capacity(lines.len() + 10);

  match unpublished_at {
    Some(start) => {
      let end = lines[start + 1..]
        .iter()
        .position(|line| version_heading(line).is_some())
        .map(|offset| start + 1 + offset)
        .unwrap_or(lines.len());

      out.extend_from_slice(&lines[..start]);
      out.extend(unpublished_template());
      out.push(released_heading);
      out.extend(drop_empty_subsections(&lines[start + 1..end]));
      if out.last().is_some_and(|l| !l.trim().is_empty()) && end < lines.len() {
        out.push(String::new());
      }
      out.extend_from_slice(&lines[end..]);
    }
    None => {
      // No unpublished section: insert after the title (or at the top)
      let insert_at = lines
        .iter()
        .position(|line| line.starts_with("# "))
        .map(|i| i + 1)
        .unwrap_or(0);

      out.extend_from_slice(&lines[..insert_at]);
      if lines.is_empty() {
        out.push("# Changelog".to_string());
      }
      if out.last().is_some_and(|l| !l.trim().is_empty()) {
        out.push(String::new());
      }
      out.extend(unpublished_template());
      out.push(released_heading);
      out.push(String::new());
      let rest = &lines[insert_at..];
      let skip = rest.iter().take_while(|l| l.trim().is_empty()).count();
      out.extend_from_slice(&rest[skip..]);
    }
  }

  let mut text = out.join("\n");
  let trimmed_len = text.trim_end().len();
  text.truncate(trimmed_len);
  text.push('\n');
  text
}
