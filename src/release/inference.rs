//! Release-type inference and version arithmetic
//!
//! Decides how big a bump a package needs from what changed since its last
//! release, then computes the next version the way npm's `semver.inc` does.

use crate::changelog::ChangelogChanges;
use crate::core::error::RailResult;
use crate::core::vcs::FileLog;
use semver::{BuildMetadata, Prerelease, Version};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prerelease identifier used when none is given
pub const DEFAULT_PRERELEASE_ID: &str = "rc";

/// Kind of version bump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
  Patch,
  Minor,
  Major,
  Prepatch,
  Preminor,
  Premajor,
  Prerelease,
}

impl ReleaseType {
  pub fn as_str(&self) -> &'static str {
    match self {
      ReleaseType::Patch => "patch",
      ReleaseType::Minor => "minor",
      ReleaseType::Major => "major",
      ReleaseType::Prepatch => "prepatch",
      ReleaseType::Preminor => "preminor",
      ReleaseType::Premajor => "premajor",
      ReleaseType::Prerelease => "prerelease",
    }
  }

  /// Prerelease counterpart (`minor` → `preminor`)
  pub fn to_prerelease(self) -> Self {
    match self {
      ReleaseType::Patch => ReleaseType::Prepatch,
      ReleaseType::Minor => ReleaseType::Preminor,
      ReleaseType::Major => ReleaseType::Premajor,
      other => other,
    }
  }

  pub fn is_prerelease(&self) -> bool {
    matches!(
      self,
      ReleaseType::Prepatch | ReleaseType::Preminor | ReleaseType::Premajor | ReleaseType::Prerelease
    )
  }

  /// Next version after `version`
  ///
  /// Follows npm `semver.inc`: a prerelease of the target version is promoted rather than
  /// skipped (`1.0.0-rc.1` + major = `1.0.0`), and `pre*` bumps start at `<id>.0`.
  pub fn apply(&self, version: &Version, prerelease_id: Option<&str>) -> RailResult<Version> {
    let id = prerelease_id.unwrap_or(DEFAULT_PRERELEASE_ID);
    let mut next = Version {
      build: BuildMetadata::EMPTY,
      ..version.clone()
    };
    let was_prerelease = !version.pre.is_empty();

    match self {
      ReleaseType::Major => {
        if version.minor != 0 || version.patch != 0 || !was_prerelease {
          next.major += 1;
        }
        next.minor = 0;
        next.patch = 0;
        next.pre = Prerelease::EMPTY;
      }
      ReleaseType::Minor => {
        if version.patch != 0 || !was_prerelease {
          next.minor += 1;
        }
        next.patch = 0;
        next.pre = Prerelease::EMPTY;
      }
      ReleaseType::Patch => {
        if !was_prerelease {
          next.patch += 1;
        }
        next.pre = Prerelease::EMPTY;
      }
      ReleaseType::Premajor => {
        next.major += 1;
        next.minor = 0;
        next.patch = 0;
        next.pre = Prerelease::new(&format!("{}.0", id))?;
      }
      ReleaseType::Preminor => {
        next.minor += 1;
        next.patch = 0;
        next.pre = Prerelease::new(&format!("{}.0", id))?;
      }
      ReleaseType::Prepatch => {
        next.patch += 1;
        next.pre = Prerelease::new(&format!("{}.0", id))?;
      }
      ReleaseType::Prerelease => {
        if !was_prerelease {
          next.patch += 1;
          next.pre = Prerelease::new(&format!("{}.0", id))?;
        } else {
          next.pre = Prerelease::new(&bump_prerelease(version.pre.as_str(), prerelease_id))?;
        }
      }
    }

    Ok(next)
  }
}

impl fmt::Display for ReleaseType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Increment the trailing numeric identifier, switching identifiers when asked
fn bump_prerelease(pre: &str, prerelease_id: Option<&str>) -> String {
  let mut parts: Vec<String> = pre.split('.').map(str::to_string).collect();

  match parts.iter().rposition(|part| part.parse::<u64>().is_ok()) {
    Some(pos) => {
      let n = parts[pos].parse::<u64>().unwrap_or(0);
      parts[pos] = (n + 1).to_string();
    }
    None => parts.push("0".to_string()),
  }

  if let Some(id) = prerelease_id {
    let same_id = parts.first().is_some_and(|first| first == id);
    let numbered = parts.get(1).is_some_and(|part| part.parse::<u64>().is_ok());
    if !same_id || !numbered {
      parts = vec![id.to_string(), "0".to_string()];
    }
  }

  parts.join(".")
}

/// Suggest a release type for a package
///
/// Native directories are matched against each file's package-relative path.
pub fn infer(
  current_version: &Version,
  file_changes: &[FileLog],
  changelog_changes: &ChangelogChanges,
  prerelease_id: Option<&str>,
  native_dirs: &[String],
) -> ReleaseType {
  if !current_version.pre.is_empty() {
    return ReleaseType::Prerelease;
  }

  let release_type = if !changelog_changes.breaking_changes().is_empty() {
    ReleaseType::Major
  } else if has_native_changes(file_changes, native_dirs) {
    ReleaseType::Minor
  } else {
    ReleaseType::Patch
  };

  if prerelease_id.is_some() {
    release_type.to_prerelease()
  } else {
    release_type
  }
}

fn has_native_changes(file_changes: &[FileLog], native_dirs: &[String]) -> bool {
  file_changes.iter().any(|file| {
    native_dirs
      .iter()
      .any(|dir| file.relative_path.starts_with(&format!("{}/", dir.trim_end_matches('/'))))
  })
}
