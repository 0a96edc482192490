//! Action selection and the options that shape a run

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a run of release-rail does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionType {
  /// Bump, commit and publish packages with unpublished changes
  Publish,
  /// Print packages with unpublished changes
  List,
  /// Move a dist-tag onto the local versions of packages
  Promote,
  /// Branch off a published version of a single package
  Backport,
}

impl ActionType {
  pub fn as_str(&self) -> &'static str {
    match self {
      ActionType::Publish => "publish",
      ActionType::List => "list",
      ActionType::Promote => "promote",
      ActionType::Backport => "backport",
    }
  }

  /// Whether the branch and working-tree checks apply
  pub fn requires_repo_checks(&self) -> bool {
    matches!(self, ActionType::Publish | ActionType::Backport)
  }
}

impl fmt::Display for ActionType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Options parsed from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOptions {
  /// Packages to operate on; empty means all
  pub package_names: Vec<String>,
  /// Packages to leave out
  pub exclude: Vec<String>,
  /// Resume from the checkpoint without asking
  pub retry: bool,
  /// Prerelease identifier (`rc`, `beta`, ...) when releasing a prerelease
  pub prerelease: Option<String>,
  /// Skip registry side effects
  pub dry: bool,
  /// First line of the release commit
  pub commit_message: String,
  /// Skip branch and working-tree checks
  pub skip_repo_checks: bool,
  /// Answer every prompt with its default
  pub assume_yes: bool,
  /// Dist-tag that `promote` moves
  pub promote_tag: String,
  /// Published version that `backport` branches off
  pub backport_version: Option<String>,
}

impl Default for ActionOptions {
  fn default() -> Self {
    Self {
      package_names: Vec::new(),
      exclude: Vec::new(),
      retry: false,
      prerelease: None,
      dry: false,
      commit_message: "Publish packages".to_string(),
      skip_repo_checks: false,
      assume_yes: false,
      promote_tag: "latest".to_string(),
      backport_version: None,
    }
  }
}

impl ActionOptions {
  /// Subset of options a checkpoint must agree with to be reusable
  pub fn fingerprint(&self) -> OptionsFingerprint {
    OptionsFingerprint {
      package_names: normalized(&self.package_names),
      exclude: normalized(&self.exclude),
      prerelease: self.prerelease.clone(),
      promote_tag: self.promote_tag.clone(),
      backport_version: self.backport_version.clone(),
    }
  }
}

fn normalized(names: &[String]) -> Vec<String> {
  let mut names = names.to_vec();
  names.sort();
  names.dedup();
  names
}

/// Options persisted in the checkpoint
///
/// Name lists are sorted and deduplicated so argument order doesn't invalidate a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsFingerprint {
  pub package_names: Vec<String>,
  pub exclude: Vec<String>,
  pub prerelease: Option<String>,
  pub promote_tag: String,
  pub backport_version: Option<String>,
}
