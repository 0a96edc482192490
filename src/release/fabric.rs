//! Per-package working set of a run
//!
//! A [`Fabric`] bundles what is known about one package: its on-disk
//! description, its registry snapshot, its changelog and the [`PackageState`]
//! phases fill in. Only the state survives between runs (in the checkpoint).

use crate::changelog::{Changelog, ChangelogChanges};
use crate::core::vcs::{CommitLog, FileLog};
use crate::registry::PackageView;
use crate::release::inference::ReleaseType;
use crate::workspace::Package;
use serde::{Deserialize, Serialize};

/// Result of the integrity check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityCheck {
  pub integral: bool,
  /// Manifest `gitHead` differs from the registry's
  pub git_head_mismatch: bool,
  /// Changelog's last released version differs from the registry's
  pub version_mismatch: bool,
}

/// What changed since the last release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnpublishedChanges {
  /// Commits touching the package, newest first
  pub logs: Vec<CommitLog>,
  pub file_logs: Vec<FileLog>,
  pub changelog_changes: ChangelogChanges,
  pub has_unpublished_changes: bool,
  pub release_type: ReleaseType,
  pub release_version: semver::Version,
}

/// Dist-tag move computed for `promote`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionCandidate {
  /// Tag currently pointing at the local version
  pub dist_tag: Option<String>,
  /// Version the target tag points at now
  pub version_to_replace: Option<String>,
  pub can_promote: bool,
  /// Promoting would move the target tag to a lower version
  pub is_degrading: bool,
}

/// Base of a backport branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackportTarget {
  pub version: String,
  pub base_commit: String,
  pub branch: String,
}

/// State carried between phases and persisted in checkpoints
///
/// Each field belongs to one stage; `None` means the stage hasn't run for this package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageState {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub integrity: Option<IntegrityCheck>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub changes: Option<UnpublishedChanges>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub selected_to_publish: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub promotion: Option<PromotionCandidate>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub selected_to_promote: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub backport: Option<BackportTarget>,
}

impl PackageState {
  /// Overlay `saved` onto this state; fields computed in `saved` win
  pub fn merge(&mut self, saved: PackageState) {
    let PackageState {
      integrity,
      changes,
      selected_to_publish,
      promotion,
      selected_to_promote,
      backport,
    } = saved;

    if integrity.is_some() {
      self.integrity = integrity;
    }
    if changes.is_some() {
      self.changes = changes;
    }
    if selected_to_publish.is_some() {
      self.selected_to_publish = selected_to_publish;
    }
    if promotion.is_some() {
      self.promotion = promotion;
    }
    if selected_to_promote.is_some() {
      self.selected_to_promote = selected_to_promote;
    }
    if backport.is_some() {
      self.backport = backport;
    }
  }

  pub fn is_empty(&self) -> bool {
    *self == PackageState::default()
  }

  pub fn has_unpublished_changes(&self) -> bool {
    self.changes.as_ref().is_some_and(|c| c.has_unpublished_changes)
  }

  pub fn is_selected_to_publish(&self) -> bool {
    self.selected_to_publish == Some(true)
  }

  pub fn is_selected_to_promote(&self) -> bool {
    self.selected_to_promote == Some(true)
  }

  pub fn release_version(&self) -> Option<&semver::Version> {
    self.changes.as_ref().map(|c| &c.release_version)
  }
}

/// Everything a run knows about one package
#[derive(Debug, Clone)]
pub struct Fabric {
  pub package: Package,
  /// Registry snapshot of the local version; `None` when never published
  pub view: Option<PackageView>,
  pub changelog: Changelog,
  pub state: PackageState,
}

impl Fabric {
  pub fn new(package: Package, view: Option<PackageView>) -> Self {
    let changelog = Changelog::load_from(package.changelog_path());
    Self {
      package,
      view,
      changelog,
      state: PackageState::default(),
    }
  }

  pub fn name(&self) -> &str {
    &self.package.name
  }
}
