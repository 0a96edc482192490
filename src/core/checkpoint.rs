//! Checkpoint persistence for resumable runs
//!
//! After every completed phase the pipeline writes a [`Checkpoint`] holding the
//! index of the next phase and each package's [`PackageState`]. A later run
//! resumes from it only when it was taken for the same action, at the same
//! repository head, with the same options and within the expiration window.
//!
//! # File format
//!
//! ```json
//! {
//!   "runId": "3f2a9c01b7de",
//!   "timestamp": "2024-06-01T12:00:00Z",
//!   "actionType": "publish",
//!   "head": "<commit sha>",
//!   "phaseIndex": 3,
//!   "options": { "packageNames": [], "exclude": [], ... },
//!   "state": { "expo-camera": { "changes": { ... }, "selectedToPublish": true } }
//! }
//! ```

use crate::core::error::{RailResult, ResultExt};
use crate::release::fabric::{Fabric, PackageState};
use crate::release::options::{ActionType, OptionsFingerprint};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Identifier of a run (SHA256 of action, starting head and start time)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
  pub fn new(action: ActionType, head: &str, started_at: DateTime<Utc>) -> Self {
    let mut hasher = Sha256::new();
    hasher.update(action.as_str().as_bytes());
    hasher.update(head.as_bytes());
    hasher.update(started_at.to_rfc3339().as_bytes());
    Self(format!("{:x}", hasher.finalize()))
  }

  /// Get the short ID (first 12 characters)
  pub fn short(&self) -> &str {
    &self.0[..12.min(self.0.len())]
  }
}

impl fmt::Display for RunId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.short())
  }
}

/// Saved progress of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
  pub run_id: RunId,
  pub timestamp: DateTime<Utc>,
  pub action_type: ActionType,
  pub head: String,
  /// Index of the next phase to run
  pub phase_index: usize,
  pub options: OptionsFingerprint,
  pub state: BTreeMap<String, PackageState>,
}

/// Why a checkpoint can't be reused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidity {
  ActionMismatch { saved: ActionType, current: ActionType },
  HeadMismatch { saved: String, current: String },
  Expired { age_minutes: i64 },
  OptionsMismatch,
}

impl fmt::Display for Invalidity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Invalidity::ActionMismatch { saved, current } => {
        write!(f, "it was saved by `{}`, not `{}`", saved, current)
      }
      Invalidity::HeadMismatch { saved, current } => write!(
        f,
        "repository head moved from {} to {}",
        short_sha(saved),
        short_sha(current)
      ),
      Invalidity::Expired { age_minutes } => write!(f, "it expired ({} minutes old)", age_minutes),
      Invalidity::OptionsMismatch => write!(f, "you've run the command with different options"),
    }
  }
}

fn short_sha(sha: &str) -> &str {
  &sha[..7.min(sha.len())]
}

/// Differences between the checkpointed and the live package sets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
  /// In the checkpoint but no longer part of the run
  pub dropped: Vec<String>,
  /// Part of the run but absent from the checkpoint
  pub fresh: Vec<String>,
}

impl Checkpoint {
  /// Snapshot the state of every fabric
  pub fn capture(
    run_id: RunId,
    action_type: ActionType,
    head: impl Into<String>,
    phase_index: usize,
    options: OptionsFingerprint,
    fabrics: &[Fabric],
  ) -> Self {
    Self {
      run_id,
      timestamp: Utc::now(),
      action_type,
      head: head.into(),
      phase_index,
      options,
      state: fabrics
        .iter()
        .map(|fabric| (fabric.package.name.clone(), fabric.state.clone()))
        .collect(),
    }
  }

  /// Check the checkpoint against the current run
  pub fn validate(
    &self,
    action_type: ActionType,
    head: &str,
    options: &OptionsFingerprint,
    expiration: Duration,
    now: DateTime<Utc>,
  ) -> Result<(), Invalidity> {
    if self.action_type != action_type {
      return Err(Invalidity::ActionMismatch {
        saved: self.action_type,
        current: action_type,
      });
    }
    if self.head != head {
      return Err(Invalidity::HeadMismatch {
        saved: self.head.clone(),
        current: head.to_string(),
      });
    }
    let age = now.signed_duration_since(self.timestamp);
    if age > expiration {
      return Err(Invalidity::Expired {
        age_minutes: age.num_minutes(),
      });
    }
    if &self.options != options {
      return Err(Invalidity::OptionsMismatch);
    }
    Ok(())
  }

  /// Merge saved states into the live fabrics
  pub fn restore_into(&self, fabrics: &mut [Fabric]) -> RestoreReport {
    let mut report = RestoreReport::default();
    let live: HashSet<&str> = fabrics.iter().map(|f| f.package.name.as_str()).collect();

    report.dropped = self
      .state
      .keys()
      .filter(|name| !live.contains(name.as_str()))
      .cloned()
      .collect();

    for fabric in fabrics.iter_mut() {
      match self.state.get(&fabric.package.name) {
        Some(saved) => fabric.state.merge(saved.clone()),
        None => report.fresh.push(fabric.package.name.clone()),
      }
    }

    report
  }
}

/// Reads and writes the checkpoint file
#[derive(Debug, Clone)]
pub struct CheckpointStore {
  path: PathBuf,
}

impl CheckpointStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn exists(&self) -> bool {
    self.path.is_file()
  }

  /// Load the checkpoint, `None` when there is none
  pub fn load(&self) -> RailResult<Option<Checkpoint>> {
    if !self.exists() {
      return Ok(None);
    }
    let content =
      fs::read_to_string(&self.path).with_context(|| format!("Failed to read checkpoint {}", self.path.display()))?;
    let checkpoint: Checkpoint =
      serde_json::from_str(&content).with_context(|| format!("Corrupt checkpoint {}", self.path.display()))?;
    Ok(Some(checkpoint))
  }

  /// Write atomically: temp file in the same directory, fsync, rename
  pub fn save(&self, checkpoint: &Checkpoint) -> RailResult<()> {
    let json = serde_json::to_string_pretty(checkpoint)?;
    let dir = match self.path.parent() {
      Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
      _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let tmp_path = dir.join(".checkpoint.json.tmp");
    let mut file = fs::File::create(&tmp_path).with_context(|| format!("create {}", tmp_path.display()))?;
    file
      .write_all(json.as_bytes())
      .with_context(|| format!("write {}", tmp_path.display()))?;
    file.sync_all().with_context(|| format!("fsync {}", tmp_path.display()))?;
    drop(file);

    fs::rename(&tmp_path, &self.path)
      .with_context(|| format!("rename {} to {}", tmp_path.display(), self.path.display()))?;
    Ok(())
  }

  /// Remove the checkpoint if present
  pub fn invalidate(&self) -> RailResult<()> {
    match fs::remove_file(&self.path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e).with_context(|| format!("Failed to remove checkpoint {}", self.path.display())),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::release::fabric::{Fabric, PackageState};
  use crate::release::options::ActionOptions;
  use crate::testing::fabric;

  fn checkpoint(fabrics: &[Fabric]) -> Checkpoint {
    let now = Utc::now();
    Checkpoint::capture(
      RunId::new(ActionType::Publish, "head1", now),
      ActionType::Publish,
      "head1",
      3,
      ActionOptions::default().fingerprint(),
      fabrics,
    )
  }

  #[test]
  fn test_save_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = CheckpointStore::new(dir.path().join(".release-rail/checkpoint.json"));
    assert!(store.load().unwrap().is_none());

    let mut foo = fabric("foo", "1.2.0");
    foo.state.selected_to_publish = Some(true);
    let saved = checkpoint(&[foo, fabric("bar", "0.1.0")]);
    store.save(&saved).unwrap();

    let loaded = store.load().unwrap().unwrap();
    assert_eq!(loaded, saved);
    assert_eq!(loaded.phase_index, 3);
    assert!(!dir.path().join(".release-rail/.checkpoint.json.tmp").exists());

    store.invalidate().unwrap();
    assert!(!store.exists());
    store.invalidate().unwrap();
  }

  #[test]
  fn test_corrupt_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checkpoint.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(CheckpointStore::new(path).load().is_err());
  }

  #[test]
  fn test_validate_accepts_matching_run() {
    let cp = checkpoint(&[]);
    let result = cp.validate(
      ActionType::Publish,
      "head1",
      &ActionOptions::default().fingerprint(),
      Duration::minutes(60),
      cp.timestamp + Duration::minutes(5),
    );
    assert_eq!(result, Ok(()));
  }

  #[test]
  fn test_validate_rejects_moved_head() {
    let cp = checkpoint(&[]);
    let result = cp.validate(
      ActionType::Publish,
      "head2",
      &ActionOptions::default().fingerprint(),
      Duration::minutes(60),
      cp.timestamp,
    );
    assert!(matches!(result, Err(Invalidity::HeadMismatch { .. })));
  }

  #[test]
  fn test_validate_rejects_other_action_expiry_and_options() {
    let cp = checkpoint(&[]);
    let fp = ActionOptions::default().fingerprint();
    let hour = Duration::minutes(60);

    let err = cp
      .validate(ActionType::Promote, "head1", &fp, hour, cp.timestamp)
      .unwrap_err();
    assert!(matches!(err, Invalidity::ActionMismatch { .. }));

    let err = cp
      .validate(ActionType::Publish, "head1", &fp, hour, cp.timestamp + Duration::minutes(61))
      .unwrap_err();
    assert_eq!(err, Invalidity::Expired { age_minutes: 61 });

    let other = ActionOptions {
      exclude: vec!["foo".into()],
      ..Default::default()
    }
    .fingerprint();
    let err = cp.validate(ActionType::Publish, "head1", &other, hour, cp.timestamp).unwrap_err();
    assert_eq!(err, Invalidity::OptionsMismatch);
  }

  #[test]
  fn test_restore_reports_set_mismatch() {
    let mut foo = fabric("foo", "1.0.0");
    foo.state.selected_to_publish = Some(true);
    let cp = checkpoint(&[foo, fabric("gone", "1.0.0")]);

    let mut live = vec![fabric("foo", "1.0.0"), fabric("new", "1.0.0")];
    let report = cp.restore_into(&mut live);

    assert_eq!(report.dropped, ["gone"]);
    assert_eq!(report.fresh, ["new"]);
    assert!(live[0].state.is_selected_to_publish());
    assert_eq!(live[1].state, PackageState::default());
  }

  #[test]
  fn test_run_id_is_short_hex() {
    let id = RunId::new(ActionType::List, "abc", Utc::now());
    assert_eq!(id.short().len(), 12);
    assert!(id.short().chars().all(|c| c.is_ascii_hexdigit()));
  }
}
