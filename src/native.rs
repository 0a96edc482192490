//! Native project updates
//!
//! Android: version fields in `android/build.gradle` are rewritten in place.
//! iOS: released pods are refreshed with `pod update` in the app's ios directory.

use crate::core::error::{RailError, RailResult, ResultExt};
use regex::{Captures, Regex};
use std::fs;
use std::path::Path;
use std::process::Command;

/// Set `version = '…'` / `versionName "…"` to `version` and bump every `versionCode`
pub fn rewrite_gradle(content: &str, version: &str) -> RailResult<String> {
  // One pattern per quote style; the quote must match on both sides
  let single = Regex::new(r"\b(version\s*=\s*|versionName\s+)'[^'\n]*'")?;
  let double = Regex::new(r#"\b(version\s*=\s*|versionName\s+)"[^"\n]*""#)?;
  let version_code = Regex::new(r"\bversionCode\s+(\d+)\b")?;

  let content = single.replace_all(content, |caps: &Captures| format!("{}'{}'", &caps[1], version));
  let content = double.replace_all(&content, |caps: &Captures| format!("{}\"{}\"", &caps[1], version));
  let content = version_code.replace_all(&content, |caps: &Captures| {
    let code: u64 = caps[1].parse().unwrap_or(0);
    format!("versionCode {}", code + 1)
  });

  Ok(content.into_owned())
}

/// Rewrite a `build.gradle` file; returns `false` when the package has none
pub fn update_build_gradle(path: &Path, version: &str) -> RailResult<bool> {
  if !path.is_file() {
    return Ok(false);
  }

  let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
  let updated = rewrite_gradle(&content, version)?;
  fs::write(path, updated).with_context(|| format!("Failed to write {}", path.display()))?;
  Ok(true)
}

/// Run `<pod_command> update <pods...> --no-repo-update` in `ios_dir`
pub fn pod_update(pod_command: &str, ios_dir: &Path, pods: &[String]) -> RailResult<()> {
  let label = format!("{} update {} --no-repo-update", pod_command, pods.join(" "));

  let output = Command::new(pod_command)
    .current_dir(ios_dir)
    .arg("update")
    .args(pods)
    .arg("--no-repo-update")
    .output()
    .with_context(|| format!("Failed to execute {}", label))?;

  if !output.status.success() {
    return Err(RailError::Command {
      command: label,
      stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    });
  }

  Ok(())
}
