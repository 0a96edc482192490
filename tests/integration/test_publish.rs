//! Integration tests for `release-rail publish`

use crate::helpers::{TestWorkspace, release_rail, run_release_rail};
use anyhow::Result;

/// Monorepo where `foo` was released at `c1` and then got an iOS change
fn released_then_changed() -> Result<(TestWorkspace, String)> {
  let ws = TestWorkspace::new()?;
  ws.add_package("foo", "1.2.0", None)?;
  let released = ws.commit("Add foo")?;

  ws.add_package("foo", "1.2.0", Some(&released))?;
  ws.commit("Publish packages")?;

  ws.write_file("packages/foo/ios/Zoom.m", "// zoom\n")?;
  let change = ws.commit("Add zoom on iOS")?;

  Ok((ws, change))
}

#[test]
fn test_publish_dry_run_bumps_commits_and_cleans_up() -> Result<()> {
  let (ws, change) = released_then_changed()?;

  let output = run_release_rail(&ws.path, &["publish", "--yes", "--dry"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);

  let manifest = ws.manifest("foo")?;
  assert_eq!(manifest["version"], "1.3.0", "native change should be a minor bump");
  assert_eq!(manifest["gitHead"], change.as_str());

  let message = ws.last_commit_message()?;
  assert!(message.starts_with("Publish packages"), "unexpected commit: {}", message);
  assert!(message.contains("foo@1.3.0"), "unexpected commit: {}", message);

  let changelog = ws.read_file("packages/foo/CHANGELOG.md")?;
  assert!(changelog.contains("## 1.3.0"));
  assert!(stdout.contains("would be published"), "stdout: {}", stdout);
  assert!(!ws.checkpoint_exists());

  Ok(())
}

#[test]
fn test_publish_prerelease_skips_changelog() -> Result<()> {
  let (ws, _) = released_then_changed()?;

  run_release_rail(&ws.path, &["publish", "--yes", "--dry", "--prerelease"])?;

  assert_eq!(ws.manifest("foo")?["version"], "1.3.0-rc.0");
  assert!(!ws.file_exists("packages/foo/CHANGELOG.md"));
  assert!(ws.last_commit_message()?.contains("foo@1.3.0-rc.0"));

  Ok(())
}

#[test]
fn test_publish_up_to_date() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_package("foo", "1.2.0", None)?;
  let released = ws.commit("Add foo")?;
  ws.add_package("foo", "1.2.0", Some(&released))?;
  let head = ws.commit("Publish packages")?;

  let output = run_release_rail(&ws.path, &["publish", "--yes", "--dry"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);

  assert!(stdout.contains("All packages are up-to-date"), "stdout: {}", stdout);
  assert_eq!(ws.head()?, head, "nothing should be committed");
  assert!(!ws.checkpoint_exists());

  Ok(())
}

#[test]
fn test_publish_refuses_dirty_tree() -> Result<()> {
  let (ws, _) = released_then_changed()?;
  ws.write_file("packages/foo/index.js", "module.exports = 'changed';\n")?;

  let output = release_rail(&ws.path, &["publish", "--yes", "--dry"])?;

  assert_eq!(output.status.code(), Some(3));
  assert_eq!(ws.manifest("foo")?["version"], "1.2.0");
  assert!(!ws.checkpoint_exists());

  Ok(())
}

#[test]
fn test_publish_excluded_package_untouched() -> Result<()> {
  let (ws, _) = released_then_changed()?;
  ws.add_package("bar", "0.1.0", None)?;
  ws.commit("Add bar")?;

  run_release_rail(&ws.path, &["publish", "--yes", "--dry", "--exclude", "foo"])?;

  assert_eq!(ws.manifest("foo")?["version"], "1.2.0");
  assert_eq!(ws.manifest("bar")?["version"], "0.1.1");

  Ok(())
}
