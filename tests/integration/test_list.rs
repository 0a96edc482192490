//! Integration tests for `release-rail list`

use crate::helpers::{TestWorkspace, release_rail, run_release_rail};
use anyhow::Result;

#[test]
fn test_list_shows_unpublished_changes() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_package("foo", "1.0.0", None)?;
  ws.write_file(
    "packages/foo/CHANGELOG.md",
    "# Changelog\n\n## Unpublished\n\n### 🛠 Breaking changes\n\n- Dropped Node 16.\n",
  )?;
  let head = ws.commit("Add foo")?;

  let output = run_release_rail(&ws.path, &["list"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);

  assert!(stdout.contains("foo has some changes since 1.0.0"), "stdout: {}", stdout);
  assert!(stdout.contains("Dropped Node 16."), "stdout: {}", stdout);
  assert!(stdout.contains("to 2.0.0"), "breaking change should suggest a major bump: {}", stdout);

  assert_eq!(ws.manifest("foo")?["version"], "1.0.0");
  assert_eq!(ws.head()?, head);
  assert!(!ws.checkpoint_exists());

  Ok(())
}

#[test]
fn test_list_ignores_dirty_tree_and_private_packages() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_package("foo", "1.0.0", None)?;
  ws.write_file(
    "packages/internal/package.json",
    "{\n  \"name\": \"internal\",\n  \"version\": \"1.0.0\",\n  \"private\": true\n}\n",
  )?;
  ws.write_file("packages/tools/package.json", "{\n  \"name\": \"tools\",\n  \"private\": true\n}\n")?;
  ws.commit("Add packages")?;
  ws.write_file("packages/foo/index.js", "module.exports = 'dirty';\n")?;

  let output = run_release_rail(&ws.path, &["list"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);

  assert!(stdout.contains("foo has some changes"), "stdout: {}", stdout);
  assert!(!stdout.contains("internal has some changes"), "stdout: {}", stdout);

  Ok(())
}

#[test]
fn test_list_suggests_prerelease_versions() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_package("foo", "1.0.0", None)?;
  ws.write_file(
    "packages/foo/CHANGELOG.md",
    "# Changelog\n\n## Unpublished\n\n### 🛠 Breaking changes\n\n- Dropped Node 16.\n",
  )?;
  ws.commit("Add foo")?;

  let output = run_release_rail(&ws.path, &["list", "--prerelease", "rc"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);

  assert!(stdout.contains("to 2.0.0-rc.0"), "stdout: {}", stdout);

  Ok(())
}

#[test]
fn test_list_unknown_package_fails() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_package("foo", "1.0.0", None)?;
  ws.commit("Add foo")?;

  let output = release_rail(&ws.path, &["list", "nope"])?;
  let stderr = String::from_utf8_lossy(&output.stderr);

  assert!(!output.status.success());
  assert!(stderr.contains("nope"), "stderr: {}", stderr);

  Ok(())
}
