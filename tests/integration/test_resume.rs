//! Integration tests for checkpointing and `--retry`

use crate::helpers::{TestWorkspace, release_rail, run_release_rail};
use anyhow::Result;

const FAILING_PODS: &str = r#"[native]
ios_dir = "apps/ios"
pod_command = "release-rail-no-such-pod"
"#;

/// `foo` ships a podspec and has an iOS change, so the iOS phase runs `pod`
fn workspace_with_pods() -> Result<TestWorkspace> {
  let ws = TestWorkspace::with_config(FAILING_PODS)?;
  ws.add_package("foo", "1.2.0", None)?;
  ws.write_file("packages/foo/Foo.podspec", "Pod::Spec.new do |s|\nend\n")?;
  ws.write_file("packages/foo/ios/Zoom.m", "// zoom\n")?;
  ws.write_file("apps/ios/Podfile", "target 'App'\n")?;
  ws.commit("Add foo")?;
  Ok(ws)
}

fn disable_pods(ws: &TestWorkspace) -> Result<()> {
  let config = ws.read_file("release-rail.toml")?;
  ws.write_file("release-rail.toml", &config.replace("[native]", "[native]\npod_update = false"))
}

#[test]
fn test_failed_phase_leaves_checkpoint() -> Result<()> {
  let ws = workspace_with_pods()?;

  let output = release_rail(&ws.path, &["publish", "--yes", "--dry"])?;
  let stderr = String::from_utf8_lossy(&output.stderr);

  assert!(!output.status.success());
  assert!(stderr.contains("phase 6/9"), "stderr: {}", stderr);
  assert!(stderr.contains("update iOS projects"), "stderr: {}", stderr);
  assert_eq!(ws.manifest("foo")?["version"], "1.3.0");

  let checkpoint: serde_json::Value = serde_json::from_str(&ws.read_file(".release-rail/checkpoint.json")?)?;
  assert_eq!(checkpoint["phaseIndex"], 6);
  assert_eq!(checkpoint["actionType"], "publish");
  assert_eq!(checkpoint["state"]["foo"]["selectedToPublish"], true);

  Ok(())
}

#[test]
fn test_retry_resumes_at_failed_phase() -> Result<()> {
  let ws = workspace_with_pods()?;
  release_rail(&ws.path, &["publish", "--yes", "--dry"])?;
  disable_pods(&ws)?;

  let output = run_release_rail(
    &ws.path,
    &["publish", "--retry", "--yes", "--dry", "--skip-repo-checks"],
  )?;
  let stdout = String::from_utf8_lossy(&output.stdout);

  assert!(stdout.contains("Restoring run"), "stdout: {}", stdout);
  assert!(!stdout.contains("Updating versions"), "completed phases ran again: {}", stdout);
  assert_eq!(ws.manifest("foo")?["version"], "1.3.0");
  assert!(ws.last_commit_message()?.contains("foo@1.3.0"));
  assert!(!ws.checkpoint_exists());

  Ok(())
}

#[test]
fn test_changed_options_start_over() -> Result<()> {
  let ws = workspace_with_pods()?;
  release_rail(&ws.path, &["publish", "--yes", "--dry"])?;

  let output = release_rail(&ws.path, &["publish", "--retry", "--yes", "--dry", "--prerelease", "beta"])?;
  let stderr = String::from_utf8_lossy(&output.stderr);

  assert!(stderr.contains("Continuing from scratch"), "stderr: {}", stderr);

  Ok(())
}

#[test]
fn test_moved_head_starts_over() -> Result<()> {
  let ws = workspace_with_pods()?;
  release_rail(&ws.path, &["publish", "--yes", "--dry"])?;
  ws.commit("Commit the half-done release by hand")?;

  let output = run_release_rail(&ws.path, &["publish", "--retry", "--yes", "--dry"])?;
  let stderr = String::from_utf8_lossy(&output.stderr);
  let stdout = String::from_utf8_lossy(&output.stdout);

  assert!(stderr.contains("Continuing from scratch"), "stderr: {}", stderr);
  assert!(stdout.contains("All packages are up-to-date"), "stdout: {}", stdout);
  assert!(!ws.checkpoint_exists());

  Ok(())
}
