//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Registry CLI that doesn't exist, so every package reads as never published
pub const NO_REGISTRY: &str = "release-rail-no-such-registry-cli";

/// A test monorepo with git history
pub struct TestWorkspace {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestWorkspace {
  /// Create a new monorepo with a config pointing at a missing registry
  pub fn new() -> Result<Self> {
    Self::with_config("")
  }

  /// Like [`TestWorkspace::new`], with extra config appended
  pub fn with_config(extra: &str) -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    git(&path, &["init", "--initial-branch=main"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;

    std::fs::write(path.join(".gitignore"), ".release-rail/\n")?;
    std::fs::write(
      path.join("release-rail.toml"),
      format!("[registry]\ncommand = \"{}\"\n\n{}", NO_REGISTRY, extra),
    )?;

    git(&path, &["add", "."])?;
    git(&path, &["commit", "-m", "Initial workspace setup"])?;

    Ok(Self { _root: root, path })
  }

  /// Write `packages/<name>/package.json` (and an entry point)
  pub fn add_package(&self, name: &str, version: &str, git_head: Option<&str>) -> Result<PathBuf> {
    let package_path = self.path.join("packages").join(name);
    std::fs::create_dir_all(&package_path)?;

    let mut manifest = serde_json::json!({
      "name": name,
      "version": version,
      "main": "index.js",
    });
    if let Some(head) = git_head {
      manifest["gitHead"] = serde_json::Value::String(head.to_string());
    }
    std::fs::write(
      package_path.join("package.json"),
      serde_json::to_string_pretty(&manifest)? + "\n",
    )?;
    std::fs::write(package_path.join("index.js"), format!("module.exports = '{}';\n", name))?;

    Ok(package_path)
  }

  /// Write a file relative to the repository root
  pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
    let file_path = self.path.join(path);
    if let Some(parent) = file_path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(file_path, content)?;
    Ok(())
  }

  /// Commit current changes
  pub fn commit(&self, message: &str) -> Result<String> {
    git(&self.path, &["add", "."])?;
    git(&self.path, &["commit", "-m", message])?;
    self.head()
  }

  pub fn head(&self) -> Result<String> {
    let output = git(&self.path, &["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Full message of the last commit
  pub fn last_commit_message(&self) -> Result<String> {
    let output = git(&self.path, &["log", "-1", "--format=%B"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Parsed `package.json` of a package
  pub fn manifest(&self, name: &str) -> Result<serde_json::Value> {
    let content = self.read_file(&format!("packages/{}/package.json", name))?;
    Ok(serde_json::from_str(&content)?)
  }

  pub fn checkpoint_exists(&self) -> bool {
    self.file_exists(".release-rail/checkpoint.json")
  }

  /// Check if a file exists
  pub fn file_exists(&self, path: &str) -> bool {
    self.path.join(path).exists()
  }

  /// Read a file
  pub fn read_file(&self, path: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(path))?)
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run release-rail, whatever its exit status
pub fn release_rail(cwd: &Path, args: &[&str]) -> Result<Output> {
  Command::new(env!("CARGO_BIN_EXE_release-rail"))
    .current_dir(cwd)
    .args(args)
    .env("NO_COLOR", "1")
    .output()
    .context("Failed to run release-rail")
}

/// Run release-rail and require success
pub fn run_release_rail(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = release_rail(cwd, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "release-rail command failed: release-rail {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}
