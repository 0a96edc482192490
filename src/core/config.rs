use crate::core::error::{ConfigError, RailError, RailResult, ResultExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for release-rail
/// Searched in order: release-rail.toml, .release-rail.toml, .config/release-rail.toml
///
/// Every section is optional; a workspace without a config file runs on defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RailConfig {
  #[serde(default)]
  pub workspace: WorkspaceConfig,
  #[serde(default)]
  pub repository: RepositoryConfig,
  #[serde(default)]
  pub checkpoint: CheckpointConfig,
  #[serde(default)]
  pub native: NativeConfig,
  #[serde(default)]
  pub registry: RegistryConfig,
}

/// Where packages live inside the monorepo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
  /// Glob patterns (relative to the repo root) matching package directories
  #[serde(default = "default_package_globs")]
  pub packages: Vec<String>,
}

fn default_package_globs() -> Vec<String> {
  vec!["packages/*".to_string()]
}

impl Default for WorkspaceConfig {
  fn default() -> Self {
    Self {
      packages: default_package_globs(),
    }
  }
}

/// Branch policy for publishing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
  /// Branches publishing is expected to run from (default: ["main", "master"])
  #[serde(default = "default_branches")]
  pub branches: Vec<String>,

  /// Per-package side branches, e.g. `expo-camera/8.x.x` or `expo-camera/8.1.x`
  #[serde(default = "default_release_branch_pattern")]
  pub release_branch_pattern: String,
}

fn default_branches() -> Vec<String> {
  vec!["main".to_string(), "master".to_string()]
}

fn default_release_branch_pattern() -> String {
  r"^[\w\-@]+/\d+\.(x\.x|\d+\.x)$".to_string()
}

impl Default for RepositoryConfig {
  fn default() -> Self {
    Self {
      branches: default_branches(),
      release_branch_pattern: default_release_branch_pattern(),
    }
  }
}

/// Checkpoint persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
  /// Checkpoint file location (relative to the repo root)
  #[serde(default = "default_checkpoint_path")]
  pub path: PathBuf,

  /// Checkpoints older than this are ignored
  #[serde(default = "default_expiration_minutes")]
  pub expiration_minutes: u64,
}

fn default_checkpoint_path() -> PathBuf {
  PathBuf::from(".release-rail").join("checkpoint.json")
}

fn default_expiration_minutes() -> u64 {
  60
}

impl Default for CheckpointConfig {
  fn default() -> Self {
    Self {
      path: default_checkpoint_path(),
      expiration_minutes: default_expiration_minutes(),
    }
  }
}

impl CheckpointConfig {
  pub fn expiration(&self) -> chrono::Duration {
    chrono::Duration::minutes(i64::try_from(self.expiration_minutes).unwrap_or(i64::MAX / 60_000))
  }
}

/// Native project handling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeConfig {
  /// Package subdirectories whose changes imply a minor release
  #[serde(default = "default_native_directories")]
  pub directories: Vec<String>,

  /// Directory holding the Podfile (relative to the repo root); iOS phase is skipped when unset
  #[serde(default)]
  pub ios_dir: Option<PathBuf>,

  /// Run `pod update` for released pods
  #[serde(default = "default_true")]
  pub pod_update: bool,

  /// CocoaPods executable
  #[serde(default = "default_pod_command")]
  pub pod_command: String,

  /// JSON file mapping package names to bundled version ranges (relative to the repo root)
  #[serde(default)]
  pub bundled_versions: Option<PathBuf>,
}

fn default_native_directories() -> Vec<String> {
  vec!["android".to_string(), "ios".to_string()]
}

fn default_true() -> bool {
  true
}

fn default_pod_command() -> String {
  "pod".to_string()
}

impl Default for NativeConfig {
  fn default() -> Self {
    Self {
      directories: default_native_directories(),
      ios_dir: None,
      pod_update: true,
      pod_command: default_pod_command(),
      bundled_versions: None,
    }
  }
}

/// Package registry client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
  /// Registry CLI (npm-compatible: `view --json`, `dist-tag`, `publish`)
  #[serde(default = "default_registry_command")]
  pub command: String,
}

fn default_registry_command() -> String {
  "npm".to_string()
}

impl Default for RegistryConfig {
  fn default() -> Self {
    Self {
      command: default_registry_command(),
    }
  }
}

impl RailConfig {
  /// Find config file in search order: release-rail.toml, .release-rail.toml, .config/release-rail.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("release-rail.toml"),
      path.join(".release-rail.toml"),
      path.join(".config").join("release-rail.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config, falling back to defaults when no file exists
  pub fn load(path: &Path) -> RailResult<Self> {
    let Some(config_path) = Self::find_config_path(path) else {
      return Ok(Self::default());
    };

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config = Self::parse(&content).with_context(|| format!("Invalid config in {}", config_path.display()))?;

    Ok(config)
  }

  /// Parse and validate config contents
  pub fn parse(content: &str) -> RailResult<Self> {
    let config: RailConfig = toml_edit::de::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  /// Validate config values that serde can't check
  pub fn validate(&self) -> RailResult<()> {
    if self.workspace.packages.is_empty() {
      return Err(RailError::Config(ConfigError::InvalidValue {
        field: "workspace.packages".to_string(),
        reason: "at least one package glob is required".to_string(),
      }));
    }

    if let Err(e) = regex::Regex::new(&self.repository.release_branch_pattern) {
      return Err(RailError::Config(ConfigError::InvalidValue {
        field: "repository.release_branch_pattern".to_string(),
        reason: e.to_string(),
      }));
    }

    if self.checkpoint.expiration_minutes == 0 {
      return Err(RailError::Config(ConfigError::InvalidValue {
        field: "checkpoint.expiration_minutes".to_string(),
        reason: "must be greater than zero".to_string(),
      }));
    }

    if self.checkpoint.path.is_absolute() {
      return Err(RailError::Config(ConfigError::InvalidValue {
        field: "checkpoint.path".to_string(),
        reason: "must be relative to the repository root".to_string(),
      }));
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_without_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = RailConfig::load(dir.path()).unwrap();
    assert_eq!(config.workspace.packages, vec!["packages/*"]);
    assert_eq!(config.repository.branches, vec!["main", "master"]);
    assert_eq!(config.checkpoint.expiration_minutes, 60);
    assert_eq!(config.native.directories, vec!["android", "ios"]);
    assert_eq!(config.registry.command, "npm");
    assert!(config.native.ios_dir.is_none());
  }

  #[test]
  fn test_partial_file_keeps_defaults() {
    let config = RailConfig::parse(
      r#"
[native]
ios_dir = "ios"
pod_update = false

[registry]
command = "pnpm"
"#,
    )
    .unwrap();
    assert_eq!(config.native.ios_dir, Some(PathBuf::from("ios")));
    assert!(!config.native.pod_update);
    assert_eq!(config.native.pod_command, "pod");
    assert_eq!(config.registry.command, "pnpm");
    assert_eq!(config.workspace.packages, vec!["packages/*"]);
  }

  #[test]
  fn test_load_from_dot_config() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join(".config")).unwrap();
    fs::write(
      dir.path().join(".config/release-rail.toml"),
      "[checkpoint]\nexpiration_minutes = 5\n",
    )
    .unwrap();
    let config = RailConfig::load(dir.path()).unwrap();
    assert_eq!(config.checkpoint.expiration_minutes, 5);
    assert_eq!(config.checkpoint.expiration(), chrono::Duration::minutes(5));
  }

  #[test]
  fn test_invalid_branch_pattern() {
    let result = RailConfig::parse("[repository]\nrelease_branch_pattern = \"(unclosed\"\n");
    assert!(result.is_err());
  }

  #[test]
  fn test_zero_expiration_rejected() {
    let result = RailConfig::parse("[checkpoint]\nexpiration_minutes = 0\n");
    assert!(result.is_err());
  }
}
