//! Package catalog
//!
//! Discovers publishable packages in the monorepo from the `[workspace]
//! packages` globs. A package is any matched directory with a `package.json`
//! that isn't marked `private`; private manifests are never parsed further.

pub mod manifest;

use crate::core::error::{RailError, RailResult, ResultExt};
use crate::utils::relative_to;
use std::path::{Path, PathBuf};

pub use manifest::{Manifest, read_manifest, update_fields};

/// A package in the monorepo, as read from disk at the start of a run
#[derive(Debug, Clone)]
pub struct Package {
  pub name: String,
  pub version: semver::Version,
  /// Commit the current version was released from
  pub git_head: Option<String>,
  /// Absolute package directory
  pub path: PathBuf,
  /// Directory relative to the repository root
  pub relative_path: PathBuf,
  /// Pod name, when the package ships a podspec
  pub podspec_name: Option<String>,
}

impl Package {
  /// Build a package from its already-read manifest
  pub fn from_manifest(root: &Path, dir: &Path, manifest: Manifest) -> RailResult<Self> {
    let Some(raw_version) = manifest.version else {
      return Err(RailError::message(format!(
        "{} has no version in {}",
        manifest.name,
        dir.join("package.json").display()
      )));
    };
    let version = semver::Version::parse(&raw_version)
      .with_context(|| format!("Invalid version '{}' in {}", raw_version, manifest.name))?;

    Ok(Self {
      name: manifest.name,
      version,
      git_head: manifest.git_head.filter(|head| !head.is_empty()),
      path: dir.to_path_buf(),
      relative_path: relative_to(root, dir),
      podspec_name: find_podspec(dir)?,
    })
  }

  pub fn manifest_path(&self) -> PathBuf {
    self.path.join("package.json")
  }

  pub fn changelog_path(&self) -> PathBuf {
    self.path.join("CHANGELOG.md")
  }

  pub fn build_gradle_path(&self) -> PathBuf {
    self.path.join("android").join("build.gradle")
  }
}

/// Pod name from `<pkg>/*.podspec` or `<pkg>/ios/*.podspec`
fn find_podspec(dir: &Path) -> RailResult<Option<String>> {
  for base in [dir.to_path_buf(), dir.join("ios")] {
    let pattern = glob::Pattern::escape(&base.to_string_lossy()) + "/*.podspec";
    let mut matches: Vec<PathBuf> = glob::glob(&pattern)?.filter_map(Result::ok).collect();
    matches.sort();
    if let Some(stem) = matches.first().and_then(|p| p.file_stem()) {
      return Ok(Some(stem.to_string_lossy().to_string()));
    }
  }
  Ok(None)
}

/// Find every public package matched by `globs` under `root`, sorted by name
pub fn discover_packages(root: &Path, globs: &[String]) -> RailResult<Vec<Package>> {
  let mut packages: Vec<Package> = Vec::new();
  let root_pattern = glob::Pattern::escape(&root.to_string_lossy());

  for pattern in globs {
    let full = format!("{}/{}", root_pattern, pattern.trim_start_matches("./"));
    for entry in glob::glob(&full)? {
      let dir = entry.map_err(|e| e.into_error())?;
      if !dir.join("package.json").is_file() {
        continue;
      }
      if packages.iter().any(|p| p.path == dir) {
        continue;
      }
      let manifest = read_manifest(&dir.join("package.json"))?;
      if manifest.private {
        continue;
      }
      packages.push(Package::from_manifest(root, &dir, manifest)?);
    }
  }

  packages.sort_by(|a, b| a.name.cmp(&b.name));
  Ok(packages)
}
