//! Utility functions for cross-platform path handling

use std::path::{Path, PathBuf};

/// Convert a path to Git format (always forward slashes)
///
/// Git expects paths with forward slashes, even on Windows.
/// This function converts backslashes to forward slashes for use in Git commands.
pub fn path_to_git_format(path: &Path) -> String {
  #[cfg(target_os = "windows")]
  {
    path.to_string_lossy().replace('\\', "/")
  }
  #[cfg(not(target_os = "windows"))]
  {
    path.to_string_lossy().to_string()
  }
}

/// Express `path` relative to `root`
///
/// Relative inputs are returned unchanged. Absolute inputs are stripped of `root`,
/// retrying with canonicalized paths so symlinked temp dirs (macOS `/private/var`) still match.
/// Paths outside `root` come back as-is.
pub fn relative_to(root: &Path, path: &Path) -> PathBuf {
  if path.is_relative() {
    return path.to_path_buf();
  }

  if let Ok(rel) = path.strip_prefix(root) {
    return rel.to_path_buf();
  }

  if let (Ok(root), Ok(path)) = (root.canonicalize(), path.canonicalize())
    && let Ok(rel) = path.strip_prefix(&root)
  {
    return rel.to_path_buf();
  }

  path.to_path_buf()
}
