//! `package.json` reading and in-place field updates
//!
//! Updates go through `serde_json::Value` with `preserve_order`, so keys keep
//! their position and untouched fields round-trip unchanged.

use crate::core::error::{RailError, RailResult, ResultExt};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Fields release-rail reads from a manifest
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
  pub name: String,
  /// Private packages may leave it out
  #[serde(default)]
  pub version: Option<String>,
  #[serde(default)]
  pub private: bool,
  #[serde(default)]
  pub git_head: Option<String>,
}

/// Read and parse a `package.json`
pub fn read_manifest(path: &Path) -> RailResult<Manifest> {
  let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
  let manifest: Manifest =
    serde_json::from_str(&content).with_context(|| format!("Invalid manifest {}", path.display()))?;
  Ok(manifest)
}

/// Set top-level string fields, keeping key order and every other field intact
pub fn update_fields(path: &Path, fields: &[(&str, &str)]) -> RailResult<()> {
  let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
  let mut value: Value =
    serde_json::from_str(&content).with_context(|| format!("Invalid manifest {}", path.display()))?;

  let object: &mut Map<String, Value> = value
    .as_object_mut()
    .ok_or_else(|| RailError::message(format!("{} is not a JSON object", path.display())))?;

  for (key, new_value) in fields {
    object.insert((*key).to_string(), Value::String((*new_value).to_string()));
  }

  let mut output = serde_json::to_string_pretty(&value)?;
  output.push('\n');
  fs::write(path, output).with_context(|| format!("Failed to write {}", path.display()))?;
  Ok(())
}
