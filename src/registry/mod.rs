//! Package registry abstraction
//!
//! [`NpmRegistry`] drives an npm-compatible CLI. Tests use an in-memory fake.

pub mod npm;

use crate::core::error::RailResult;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub use npm::NpmRegistry;

/// Registry snapshot of a package version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageView {
  pub name: String,
  pub version: String,
  #[serde(rename = "dist-tags", default)]
  pub dist_tags: BTreeMap<String, String>,
  #[serde(default, deserialize_with = "one_or_many")]
  pub versions: Vec<String>,
  #[serde(rename = "gitHead", default)]
  pub git_head: Option<String>,
}

impl PackageView {
  /// Tags currently pointing at `version`
  pub fn tags_for(&self, version: &str) -> Vec<&str> {
    self
      .dist_tags
      .iter()
      .filter(|(_, v)| v.as_str() == version)
      .map(|(tag, _)| tag.as_str())
      .collect()
  }
}

/// `npm view` prints a bare string when a package has a single version
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum OneOrMany {
    One(String),
    Many(Vec<String>),
  }

  Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
    Some(OneOrMany::One(v)) => vec![v],
    Some(OneOrMany::Many(v)) => v,
    None => Vec::new(),
  })
}

/// Registry operations the release workflow relies on
pub trait Registry: Send + Sync {
  /// Snapshot of `name` (at `version` when given); `None` when not published
  fn view(&self, name: &str, version: Option<&str>) -> RailResult<Option<PackageView>>;

  /// Point `tag` at `name@version`
  fn add_tag(&self, name: &str, version: &str, tag: &str) -> RailResult<()>;

  /// Remove `tag` from `name`
  fn remove_tag(&self, name: &str, tag: &str) -> RailResult<()>;

  /// Publish the package in `dir` under `tag`
  fn publish(&self, dir: &Path, tag: &str) -> RailResult<()>;
}
