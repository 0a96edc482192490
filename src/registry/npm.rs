//! npm CLI backend

use super::{PackageView, Registry};
use crate::core::error::{RailError, RailResult, RegistryError, ResultExt};
use std::path::Path;
use std::process::{Command, Output};

/// Registry client shelling out to `npm` (or a compatible command)
pub struct NpmRegistry {
  command: String,
}

impl NpmRegistry {
  pub fn new(command: impl Into<String>) -> Self {
    Self {
      command: command.into(),
    }
  }

  fn cmd(&self) -> Command {
    Command::new(&self.command)
  }

  fn run_checked(&self, cmd: &mut Command, label: String) -> RailResult<Output> {
    let output = cmd.output().with_context(|| format!("Failed to execute {}", label))?;

    if !output.status.success() {
      return Err(RailError::Registry(RegistryError::CommandFailed {
        command: label,
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      }));
    }

    Ok(output)
  }
}

/// Whether `npm view` failed because the package or version doesn't exist
pub(crate) fn is_not_found(stderr: &str) -> bool {
  stderr.contains("E404") || stderr.contains("404 Not Found") || stderr.contains("is not in this registry")
}

/// Parse `npm view --json` output
///
/// A version range prints an array of manifests; the last one is the newest.
pub(crate) fn parse_view(stdout: &str) -> RailResult<Option<PackageView>> {
  let trimmed = stdout.trim();
  if trimmed.is_empty() {
    return Ok(None);
  }

  let value: serde_json::Value = serde_json::from_str(trimmed)?;
  let value = match value {
    serde_json::Value::Array(mut items) => match items.pop() {
      Some(last) => last,
      None => return Ok(None),
    },
    other => other,
  };

  Ok(Some(serde_json::from_value(value)?))
}

impl Registry for NpmRegistry {
  fn view(&self, name: &str, version: Option<&str>) -> RailResult<Option<PackageView>> {
    let spec = match version {
      Some(version) => format!("{}@{}", name, version),
      None => name.to_string(),
    };

    // A missing CLI means no registry data
    let Ok(output) = self.cmd().args(["view", &spec, "--json"]).output() else {
      return Ok(None);
    };
    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if !is_not_found(&stderr) {
        eprintln!(
          "⚠️  `{} view {}` failed, treating {} as unpublished: {}",
          self.command,
          spec,
          name,
          stderr.lines().find(|l| !l.trim().is_empty()).unwrap_or("no output").trim()
        );
      }
      return Ok(None);
    }

    parse_view(&String::from_utf8_lossy(&output.stdout))
  }

  fn add_tag(&self, name: &str, version: &str, tag: &str) -> RailResult<()> {
    let spec = format!("{}@{}", name, version);
    self.run_checked(
      self.cmd().args(["dist-tag", "add", &spec, tag]),
      format!("{} dist-tag add {} {}", self.command, spec, tag),
    )?;
    Ok(())
  }

  fn remove_tag(&self, name: &str, tag: &str) -> RailResult<()> {
    self.run_checked(
      self.cmd().args(["dist-tag", "rm", name, tag]),
      format!("{} dist-tag rm {} {}", self.command, name, tag),
    )?;
    Ok(())
  }

  fn publish(&self, dir: &Path, tag: &str) -> RailResult<()> {
    self.run_checked(
      self.cmd().current_dir(dir).args(["publish", "--tag", tag]),
      format!("{} publish --tag {} (in {})", self.command, tag, dir.display()),
    )?;
    Ok(())
  }
}
