//! Phases of the `backport` action: branch off a published version

use crate::core::error::{RailError, RailResult, RegistryError};
use crate::release::fabric::{BackportTarget, Fabric};
use crate::release::pipeline::{Phase, PhaseContext, PhaseOutcome};
use crate::ui::style;
use semver::Version;

pub fn phases() -> Vec<Phase> {
  vec![
    Phase::new("resolve backport base", resolve_base),
    Phase::new("create backport branch", create_branch),
  ]
}

/// `<package>/<major>.<minor>.x`
pub fn branch_name(package: &str, version: &Version) -> String {
  format!("{}/{}.{}.x", package, version.major, version.minor)
}

fn resolve_base(fabrics: &mut [Fabric], ctx: &mut PhaseContext<'_>) -> RailResult<PhaseOutcome> {
  println!("🔙 Resolving backport base...");

  let [fabric] = fabrics else {
    return Err(RailError::with_help(
      format!("Backporting works on exactly one package, got {}", fabrics.len()),
      "Name the package to backport, e.g. `release-rail backport expo-camera --from-version 8.1.0`",
    ));
  };
  let Some(requested) = ctx.options.backport_version.as_deref() else {
    return Err(RailError::with_help(
      "No version to backport from",
      "Pass the published version with `--from-version`",
    ));
  };
  let version = Version::parse(requested)?;

  let name = fabric.name().to_string();
  let not_found = || {
    RailError::Registry(RegistryError::VersionNotFound {
      package: name.clone(),
      version: requested.to_string(),
    })
  };
  let view = ctx.registry.view(&name, Some(requested))?.ok_or_else(not_found)?;
  let base_commit = view.git_head.ok_or_else(|| {
    RailError::with_help(
      format!("{}@{} was published without a gitHead", name, requested),
      "Create the branch by hand from the commit that was released",
    )
  })?;

  let branch = branch_name(&name, &version);
  println!(
    "{} {}@{} was released from {}",
    style::bullet(),
    style::green(&name),
    style::cyan(requested),
    style::cyan(&base_commit)
  );

  fabric.state.backport = Some(BackportTarget {
    version: requested.to_string(),
    base_commit,
    branch,
  });
  Ok(PhaseOutcome::next())
}

fn create_branch(fabrics: &mut [Fabric], ctx: &mut PhaseContext<'_>) -> RailResult<PhaseOutcome> {
  println!("🌿 Creating backport branch...");

  for target in fabrics.iter().filter_map(|f| f.state.backport.as_ref()) {
    ctx.vcs.create_branch(&target.branch, &target.base_commit)?;
    println!(
      "✅ Created branch {} from {}",
      style::green(&target.branch),
      style::cyan(&target.base_commit)
    );
  }

  Ok(PhaseOutcome::next())
}
