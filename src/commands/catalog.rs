//! Fabric preparation: discover packages, scope them, fetch registry views

use crate::core::error::{ConfigError, RailError, RailResult, ResultExt};
use crate::release::fabric::Fabric;
use crate::release::pipeline::PhaseContext;
use crate::ui::progress::SharedProgress;
use crate::workspace::{Package, discover_packages};
use rayon::prelude::*;

/// Keep packages named on the command line (all when none) minus exclusions
pub fn scope_packages(packages: Vec<Package>, names: &[String], exclude: &[String]) -> RailResult<Vec<Package>> {
  for name in names {
    if !packages.iter().any(|p| &p.name == name) {
      return Err(RailError::Config(ConfigError::PackageNotFound { name: name.clone() }));
    }
  }

  Ok(
    packages
      .into_iter()
      .filter(|p| names.is_empty() || names.contains(&p.name))
      .filter(|p| !exclude.contains(&p.name))
      .collect(),
  )
}

/// Build one fabric per package in scope, fetching registry views in parallel
pub fn prepare_fabrics(ctx: &PhaseContext<'_>) -> RailResult<Vec<Fabric>> {
  println!("🔎 Gathering data about packages...\n");

  let packages = discover_packages(ctx.root, &ctx.config.workspace.packages)?;
  let packages = scope_packages(packages, &ctx.options.package_names, &ctx.options.exclude)?;

  let registry = ctx.registry;
  let progress = SharedProgress::new(packages.len(), "Fetching registry data");

  packages
    .into_par_iter()
    .map(|package| -> RailResult<Fabric> {
      let version = package.version.to_string();
      let view = registry
        .view(&package.name, Some(&version))
        .with_context(|| format!("Failed to fetch registry data for {}", package.name))?;
      progress.inc();
      Ok(Fabric::new(package, view))
    })
    .collect()
}
