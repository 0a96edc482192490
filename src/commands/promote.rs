//! Phases of the `promote` action: move a dist-tag onto the local versions

use crate::core::error::{RailResult, ResultExt};
use crate::registry::PackageView;
use crate::release::fabric::{Fabric, PromotionCandidate};
use crate::release::pipeline::{Phase, PhaseContext, PhaseOutcome};
use crate::ui::operator::Choice;
use crate::ui::style;
use semver::Version;

pub fn phases() -> Vec<Phase> {
  vec![
    Phase::new("find packages to promote", find_to_promote),
    Phase::new("select packages to promote", select_to_promote),
    Phase::new("promote packages", promote_packages),
  ]
}

/// Work out how `target` would move for a package at `version`
pub fn promotion_candidate(view: Option<&PackageView>, version: &Version, target: &str) -> PromotionCandidate {
  let Some(view) = view else {
    return PromotionCandidate {
      dist_tag: None,
      version_to_replace: None,
      can_promote: false,
      is_degrading: false,
    };
  };

  let current = version.to_string();
  let tags = view.tags_for(&current);
  let dist_tag = if tags.contains(&target) {
    Some(target.to_string())
  } else {
    tags.first().map(|tag| tag.to_string())
  };

  let version_to_replace = view.dist_tags.get(target).cloned();
  let is_degrading = version_to_replace
    .as_deref()
    .and_then(|v| Version::parse(v).ok())
    .is_some_and(|replaced| *version < replaced);
  let can_promote = dist_tag.as_deref().is_some_and(|tag| tag != target);

  PromotionCandidate {
    dist_tag,
    version_to_replace,
    can_promote,
    is_degrading,
  }
}

fn find_to_promote(fabrics: &mut [Fabric], ctx: &mut PhaseContext<'_>) -> RailResult<PhaseOutcome> {
  println!("👀 Searching for packages to promote...");

  let target = ctx.options.promote_tag.as_str();
  for fabric in fabrics.iter_mut() {
    let candidate = promotion_candidate(fabric.view.as_ref(), &fabric.package.version, target);
    fabric.state.promotion = Some(candidate);
  }

  let promotable = fabrics
    .iter()
    .filter(|f| f.state.promotion.as_ref().is_some_and(|p| p.can_promote))
    .count();
  if promotable == 0 {
    println!("✅ No packages to promote.");
    return Ok(PhaseOutcome::Finished);
  }

  println!(
    "{} Found {} packages that can be promoted to {}",
    style::bullet(),
    style::cyan(promotable),
    style::yellow(target)
  );
  Ok(PhaseOutcome::next())
}

fn choice_label(fabric: &Fabric, candidate: &PromotionCandidate, target: &str) -> String {
  let action = if candidate.is_degrading {
    style::red("degrading")
  } else {
    style::green("promoting")
  };
  format!(
    "{} {} {} from {} to {} (replacing {})",
    style::green(fabric.name()),
    action,
    style::cyan(&fabric.package.version),
    style::yellow(candidate.dist_tag.as_deref().unwrap_or_default()),
    style::yellow(target),
    style::cyan(candidate.version_to_replace.as_deref().unwrap_or("nothing"))
  )
}

fn select_to_promote(fabrics: &mut [Fabric], ctx: &mut PhaseContext<'_>) -> RailResult<PhaseOutcome> {
  println!("👉 Selecting packages to promote...\n");

  let target = ctx.options.promote_tag.as_str();
  let mut candidates: Vec<(usize, &PromotionCandidate)> = fabrics
    .iter()
    .enumerate()
    .filter_map(|(i, f)| f.state.promotion.as_ref().filter(|p| p.can_promote).map(|p| (i, p)))
    .collect();
  // Degrading moves are listed first and start unchecked
  candidates.sort_by_key(|(_, p)| !p.is_degrading);

  let choices: Vec<Choice> = candidates
    .iter()
    .map(|(i, p)| Choice::new(choice_label(&fabrics[*i], p, target), !p.is_degrading))
    .collect();
  let picked = ctx
    .operator
    .select(&format!("Which packages do you want to promote to {}?", target), &choices)?;

  let selected: Vec<usize> = picked
    .into_iter()
    .filter_map(|choice| candidates.get(choice).map(|(i, _)| *i))
    .collect();
  println!();

  for (i, fabric) in fabrics.iter_mut().enumerate() {
    fabric.state.selected_to_promote = Some(selected.contains(&i));
  }

  if selected.is_empty() {
    println!("🤷 There is nothing chosen to be promoted.");
    return Ok(PhaseOutcome::Finished);
  }
  Ok(PhaseOutcome::next())
}

fn promote_packages(fabrics: &mut [Fabric], ctx: &mut PhaseContext<'_>) -> RailResult<PhaseOutcome> {
  let target = ctx.options.promote_tag.as_str();
  println!("🚀 Promoting packages to {} tag...", style::yellow(target));

  let mut count = 0;
  for fabric in fabrics.iter().filter(|f| f.state.is_selected_to_promote()) {
    let Some(candidate) = &fabric.state.promotion else {
      continue;
    };
    let name = fabric.name();
    let version = fabric.package.version.to_string();

    if ctx.options.dry {
      println!(
        "{} {}@{} would be tagged {} {}",
        style::bullet(),
        style::green(name),
        style::cyan(&version),
        style::yellow(target),
        style::gray("(dry run)")
      );
    } else {
      // The view is fetched at the start of every run, so a resumed run skips moves already made
      let points_at_version = |tag: &str| {
        fabric
          .view
          .as_ref()
          .is_some_and(|view| view.dist_tags.get(tag) == Some(&version))
      };

      if !points_at_version(target) {
        ctx
          .registry
          .add_tag(name, &version, target)
          .with_context(|| format!("Failed to tag {}@{} as {}", name, version, target))?;
      }
      if let Some(old_tag) = candidate.dist_tag.as_deref().filter(|tag| points_at_version(*tag)) {
        ctx
          .registry
          .remove_tag(name, old_tag)
          .with_context(|| format!("Failed to remove {} tag of {}", old_tag, name))?;
      }
      println!(
        "{} {}@{} is now {}",
        style::bullet(),
        style::green(name),
        style::cyan(&version),
        style::yellow(target)
      );
    }
    count += 1;
  }

  println!("\n✅ Successfully promoted {} packages.", count);
  Ok(PhaseOutcome::next())
}
