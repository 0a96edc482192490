//! Phases of the `publish` and `list` actions

use crate::core::error::{RailResult, ResultExt};
use crate::core::vcs::{CommitRange, Vcs};
use crate::native;
use crate::release::fabric::{Fabric, IntegrityCheck, UnpublishedChanges};
use crate::release::inference;
use crate::release::pipeline::{Phase, PhaseContext, PhaseOutcome};
use crate::ui::style;
use crate::workspace::update_fields;
use chrono::Local;
use rayon::prelude::*;
use std::fs;
use std::path::PathBuf;

const LATEST_TAG: &str = "latest";
const PRERELEASE_TAG: &str = "next";

pub fn phases() -> Vec<Phase> {
  vec![
    Phase::new("check packages integrity", check_integrity),
    Phase::new("find unpublished packages", find_unpublished),
    Phase::new("select packages to publish", select_to_publish),
    Phase::new("update versions", update_versions),
    Phase::new("update bundled versions", update_bundled_versions),
    Phase::new("update Android projects", update_android_projects),
    Phase::new("update iOS projects", update_ios_projects),
    Phase::new("cut off changelogs", cut_off_changelogs),
    Phase::new("commit changes", commit_changes),
    Phase::new("publish packages", publish_packages),
  ]
}

pub fn list_phases() -> Vec<Phase> {
  vec![
    Phase::new("find unpublished packages", find_unpublished),
    Phase::new("list unpublished packages", list_unpublished),
  ]
}

fn short(hash: &str) -> &str {
  hash.get(..7).unwrap_or(hash)
}

/// Dist-tag a release version goes out under
pub fn dist_tag_for(version: &semver::Version) -> &'static str {
  if version.pre.is_empty() { LATEST_TAG } else { PRERELEASE_TAG }
}

/// Compare the local package against its registry snapshot
pub fn integrity_of(fabric: &Fabric) -> RailResult<IntegrityCheck> {
  let Some(view) = &fabric.view else {
    return Ok(IntegrityCheck {
      integral: true,
      git_head_mismatch: false,
      version_mismatch: false,
    });
  };

  let git_head_mismatch = fabric.package.git_head != view.git_head;
  let version_mismatch = fabric
    .changelog
    .last_published_version()?
    .is_some_and(|version| version != view.version);

  Ok(IntegrityCheck {
    integral: !git_head_mismatch && !version_mismatch,
    git_head_mismatch,
    version_mismatch,
  })
}

fn check_integrity(fabrics: &mut [Fabric], _ctx: &mut PhaseContext<'_>) -> RailResult<PhaseOutcome> {
  println!("👁  Checking packages integrity...");

  let mut issues = 0;
  for fabric in fabrics.iter_mut() {
    let check = integrity_of(fabric)?;
    if let (false, Some(view)) = (check.integral, &fabric.view) {
      issues += 1;
      if check.git_head_mismatch {
        eprintln!(
          "⚠️  {}: gitHead {} differs from the registry's {}",
          style::green(fabric.name()),
          style::cyan(fabric.package.git_head.as_deref().unwrap_or("(none)")),
          style::cyan(view.git_head.as_deref().unwrap_or("(none)"))
        );
      }
      if check.version_mismatch {
        eprintln!(
          "⚠️  {}: changelog's last release doesn't match published version {}",
          style::green(fabric.name()),
          style::cyan(&view.version)
        );
      }
    }
    fabric.state.integrity = Some(check);
  }

  if issues == 0 {
    println!("{} All packages are integral", style::bullet());
  }
  Ok(PhaseOutcome::next())
}

/// Collect commits, file changes and changelog entries since the last release
///
/// The oldest commit after `gitHead` is the release commit that recorded it,
/// so it's left out of both logs.
pub fn find_changes(
  fabric: &Fabric,
  vcs: &dyn Vcs,
  head: &str,
  prerelease_id: Option<&str>,
  native_dirs: &[String],
) -> RailResult<UnpublishedChanges> {
  let package = &fabric.package;
  let mut logs = vcs.log(&package.path, &CommitRange::new(package.git_head.clone(), head))?;

  let file_logs = match &package.git_head {
    Some(_) => match logs.pop() {
      Some(release_commit) if !logs.is_empty() => {
        vcs.file_log(&package.path, &CommitRange::new(Some(release_commit.hash), head))?
      }
      _ => Vec::new(),
    },
    None if logs.is_empty() => Vec::new(),
    None => vcs.file_log(&package.path, &CommitRange::new(None, head))?,
  };

  let changelog_changes = fabric.changelog.changes()?;
  let has_unpublished_changes = !logs.is_empty() || !changelog_changes.is_empty();
  let release_type = inference::infer(
    &package.version,
    &file_logs,
    &changelog_changes,
    prerelease_id,
    native_dirs,
  );
  let release_version = release_type.apply(&package.version, prerelease_id)?;

  Ok(UnpublishedChanges {
    logs,
    file_logs,
    changelog_changes,
    has_unpublished_changes,
    release_type,
    release_version,
  })
}

fn find_unpublished(fabrics: &mut [Fabric], ctx: &mut PhaseContext<'_>) -> RailResult<PhaseOutcome> {
  println!("👀 Searching for packages with unpublished changes...");

  let vcs = ctx.vcs;
  let head = ctx.head.as_str();
  let prerelease_id = ctx.options.prerelease.as_deref();
  let native_dirs = &ctx.config.native.directories;

  let results: Vec<RailResult<UnpublishedChanges>> = fabrics
    .par_iter()
    .map(|fabric| {
      find_changes(fabric, vcs, head, prerelease_id, native_dirs)
        .with_context(|| format!("Failed to find changes of {}", fabric.name()))
    })
    .collect();

  for (fabric, result) in fabrics.iter_mut().zip(results) {
    fabric.state.changes = Some(result?);
  }

  let count = fabrics.iter().filter(|f| f.state.has_unpublished_changes()).count();
  if count == 0 {
    println!("✅ All packages are up-to-date.");
    return Ok(PhaseOutcome::Finished);
  }

  println!("{} Found {} packages with unpublished changes", style::bullet(), style::cyan(count));
  Ok(PhaseOutcome::next())
}

/// Print commits, changelog entries, file changes and the suggested bump
pub fn print_summary(fabric: &Fabric) {
  let Some(changes) = &fabric.state.changes else {
    return;
  };
  let package = &fabric.package;

  println!(
    "📦 {} has some changes since {}",
    style::green(&package.name),
    style::cyan(&package.version)
  );

  if !changes.logs.is_empty() {
    println!("{} New commits:", style::bullet());
    for log in &changes.logs {
      println!(
        "   - {} {} {}",
        style::gray(short(&log.hash)),
        log.title,
        style::gray(format!("by {}", log.author_name))
      );
    }
  }

  for (kind, entries) in &changes.changelog_changes.entries {
    if entries.is_empty() {
      continue;
    }
    println!("{} {} from the changelog:", style::bullet(), style::magenta(kind));
    for entry in entries {
      println!("   - {}", entry);
    }
  }

  if !changes.file_logs.is_empty() {
    println!("{} File changes:", style::bullet());
    for file in &changes.file_logs {
      println!("   - {} {}", style::gray(file.status.as_str()), file.relative_path);
    }
  }

  println!(
    "{} Suggested {} upgrade from {} to {}",
    style::bullet(),
    style::magenta(&changes.release_type),
    style::cyan(&package.version),
    style::cyan(&changes.release_version)
  );
  println!();
}

fn list_unpublished(fabrics: &mut [Fabric], _ctx: &mut PhaseContext<'_>) -> RailResult<PhaseOutcome> {
  println!("🧩 Unpublished packages:\n");
  for fabric in fabrics.iter().filter(|f| f.state.has_unpublished_changes()) {
    print_summary(fabric);
  }
  Ok(PhaseOutcome::next())
}

fn select_to_publish(fabrics: &mut [Fabric], ctx: &mut PhaseContext<'_>) -> RailResult<PhaseOutcome> {
  println!("👉 Selecting packages to publish...\n");

  for fabric in fabrics.iter_mut() {
    let Some(version) = fabric.state.release_version().filter(|_| fabric.state.has_unpublished_changes()) else {
      fabric.state.selected_to_publish = Some(false);
      continue;
    };

    print_summary(fabric);
    let question = format!(
      "Do you want to publish {} as version {}?",
      style::green(fabric.name()),
      style::cyan(version)
    );
    let selected = ctx.operator.confirm(&question, true)?;
    println!();
    fabric.state.selected_to_publish = Some(selected);
  }

  if !fabrics.iter().any(|f| f.state.is_selected_to_publish()) {
    println!("🤷 There is nothing chosen to be published.");
    return Ok(PhaseOutcome::Finished);
  }
  Ok(PhaseOutcome::next())
}

/// Selected fabrics paired with their release version
fn selected(fabrics: &[Fabric]) -> impl Iterator<Item = (&Fabric, &semver::Version)> {
  fabrics.iter().filter(|f| f.state.is_selected_to_publish()).filter_map(|f| {
    let version = f.state.release_version()?;
    Some((f, version))
  })
}

fn update_versions(fabrics: &mut [Fabric], ctx: &mut PhaseContext<'_>) -> RailResult<PhaseOutcome> {
  println!("📦 Updating versions...");

  let mut paths = Vec::new();
  for (fabric, version) in selected(fabrics) {
    let git_head = fabric
      .state
      .changes
      .as_ref()
      .and_then(|c| c.logs.first())
      .map(|log| log.hash.as_str())
      .or(fabric.package.git_head.as_deref())
      .unwrap_or(&ctx.head);

    let manifest = fabric.package.manifest_path();
    let version_field = version.to_string();
    update_fields(&manifest, &[("version", version_field.as_str()), ("gitHead", git_head)])?;
    println!(
      "{} {}: version {}, gitHead {}",
      style::bullet(),
      style::green(fabric.name()),
      style::cyan(version),
      style::cyan(short(git_head))
    );
    paths.push(manifest);
  }

  Ok(PhaseOutcome::Continue(paths))
}

fn update_bundled_versions(fabrics: &mut [Fabric], ctx: &mut PhaseContext<'_>) -> RailResult<PhaseOutcome> {
  println!("🧰 Updating bundled native module versions...");

  let Some(relative) = &ctx.config.native.bundled_versions else {
    println!("{} No bundled versions file configured", style::bullet());
    return Ok(PhaseOutcome::next());
  };
  let path = ctx.root.join(relative);

  let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
  let mut versions: serde_json::Map<String, serde_json::Value> =
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;

  for (fabric, version) in selected(fabrics) {
    versions.insert(
      fabric.name().to_string(),
      serde_json::Value::String(format!("~{}", version)),
    );
    println!("{} {}: ~{}", style::bullet(), style::green(fabric.name()), version);
  }

  let mut output = serde_json::to_string_pretty(&versions)?;
  output.push('\n');
  fs::write(&path, output).with_context(|| format!("Failed to write {}", path.display()))?;

  Ok(PhaseOutcome::Continue(vec![path]))
}

fn update_android_projects(fabrics: &mut [Fabric], _ctx: &mut PhaseContext<'_>) -> RailResult<PhaseOutcome> {
  println!("🤖 Updating Android projects...");

  let mut paths = Vec::new();
  for (fabric, version) in selected(fabrics) {
    let gradle = fabric.package.build_gradle_path();
    if native::update_build_gradle(&gradle, &version.to_string())? {
      println!("{} {}: {}", style::bullet(), style::green(fabric.name()), gradle.display());
      paths.push(gradle);
    }
  }

  Ok(PhaseOutcome::Continue(paths))
}

fn update_ios_projects(fabrics: &mut [Fabric], ctx: &mut PhaseContext<'_>) -> RailResult<PhaseOutcome> {
  println!("🍎 Updating iOS projects...");

  let native = &ctx.config.native;
  let Some(ios_dir) = native.ios_dir.as_ref().filter(|_| native.pod_update) else {
    println!("{} Pod updates are disabled", style::bullet());
    return Ok(PhaseOutcome::next());
  };

  let pods: Vec<String> = selected(fabrics)
    .filter_map(|(fabric, _)| fabric.package.podspec_name.clone())
    .collect();
  if pods.is_empty() {
    println!("{} No pods to update", style::bullet());
    return Ok(PhaseOutcome::next());
  }

  let ios_dir = ctx.root.join(ios_dir);
  println!("{} Updating pods: {}", style::bullet(), style::green(pods.join(", ")));
  native::pod_update(&native.pod_command, &ios_dir, &pods)?;

  let paths: Vec<PathBuf> = ["Pods", "Podfile.lock"]
    .into_iter()
    .map(|name| ios_dir.join(name))
    .filter(|path| path.exists())
    .collect();
  Ok(PhaseOutcome::Continue(paths))
}

fn cut_off_changelogs(fabrics: &mut [Fabric], _ctx: &mut PhaseContext<'_>) -> RailResult<PhaseOutcome> {
  println!("✂️  Cutting off changelogs...");

  let date = Local::now().format("%Y-%m-%d").to_string();
  let mut paths = Vec::new();
  for (fabric, version) in selected(fabrics) {
    if !version.pre.is_empty() {
      println!(
        "{} {}: skipped for prerelease {}",
        style::bullet(),
        style::green(fabric.name()),
        style::cyan(version)
      );
      continue;
    }

    fabric.changelog.cut_off(&version.to_string(), &date)?;
    println!("{} {}: {}", style::bullet(), style::green(fabric.name()), style::cyan(version));
    paths.push(fabric.changelog.path().to_path_buf());
  }

  Ok(PhaseOutcome::Continue(paths))
}

/// Commit message paragraphs: the title, then one `name@version` line per package
pub fn commit_messages(title: &str, fabrics: &[Fabric]) -> Vec<String> {
  let releases: Vec<String> = selected(fabrics)
    .map(|(fabric, version)| format!("{}@{}", fabric.name(), version))
    .collect();
  vec![title.to_string(), releases.join("\n")]
}

fn commit_changes(fabrics: &mut [Fabric], ctx: &mut PhaseContext<'_>) -> RailResult<PhaseOutcome> {
  println!("📼 Committing changes...");

  let messages = commit_messages(&ctx.options.commit_message, fabrics);
  ctx.vcs.commit(&messages)?;
  println!("{} {}", style::bullet(), messages.join("\n   "));

  Ok(PhaseOutcome::next())
}

fn publish_packages(fabrics: &mut [Fabric], ctx: &mut PhaseContext<'_>) -> RailResult<PhaseOutcome> {
  println!("🚀 Publishing packages...");

  let mut count = 0;
  for (fabric, version) in selected(fabrics) {
    let tag = dist_tag_for(version);
    let release = format!("{}@{}", fabric.name(), version);

    if ctx.options.dry {
      println!(
        "{} {} would be published under {} {}",
        style::bullet(),
        style::green(&release),
        style::cyan(tag),
        style::gray("(dry run)")
      );
    } else {
      ctx
        .registry
        .publish(&fabric.package.path, tag)
        .with_context(|| format!("Failed to publish {}", release))?;
      println!("{} Published {} under {}", style::bullet(), style::green(&release), style::cyan(tag));
    }
    count += 1;
  }

  println!("\n✅ Successfully published {} packages.", count);
  Ok(PhaseOutcome::next())
}
