//! Repository checks run before publishing or backporting

use crate::core::config::RepositoryConfig;
use crate::core::error::{RailError, RailResult, ValidationError};
use crate::release::pipeline::PhaseContext;
use crate::ui::style;
use regex::Regex;

/// Whether `branch` is a main branch or a per-package release branch
pub fn is_release_branch(branch: &str, config: &RepositoryConfig) -> RailResult<bool> {
  if config.branches.iter().any(|b| b == branch) {
    return Ok(true);
  }
  Ok(Regex::new(&config.release_branch_pattern)?.is_match(branch))
}

/// Check branch and working tree; unneeded for read-only actions or with `--skip-repo-checks`
pub fn check_repository(ctx: &mut PhaseContext<'_>) -> RailResult<()> {
  if !ctx.action.requires_repo_checks() || ctx.options.skip_repo_checks {
    return Ok(());
  }

  let branch = ctx.vcs.current_branch()?;
  if !is_release_branch(&branch, &ctx.config.repository)? {
    let expected = ctx.config.repository.branches.join(", ");
    eprintln!(
      "⚠️  It's recommended to publish from {} or a release branch, while you're at {}",
      style::cyan(expected),
      style::cyan(&branch)
    );
    let proceed = ctx.operator.confirm("Do you want to proceed?", true)?;
    println!();
    if !proceed {
      return Err(RailError::Validation(ValidationError::UnexpectedBranch { branch }));
    }
  }

  if ctx.vcs.has_unstaged_changes()? {
    return Err(RailError::Validation(ValidationError::DirtyWorkingTree));
  }

  Ok(())
}
