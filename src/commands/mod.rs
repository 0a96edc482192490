//! CLI actions for release-rail
//!
//! - **publish**: Integrity check through `npm publish`, plus the `list` phases
//! - **promote**: Move a dist-tag onto the local versions
//! - **backport**: Branch off a published version
//! - **preconditions**: Branch and working tree checks
//! - **catalog**: Package discovery and registry snapshots
//!
//! Every action runs through the same [`Pipeline`], so any of them can be
//! resumed with `--retry` after a failure.

pub mod backport;
pub mod catalog;
pub mod preconditions;
pub mod promote;
pub mod publish;

use crate::core::checkpoint::CheckpointStore;
use crate::core::config::RailConfig;
use crate::core::error::RailResult;
use crate::core::vcs::SystemGit;
use crate::registry::NpmRegistry;
use crate::release::options::{ActionOptions, ActionType};
use crate::release::pipeline::{Phase, PhaseContext, Pipeline, RunOutcome};
use crate::ui::operator::{AssumeDefaults, Operator, TerminalOperator};
use crate::ui::style;
use std::path::Path;

/// Phases an action runs, in order
pub fn phases_for(action: ActionType) -> Vec<Phase> {
  match action {
    ActionType::Publish => publish::phases(),
    ActionType::List => publish::list_phases(),
    ActionType::Promote => promote::phases(),
    ActionType::Backport => backport::phases(),
  }
}

/// Check preconditions, prepare fabrics and run the pipeline
pub fn execute(pipeline: &mut Pipeline, ctx: &mut PhaseContext<'_>) -> RailResult<RunOutcome> {
  pipeline.begin_preparing();

  let prepared = preconditions::check_repository(ctx).and_then(|()| catalog::prepare_fabrics(ctx));
  let mut fabrics = match prepared {
    Ok(fabrics) => fabrics,
    Err(e) => {
      pipeline.abort();
      return Err(e);
    }
  };

  pipeline.run(&mut fabrics, ctx)
}

/// Run an action in the repository containing `cwd`
pub fn run_action(action: ActionType, options: ActionOptions, cwd: &Path) -> RailResult<()> {
  let git = SystemGit::open(cwd)?;
  let root = git.work_tree().to_path_buf();
  let config = RailConfig::load(&root)?;
  let registry = NpmRegistry::new(config.registry.command.clone());

  let mut operator: Box<dyn Operator> = if options.assume_yes {
    Box::new(AssumeDefaults)
  } else {
    Box::new(TerminalOperator::stdin())
  };

  let store = CheckpointStore::new(root.join(&config.checkpoint.path));
  let mut pipeline = Pipeline::new(action, phases_for(action), store, config.checkpoint.expiration());
  let mut ctx = PhaseContext::new(
    action,
    &options,
    &config,
    &root,
    &git,
    &registry,
    operator.as_mut(),
  );

  if options.dry {
    println!("{}\n", style::yellow("Dry run: nothing will be sent to the registry"));
  }

  match execute(&mut pipeline, &mut ctx)? {
    RunOutcome::Completed => println!("✅ Finished {}.", style::green(action)),
    RunOutcome::NothingToDo { phase } => println!("{} Stopped after {}", style::bullet(), phase),
  }

  Ok(())
}
