//! Phase pipeline
//!
//! An action is an ordered list of [`Phase`]s run over every package's
//! [`Fabric`]. After each phase the paths it returned are staged and a
//! checkpoint is written, so a failed run can be resumed with `--retry`
//! from the first phase that didn't complete.
//!
//! ```text
//! Idle ─▶ Preparing ─▶ Running(0) ─▶ … ─▶ Running(n) ─▶ Completed
//!             │             │
//!             ▼             ▼
//!          Aborted      Failed(i)
//! ```
//!
//! There is no rollback: side effects of completed phases stay in place and
//! the checkpoint records exactly which phases completed.

use crate::core::checkpoint::{Checkpoint, CheckpointStore, RunId};
use crate::core::config::RailConfig;
use crate::core::error::{RailError, RailResult};
use crate::core::vcs::Vcs;
use crate::registry::Registry;
use crate::release::fabric::Fabric;
use crate::release::options::{ActionOptions, ActionType};
use crate::ui::operator::Operator;
use crate::ui::style;
use chrono::{Duration, Local, Utc};
use std::path::{Path, PathBuf};

/// What a phase asks the pipeline to do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseOutcome {
  /// Stage these paths and go on with the next phase
  Continue(Vec<PathBuf>),
  /// Nothing left to do; end the run successfully
  Finished,
}

impl PhaseOutcome {
  /// Continue without staging anything
  pub fn next() -> Self {
    PhaseOutcome::Continue(Vec::new())
  }
}

/// Services and options available to every phase
pub struct PhaseContext<'a> {
  pub action: ActionType,
  pub options: &'a ActionOptions,
  pub config: &'a RailConfig,
  /// Repository root
  pub root: &'a Path,
  /// Head commit when the run started; set by the pipeline
  pub head: String,
  pub vcs: &'a dyn Vcs,
  pub registry: &'a dyn Registry,
  pub operator: &'a mut dyn Operator,
}

impl<'a> PhaseContext<'a> {
  pub fn new(
    action: ActionType,
    options: &'a ActionOptions,
    config: &'a RailConfig,
    root: &'a Path,
    vcs: &'a dyn Vcs,
    registry: &'a dyn Registry,
    operator: &'a mut dyn Operator,
  ) -> Self {
    Self {
      action,
      options,
      config,
      root,
      head: String::new(),
      vcs,
      registry,
      operator,
    }
  }
}

type PhaseFn = Box<dyn Fn(&mut [Fabric], &mut PhaseContext<'_>) -> RailResult<PhaseOutcome>>;

/// A named step of an action
pub struct Phase {
  pub name: &'static str,
  run: PhaseFn,
}

impl Phase {
  pub fn new<F>(name: &'static str, run: F) -> Self
  where
    F: Fn(&mut [Fabric], &mut PhaseContext<'_>) -> RailResult<PhaseOutcome> + 'static,
  {
    Self {
      name,
      run: Box::new(run),
    }
  }
}

/// Lifecycle of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
  Idle,
  Preparing,
  Running(usize),
  Completed,
  Aborted,
  Failed(usize),
}

/// How a successful run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
  /// Every phase ran
  Completed,
  /// A phase found nothing to do
  NothingToDo { phase: &'static str },
}

pub struct Pipeline {
  action: ActionType,
  phases: Vec<Phase>,
  store: CheckpointStore,
  expiration: Duration,
  status: PipelineStatus,
}

impl Pipeline {
  pub fn new(action: ActionType, phases: Vec<Phase>, store: CheckpointStore, expiration: Duration) -> Self {
    Self {
      action,
      phases,
      store,
      expiration,
      status: PipelineStatus::Idle,
    }
  }

  pub fn status(&self) -> PipelineStatus {
    self.status
  }

  pub fn phase_names(&self) -> Vec<&'static str> {
    self.phases.iter().map(|p| p.name).collect()
  }

  /// Mark the start of preconditions and fabric preparation
  pub fn begin_preparing(&mut self) {
    self.status = PipelineStatus::Preparing;
  }

  /// Stop before any phase ran (declined precondition)
  pub fn abort(&mut self) {
    self.status = PipelineStatus::Aborted;
  }

  /// Run phases from the checkpoint (or from the start) to the end
  pub fn run(&mut self, fabrics: &mut [Fabric], ctx: &mut PhaseContext<'_>) -> RailResult<RunOutcome> {
    self.status = PipelineStatus::Preparing;
    ctx.head = ctx.vcs.head_commit()?;

    let (start, run_id) = self.resume_point(fabrics, ctx)?;
    let total = self.phases.len();

    for index in start..total {
      self.status = PipelineStatus::Running(index);
      let phase = &self.phases[index];

      let outcome = match (phase.run)(fabrics, ctx) {
        Ok(outcome) => outcome,
        Err(e) => {
          self.status = PipelineStatus::Failed(index);
          return Err(RailError::phase(index, total, phase.name, e));
        }
      };

      let paths = match outcome {
        PhaseOutcome::Finished => {
          self.store.invalidate()?;
          self.status = PipelineStatus::Completed;
          return Ok(RunOutcome::NothingToDo { phase: phase.name });
        }
        PhaseOutcome::Continue(paths) => paths,
      };

      if let Err(e) = ctx.vcs.stage(&paths) {
        self.status = PipelineStatus::Failed(index);
        return Err(RailError::phase(index, total, phase.name, e));
      }

      println!();

      if let Err(e) = self.save(index + 1, &run_id, fabrics, ctx) {
        self.status = PipelineStatus::Failed(index);
        return Err(RailError::phase(index, total, phase.name, e));
      }
    }

    self.store.invalidate()?;
    self.status = PipelineStatus::Completed;
    Ok(RunOutcome::Completed)
  }

  fn save(&self, next_phase: usize, run_id: &RunId, fabrics: &[Fabric], ctx: &PhaseContext<'_>) -> RailResult<()> {
    // Phases may commit; a resumed run compares against the head as of this save
    let head = ctx.vcs.head_commit()?;
    let checkpoint = Checkpoint::capture(
      run_id.clone(),
      self.action,
      head,
      next_phase,
      ctx.options.fingerprint(),
      fabrics,
    );
    self.store.save(&checkpoint)
  }

  /// Decide which phase to start from, restoring state when resuming
  fn resume_point(&self, fabrics: &mut [Fabric], ctx: &mut PhaseContext<'_>) -> RailResult<(usize, RunId)> {
    let fresh = || (0, RunId::new(self.action, &ctx.head, Utc::now()));

    let checkpoint = match self.store.load() {
      Ok(Some(checkpoint)) => checkpoint,
      Ok(None) => return Ok(fresh()),
      Err(e) => {
        eprintln!("⚠️  Ignoring unreadable checkpoint: {}\n", e);
        return Ok(fresh());
      }
    };

    let fingerprint = ctx.options.fingerprint();
    if let Err(reason) =
      checkpoint.validate(self.action, &ctx.head, &fingerprint, self.expiration, Utc::now())
    {
      eprintln!("⚠️  Found a checkpoint but {}. Continuing from scratch...\n", reason);
      return Ok(fresh());
    }

    let saved_on = checkpoint
      .timestamp
      .with_timezone(&Local)
      .format("%Y-%m-%d %H:%M:%S")
      .to_string();

    if !ctx.options.retry {
      let question = format!(
        "Found a checkpoint from {} at phase {}/{}. Would you like to resume?",
        style::magenta(&saved_on),
        checkpoint.phase_index,
        self.phases.len().saturating_sub(1)
      );
      let resume = ctx.operator.confirm(&question, true)?;
      println!();
      if !resume {
        return Ok(fresh());
      }
    }

    println!(
      "♻️  Restoring run {} from checkpoint saved on {}...\n",
      style::cyan(&checkpoint.run_id),
      style::magenta(&saved_on)
    );

    let report = checkpoint.restore_into(fabrics);
    for name in &report.dropped {
      eprintln!(
        "⚠️  {} is in the checkpoint but not part of this run; its saved state is dropped",
        style::green(name)
      );
    }
    for name in &report.fresh {
      eprintln!(
        "⚠️  {} has no saved state; it will be skipped by the remaining phases",
        style::green(name)
      );
    }

    Ok((checkpoint.phase_index, checkpoint.run_id))
  }
}
