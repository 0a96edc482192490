//! Release workflow engine
//!
//! - **options**: Action types and the options a run was started with
//! - **inference**: Release type suggestion and version arithmetic
//! - **fabric**: Per-package working set and its persisted state
//! - **pipeline**: Ordered phases with checkpointing between them

pub mod fabric;
pub mod inference;
pub mod options;
pub mod pipeline;

pub use fabric::{Fabric, PackageState};
pub use inference::ReleaseType;
pub use options::{ActionOptions, ActionType};
pub use pipeline::{Phase, PhaseContext, PhaseOutcome, Pipeline, RunOutcome};
