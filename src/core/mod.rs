//! Core engine for release-rail
//!
//! - **checkpoint**: Run identity and the resumable checkpoint store
//! - **config**: `release-rail.toml` parsing and validation
//! - **error**: Error types with contextual help messages
//! - **vcs**: Git operations abstraction (SystemGit)

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod vcs;
