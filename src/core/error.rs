//! Error types for release-rail with contextual messages and exit codes
//!
//! This module provides a unified error type that categorizes errors and provides
//! contextual help messages to users. Phase failures wrap the underlying error
//! together with the index of the phase that failed, so the operator knows where
//! a `--retry` run will pick up.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for release-rail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, missing files)
  User = 1,
  /// System error (git, registry, I/O)
  System = 2,
  /// Validation failure (branch, dirty working tree)
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for release-rail
#[derive(Debug)]
pub enum RailError {
  /// Configuration errors
  Config(ConfigError),

  /// Git operation errors
  Git(GitError),

  /// Package registry errors
  Registry(RegistryError),

  /// Repository precondition errors
  Validation(ValidationError),

  /// I/O errors
  Io(io::Error),

  /// An external tool (pod, gradle wrapper, ...) exited non-zero
  Command { command: String, stderr: String },

  /// A pipeline phase failed; nothing after it was run
  Phase {
    index: usize,
    total: usize,
    name: String,
    source: Box<RailError>,
  },

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl RailError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    RailError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    RailError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Wrap an error raised while running a pipeline phase
  pub fn phase(index: usize, total: usize, name: impl Into<String>, source: RailError) -> Self {
    RailError::Phase {
      index,
      total,
      name: name.into(),
      source: Box::new(source),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      RailError::Message { message, context, help } => RailError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      RailError::Io(err) => RailError::Message {
        message: format!("{}: {}", ctx_str, err),
        context: None,
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      RailError::Config(_) => ExitCode::User,
      RailError::Git(_) => ExitCode::System,
      RailError::Registry(_) => ExitCode::System,
      RailError::Validation(_) => ExitCode::Validation,
      RailError::Io(_) => ExitCode::System,
      RailError::Command { .. } => ExitCode::System,
      RailError::Phase { source, .. } => source.exit_code(),
      RailError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      RailError::Config(e) => e.help_message(),
      RailError::Git(e) => e.help_message(),
      RailError::Registry(e) => e.help_message(),
      RailError::Validation(e) => e.help_message(),
      RailError::Phase { source, .. } => Some(
        source
          .help_message()
          .map(|h| format!("{}\nFix the problem and re-run with --retry to resume from this phase.", h))
          .unwrap_or_else(|| "Fix the problem and re-run with --retry to resume from this phase.".to_string()),
      ),
      RailError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }

  /// Standard error output of the failing subprocess, if any
  pub fn stderr(&self) -> Option<&str> {
    match self {
      RailError::Git(GitError::CommandFailed { stderr, .. }) => Some(stderr),
      RailError::Registry(RegistryError::CommandFailed { stderr, .. }) => Some(stderr),
      RailError::Command { stderr, .. } => Some(stderr),
      RailError::Phase { source, .. } => source.stderr(),
      _ => None,
    }
  }
}

impl fmt::Display for RailError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RailError::Config(e) => write!(f, "{}", e),
      RailError::Git(e) => write!(f, "{}", e),
      RailError::Registry(e) => write!(f, "{}", e),
      RailError::Validation(e) => write!(f, "{}", e),
      RailError::Io(e) => write!(f, "I/O error: {}", e),
      RailError::Command { command, .. } => write!(f, "Command failed: {}", command),
      RailError::Phase {
        index,
        total,
        name,
        source,
      } => {
        // Reported as index/last-index so the final phase reads N/N
        write!(
          f,
          "Command failed at phase {}/{} ({})\n{}",
          index,
          total.saturating_sub(1),
          name,
          source
        )
      }
      RailError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for RailError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      RailError::Io(e) => Some(e),
      RailError::Phase { source, .. } => Some(source.as_ref()),
      _ => None,
    }
  }
}

impl From<io::Error> for RailError {
  fn from(err: io::Error) -> Self {
    RailError::Io(err)
  }
}

impl From<String> for RailError {
  fn from(msg: String) -> Self {
    RailError::message(msg)
  }
}

impl From<&str> for RailError {
  fn from(msg: &str) -> Self {
    RailError::message(msg)
  }
}

impl From<toml_edit::de::Error> for RailError {
  fn from(err: toml_edit::de::Error) -> Self {
    RailError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for RailError {
  fn from(err: serde_json::Error) -> Self {
    RailError::message(format!("JSON error: {}", err))
  }
}

impl From<semver::Error> for RailError {
  fn from(err: semver::Error) -> Self {
    RailError::message(format!("Invalid version: {}", err))
  }
}

impl From<regex::Error> for RailError {
  fn from(err: regex::Error) -> Self {
    RailError::message(format!("Invalid regular expression: {}", err))
  }
}

impl From<glob::PatternError> for RailError {
  fn from(err: glob::PatternError) -> Self {
    RailError::message(format!("Invalid glob pattern: {}", err))
  }
}

impl From<std::string::FromUtf8Error> for RailError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    RailError::message(format!("UTF-8 conversion error: {}", err))
  }
}

impl From<std::path::StripPrefixError> for RailError {
  fn from(err: std::path::StripPrefixError) -> Self {
    RailError::message(format!("Path strip prefix error: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// A config value failed validation
  InvalidValue { field: String, reason: String },

  /// Package requested on the command line doesn't exist in the workspace
  PackageNotFound { name: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::InvalidValue { field, .. } => Some(format!("Check `{}` in release-rail.toml.", field)),
      ConfigError::PackageNotFound { name } => Some(format!(
        "Run `release-rail list` to see packages with unpublished changes. Is '{}' marked private?",
        name
      )),
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::InvalidValue { field, reason } => {
        write!(f, "Invalid config value for {}: {}", field, reason)
      }
      ConfigError::PackageNotFound { name } => {
        write!(f, "Package '{}' not found in the workspace", name)
      }
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  RepoNotFound { path: PathBuf },

  /// Branch operation failed
  BranchError { message: String },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::RepoNotFound { path } => Some(format!(
        "Run release-rail from inside the monorepo checkout (looked at {}).",
        path.display()
      )),
      GitError::BranchError { .. } => Some("Check `git branch --list` for an existing branch with that name.".to_string()),
      GitError::CommandFailed { .. } => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr)
      }
      GitError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
      GitError::BranchError { message } => {
        write!(f, "Branch operation failed: {}", message)
      }
    }
  }
}

/// Package registry errors
#[derive(Debug)]
pub enum RegistryError {
  /// Registry client command failed
  CommandFailed { command: String, stderr: String },

  /// Registry has no record of the requested package version
  VersionNotFound { package: String, version: String },
}

impl RegistryError {
  fn help_message(&self) -> Option<String> {
    match self {
      RegistryError::CommandFailed { stderr, .. } => {
        if stderr.contains("E401") || stderr.contains("ENEEDAUTH") {
          Some("You are not logged in to the registry. Run `npm login` first.".to_string())
        } else if stderr.contains("E403") {
          Some("Check that your account has publish rights for this package.".to_string())
        } else {
          None
        }
      }
      RegistryError::VersionNotFound { package, .. } => {
        Some(format!("List published versions with `npm view {} versions`.", package))
      }
    }
  }
}

impl fmt::Display for RegistryError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RegistryError::CommandFailed { command, stderr } => {
        write!(f, "Registry command failed: {}\n{}", command, stderr)
      }
      RegistryError::VersionNotFound { package, version } => {
        write!(f, "Version {} of {} is not published", version, package)
      }
    }
  }
}

/// Repository precondition errors
#[derive(Debug)]
pub enum ValidationError {
  /// Working tree has unstaged changes
  DirtyWorkingTree,

  /// Operator declined to continue on a non-release branch
  UnexpectedBranch { branch: String },
}

impl ValidationError {
  fn help_message(&self) -> Option<String> {
    match self {
      ValidationError::DirtyWorkingTree => {
        Some("Commit or stash your changes, or pass --skip-repo-checks if you know what you're doing.".to_string())
      }
      ValidationError::UnexpectedBranch { .. } => {
        Some("Switch to the main branch or a release branch like `my-package/1.2.x`.".to_string())
      }
    }
  }
}

impl fmt::Display for ValidationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ValidationError::DirtyWorkingTree => {
        write!(f, "Repository contains unstaged changes, please make sure to have it clear")
      }
      ValidationError::UnexpectedBranch { branch } => {
        write!(f, "Refusing to continue on branch '{}'", branch)
      }
    }
  }
}

/// Result type alias for release-rail
pub type RailResult<T> = Result<T, RailError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> RailResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> RailResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<RailError>,
{
  fn context(self, ctx: impl Into<String>) -> RailResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> RailResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &RailError) {
  if let RailError::Phase { source, .. } = error {
    eprintln!();
    eprintln!("💥 {}", error.to_string().lines().next().unwrap_or_default());
    eprintln!("💥 Error message: {}", source);
    if let Some(stderr) = error.stderr() {
      eprintln!("💥 Standard error output:\n{}", stderr);
    }
  } else {
    eprintln!("\n❌ {}\n", error);
  }

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
