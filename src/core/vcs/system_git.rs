//! System git backend
//!
//! Every operation is a `git` subprocess run in an isolated environment
//! (see [`SystemGit::git_cmd`]). Output is parsed from fixed formats using
//! ASCII unit/record separators so commit titles can contain anything.

use super::{CommitLog, CommitRange, EMPTY_TREE, FileLog, FileStatus, Vcs};
use crate::core::error::{GitError, RailError, RailResult, ResultExt};
use crate::utils::{path_to_git_format, relative_to};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const FIELD_SEP: char = '\x1f';
const RECORD_SEP: char = '\x1e';

/// Git backend using system git
pub struct SystemGit {
  /// Repository working directory
  pub(crate) repo_path: PathBuf,

  /// Working tree root
  pub(crate) work_tree: PathBuf,
}

impl SystemGit {
  /// Open a git repository
  ///
  /// This performs ONE subprocess call to get the repository metadata.
  pub fn open(path: &Path) -> RailResult<Self> {
    let output = Command::new("git")
      .arg("-C")
      .arg(path)
      .args(["rev-parse", "--show-toplevel"])
      .output()
      .context("Failed to execute git rev-parse")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") {
        return Err(RailError::Git(GitError::RepoNotFound {
          path: path.to_path_buf(),
        }));
      }
      return Err(RailError::message(format!("Failed to open git repository: {}", stderr)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let work_tree = stdout.trim();

    // Pathspecs are built relative to the work tree, so commands run from there
    Ok(Self {
      repo_path: PathBuf::from(work_tree),
      work_tree: PathBuf::from(work_tree),
    })
  }

  /// Working tree root as reported by git
  pub fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Sets working directory to repo path
  /// - Clears environment variables
  /// - Whitelists only PATH and HOME
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    cmd.arg("-C").arg(&self.repo_path);

    // Isolated environment (don't trust global config)
    cmd.env_clear();
    if let Ok(path) = std::env::var("PATH") {
      cmd.env("PATH", path);
    }
    if let Ok(home) = std::env::var("HOME") {
      cmd.env("HOME", home);
    }

    cmd.arg("-c").arg("advice.detachedHead=false");
    cmd.arg("-c").arg("core.quotePath=false"); // Don't escape non-ASCII

    cmd
  }

  /// Run a git command and fail with its stderr on non-zero exit
  fn run_checked(&self, cmd: &mut Command, label: &str) -> RailResult<Output> {
    let output = cmd.output().with_context(|| format!("Failed to execute {}", label))?;

    if !output.status.success() {
      return Err(RailError::Git(GitError::CommandFailed {
        command: label.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      }));
    }

    Ok(output)
  }

  /// Pathspec for `path`, relative to the working tree
  fn pathspec(&self, path: &Path) -> String {
    let rel = relative_to(&self.work_tree, path);
    let spec = path_to_git_format(&rel);
    if spec.is_empty() { ".".to_string() } else { spec }
  }
}

impl Vcs for SystemGit {
  fn current_branch(&self) -> RailResult<String> {
    let output = self
      .git_cmd()
      .args(["rev-parse", "--abbrev-ref", "HEAD"])
      .output()
      .context("Failed to get current branch")?;

    if !output.status.success() {
      return Ok("HEAD".to_string()); // Detached HEAD
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  fn head_commit(&self) -> RailResult<String> {
    let output = self.run_checked(self.git_cmd().args(["rev-parse", "HEAD"]), "git rev-parse HEAD")?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  fn log(&self, path: &Path, range: &CommitRange) -> RailResult<Vec<CommitLog>> {
    let format = format!(
      "--format=%H{sep}%P{sep}%an{sep}%ae{sep}%aI{sep}%ar{sep}%s{rec}",
      sep = "%x1f",
      rec = "%x1e"
    );
    let pathspec = self.pathspec(path);

    let output = self.run_checked(
      self
        .git_cmd()
        .args(["log", &format, &range.log_spec(), "--"])
        .arg(&pathspec),
      "git log",
    )?;

    Ok(parse_log(&String::from_utf8_lossy(&output.stdout)))
  }

  fn file_log(&self, path: &Path, range: &CommitRange) -> RailResult<Vec<FileLog>> {
    let pathspec = self.pathspec(path);
    let from = range.from.as_deref().unwrap_or(EMPTY_TREE);

    let mut cmd = self.git_cmd();
    cmd.args(["diff", "--name-status", "--find-renames", "--find-copies"]);
    cmd.args([from, range.to.as_str(), "--"]).arg(&pathspec);

    let output = self.run_checked(&mut cmd, "git diff --name-status")?;
    Ok(parse_name_status(&String::from_utf8_lossy(&output.stdout), &pathspec))
  }

  fn stage(&self, paths: &[PathBuf]) -> RailResult<()> {
    if paths.is_empty() {
      return Ok(());
    }

    let mut cmd = self.git_cmd();
    cmd.args(["add", "--"]);
    for path in paths {
      cmd.arg(self.pathspec(path));
    }

    self.run_checked(&mut cmd, "git add")?;
    Ok(())
  }

  fn commit(&self, messages: &[String]) -> RailResult<()> {
    let mut cmd = self.git_cmd();
    cmd.arg("commit");
    for message in messages {
      cmd.arg("-m").arg(message);
    }

    self.run_checked(&mut cmd, "git commit")?;
    Ok(())
  }

  fn has_unstaged_changes(&self) -> RailResult<bool> {
    let output = self
      .git_cmd()
      .args(["diff", "--quiet"])
      .output()
      .context("Failed to execute git diff --quiet")?;

    match output.status.code() {
      Some(0) => Ok(false),
      Some(1) => Ok(true),
      _ => Err(RailError::Git(GitError::CommandFailed {
        command: "git diff --quiet".to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      })),
    }
  }

  fn create_branch(&self, name: &str, from: &str) -> RailResult<()> {
    let output = self
      .git_cmd()
      .args(["checkout", "-b", name, from])
      .output()
      .context("Failed to execute git checkout -b")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("already exists") {
        return Err(RailError::Git(GitError::BranchError {
          message: format!("branch '{}' already exists", name),
        }));
      }
      return Err(RailError::Git(GitError::CommandFailed {
        command: format!("git checkout -b {} {}", name, from),
        stderr: stderr.trim().to_string(),
      }));
    }

    Ok(())
  }
}

fn parse_log(stdout: &str) -> Vec<CommitLog> {
  stdout
    .split(RECORD_SEP)
    .map(str::trim)
    .filter(|record| !record.is_empty())
    .filter_map(|record| {
      let fields: Vec<&str> = record.split(FIELD_SEP).collect();
      if fields.len() < 7 {
        return None;
      }
      Some(CommitLog {
        hash: fields[0].to_string(),
        parent: fields[1].split_whitespace().next().map(str::to_string),
        author_name: fields[2].to_string(),
        author_email: fields[3].to_string(),
        author_date: fields[4].to_string(),
        relative_date: fields[5].to_string(),
        title: fields[6..].join(" "),
      })
    })
    .collect()
}

/// Parse `git diff --name-status` with repo-root paths; `package_spec` is the package pathspec
///
/// Renames and copies print `R100\told\tnew`; the new path is kept.
fn parse_name_status(stdout: &str, package_spec: &str) -> Vec<FileLog> {
  let prefix = format!("{}/", package_spec);
  stdout
    .lines()
    .filter_map(|line| {
      let mut fields = line.split('\t');
      let status = fields.next()?;
      let path = fields.last()?.trim();
      let relative_path = match package_spec {
        "." => path,
        _ => path.strip_prefix(&prefix).unwrap_or(path),
      };
      Some(FileLog {
        path: path.to_string(),
        relative_path: relative_path.to_string(),
        status: FileStatus::from_letter(status),
      })
    })
    .collect()
}
