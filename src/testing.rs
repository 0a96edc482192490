//! In-memory collaborators for unit tests

use crate::core::checkpoint::CheckpointStore;
use crate::core::config::RailConfig;
use crate::core::error::{GitError, RailError, RailResult, RegistryError};
use crate::core::vcs::{CommitLog, CommitRange, FileLog, FileStatus, Vcs};
use crate::registry::{PackageView, Registry};
use crate::release::fabric::Fabric;
use crate::release::options::{ActionOptions, ActionType};
use crate::release::pipeline::PhaseContext;
use crate::ui::operator::{Choice, Operator};
use crate::workspace::Package;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

pub const HEAD: &str = "0000000000000000000000000000000000000001";

/// Package rooted at a path that doesn't exist (empty changelog, no native dirs)
pub fn package(name: &str, version: &str) -> Package {
  package_at(Path::new("/nonexistent/monorepo"), name, version)
}

pub fn package_at(root: &Path, name: &str, version: &str) -> Package {
  let relative_path = PathBuf::from("packages").join(name);
  Package {
    name: name.to_string(),
    version: semver::Version::parse(version).unwrap(),
    git_head: None,
    path: root.join(&relative_path),
    relative_path,
    podspec_name: None,
  }
}

pub fn fabric(name: &str, version: &str) -> Fabric {
  Fabric::new(package(name, version), None)
}

pub fn view(name: &str, version: &str, tags: &[(&str, &str)], git_head: Option<&str>) -> PackageView {
  PackageView {
    name: name.to_string(),
    version: version.to_string(),
    dist_tags: tags.iter().map(|(t, v)| (t.to_string(), v.to_string())).collect(),
    versions: vec![version.to_string()],
    git_head: git_head.map(str::to_string),
  }
}

pub fn commit(hash: &str, title: &str) -> CommitLog {
  CommitLog {
    hash: hash.to_string(),
    parent: None,
    title: title.to_string(),
    author_name: "Test User".to_string(),
    author_email: "test@example.com".to_string(),
    author_date: "2024-01-01T00:00:00+00:00".to_string(),
    relative_date: "2 days ago".to_string(),
  }
}

/// Modified file, `path` relative to a package at `packages/<pkg>`
pub fn changed(path: &str) -> FileLog {
  FileLog {
    path: format!("packages/pkg/{}", path),
    relative_path: path.to_string(),
    status: FileStatus::Modified,
  }
}

/// Scriptable [`Vcs`]; history is keyed by package path
pub struct FakeVcs {
  pub branch: String,
  head: Mutex<String>,
  pub logs: HashMap<PathBuf, Vec<CommitLog>>,
  pub file_logs: HashMap<PathBuf, Vec<FileLog>>,
  pub unstaged_changes: bool,
  pub fail_stage: bool,
  staged: Mutex<Vec<PathBuf>>,
  commits: Mutex<Vec<Vec<String>>>,
  branches: Mutex<Vec<(String, String)>>,
  ranges: Mutex<Vec<CommitRange>>,
}

impl Default for FakeVcs {
  fn default() -> Self {
    Self {
      branch: "main".to_string(),
      head: Mutex::new(HEAD.to_string()),
      logs: HashMap::new(),
      file_logs: HashMap::new(),
      unstaged_changes: false,
      fail_stage: false,
      staged: Mutex::default(),
      commits: Mutex::default(),
      branches: Mutex::default(),
      ranges: Mutex::default(),
    }
  }
}

impl FakeVcs {
  pub fn set_head(&self, head: &str) {
    *self.head.lock().unwrap() = head.to_string();
  }

  pub fn staged(&self) -> Vec<PathBuf> {
    self.staged.lock().unwrap().clone()
  }

  pub fn commits(&self) -> Vec<Vec<String>> {
    self.commits.lock().unwrap().clone()
  }

  pub fn branches(&self) -> Vec<(String, String)> {
    self.branches.lock().unwrap().clone()
  }

  pub fn ranges(&self) -> Vec<CommitRange> {
    self.ranges.lock().unwrap().clone()
  }
}

impl Vcs for FakeVcs {
  fn current_branch(&self) -> RailResult<String> {
    Ok(self.branch.clone())
  }

  fn head_commit(&self) -> RailResult<String> {
    Ok(self.head.lock().unwrap().clone())
  }

  fn log(&self, path: &Path, range: &CommitRange) -> RailResult<Vec<CommitLog>> {
    self.ranges.lock().unwrap().push(range.clone());
    Ok(self.logs.get(path).cloned().unwrap_or_default())
  }

  fn file_log(&self, path: &Path, _range: &CommitRange) -> RailResult<Vec<FileLog>> {
    Ok(self.file_logs.get(path).cloned().unwrap_or_default())
  }

  fn stage(&self, paths: &[PathBuf]) -> RailResult<()> {
    if self.fail_stage && !paths.is_empty() {
      return Err(RailError::Git(GitError::CommandFailed {
        command: "git add".to_string(),
        stderr: "fatal: Unable to create index.lock".to_string(),
      }));
    }
    self.staged.lock().unwrap().extend(paths.iter().cloned());
    Ok(())
  }

  fn commit(&self, messages: &[String]) -> RailResult<()> {
    let mut commits = self.commits.lock().unwrap();
    commits.push(messages.to_vec());
    *self.head.lock().unwrap() = format!("{:040x}", 0x100 + commits.len());
    Ok(())
  }

  fn has_unstaged_changes(&self) -> RailResult<bool> {
    Ok(self.unstaged_changes)
  }

  fn create_branch(&self, name: &str, from: &str) -> RailResult<()> {
    self.branches.lock().unwrap().push((name.to_string(), from.to_string()));
    Ok(())
  }
}

/// Registry serving canned views and recording mutations
///
/// Tag changes update the stored views, and removing a tag that isn't set
/// fails the way npm does.
#[derive(Default)]
pub struct FakeRegistry {
  /// Keyed by `name` (current version) or `name@version`
  views: Mutex<HashMap<String, PackageView>>,
  pub fail_publish: bool,
  /// Packages whose next `remove_tag` fails
  fail_remove_once: Mutex<HashSet<String>>,
  calls: Mutex<Vec<String>>,
}

impl FakeRegistry {
  pub fn insert(&mut self, view: PackageView) {
    let views = self.views.get_mut().unwrap();
    views.insert(format!("{}@{}", view.name, view.version), view.clone());
    views.insert(view.name.clone(), view);
  }

  pub fn fail_next_remove(&self, name: &str) {
    self.fail_remove_once.lock().unwrap().insert(name.to_string());
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }

  /// Current dist-tags of `name`
  pub fn tags(&self, name: &str) -> BTreeMap<String, String> {
    self.views.lock().unwrap().get(name).map(|v| v.dist_tags.clone()).unwrap_or_default()
  }
}

impl Registry for FakeRegistry {
  fn view(&self, name: &str, version: Option<&str>) -> RailResult<Option<PackageView>> {
    let key = match version {
      Some(version) => format!("{}@{}", name, version),
      None => name.to_string(),
    };
    Ok(self.views.lock().unwrap().get(&key).cloned())
  }

  fn add_tag(&self, name: &str, version: &str, tag: &str) -> RailResult<()> {
    self
      .calls
      .lock()
      .unwrap()
      .push(format!("dist-tag add {}@{} {}", name, version, tag));
    for view in self.views.lock().unwrap().values_mut().filter(|v| v.name == name) {
      view.dist_tags.insert(tag.to_string(), version.to_string());
    }
    Ok(())
  }

  fn remove_tag(&self, name: &str, tag: &str) -> RailResult<()> {
    let command = format!("dist-tag rm {} {}", name, tag);
    self.calls.lock().unwrap().push(command.clone());

    if self.fail_remove_once.lock().unwrap().remove(name) {
      return Err(RailError::Registry(RegistryError::CommandFailed {
        command: format!("npm {}", command),
        stderr: "npm ERR! network socket hang up".to_string(),
      }));
    }

    let mut views = self.views.lock().unwrap();
    let mut known = views.values_mut().filter(|v| v.name == name).peekable();
    if known.peek().is_some() && !known.all(|v| v.dist_tags.remove(tag).is_some()) {
      return Err(RailError::Registry(RegistryError::CommandFailed {
        command: format!("npm {}", command),
        stderr: format!("npm ERR! {} is not a dist-tag on {}", tag, name),
      }));
    }
    Ok(())
  }

  fn publish(&self, dir: &Path, tag: &str) -> RailResult<()> {
    if self.fail_publish {
      return Err(RailError::Registry(RegistryError::CommandFailed {
        command: "npm publish".to_string(),
        stderr: "npm ERR! code E403".to_string(),
      }));
    }
    let name = dir.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    self.calls.lock().unwrap().push(format!("publish {} --tag {}", name, tag));
    Ok(())
  }
}

/// Operator answering from queues, falling back to defaults
#[derive(Default)]
pub struct ScriptedOperator {
  pub confirms: VecDeque<bool>,
  pub selections: VecDeque<Vec<usize>>,
  pub asked: Vec<String>,
  /// Choices offered by the last `select`
  pub last_choices: Vec<Choice>,
}

impl Operator for ScriptedOperator {
  fn confirm(&mut self, question: &str, default: bool) -> RailResult<bool> {
    self.asked.push(question.to_string());
    Ok(self.confirms.pop_front().unwrap_or(default))
  }

  fn select(&mut self, question: &str, choices: &[Choice]) -> RailResult<Vec<usize>> {
    self.asked.push(question.to_string());
    self.last_choices = choices.to_vec();
    Ok(self.selections.pop_front().unwrap_or_else(|| {
      choices
        .iter()
        .enumerate()
        .filter(|(_, c)| c.checked)
        .map(|(i, _)| i)
        .collect()
    }))
  }
}

/// Everything a phase needs, backed by fakes and a temp dir
pub struct TestEnv {
  pub root: TempDir,
  pub config: RailConfig,
  pub options: ActionOptions,
  pub vcs: FakeVcs,
  pub registry: FakeRegistry,
  pub operator: ScriptedOperator,
}

impl TestEnv {
  pub fn new() -> Self {
    Self {
      root: tempfile::tempdir().unwrap(),
      config: RailConfig::default(),
      options: ActionOptions::default(),
      vcs: FakeVcs::default(),
      registry: FakeRegistry::default(),
      operator: ScriptedOperator::default(),
    }
  }

  pub fn root(&self) -> &Path {
    self.root.path()
  }

  pub fn store(&self) -> CheckpointStore {
    CheckpointStore::new(self.root.path().join(&self.config.checkpoint.path))
  }

  pub fn ctx(&mut self, action: ActionType) -> PhaseContext<'_> {
    let mut ctx = PhaseContext::new(
      action,
      &self.options,
      &self.config,
      self.root.path(),
      &self.vcs,
      &self.registry,
      &mut self.operator,
    );
    ctx.head = HEAD.to_string();
    ctx
  }

  /// Write a package to disk under `packages/<name>` and return its fabric
  pub fn write_package(&self, name: &str, version: &str, git_head: Option<&str>) -> Fabric {
    let mut package = package_at(self.root.path(), name, version);
    package.git_head = git_head.map(str::to_string);
    std::fs::create_dir_all(&package.path).unwrap();

    let mut manifest = serde_json::json!({ "name": name, "version": version });
    if let Some(head) = git_head {
      manifest["gitHead"] = serde_json::Value::String(head.to_string());
    }
    std::fs::write(
      package.manifest_path(),
      serde_json::to_string_pretty(&manifest).unwrap() + "\n",
    )
    .unwrap();

    let view = self.registry.view(name, Some(version)).unwrap();
    Fabric::new(package, view)
  }
}
