mod changelog;
mod commands;
mod core;
mod native;
mod registry;
mod release;
#[cfg(test)]
mod testing;
mod ui;
mod utils;
mod workspace;

use clap::{Args, Parser, Subcommand};
use core::error::{RailError, print_error};
use release::inference::DEFAULT_PRERELEASE_ID;
use release::options::{ActionOptions, ActionType};

/// Publish packages from a monorepo in resumable phases
#[derive(Parser)]
#[command(name = "release-rail")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Bump, commit and publish packages with unpublished changes
  Publish {
    #[command(flatten)]
    common: CommonArgs,
    /// Release as a prerelease with this identifier
    #[arg(long, value_name = "ID", num_args = 0..=1, default_missing_value = DEFAULT_PRERELEASE_ID)]
    prerelease: Option<String>,
    /// Do everything except talking to the registry
    #[arg(long)]
    dry: bool,
    /// Title of the release commit
    #[arg(short = 'm', long, default_value = "Publish packages")]
    commit_message: String,
    /// Skip the branch and working tree checks
    #[arg(long)]
    skip_repo_checks: bool,
  },

  /// List packages with unpublished changes
  List {
    #[command(flatten)]
    common: CommonArgs,
    /// Suggest prerelease versions with this identifier
    #[arg(long, value_name = "ID", num_args = 0..=1, default_missing_value = DEFAULT_PRERELEASE_ID)]
    prerelease: Option<String>,
  },

  /// Move a dist-tag onto the local package versions
  Promote {
    #[command(flatten)]
    common: CommonArgs,
    /// Tag to promote to
    #[arg(long, default_value = "latest")]
    tag: String,
    /// Print what would change without touching the registry
    #[arg(long)]
    dry: bool,
  },

  /// Create a release branch from a published version
  Backport {
    #[command(flatten)]
    common: CommonArgs,
    /// Published version to branch from
    #[arg(long, value_name = "VERSION")]
    from_version: String,
    /// Skip the branch and working tree checks
    #[arg(long)]
    skip_repo_checks: bool,
  },
}

/// Arguments shared by every action
#[derive(Args)]
struct CommonArgs {
  /// Packages to work on (default: all public packages)
  packages: Vec<String>,
  /// Leave these packages out
  #[arg(short, long, value_name = "PACKAGE")]
  exclude: Vec<String>,
  /// Resume from the last checkpoint without asking
  #[arg(short, long)]
  retry: bool,
  /// Answer every question with its default
  #[arg(short, long)]
  yes: bool,
}

impl CommonArgs {
  fn into_options(self) -> ActionOptions {
    ActionOptions {
      package_names: self.packages,
      exclude: self.exclude,
      retry: self.retry,
      assume_yes: self.yes,
      ..ActionOptions::default()
    }
  }
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn main() {
  let cli = Cli::parse();

  let cwd = match std::env::current_dir() {
    Ok(dir) => dir,
    Err(e) => {
      eprintln!("Error: Failed to get current directory: {}", e);
      std::process::exit(1);
    }
  };

  let (action, options) = match cli.command {
    Commands::Publish {
      common,
      prerelease,
      dry,
      commit_message,
      skip_repo_checks,
    } => (
      ActionType::Publish,
      ActionOptions {
        prerelease,
        dry,
        commit_message,
        skip_repo_checks,
        ..common.into_options()
      },
    ),
    Commands::List { common, prerelease } => (
      ActionType::List,
      ActionOptions {
        prerelease,
        ..common.into_options()
      },
    ),
    Commands::Promote { common, tag, dry } => (
      ActionType::Promote,
      ActionOptions {
        promote_tag: tag,
        dry,
        ..common.into_options()
      },
    ),
    Commands::Backport {
      common,
      from_version,
      skip_repo_checks,
    } => (
      ActionType::Backport,
      ActionOptions {
        backport_version: Some(from_version),
        skip_repo_checks,
        ..common.into_options()
      },
    ),
  };

  if let Err(err) = commands::run_action(action, options, &cwd) {
    handle_error(err);
  }
}

fn handle_error(err: RailError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
