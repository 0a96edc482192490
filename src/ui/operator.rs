//! Operator decisions
//!
//! Every question release-rail asks goes through [`Operator`], so `--yes` and
//! tests can answer without a terminal.

use crate::core::error::{RailError, RailResult};
use crate::ui::style;
use std::io::{self, BufRead, Write};

/// An entry of a multi-select prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
  pub label: String,
  /// Pre-selected
  pub checked: bool,
}

impl Choice {
  pub fn new(label: impl Into<String>, checked: bool) -> Self {
    Self {
      label: label.into(),
      checked,
    }
  }
}

/// Source of interactive decisions
pub trait Operator {
  /// Yes/no question
  fn confirm(&mut self, question: &str, default: bool) -> RailResult<bool>;

  /// Pick any number of `choices`; returns the indices picked, ascending
  fn select(&mut self, question: &str, choices: &[Choice]) -> RailResult<Vec<usize>>;
}

/// Accepts every default without asking (`--yes`)
#[derive(Debug, Default)]
pub struct AssumeDefaults;

impl Operator for AssumeDefaults {
  fn confirm(&mut self, question: &str, default: bool) -> RailResult<bool> {
    println!("❔ {} {}", question, style::gray(if default { "(yes)" } else { "(no)" }));
    Ok(default)
  }

  fn select(&mut self, question: &str, choices: &[Choice]) -> RailResult<Vec<usize>> {
    println!("❔ {}", question);
    Ok(default_selection(choices))
  }
}

fn default_selection(choices: &[Choice]) -> Vec<usize> {
  choices
    .iter()
    .enumerate()
    .filter(|(_, choice)| choice.checked)
    .map(|(i, _)| i)
    .collect()
}

/// Prompts on stdout and reads answers from stdin
///
/// End of input (non-interactive stdin) is an error; `--yes` is the way to
/// accept defaults unattended.
pub struct TerminalOperator<R: BufRead> {
  input: R,
}

impl TerminalOperator<io::StdinLock<'static>> {
  pub fn stdin() -> Self {
    Self { input: io::stdin().lock() }
  }
}

impl<R: BufRead> TerminalOperator<R> {
  pub fn new(input: R) -> Self {
    Self { input }
  }

  fn read_answer(&mut self, question: &str) -> RailResult<String> {
    io::stdout().flush()?;
    let mut line = String::new();
    if self.input.read_line(&mut line)? == 0 {
      println!();
      return Err(no_answer(question));
    }
    Ok(line.trim().to_string())
  }
}

fn no_answer(question: &str) -> RailError {
  RailError::with_help(
    format!("No answer to \"{}\": input ended", question),
    "Run release-rail in a terminal, or pass --yes to accept every default",
  )
}

impl<R: BufRead> Operator for TerminalOperator<R> {
  fn confirm(&mut self, question: &str, default: bool) -> RailResult<bool> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };

    loop {
      print!("❔ {} {} ", question, style::gray(hint));
      let answer = self.read_answer(question)?;

      match answer.to_lowercase().as_str() {
        "" => return Ok(default),
        "y" | "yes" => return Ok(true),
        "n" | "no" => return Ok(false),
        _ => println!("{} Please answer y or n.", style::bullet()),
      }
    }
  }

  fn select(&mut self, question: &str, choices: &[Choice]) -> RailResult<Vec<usize>> {
    let mut checked: Vec<bool> = choices.iter().map(|c| c.checked).collect();

    loop {
      println!("❔ {}", question);
      for (i, choice) in choices.iter().enumerate() {
        let mark = if checked[i] { "[x]" } else { "[ ]" };
        println!("  {:>2}. {} {}", i + 1, mark, choice.label);
      }
      print!("{} ", style::gray("Numbers to toggle (e.g. 1,3), empty to confirm:"));

      let answer = self.read_answer(question)?;
      if answer.is_empty() {
        break;
      }

      for token in answer.split([',', ' ']).filter(|t| !t.is_empty()) {
        match token.parse::<usize>() {
          Ok(n) if (1..=choices.len()).contains(&n) => checked[n - 1] = !checked[n - 1],
          _ => println!("{} Ignoring '{}'", style::bullet(), token),
        }
      }
    }

    Ok(checked.iter().enumerate().filter(|(_, c)| **c).map(|(i, _)| i).collect())
  }
}
