//! Executes script steps against a tree and reports each outcome.

use std::io::{BufRead, Write};

use anyhow::Context;
use colored::Colorize;
use ft_tree::{CheckReport, FileTree, Stat, TreeConfig, TreeError};
use serde::Serialize;
use tracing::debug;

use crate::cli::OutputFormat;
use crate::script::{self, Probe, Step};

/// Result of one command, as printed.
#[derive(Debug, Serialize)]
pub struct Outcome {
    pub line: usize,
    pub command: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Output>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Failure>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Output {
    Text(String),
    Flag(bool),
    Stat(Stat),
    Report(CheckReport),
}

#[derive(Debug, Serialize)]
pub struct Failure {
    pub code: &'static str,
    pub message: String,
}

impl From<&TreeError> for Failure {
    fn from(err: &TreeError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Totals for a finished run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub executed: usize,
    pub failed: usize,
}

impl Summary {
    pub fn succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// A tree plus the bookkeeping for one script run.
pub struct Session {
    tree: FileTree<String>,
    format: OutputFormat,
    started: bool,
    summary: Summary,
}

impl Session {
    pub fn new(config: TreeConfig, format: OutputFormat) -> Self {
        Self {
            tree: FileTree::new(config),
            format,
            started: false,
            summary: Summary::default(),
        }
    }

    /// Parse and execute every line of `input`, printing outcomes to `out`.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        input: R,
        out: &mut W,
    ) -> anyhow::Result<Summary> {
        for (index, line) in input.lines().enumerate() {
            let line = line.context("failed to read command")?;
            let outcome = self.execute_line(index + 1, &line);
            if let Some(outcome) = outcome {
                self.print(&outcome, out)?;
            }
        }
        Ok(self.summary)
    }

    /// Execute a single line. Blank and comment lines produce no outcome.
    pub fn execute_line(&mut self, line: usize, text: &str) -> Option<Outcome> {
        let outcome = match script::parse_line(text) {
            Ok(None) => return None,
            Ok(Some(step)) => {
                self.start(&step);
                self.execute(line, &step)
            }
            Err(err) => Outcome {
                line,
                command: text.trim().to_string(),
                ok: false,
                output: None,
                error: Some(Failure {
                    code: "parse_error",
                    message: err.to_string(),
                }),
            },
        };

        self.summary.executed += 1;
        if !outcome.ok {
            self.summary.failed += 1;
        }
        Some(outcome)
    }

    /// Initialize implicitly unless the first command manages the lifecycle.
    fn start(&mut self, first: &Step) {
        if self.started {
            return;
        }
        self.started = true;
        if !first.is_lifecycle() {
            if let Err(err) = self.tree.init() {
                debug!(error = %err, "implicit init failed");
            }
        }
    }

    fn execute(&mut self, line: usize, step: &Step) -> Outcome {
        let result = match step {
            Step::Init => self.tree.init().map(|()| None),
            Step::Destroy => self.tree.destroy().map(|()| None),
            Step::Mkdir(path) => self.tree.insert_directory(path).map(|()| None),
            Step::Touch(path, contents) => {
                let length = contents.as_ref().map_or(0, String::len);
                self.tree
                    .insert_file(path, contents.clone(), length)
                    .map(|()| None)
            }
            Step::Rmdir(path) => self.tree.remove_directory(path).map(|()| None),
            Step::Rm(path) => self.tree.remove_file(path).map(|()| None),
            Step::Cat(path) => self
                .tree
                .get_file_contents(path)
                .map(|contents| Some(Output::Text(contents.cloned().unwrap_or_default()))),
            Step::Put(path, contents) => {
                let length = contents.as_ref().map_or(0, String::len);
                self.tree
                    .replace_file_contents(path, contents.clone(), length)
                    .map(|old| Some(Output::Text(old.unwrap_or_default())))
            }
            Step::Stat(path) => self.tree.stat(path).map(|stat| Some(Output::Stat(stat))),
            Step::Test(probe, path) => {
                let found = match probe {
                    Probe::Directory => self.tree.contains_directory(path),
                    Probe::File => self.tree.contains_file(path),
                };
                return Outcome {
                    line,
                    command: step.to_string(),
                    ok: found,
                    output: Some(Output::Flag(found)),
                    error: None,
                };
            }
            Step::Print => self
                .tree
                .render()
                .map(|listing| Some(Output::Text(listing)))
                .ok_or(TreeError::Initialization { initialized: false }),
            Step::Check => {
                let report = self.tree.check();
                return Outcome {
                    line,
                    command: step.to_string(),
                    ok: report.is_valid(),
                    output: Some(Output::Report(report)),
                    error: None,
                };
            }
        };

        match result {
            Ok(output) => Outcome {
                line,
                command: step.to_string(),
                ok: true,
                output,
                error: None,
            },
            Err(err) => Outcome {
                line,
                command: step.to_string(),
                ok: false,
                output: None,
                error: Some(Failure::from(&err)),
            },
        }
    }

    fn print<W: Write>(&self, outcome: &Outcome, out: &mut W) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_writer(&mut *out, outcome)?;
                writeln!(out)?;
            }
            OutputFormat::Text => write_text(outcome, out)?,
        }
        Ok(())
    }
}

fn write_text<W: Write>(outcome: &Outcome, out: &mut W) -> std::io::Result<()> {
    match &outcome.error {
        Some(failure) => writeln!(
            out,
            "{} {}: {} {}",
            "✗".red().bold(),
            outcome.command,
            failure.message.red(),
            format!("[line {}]", outcome.line).dimmed()
        )?,
        None if outcome.ok => writeln!(out, "{} {}", "✓".green().bold(), outcome.command)?,
        None => writeln!(out, "{} {}", "✗".red().bold(), outcome.command)?,
    }

    match &outcome.output {
        Some(Output::Text(text)) => {
            for line in text.lines() {
                writeln!(out, "  {line}")?;
            }
        }
        Some(Output::Flag(found)) => writeln!(out, "  {found}")?,
        Some(Output::Stat(stat)) => {
            let kind = if stat.is_file { "file" } else { "directory" };
            writeln!(out, "  {}, size {}", kind.cyan(), stat.size)?;
        }
        Some(Output::Report(report)) => {
            for line in report.to_string().lines() {
                writeln!(out, "  {line}")?;
            }
        }
        None => {}
    }
    Ok(())
}
