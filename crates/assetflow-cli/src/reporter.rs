// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Styled status lines for pipeline progress.

use assetflow::{AssetError, PipelineObserver, Step};
use console::style;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prints one line per finished step and per watch rebuild.
///
/// Quiet mode keeps failures and drops everything else.
#[derive(Debug, Clone)]
pub struct ConsoleReporter {
    root: PathBuf,
    quiet: bool,
}

impl ConsoleReporter {
    /// Creates a reporter printing paths relative to `root`.
    pub fn new(root: impl Into<PathBuf>, quiet: bool) -> Self {
        Self {
            root: root.into(),
            quiet,
        }
    }

    fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

/// Formats the label column shared by every status line.
pub fn step_line(step: Step, outcome: Result<Duration, &AssetError>) -> String {
    match outcome {
        Ok(elapsed) => format!(
            "  {:<12} {} {}",
            style(step.as_str()).cyan(),
            style("✓").green(),
            style(format!("{}ms", elapsed.as_millis())).dim()
        ),
        Err(err) => format!(
            "  {:<12} {} {}",
            style(step.as_str()).cyan(),
            style("✗").red(),
            style(err.to_string()).red()
        ),
    }
}

impl PipelineObserver for ConsoleReporter {
    fn step_started(&self, step: Step) {
        tracing::debug!("{} started", step);
    }

    fn step_finished(&self, step: Step, elapsed: Duration, outcome: Result<(), &AssetError>) {
        match outcome {
            Ok(()) if !self.quiet => println!("{}", step_line(step, Ok(elapsed))),
            Ok(()) => {}
            Err(err) => eprintln!("{}", step_line(step, Err(err))),
        }
    }

    fn rebuild_started(&self, changed: &[PathBuf]) {
        if self.quiet {
            return;
        }
        let files = changed
            .iter()
            .map(|p| self.relative(p).display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        println!();
        println!("{} {}", style("↻").yellow(), style(files).dim());
    }

    fn rebuild_finished(&self, outcome: Result<(), &AssetError>) {
        match outcome {
            Ok(()) if !self.quiet => println!("{}", style("Rebuilt, watching for changes...").green()),
            Ok(()) => {}
            Err(_) => eprintln!(
                "{}",
                style("Rebuild failed, still watching for changes...").yellow()
            ),
        }
    }
}
