// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! CLI command implementations.
//!
//! This module contains the implementations for all assetflow commands:
//!
//! - `build`: Clean, rebuild, cache-bust and compress, then watch
//! - `img`: Compress icons and images
//! - `clean`: Delete every output and rebuild once
//! - `watch`: Rebuild code and cache-bust, then watch
//! - `init`: Create the starter directory tree

/// Full build command (the default).
pub mod build;
/// Clean rebuild command.
pub mod clean;
/// Image-only command.
pub mod img;
/// Project initialization command.
pub mod init;
/// Watch command.
pub mod watch;

use crate::reporter::ConsoleReporter;
use crate::toolchain::{prepare_tools, ExternalTools};
use crate::watcher::FileWatcher;
use assetflow::{Orchestrator, Pipeline, PipelineConfig, WatchLoop};
use console::style;
use std::time::Instant;
use tokio::signal;
use tokio::sync::mpsc;

/// Loads `assetflow.toml` from the working directory.
pub(crate) fn load_config() -> anyhow::Result<PipelineConfig> {
    let root = std::env::current_dir()?;
    Ok(PipelineConfig::load(root)?)
}

/// Builds an orchestrator with the tools `pipeline` needs.
///
/// Sass and esbuild are only provisioned when the pipeline has a style or
/// script step.
pub(crate) async fn orchestrator(
    config: PipelineConfig,
    pipeline: &Pipeline,
    quiet: bool,
) -> anyhow::Result<Orchestrator<ExternalTools>> {
    let root = config.root().to_path_buf();

    let tools = if pipeline.needs_code_tools() {
        let mut tools_config = config.tools.clone();
        // relative overrides are relative to the project
        for path in [&mut tools_config.sass_path, &mut tools_config.esbuild_path]
            .into_iter()
            .flatten()
        {
            *path = root.join(&*path);
        }
        let paths = prepare_tools(&tools_config, quiet).await?;
        if !quiet {
            println!();
        }
        ExternalTools::new(paths, &root, &config.tools)
    } else {
        ExternalTools::images_only(&root, &config.tools)
    };

    Ok(Orchestrator::new(config, tools).with_observer(ConsoleReporter::new(root, quiet)))
}

/// Runs `pipeline` once, then the watch loop if the pipeline asks for it.
pub(crate) async fn execute(pipeline: Pipeline, quiet: bool) -> anyhow::Result<()> {
    let config = load_config()?;
    let orchestrator = orchestrator(config, &pipeline, quiet).await?;

    if !quiet {
        println!(
            "{} {}",
            style("Running").cyan(),
            style(pipeline.name()).bold()
        );
    }

    let start = Instant::now();
    orchestrator.run(&pipeline).await?;

    if !quiet {
        println!(
            "{} {}",
            style("✓ Done in").green(),
            style(format!("{}ms", start.elapsed().as_millis())).dim()
        );
    }

    if pipeline.enters_watch() {
        watch(&orchestrator, quiet).await?;
    }
    Ok(())
}

/// Serves rebuilds until Ctrl+C.
pub(crate) async fn watch(orchestrator: &Orchestrator<ExternalTools>, quiet: bool) -> anyhow::Result<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    let _watcher = FileWatcher::start(orchestrator.config(), tx)?;

    if !quiet {
        println!();
        println!("Watching for changes... Press Ctrl+C to stop");
    }

    tokio::select! {
        summary = WatchLoop::new(orchestrator).run(rx) => {
            tracing::info!("Watcher closed after {} rebuild(s)", summary.rebuilds);
        }
        result = signal::ctrl_c() => {
            result?;
            if !quiet {
                println!("\nStopping file watcher...");
            }
        }
    }

    Ok(())
}
