// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! File system watching for rebuilds.
//!
//! This module provides `FileWatcher`, which turns filesystem events below
//! the style and script source directories into [`ChangeBatch`]es for the
//! watch loop.
//!
//! # Features
//!
//! - Polling (default) or native change detection
//! - Debounced events (200ms)
//! - Filters paths against the configured style/script globs
//! - Recursive directory watching

use assetflow::{ChangeBatch, ChangeFilter, PipelineConfig, WatchStrategy};
use notify::{PollWatcher, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer_opt, DebounceEventResult, Debouncer, FileIdMap};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

const DEBOUNCE: Duration = Duration::from_millis(200);

enum Backend {
    Poll(Debouncer<PollWatcher, FileIdMap>),
    Native(Debouncer<RecommendedWatcher, FileIdMap>),
}

/// Watches the style and script sources, sending relevant changes to a
/// channel. Watching stops when the value is dropped.
pub struct FileWatcher {
    _backend: Backend,
}

impl FileWatcher {
    /// Starts watching according to `config.watch`.
    ///
    /// Source directories that do not exist yet are skipped with a warning.
    pub fn start(config: &PipelineConfig, changes: UnboundedSender<ChangeBatch>) -> anyhow::Result<Self> {
        let filter = ChangeFilter::new(config)?;
        let roots = filter.watch_roots().to_vec();

        let handler = move |result: DebounceEventResult| match result {
            Ok(events) => {
                let paths = events
                    .iter()
                    .filter(|e| !e.kind.is_access())
                    .flat_map(|e| e.paths.iter());
                let batch = filter.filter(paths);
                if !batch.is_empty() {
                    tracing::debug!("Changed: {:?}", batch);
                    // the loop has shut down when this fails
                    let _ = changes.send(batch);
                }
            }
            Err(errors) => {
                for error in errors {
                    tracing::warn!("Watch error: {}", error);
                }
            }
        };

        let mut backend = match config.watch.strategy() {
            WatchStrategy::Poll { interval } => {
                tracing::debug!("Polling every {:?}", interval);
                Backend::Poll(new_debouncer_opt::<_, PollWatcher, FileIdMap>(
                    DEBOUNCE,
                    None,
                    handler,
                    FileIdMap::new(),
                    notify::Config::default().with_poll_interval(interval),
                )?)
            }
            WatchStrategy::Native => Backend::Native(new_debouncer_opt::<_, RecommendedWatcher, FileIdMap>(
                DEBOUNCE,
                None,
                handler,
                FileIdMap::new(),
                notify::Config::default(),
            )?),
        };

        for root in &roots {
            if !root.is_dir() {
                tracing::warn!("{} does not exist, not watching it", root.display());
                continue;
            }
            match &mut backend {
                Backend::Poll(debouncer) => debouncer.watch(root, RecursiveMode::Recursive)?,
                Backend::Native(debouncer) => debouncer.watch(root, RecursiveMode::Recursive)?,
            }
            tracing::info!("Watching {}", root.display());
        }

        Ok(Self { _backend: backend })
    }
}
