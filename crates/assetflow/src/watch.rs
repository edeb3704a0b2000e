// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Watch loop.
//!
//! The loop is a two-state machine. While [`WatchState::Idle`] it waits for a
//! batch of changed paths; on arrival it drains every batch already queued,
//! switches to [`WatchState::Running`], runs [`Pipeline::watch_rebuild`] and
//! returns to idle. Changes that arrive during a rebuild wait in the channel
//! and are coalesced into a single follow-up rebuild, so rebuilds never
//! overlap.
//!
//! A failed rebuild is reported and the loop keeps waiting. The loop ends
//! only when every sender of the change channel has been dropped.
//!
//! Change detection itself (polling or native notifications) lives with the
//! caller; [`ChangeFilter`] decides which paths are relevant.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::pipeline::{Orchestrator, Pipeline};
use crate::sources::glob_base;
use crate::steps::AssetTools;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedReceiver;

/// Paths reported changed by one detection round.
pub type ChangeBatch = Vec<PathBuf>;

/// State of the watch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Waiting for changes.
    Idle,
    /// Executing a rebuild.
    Running,
}

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    /// Rebuilds executed.
    pub rebuilds: usize,
    /// Rebuilds that failed.
    pub failures: usize,
}

/// Decides which changed paths trigger a rebuild.
///
/// Matches the style and script globs of the configuration against paths
/// relative to the project root.
#[derive(Debug, Clone)]
pub struct ChangeFilter {
    root: PathBuf,
    globs: GlobSet,
    watch_roots: Vec<PathBuf>,
}

impl ChangeFilter {
    /// Builds the filter for `config`'s watch globs.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        let mut watch_roots = Vec::new();

        for pattern in config.watch_globs() {
            builder.add(GlobBuilder::new(pattern).literal_separator(true).build()?);

            let base = config.root().join(glob_base(pattern));
            if !watch_roots.contains(&base) {
                watch_roots.push(base);
            }
        }

        Ok(Self {
            root: config.root().to_path_buf(),
            globs: builder.build()?,
            watch_roots,
        })
    }

    /// Directories to watch recursively.
    pub fn watch_roots(&self) -> &[PathBuf] {
        &self.watch_roots
    }

    /// Whether a change to `path` should trigger a rebuild.
    pub fn matches(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        self.globs.is_match(relative)
    }

    /// Keeps the relevant paths, sorted and deduplicated.
    pub fn filter<'a>(&self, paths: impl IntoIterator<Item = &'a PathBuf>) -> ChangeBatch {
        let mut batch: ChangeBatch = paths
            .into_iter()
            .filter(|p| self.matches(p))
            .cloned()
            .collect();
        batch.sort();
        batch.dedup();
        batch
    }
}

/// Serializes rebuilds in response to change batches.
pub struct WatchLoop<'a, T> {
    orchestrator: &'a Orchestrator<T>,
    state: WatchState,
    summary: WatchSummary,
}

impl<'a, T: AssetTools> WatchLoop<'a, T> {
    /// Creates an idle loop driving `orchestrator`.
    pub fn new(orchestrator: &'a Orchestrator<T>) -> Self {
        Self {
            orchestrator,
            state: WatchState::Idle,
            summary: WatchSummary::default(),
        }
    }

    /// Current state.
    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Consumes change batches until the channel closes.
    pub async fn run(mut self, mut changes: UnboundedReceiver<ChangeBatch>) -> WatchSummary {
        tracing::info!("Watching for file changes");

        while let Some(mut batch) = changes.recv().await {
            while let Ok(more) = changes.try_recv() {
                batch.extend(more);
            }
            batch.sort();
            batch.dedup();
            self.rebuild(&batch).await;
        }

        tracing::info!(
            "Watch loop stopped after {} rebuild(s), {} failed",
            self.summary.rebuilds,
            self.summary.failures
        );
        self.summary
    }

    async fn rebuild(&mut self, changed: &[PathBuf]) {
        self.state = WatchState::Running;
        tracing::info!("{} file(s) changed, rebuilding", changed.len());
        if let Some(observer) = self.orchestrator.observer() {
            observer.rebuild_started(changed);
        }

        let result = self.orchestrator.run(&Pipeline::watch_rebuild()).await;
        self.summary.rebuilds += 1;
        if let Err(e) = &result {
            self.summary.failures += 1;
            tracing::error!("Rebuild failed: {}", e);
        }
        if let Some(observer) = self.orchestrator.observer() {
            observer.rebuild_finished(result.as_ref().map(|_| ()));
        }

        self.state = WatchState::Idle;
    }
}
