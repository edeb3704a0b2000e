// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Stage graph and scheduler.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s. The steps of one stage run
//! concurrently and are joined before the next stage starts. The first
//! failing step aborts the pipeline.
//!
//! | Pipeline | Stages |
//! |---|---|
//! | [`Pipeline::full_build`] | clean code → style + script → cache-bust → clean images → icons → images, then watch |
//! | [`Pipeline::images_only`] | icons → images |
//! | [`Pipeline::clean_rebuild`] | clean code → clean images → style → script → icons → images |
//! | [`Pipeline::watch_only`] | style → script → cache-bust, then watch |
//! | [`Pipeline::watch_rebuild`] | style + script → cache-bust |

use crate::cachebust::CacheBuster;
use crate::clean;
use crate::config::PipelineConfig;
use crate::error::{AssetError, Result};
use crate::steps::{self, AssetTools};
use futures_util::future::try_join_all;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One unit of work in a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Delete the style and script output directories.
    CleanCode,
    /// Delete the image and icon output directories.
    CleanImages,
    /// Compile the style entry point.
    Style,
    /// Concatenate and minify scripts.
    Script,
    /// Compress icons.
    Icons,
    /// Compress images.
    Images,
    /// Refresh the entry page's cache-bust tokens.
    CacheBust,
}

impl Step {
    /// Short label used in logs and status lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::CleanCode => "clean code",
            Step::CleanImages => "clean images",
            Step::Style => "styles",
            Step::Script => "scripts",
            Step::Icons => "icons",
            Step::Images => "images",
            Step::CacheBust => "cache-bust",
        }
    }

    /// Whether this step needs the Sass or script tools.
    pub fn needs_code_tools(&self) -> bool {
        matches!(self, Step::Style | Step::Script)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Steps that may run concurrently; joined before the next stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    steps: Vec<Step>,
}

impl Stage {
    /// A stage running the given steps concurrently.
    pub fn parallel(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
        }
    }

    /// A stage with a single step.
    pub fn single(step: Step) -> Self {
        Self { steps: vec![step] }
    }

    /// The steps of this stage.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

/// An ordered sequence of stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    name: &'static str,
    stages: Vec<Stage>,
    enters_watch: bool,
}

impl Pipeline {
    /// Builds a pipeline from explicit stages.
    pub fn new(name: &'static str, stages: Vec<Stage>) -> Self {
        Self {
            name,
            stages,
            enters_watch: false,
        }
    }

    /// Marks the pipeline as handing over to the watch loop when done.
    pub fn then_watch(mut self) -> Self {
        self.enters_watch = true;
        self
    }

    /// Clean code outputs, rebuild code, cache-bust, clean and rebuild
    /// images, then watch.
    pub fn full_build() -> Self {
        Self::new(
            "build",
            vec![
                Stage::single(Step::CleanCode),
                Stage::parallel([Step::Style, Step::Script]),
                Stage::single(Step::CacheBust),
                Stage::single(Step::CleanImages),
                Stage::single(Step::Icons),
                Stage::single(Step::Images),
            ],
        )
        .then_watch()
    }

    /// Compress icons, then images.
    pub fn images_only() -> Self {
        Self::new(
            "img",
            vec![Stage::single(Step::Icons), Stage::single(Step::Images)],
        )
    }

    /// Delete every output directory and regenerate everything once.
    pub fn clean_rebuild() -> Self {
        Self::new(
            "clean",
            vec![
                Stage::single(Step::CleanCode),
                Stage::single(Step::CleanImages),
                Stage::single(Step::Style),
                Stage::single(Step::Script),
                Stage::single(Step::Icons),
                Stage::single(Step::Images),
            ],
        )
    }

    /// Rebuild code, cache-bust, then watch.
    pub fn watch_only() -> Self {
        Self::new(
            "watch",
            vec![
                Stage::single(Step::Style),
                Stage::single(Step::Script),
                Stage::single(Step::CacheBust),
            ],
        )
        .then_watch()
    }

    /// What the watch loop runs on every change.
    pub fn watch_rebuild() -> Self {
        Self::new(
            "rebuild",
            vec![
                Stage::parallel([Step::Style, Step::Script]),
                Stage::single(Step::CacheBust),
            ],
        )
    }

    /// Pipeline name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Ordered stages.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Whether the watch loop follows this pipeline.
    pub fn enters_watch(&self) -> bool {
        self.enters_watch
    }

    /// Whether any step needs the Sass or script tools.
    pub fn needs_code_tools(&self) -> bool {
        self.steps().any(|step| step.needs_code_tools())
    }

    /// Every step in execution order.
    pub fn steps(&self) -> impl Iterator<Item = Step> + '_ {
        self.stages.iter().flat_map(|stage| stage.steps.iter().copied())
    }
}

/// Receives progress notifications from the orchestrator and watch loop.
///
/// Every method has an empty default.
pub trait PipelineObserver {
    /// A step is about to run.
    fn step_started(&self, _step: Step) {}

    /// A step finished, successfully or not.
    fn step_finished(&self, _step: Step, _elapsed: Duration, _outcome: std::result::Result<(), &AssetError>) {}

    /// The watch loop is rebuilding for these changed paths.
    fn rebuild_started(&self, _changed: &[PathBuf]) {}

    /// The watch loop finished a rebuild.
    fn rebuild_finished(&self, _outcome: std::result::Result<(), &AssetError>) {}
}

/// Runs pipelines against one configuration and tool set.
pub struct Orchestrator<T> {
    config: Arc<PipelineConfig>,
    tools: T,
    cache_buster: CacheBuster,
    observer: Option<Box<dyn PipelineObserver>>,
}

impl<T: AssetTools> Orchestrator<T> {
    /// Creates an orchestrator.
    pub fn new(config: impl Into<Arc<PipelineConfig>>, tools: T) -> Self {
        Self {
            config: config.into(),
            tools,
            cache_buster: CacheBuster::new(),
            observer: None,
        }
    }

    /// Attaches a progress observer.
    pub fn with_observer(mut self, observer: impl PipelineObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// The configuration every step reads.
    pub fn config(&self) -> &Arc<PipelineConfig> {
        &self.config
    }

    pub(crate) fn observer(&self) -> Option<&dyn PipelineObserver> {
        self.observer.as_deref()
    }

    /// Runs every stage of `pipeline` in order.
    ///
    /// Steps within a stage run concurrently; the stage completes only when
    /// all of them have. The first error aborts the remaining stages.
    pub async fn run(&self, pipeline: &Pipeline) -> Result<()> {
        tracing::info!("Running pipeline '{}'", pipeline.name());
        let start = Instant::now();

        for (index, stage) in pipeline.stages().iter().enumerate() {
            tracing::debug!("Stage {}: {:?}", index + 1, stage.steps());
            try_join_all(stage.steps().iter().map(|step| self.run_observed(*step))).await?;
        }

        tracing::debug!("Pipeline '{}' finished in {:?}", pipeline.name(), start.elapsed());
        Ok(())
    }

    async fn run_observed(&self, step: Step) -> Result<()> {
        if let Some(observer) = self.observer() {
            observer.step_started(step);
        }
        let start = Instant::now();
        let result = self.run_step(step).await;
        if let Some(observer) = self.observer() {
            observer.step_finished(step, start.elapsed(), result.as_ref().map(|_| ()));
        }
        result
    }

    async fn run_step(&self, step: Step) -> Result<()> {
        let config = self.config.as_ref();
        match step {
            Step::CleanCode => clean::remove_dirs(&config.code_outputs()).await,
            Step::CleanImages => clean::remove_dirs(&config.image_outputs()).await,
            Step::Style => steps::compile_style(config, &self.tools).await.map(|_| ()),
            Step::Script => steps::bundle_script(config, &self.tools).await.map(|_| ()),
            Step::Icons => {
                let count =
                    steps::compress_images(&config.icon_pattern(), &config.icon_output(), &self.tools)
                        .await?;
                tracing::info!("Compressed {} icon(s)", count);
                Ok(())
            }
            Step::Images => {
                let count = steps::compress_images(
                    &config.image_pattern(),
                    &config.image_output(),
                    &self.tools,
                )
                .await?;
                tracing::info!("Compressed {} image(s)", count);
                Ok(())
            }
            Step::CacheBust => self.cache_buster.bust(&config.index_path()).map(|_| ()),
        }
    }
}
