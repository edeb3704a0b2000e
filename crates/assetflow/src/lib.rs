// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

//! # assetflow
//!
//! Static asset pipeline for small web projects.
//!
//! Source files live in a developer tree (`assets/`) and are turned into a
//! deployable output tree (`_public/` by default):
//!
//! - `assets/css/main.{scss,sass}` → `css/main.css` + source map
//! - `assets/js/**/*.js` → `js/main.js` (concatenated in order, minified)
//! - `assets/icons/**/*` → `ico/**` (compressed)
//! - `assets/images/**/*` → `img/**` (compressed)
//! - `index.html` gets its `cb=<n>` cache-bust tokens refreshed
//!
//! The transformations themselves (Sass, minification, image codecs) are
//! provided by an [`AssetTools`] implementation. This crate owns ordering,
//! cleaning, cache-busting and the watch loop.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use assetflow::{Orchestrator, Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::load(std::env::current_dir()?)?;
//! let orchestrator = Orchestrator::new(config, my_tools);
//! orchestrator.run(&Pipeline::clean_rebuild()).await?;
//! ```

/// Cache-bust token rewriting for the entry page.
pub mod cachebust;
/// Removal of generated output directories.
pub mod clean;
/// Pipeline configuration from `assetflow.toml`.
pub mod config;
/// Error types.
pub mod error;
/// Stage graph, named pipelines and the scheduler.
pub mod pipeline;
/// Deterministic source glob enumeration.
pub mod sources;
/// Transform steps and the external tool interface.
pub mod steps;
/// Watch loop state machine and change filtering.
pub mod watch;

#[cfg(test)]
pub(crate) mod test_support;

pub use cachebust::CacheBuster;
pub use config::{PipelineConfig, WatchStrategy};
pub use error::{AssetError, Result};
pub use pipeline::{Orchestrator, Pipeline, PipelineObserver, Stage, Step};
pub use steps::{AssetTools, CompiledStyle};
pub use watch::{ChangeBatch, ChangeFilter, WatchLoop, WatchState, WatchSummary};
