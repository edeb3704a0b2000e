// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Error types for the asset pipeline.
//!
//! Every failure aborts the remaining stages of the running pipeline. The
//! only place errors are swallowed is the watch loop, which reports them and
//! waits for the next change.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building assets.
#[derive(Debug, Error)]
pub enum AssetError {
    /// Filesystem failure (read, write, rename, delete).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// `assetflow.toml` exists but could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// A configured source glob is malformed.
    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// A path matched by a source glob could not be read.
    #[error("Failed to read glob entry: {0}")]
    Glob(#[from] glob::GlobError),

    /// A configured watch glob is malformed.
    #[error("Invalid watch pattern: {0}")]
    WatchPattern(#[from] globset::Error),

    /// An external transformation tool rejected its input or crashed.
    #[error("{step} failed: {message}")]
    Tool {
        /// Name of the step that invoked the tool.
        step: &'static str,
        /// Tool diagnostics (usually its stderr).
        message: String,
    },

    /// The entry page to cache-bust does not exist in the output tree.
    #[error("Entry page not found: {}", .0.display())]
    EntryPageMissing(PathBuf),

    /// A blocking worker panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl AssetError {
    /// Creates a [`AssetError::Tool`] for the given step.
    pub fn tool(step: &'static str, message: impl Into<String>) -> Self {
        AssetError::Tool {
            step,
            message: message.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AssetError>;
