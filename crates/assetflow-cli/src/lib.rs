// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

//! assetflow CLI library.
//!
//! This crate provides the command-line interface for the assetflow asset
//! pipeline: the commands, the external tools (Dart Sass, esbuild, image
//! compression) and the filesystem watcher.
//!
//! # Usage
//!
//! This crate is primarily used through the `assetflow` binary:
//!
//! ```bash
//! assetflow         # Clean, build, cache-bust, compress images, then watch
//! assetflow img     # Compress icons and images
//! assetflow clean   # Delete outputs and rebuild everything once
//! assetflow watch   # Build code, cache-bust, then watch
//! assetflow init    # Create the starter directory tree
//! ```
//!
//! # Configuration
//!
//! Projects are configured via `assetflow.toml` at the project root.

/// CLI commands (build, img, clean, watch, init).
pub mod commands;
/// Console status output for pipeline progress.
pub mod reporter;
/// External tool management and invocation (Sass, esbuild, images).
pub mod toolchain;
/// File system watching for rebuilds.
pub mod watcher;
