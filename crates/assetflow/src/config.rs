// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Pipeline configuration.
//!
//! Configuration is loaded once from `assetflow.toml` at the project root and
//! then shared read-only by every step. Every key is optional.
//!
//! # Example Configuration
//!
//! ```toml
//! [project]
//! name = "my-site"
//!
//! [paths]
//! index = "_public/index.html"
//! style_watch = "assets/css/**/*.{scss,sass}"
//! style_entry = "assets/css/main"
//! style_output = "_public/css"
//! script_input = "assets/js/**/*.js"
//! script_output = "_public/js"
//! image_input = "assets/images/**/*"
//! image_output = "_public/img"
//! icon_input = "assets/icons/**/*"
//! icon_output = "_public/ico"
//!
//! [watch]
//! strategy = "poll"
//! interval_ms = 1000
//!
//! [tools]
//! sass_version = "latest"
//! esbuild_version = "latest"
//! css_target = "chrome100,edge100,firefox100,safari14"
//! jpeg_quality = 85
//! ```

use crate::error::Result;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up at the project root.
pub const CONFIG_FILE: &str = "assetflow.toml";

/// Extensions tried, in order, for the style entry point.
pub const STYLE_EXTENSIONS: [&str; 2] = ["scss", "sass"];

/// Immutable pipeline configuration, resolved against a project root.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    root: PathBuf,
    /// Project metadata.
    pub project: ProjectConfig,
    /// Source and output locations.
    pub paths: PathsConfig,
    /// Change detection settings.
    pub watch: WatchConfig,
    /// External tool settings.
    pub tools: ToolsConfig,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    project: ProjectConfig,
    #[serde(default)]
    paths: PathsConfig,
    #[serde(default)]
    watch: WatchConfig,
    #[serde(default)]
    tools: ToolsConfig,
}

/// Project metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Project name (default: "unnamed").
    #[serde(default = "default_project_name")]
    pub name: String,
}

/// Source globs and output directories, relative to the project root.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Entry page whose cache-bust tokens are rewritten.
    #[serde(default = "default_index")]
    pub index: String,
    /// Glob of every style fragment; changes here trigger a rebuild.
    #[serde(default = "default_style_watch")]
    pub style_watch: String,
    /// Style entry point without extension (`.scss` is tried before `.sass`).
    #[serde(default = "default_style_entry")]
    pub style_entry: String,
    /// Directory receiving `main.css` and its source map.
    #[serde(default = "default_style_output")]
    pub style_output: String,
    /// Glob of script fragments, concatenated in enumeration order.
    #[serde(default = "default_script_input")]
    pub script_input: String,
    /// Directory receiving `main.js`.
    #[serde(default = "default_script_output")]
    pub script_output: String,
    /// Glob of images to compress.
    #[serde(default = "default_image_input")]
    pub image_input: String,
    /// Directory receiving compressed images.
    #[serde(default = "default_image_output")]
    pub image_output: String,
    /// Glob of icons to compress.
    #[serde(default = "default_icon_input")]
    pub icon_input: String,
    /// Directory receiving compressed icons.
    #[serde(default = "default_icon_output")]
    pub icon_output: String,
}

/// How the watch loop notices source changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchStrategyKind {
    /// Scan the watched trees on a fixed interval.
    Poll,
    /// Use the platform's change notification API.
    Native,
}

/// Watch loop configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    /// Detection strategy (default: poll).
    #[serde(default = "default_strategy")]
    pub strategy: WatchStrategyKind,
    /// Poll interval in milliseconds (default: 1000).
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

/// Resolved change detection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchStrategy {
    /// Poll the filesystem every `interval`.
    Poll {
        /// Time between scans.
        interval: Duration,
    },
    /// Native filesystem notifications.
    Native,
}

/// Settings for the external transformation tools.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    /// Dart Sass version, or "latest".
    #[serde(default = "default_tool_version")]
    pub sass_version: String,
    /// esbuild version, or "latest".
    #[serde(default = "default_tool_version")]
    pub esbuild_version: String,
    /// Use this Sass executable instead of a downloaded one.
    #[serde(default)]
    pub sass_path: Option<PathBuf>,
    /// Use this esbuild executable instead of a downloaded one.
    #[serde(default)]
    pub esbuild_path: Option<PathBuf>,
    /// esbuild target list for the CSS prefix and minify pass.
    #[serde(default = "default_css_target")]
    pub css_target: String,
    /// JPEG re-encoding quality, 1-100 (default: 85).
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

fn default_project_name() -> String {
    "unnamed".to_string()
}

fn default_index() -> String {
    "_public/index.html".to_string()
}

fn default_style_watch() -> String {
    "assets/css/**/*.{scss,sass}".to_string()
}

fn default_style_entry() -> String {
    "assets/css/main".to_string()
}

fn default_style_output() -> String {
    "_public/css".to_string()
}

fn default_script_input() -> String {
    "assets/js/**/*.js".to_string()
}

fn default_script_output() -> String {
    "_public/js".to_string()
}

fn default_image_input() -> String {
    "assets/images/**/*".to_string()
}

fn default_image_output() -> String {
    "_public/img".to_string()
}

fn default_icon_input() -> String {
    "assets/icons/**/*".to_string()
}

fn default_icon_output() -> String {
    "_public/ico".to_string()
}

fn default_strategy() -> WatchStrategyKind {
    WatchStrategyKind::Poll
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_tool_version() -> String {
    "latest".to_string()
}

fn default_css_target() -> String {
    "chrome100,edge100,firefox100,safari14".to_string()
}

fn default_jpeg_quality() -> u8 {
    85
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_project_name(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            index: default_index(),
            style_watch: default_style_watch(),
            style_entry: default_style_entry(),
            style_output: default_style_output(),
            script_input: default_script_input(),
            script_output: default_script_output(),
            image_input: default_image_input(),
            image_output: default_image_output(),
            icon_input: default_icon_input(),
            icon_output: default_icon_output(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            interval_ms: default_interval_ms(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            sass_version: default_tool_version(),
            esbuild_version: default_tool_version(),
            sass_path: None,
            esbuild_path: None,
            css_target: default_css_target(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

impl WatchConfig {
    /// Resolves the configured strategy.
    pub fn strategy(&self) -> WatchStrategy {
        match self.strategy {
            WatchStrategyKind::Poll => WatchStrategy::Poll {
                interval: Duration::from_millis(self.interval_ms.max(1)),
            },
            WatchStrategyKind::Native => WatchStrategy::Native,
        }
    }
}

impl PipelineConfig {
    /// Loads `assetflow.toml` from `root`.
    ///
    /// If no configuration file exists, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config_path = root.join(CONFIG_FILE);

        if !config_path.exists() {
            tracing::debug!("No {} found, using defaults", CONFIG_FILE);
            return Ok(Self::with_defaults(root));
        }

        let content = fs::read_to_string(&config_path)?;
        Self::from_toml_str(root, &content)
    }

    /// Parses configuration text, resolving paths against `root`.
    pub fn from_toml_str(root: impl Into<PathBuf>, content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(Self {
            root: root.into(),
            project: file.project,
            paths: file.paths,
            watch: file.watch,
            tools: file.tools,
        })
    }

    /// Default configuration rooted at `root`.
    pub fn with_defaults(root: impl Into<PathBuf>) -> Self {
        let file = ConfigFile::default();
        Self {
            root: root.into(),
            project: file.project,
            paths: file.paths,
            watch: file.watch,
            tools: file.tools,
        }
    }

    /// Project root every relative path is resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a configured path against the project root.
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    /// Resolves a configured glob against the project root.
    ///
    /// The root itself is escaped so directory names containing glob
    /// metacharacters are matched literally.
    pub fn resolve_glob(&self, pattern: &str) -> String {
        if Path::new(pattern).is_absolute() {
            return pattern.to_string();
        }
        let root = glob::Pattern::escape(&self.root.to_string_lossy());
        format!("{}/{}", root.trim_end_matches(['/', '\\']), pattern)
    }

    /// Entry page in the output tree.
    pub fn index_path(&self) -> PathBuf {
        self.resolve(&self.paths.index)
    }

    /// Root of the output tree (the entry page's directory).
    pub fn output_root(&self) -> PathBuf {
        let index = self.index_path();
        index
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone())
    }

    /// Style entry candidates in lookup order.
    pub fn style_entry_candidates(&self) -> Vec<PathBuf> {
        let base = self.resolve(&self.paths.style_entry);
        STYLE_EXTENSIONS
            .iter()
            .map(|ext| base.with_extension(ext))
            .collect()
    }

    /// Style output directory.
    pub fn style_output(&self) -> PathBuf {
        self.resolve(&self.paths.style_output)
    }

    /// Script source glob, resolved.
    pub fn script_pattern(&self) -> String {
        self.resolve_glob(&self.paths.script_input)
    }

    /// Script output directory.
    pub fn script_output(&self) -> PathBuf {
        self.resolve(&self.paths.script_output)
    }

    /// Image source glob, resolved.
    pub fn image_pattern(&self) -> String {
        self.resolve_glob(&self.paths.image_input)
    }

    /// Image output directory.
    pub fn image_output(&self) -> PathBuf {
        self.resolve(&self.paths.image_output)
    }

    /// Icon source glob, resolved.
    pub fn icon_pattern(&self) -> String {
        self.resolve_glob(&self.paths.icon_input)
    }

    /// Icon output directory.
    pub fn icon_output(&self) -> PathBuf {
        self.resolve(&self.paths.icon_output)
    }

    /// Directories generated from code (styles and scripts).
    pub fn code_outputs(&self) -> Vec<PathBuf> {
        vec![self.style_output(), self.script_output()]
    }

    /// Directories generated from images (images and icons).
    pub fn image_outputs(&self) -> Vec<PathBuf> {
        vec![self.image_output(), self.icon_output()]
    }

    /// Globs whose changes trigger a watch rebuild, relative to the root.
    pub fn watch_globs(&self) -> Vec<&str> {
        vec![&self.paths.style_watch, &self.paths.script_input]
    }
}
