// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! External toolchain.
//!
//! Dart Sass and esbuild are downloaded on first use into the user cache
//! directory and reused afterwards. A project can point at its own
//! executables with `tools.sass_path` / `tools.esbuild_path`, which skips
//! the download entirely. Image compression runs in-process.

pub mod build;
mod download;
pub mod images;
pub mod types;

use assetflow::config::ToolsConfig;
use console::style;
use directories::ProjectDirs;
use std::{fs, path::PathBuf, sync::Mutex};

pub use self::build::ExternalTools;
pub use self::types::{Platform, Tool, ToolPath, ToolchainError, ToolchainResult};

/// Downloads that already failed during this execution.
pub(crate) static FAILED_DOWNLOADS: Mutex<Vec<String>> = Mutex::new(Vec::new());

/// Manages tool downloads and caching
pub struct ToolchainManager {
    cache_dir: PathBuf,
}

impl ToolchainManager {
    /// Creates a manager rooted at the user cache directory.
    pub fn new() -> ToolchainResult<Self> {
        let dirs = ProjectDirs::from("com", "maravilla-labs", "assetflow").ok_or_else(|| {
            ToolchainError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine cache directory",
            ))
        })?;
        Self::with_cache_dir(dirs.cache_dir().join("tools"))
    }

    /// Creates a manager caching tools under `cache_dir`.
    pub fn with_cache_dir(cache_dir: PathBuf) -> ToolchainResult<Self> {
        fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    /// Returns the cached tool, downloading it if necessary.
    pub async fn ensure_tool(&self, tool: Tool, version: &str) -> ToolchainResult<ToolPath> {
        let platform = current_platform()?;

        let key = format!("{:?}-{}", tool, version);
        if FAILED_DOWNLOADS
            .lock()
            .map(|failed| failed.contains(&key))
            .unwrap_or(false)
        {
            return Err(ToolchainError::DownloadFailed(
                "Previous download attempt failed, skipping retry".to_string(),
            ));
        }

        if let Some(cached) = self.find_cached_tool(tool, version)? {
            tracing::debug!("Using cached {} {}", tool.as_str(), cached.version);
            return Ok(cached);
        }

        let (version, path) =
            download::download_and_extract(tool, platform, version, &self.cache_dir).await?;
        Ok(ToolPath { tool, version, path })
    }

    /// Looks up `tool` in the cache. `latest` follows the `latest` symlink.
    pub fn find_cached_tool(&self, tool: Tool, version: &str) -> ToolchainResult<Option<ToolPath>> {
        let tool_dir = self.cache_dir.join(tool.as_str());

        let version = if version == "latest" {
            let Ok(target) = fs::read_link(tool_dir.join("latest")) else {
                return Ok(None);
            };
            match target.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => return Ok(None),
            }
        } else {
            version.to_string()
        };

        let executable = tool_dir
            .join(&version)
            .join(current_platform()?.executable_path(tool));

        Ok(executable.is_file().then(|| ToolPath {
            tool,
            version,
            path: executable,
        }))
    }
}

fn current_platform() -> ToolchainResult<Platform> {
    Platform::current().ok_or_else(|| {
        ToolchainError::UnsupportedPlatform("Current platform is not supported".to_string())
    })
}

/// Returns the path to a tool executable, downloading it if necessary
pub async fn ensure_tool(tool: Tool, version: &str) -> ToolchainResult<ToolPath> {
    ToolchainManager::new()?.ensure_tool(tool, version).await
}

/// Executables resolved for one run.
#[derive(Debug, Clone)]
pub struct ToolPaths {
    /// Dart Sass executable.
    pub sass: PathBuf,
    /// esbuild executable.
    pub esbuild: PathBuf,
}

/// Resolves Sass and esbuild, honouring configured overrides.
///
/// Prints one status line per tool unless `quiet`.
pub async fn prepare_tools(config: &ToolsConfig, quiet: bool) -> ToolchainResult<ToolPaths> {
    if !quiet {
        println!("{}", style("Preparing build tools...").cyan());
    }

    let sass = resolve_tool(Tool::Sass, &config.sass_version, config.sass_path.as_ref(), quiet).await;
    let esbuild = resolve_tool(
        Tool::Esbuild,
        &config.esbuild_version,
        config.esbuild_path.as_ref(),
        quiet,
    )
    .await;

    match (sass, esbuild) {
        (Some(sass), Some(esbuild)) => Ok(ToolPaths { sass, esbuild }),
        (sass, esbuild) => {
            let failed: Vec<&str> = [(Tool::Sass, sass.is_none()), (Tool::Esbuild, esbuild.is_none())]
                .into_iter()
                .filter(|(_, missing)| *missing)
                .map(|(tool, _)| tool.as_str())
                .collect();
            Err(ToolchainError::DownloadFailed(format!(
                "Failed to initialize build tools: {}. Check your internet connection or set tools.sass_path / tools.esbuild_path.",
                failed.join(", ")
            )))
        }
    }
}

async fn resolve_tool(
    tool: Tool,
    version: &str,
    overridden: Option<&PathBuf>,
    quiet: bool,
) -> Option<PathBuf> {
    let result = match overridden {
        Some(path) => Ok(ToolPath {
            tool,
            version: "local".to_string(),
            path: path.clone(),
        }),
        None => ensure_tool(tool, version).await,
    };

    match result {
        Ok(found) => {
            if !quiet {
                let version = if found.version == "local" {
                    format!("({})", found.path.display())
                } else {
                    format!("v{}", found.version)
                };
                println!(
                    "{} {} {}",
                    style("✓").green(),
                    style(tool.as_str()).cyan(),
                    style(version).dim()
                );
            }
            Some(found.path)
        }
        Err(e) => {
            eprintln!(
                "{} {} {}: {}",
                style("✗").red(),
                style(tool.as_str()).cyan(),
                style(format!("v{}", version)).dim(),
                style(e.to_string()).red()
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn cached_versions_are_found_without_network() {
        let Some(platform) = Platform::current() else {
            return;
        };
        let dir = TempDir::new().unwrap();
        let manager = ToolchainManager::with_cache_dir(dir.path().to_path_buf()).unwrap();

        assert!(manager.find_cached_tool(Tool::Sass, "1.89.2").unwrap().is_none());

        let exe = dir
            .path()
            .join("sass/1.89.2")
            .join(platform.executable_path(Tool::Sass));
        fs::create_dir_all(exe.parent().unwrap()).unwrap();
        fs::write(&exe, "").unwrap();

        let found = manager.find_cached_tool(Tool::Sass, "1.89.2").unwrap().unwrap();
        assert_eq!(found.path, exe);
        assert_eq!(found.version, "1.89.2");
    }

    #[cfg(unix)]
    #[test]
    fn latest_resolves_through_the_symlink() {
        let Some(platform) = Platform::current() else {
            return;
        };
        let dir = TempDir::new().unwrap();
        let manager = ToolchainManager::with_cache_dir(dir.path().to_path_buf()).unwrap();
        let tool_dir = dir.path().join("esbuild");
        let exe = tool_dir.join("0.25.0").join(platform.executable_path(Tool::Esbuild));
        fs::create_dir_all(exe.parent().unwrap()).unwrap();
        fs::write(&exe, "").unwrap();

        assert!(manager.find_cached_tool(Tool::Esbuild, "latest").unwrap().is_none());

        std::os::unix::fs::symlink("0.25.0", tool_dir.join("latest")).unwrap();
        let found = manager.find_cached_tool(Tool::Esbuild, "latest").unwrap().unwrap();
        assert_eq!(found.version, "0.25.0");
    }

    #[tokio::test]
    async fn configured_paths_skip_the_download() {
        let config = ToolsConfig {
            sass_path: Some(PathBuf::from("/opt/sass/sass")),
            esbuild_path: Some(PathBuf::from("/opt/esbuild")),
            ..ToolsConfig::default()
        };

        let paths = prepare_tools(&config, true).await.unwrap();
        assert_eq!(paths.sass, PathBuf::from("/opt/sass/sass"));
        assert_eq!(paths.esbuild, PathBuf::from("/opt/esbuild"));
    }
}
