// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Type definitions for the external toolchain.

use std::path::PathBuf;
use thiserror::Error;

/// External executables the pipeline can download and run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// Dart Sass - style compiler
    Sass,
    /// esbuild - script minifier
    Esbuild,
}

impl Tool {
    /// Returns the string identifier for this tool.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Sass => "sass",
            Tool::Esbuild => "esbuild",
        }
    }
}

/// Represents the target platform for binary downloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Linux x86_64
    LinuxX64,
    /// Linux ARM64/AArch64
    LinuxArm64,
    /// macOS x86_64 (Intel)
    DarwinX64,
    /// macOS ARM64 (Apple Silicon)
    DarwinArm64,
    /// Windows x86_64
    WindowsX64,
}

impl Platform {
    /// Get the current platform
    pub fn current() -> Option<Self> {
        #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
        {
            Some(Platform::LinuxX64)
        }
        #[cfg(all(target_os = "linux", target_arch = "aarch64"))]
        {
            Some(Platform::LinuxArm64)
        }
        #[cfg(all(target_os = "macos", target_arch = "x86_64"))]
        {
            Some(Platform::DarwinX64)
        }
        #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
        {
            Some(Platform::DarwinArm64)
        }
        #[cfg(all(target_os = "windows", target_arch = "x86_64"))]
        {
            Some(Platform::WindowsX64)
        }
        #[cfg(not(any(
            all(target_os = "linux", target_arch = "x86_64"),
            all(target_os = "linux", target_arch = "aarch64"),
            all(target_os = "macos", target_arch = "x86_64"),
            all(target_os = "macos", target_arch = "aarch64"),
            all(target_os = "windows", target_arch = "x86_64")
        )))]
        {
            None
        }
    }

    fn os_arch(&self) -> (&'static str, &'static str) {
        match self {
            Platform::LinuxX64 => ("linux", "x64"),
            Platform::LinuxArm64 => ("linux", "arm64"),
            Platform::DarwinX64 => ("darwin", "x64"),
            Platform::DarwinArm64 => ("darwin", "arm64"),
            Platform::WindowsX64 => ("win32", "x64"),
        }
    }

    /// Release asset (Sass) or npm package (esbuild) for this platform.
    pub fn asset_name(&self, tool: Tool, version: &str) -> String {
        let (os, arch) = self.os_arch();
        match tool {
            Tool::Sass => {
                let os = match os {
                    "darwin" => "macos",
                    "win32" => "windows",
                    other => other,
                };
                let ext = if *self == Platform::WindowsX64 { "zip" } else { "tar.gz" };
                format!("dart-sass-{}-{}-{}.{}", version, os, arch, ext)
            }
            Tool::Esbuild => format!("@esbuild/{}-{}", os, arch),
        }
    }

    /// Get the executable path inside the extracted archive
    pub fn executable_path(&self, tool: Tool) -> &'static str {
        match (tool, self) {
            (Tool::Sass, Platform::WindowsX64) => "dart-sass/sass.bat",
            (Tool::Sass, _) => "dart-sass/sass",
            (Tool::Esbuild, Platform::WindowsX64) => "package/esbuild.exe",
            (Tool::Esbuild, _) => "package/bin/esbuild",
        }
    }
}

/// Path to a tool's executable.
#[derive(Debug, Clone)]
pub struct ToolPath {
    /// The tool type.
    pub tool: Tool,
    /// Version string.
    pub version: String,
    /// Path to the executable.
    pub path: PathBuf,
}

/// Errors related to toolchain operations
#[derive(Debug, Error)]
pub enum ToolchainError {
    /// The current platform is not supported by the toolchain
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// An error occurred during tool download
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    /// An error occurred while extracting a downloaded archive
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    /// Failed to fetch the latest release information from GitHub or NPM
    #[error("Failed to fetch release information: {0}")]
    ReleaseFetchFailed(String),

    /// An I/O error occurred (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An error occurred while working with zip archives
    #[error("Zip error: {0}")]
    Zip(String),

    /// A network request error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON parsing failed (usually when parsing API responses)
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for toolchain operations
pub type ToolchainResult<T> = Result<T, ToolchainError>;

impl From<zip::result::ZipError> for ToolchainError {
    fn from(e: zip::result::ZipError) -> Self {
        ToolchainError::Zip(e.to_string())
    }
}
