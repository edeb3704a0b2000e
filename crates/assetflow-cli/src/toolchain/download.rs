// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Fetching, verifying and unpacking tool releases.

use super::types::{Platform, Tool, ToolchainError, ToolchainResult};
use super::FAILED_DOWNLOADS;
use console::style;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::time::sleep;

const MAX_RETRIES: u32 = 3;

/// Base delay in milliseconds for exponential backoff
const BASE_DELAY_MS: u64 = 500;

/// Used when the GitHub API refuses to tell us the latest Sass release.
const SASS_FALLBACK_VERSION: &str = "1.89.2";

const USER_AGENT: &str = "assetflow-cli";

/// Downloads `tool` into `cache_dir/<tool>/<version>/` and returns the
/// resolved version with the executable path.
pub async fn download_and_extract(
    tool: Tool,
    platform: Platform,
    version: &str,
    cache_dir: &Path,
) -> ToolchainResult<(String, PathBuf)> {
    let client = Client::new();
    let tool_dir = cache_dir.join(tool.as_str());
    fs::create_dir_all(&tool_dir)?;

    let resolved = if version == "latest" {
        fetch_latest_version(&client, tool).await?
    } else {
        version.to_string()
    };

    let version_dir = tool_dir.join(&resolved);
    fs::create_dir_all(&version_dir)?;

    let url = release_url(&client, tool, platform, &resolved).await?;
    let (archive, checksum) = download_with_retry(&client, tool, &resolved, &url, &version_dir).await?;
    extract_archive(tool, &archive, &version_dir)?;

    let executable = version_dir.join(platform.executable_path(tool));
    if !executable.exists() {
        return Err(ToolchainError::ExtractionFailed(format!(
            "{} not found in the {} archive",
            platform.executable_path(tool),
            tool.as_str()
        )));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&executable)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&executable, perms)?;
    }

    fs::write(version_dir.join(format!("{}.sha256", tool.as_str())), checksum)?;

    if version == "latest" {
        link_latest(&tool_dir, &resolved);
    }

    Ok((resolved, executable))
}

/// Points `<tool_dir>/latest` at `version` so later runs skip the lookup.
fn link_latest(tool_dir: &Path, version: &str) {
    let latest = tool_dir.join("latest");
    if latest.is_symlink() {
        let _ = fs::remove_file(&latest);
    }

    #[cfg(unix)]
    let linked = std::os::unix::fs::symlink(version, &latest);
    #[cfg(windows)]
    let linked = std::os::windows::fs::symlink_dir(version, &latest);

    if let Err(e) = linked {
        tracing::debug!("Could not link latest {}: {}", tool_dir.display(), e);
    }
}

async fn fetch_latest_version(client: &Client, tool: Tool) -> ToolchainResult<String> {
    match tool {
        Tool::Sass => {
            let resp = client
                .get("https://api.github.com/repos/sass/dart-sass/releases/latest")
                .header("User-Agent", USER_AGENT)
                .send()
                .await
                .map_err(|e| {
                    ToolchainError::ReleaseFetchFailed(format!("Failed to fetch Sass version: {}", e))
                })?;

            if resp.status() == reqwest::StatusCode::FORBIDDEN {
                return Ok(sass_fallback());
            }

            let body = resp.json::<serde_json::Value>().await.map_err(|e| {
                ToolchainError::ReleaseFetchFailed(format!(
                    "Failed to parse GitHub API response: {}",
                    e
                ))
            })?;

            if let Some(message) = body["message"].as_str() {
                if message.contains("rate limit exceeded") {
                    return Ok(sass_fallback());
                }
                return Err(ToolchainError::ReleaseFetchFailed(format!(
                    "GitHub API error: {}",
                    message
                )));
            }

            let tag = body["tag_name"].as_str().ok_or_else(|| {
                ToolchainError::ReleaseFetchFailed("Failed to parse sass release tag".to_string())
            })?;
            Ok(tag.trim_start_matches('v').to_string())
        }

        Tool::Esbuild => {
            let body = client
                .get("https://registry.npmjs.org/esbuild")
                .header("User-Agent", USER_AGENT)
                .send()
                .await?
                .json::<serde_json::Value>()
                .await?;

            body["dist-tags"]["latest"]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| {
                    ToolchainError::ReleaseFetchFailed(
                        "Failed to parse esbuild latest version from dist-tags".to_string(),
                    )
                })
        }
    }
}

fn sass_fallback() -> String {
    println!(
        "{}",
        style("GitHub API rate limit exceeded. Using fallback version.").yellow()
    );
    SASS_FALLBACK_VERSION.to_string()
}

/// Where the release archive for `tool` lives.
async fn release_url(
    client: &Client,
    tool: Tool,
    platform: Platform,
    version: &str,
) -> ToolchainResult<String> {
    let asset = platform.asset_name(tool, version);
    match tool {
        Tool::Sass => Ok(format!(
            "https://github.com/sass/dart-sass/releases/download/{}/{}",
            version, asset
        )),
        // esbuild ships per-platform npm packages; the tarball URL is in the metadata
        Tool::Esbuild => {
            let info = client
                .get(format!("https://registry.npmjs.org/{}/{}", asset, version))
                .header("User-Agent", USER_AGENT)
                .send()
                .await?
                .json::<serde_json::Value>()
                .await?;

            info["dist"]["tarball"]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| {
                    ToolchainError::DownloadFailed(format!(
                        "Failed to extract tarball URL from package metadata: {}",
                        asset
                    ))
                })
        }
    }
}

fn archive_extension(url: &str) -> &'static str {
    if url.ends_with(".zip") {
        ".zip"
    } else {
        ".tar.gz"
    }
}

/// Streams `url` to disk, hashing as it goes.
async fn download_with_retry(
    client: &Client,
    tool: Tool,
    version: &str,
    url: &str,
    version_dir: &Path,
) -> ToolchainResult<(PathBuf, String)> {
    let download_path = version_dir.join(format!("{}{}", tool.as_str(), archive_extension(url)));
    let mut attempt = 0;

    loop {
        let pb = ProgressBar::new(0);
        if let Ok(bar) = ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        {
            pb.set_style(bar.progress_chars("#>-"));
        }
        pb.set_message(format!(
            "Downloading {} v{}...",
            style(tool.as_str()).cyan(),
            style(version).cyan()
        ));

        let result = async {
            let resp = client.get(url).header("User-Agent", USER_AGENT).send().await?;

            let status = resp.status();
            if !status.is_success() {
                return Err(ToolchainError::DownloadFailed(format!(
                    "HTTP error: {} when downloading from URL: {}",
                    status, url
                )));
            }
            pb.set_length(resp.content_length().unwrap_or(0));

            let mut file = File::create(&download_path)?;
            let mut hasher = Sha256::new();
            let mut downloaded = 0;
            let mut stream = resp.bytes_stream();

            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                downloaded += chunk.len() as u64;
                pb.set_position(downloaded);
                hasher.update(&chunk);
                file.write_all(&chunk)?;
            }

            Ok::<_, ToolchainError>(format!("{:x}", hasher.finalize()))
        }
        .await;

        match result {
            Ok(checksum) => {
                pb.finish_with_message(format!(
                    "Downloaded {} v{}",
                    style(tool.as_str()).green(),
                    style(version).green()
                ));
                return Ok((download_path, checksum));
            }
            Err(err) => {
                attempt += 1;
                if attempt >= MAX_RETRIES {
                    pb.abandon();
                    if let Ok(mut failed) = FAILED_DOWNLOADS.lock() {
                        failed.push(format!("{:?}-{}", tool, version));
                    }
                    return Err(err);
                }

                let delay = BASE_DELAY_MS * 2_u64.pow(attempt - 1);
                pb.finish_with_message(format!(
                    "Download failed, retrying in {}ms ({}/{})",
                    style(delay).yellow(),
                    style(attempt).yellow(),
                    style(MAX_RETRIES).yellow()
                ));
                sleep(Duration::from_millis(delay)).await;
            }
        }
    }
}

/// Unpacks `archive` into `extract_dir` and deletes it.
fn extract_archive(tool: Tool, archive: &Path, extract_dir: &Path) -> ToolchainResult<()> {
    let pb = ProgressBar::new_spinner();
    if let Ok(spinner) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(spinner);
    }
    pb.set_message(format!("Extracting {}...", style(tool.as_str()).cyan()));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = if archive.extension().is_some_and(|ext| ext == "zip") {
        unpack_zip(archive, extract_dir)
    } else {
        unpack_tar_gz(archive, extract_dir)
    }
    .and_then(|()| fs::remove_file(archive).map_err(ToolchainError::from));

    match &result {
        Ok(()) => pb.finish_with_message(format!("Extracted {}", style(tool.as_str()).green())),
        Err(err) => pb.finish_with_message(format!(
            "Extraction failed: {}",
            style(err.to_string()).red()
        )),
    }
    result
}

pub(crate) fn unpack_tar_gz(archive: &Path, extract_dir: &Path) -> ToolchainResult<()> {
    let decoder = flate2::read::GzDecoder::new(File::open(archive)?);
    tar::Archive::new(decoder)
        .unpack(extract_dir)
        .map_err(|e| ToolchainError::ExtractionFailed(format!("{}: {}", archive.display(), e)))
}

pub(crate) fn unpack_zip(archive: &Path, extract_dir: &Path) -> ToolchainResult<()> {
    let mut zip = zip::ZipArchive::new(File::open(archive)?)?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        // entries escaping the target directory are skipped
        let Some(outpath) = entry.enclosed_name().map(|p| extract_dir.join(p)) else {
            continue;
        };

        if entry.is_dir() {
            fs::create_dir_all(&outpath)?;
            continue;
        }
        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent)?;
        }
        io::copy(&mut entry, &mut File::create(&outpath)?)?;
    }

    Ok(())
}
