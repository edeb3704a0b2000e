// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Pipeline tools backed by external executables.
//!
//! Dart Sass compiles styles into a scratch directory which is read back, so
//! the output tree is only ever written by the pipeline's atomic writer. The
//! compiled CSS then goes through esbuild, which adds vendor prefixes for the
//! configured targets and minifies. esbuild also minifies the concatenated
//! script bundle. Both esbuild passes run over stdin/stdout.
//!
//! Every child is killed when its future is dropped, so a sibling step
//! failing mid-stage does not leave compilers running.

use super::images::optimize_image;
use super::ToolPaths;
use assetflow::config::ToolsConfig;
use assetflow::{AssetError, AssetTools, CompiledStyle, Result, Step};
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// [`AssetTools`] implementation running Dart Sass, esbuild and the
/// in-process image optimizer.
#[derive(Debug, Clone)]
pub struct ExternalTools {
    sass: Option<PathBuf>,
    esbuild: Option<PathBuf>,
    working_dir: PathBuf,
    css_target: String,
    jpeg_quality: u8,
}

impl ExternalTools {
    /// Tools for a pipeline that compiles code.
    pub fn new(paths: ToolPaths, working_dir: impl Into<PathBuf>, config: &ToolsConfig) -> Self {
        Self {
            sass: Some(paths.sass),
            esbuild: Some(paths.esbuild),
            ..Self::images_only(working_dir, config)
        }
    }

    /// Tools for a pipeline that only compresses images.
    pub fn images_only(working_dir: impl Into<PathBuf>, config: &ToolsConfig) -> Self {
        Self {
            sass: None,
            esbuild: None,
            working_dir: working_dir.into(),
            css_target: config.css_target.clone(),
            jpeg_quality: config.jpeg_quality,
        }
    }

    /// Runs `program` with `input` on stdin and returns its stdout.
    async fn filter(&self, step: Step, program: &Path, args: &[&str], input: String) -> Result<String> {
        let mut child = Command::new(program)
            .args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_failed(step, program, e))?;

        // feed stdin concurrently so a full stdout pipe cannot stall the child
        let feeder = child.stdin.take().map(|mut stdin| {
            tokio::spawn(async move {
                let written = stdin.write_all(input.as_bytes()).await;
                drop(stdin);
                written
            })
        });

        let output = child.wait_with_output().await?;
        if let Some(feeder) = feeder {
            feeder.await??;
        }
        check(step, &output)?;

        String::from_utf8(output.stdout)
            .map_err(|e| AssetError::tool(step.as_str(), format!("non UTF-8 output: {}", e)))
    }
}

fn executable<'a>(path: &'a Option<PathBuf>, step: Step) -> Result<&'a Path> {
    path.as_deref()
        .ok_or_else(|| AssetError::tool(step.as_str(), "tool was not prepared for this command"))
}

/// Turns a non-zero exit into a tool error carrying stderr.
fn check(step: Step, output: &Output) -> Result<()> {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !output.status.success() {
        let message = match stderr.trim() {
            "" => format!("exited with {}", output.status),
            text => text.to_string(),
        };
        return Err(AssetError::tool(step.as_str(), message));
    }
    if !stderr.trim().is_empty() {
        tracing::warn!("{} warnings:\n{}", step, stderr.trim_end());
    }
    Ok(())
}

fn spawn_failed(step: Step, program: &Path, err: std::io::Error) -> AssetError {
    AssetError::tool(
        step.as_str(),
        format!("could not run {}: {}", program.display(), err),
    )
}

/// Drops the trailing source map reference Sass appends.
///
/// esbuild reads stdin from the project directory and would otherwise try
/// to resolve the map there.
fn strip_map_reference(css: &str) -> &str {
    match css.rfind("/*# sourceMappingURL=") {
        Some(at) => css[..at].trim_end(),
        None => css,
    }
}

impl AssetTools for ExternalTools {
    async fn compile_style(&self, entry: &Path) -> Result<CompiledStyle> {
        let sass = executable(&self.sass, Step::Style)?;
        let esbuild = executable(&self.esbuild, Step::Style)?;
        let scratch = tempfile::tempdir()?;
        let css_path = scratch.path().join(assetflow::steps::STYLE_BUNDLE);

        let output = Command::new(sass)
            .arg(entry)
            .arg(&css_path)
            .args([
                "--style=compressed",
                "--source-map",
                "--source-map-urls=absolute",
                "--embed-sources",
                "--no-error-css",
            ])
            .current_dir(&self.working_dir)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| spawn_failed(Step::Style, sass, e))?;
        check(Step::Style, &output)?;

        let compiled = tokio::fs::read_to_string(&css_path).await?;
        let map_path = scratch.path().join(assetflow::steps::STYLE_MAP);
        let source_map = match tokio::fs::read_to_string(&map_path).await {
            Ok(map) => Some(map),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let target = format!("--target={}", self.css_target);
        let css = self
            .filter(
                Step::Style,
                esbuild,
                &["--loader=css", "--minify", target.as_str(), "--log-level=warning"],
                strip_map_reference(&compiled).to_string(),
            )
            .await?;

        Ok(CompiledStyle { css, source_map })
    }

    async fn minify_script(&self, bundle: String) -> Result<String> {
        let esbuild = executable(&self.esbuild, Step::Script)?;
        self.filter(
            Step::Script,
            esbuild,
            &["--minify", "--loader=js", "--log-level=warning"],
            bundle,
        )
        .await
    }

    async fn compress_image(&self, path: &Path, bytes: Vec<u8>) -> Result<Vec<u8>> {
        let quality = self.jpeg_quality;
        tokio::task::spawn_blocking(move || optimize_image(bytes, quality))
            .await?
            .map_err(|e| AssetError::tool(Step::Images.as_str(), format!("{}: {}", path.display(), e)))
    }
}
