// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Project initialization command.
//!
//! Writes the starter source tree and output tree. The template's `public`
//! directory lands at the configured output root (`_public` by default).
//! Files that already exist are left alone and reported.

use assetflow::PipelineConfig;
use console::style;
use include_dir::{include_dir, Dir, DirEntry};
use std::fs;
use std::path::{Path, PathBuf};

static DEFAULT_TEMPLATE: Dir = include_dir!("$CARGO_MANIFEST_DIR/templates/default");

/// Top-level template directory standing for the output tree.
const OUTPUT_DIR: &str = "public";

/// Source directories created even though the template has no file in them.
const EMPTY_SOURCE_DIRS: [&str; 4] = [
    "assets/js/1-setup",
    "assets/js/2-elements",
    "assets/icons",
    "assets/images",
];

/// What [`scaffold`] did, with paths relative to the project directory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScaffoldReport {
    /// Files written.
    pub created: Vec<PathBuf>,
    /// Files that already existed and were kept.
    pub skipped: Vec<PathBuf>,
}

/// Initializes a new project.
pub async fn run(name: Option<String>) -> anyhow::Result<()> {
    let (project_dir, project_name) = resolve_project_path(name)?;
    let is_current_dir = project_dir == std::env::current_dir()?;

    let report = scaffold(&project_dir, &project_name)?;
    print_report(&project_name, &report, is_current_dir);
    Ok(())
}

fn resolve_project_path(name: Option<String>) -> anyhow::Result<(PathBuf, String)> {
    match name.as_deref() {
        Some(".") | None => {
            let current_dir = std::env::current_dir()?;
            let dir_name = current_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "my-site".to_string());
            Ok((current_dir, dir_name))
        }
        Some(name) => {
            let project_path = PathBuf::from(name);
            let dir_name = project_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| name.to_string());
            Ok((project_path, dir_name))
        }
    }
}

/// Creates the starter tree for `project_name` in `target`.
///
/// An existing `assetflow.toml` decides where the output tree goes;
/// otherwise the defaults do.
pub fn scaffold(target: &Path, project_name: &str) -> anyhow::Result<ScaffoldReport> {
    fs::create_dir_all(target)?;
    let config = PipelineConfig::load(target)?;
    let output_root = config
        .output_root()
        .strip_prefix(target)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| PathBuf::from("_public"));

    let mut report = ScaffoldReport::default();
    for entry in DEFAULT_TEMPLATE.entries() {
        extract_entry(entry, target, &output_root, project_name, &mut report)?;
    }

    let empty_dirs = EMPTY_SOURCE_DIRS
        .iter()
        .map(|dir| target.join(dir))
        .chain(config.image_outputs())
        .chain(config.code_outputs())
        .chain([config.output_root().join("fonts")]);
    for dir in empty_dirs {
        fs::create_dir_all(dir)?;
    }

    Ok(report)
}

fn extract_entry(
    entry: &DirEntry,
    target: &Path,
    output_root: &Path,
    project_name: &str,
    report: &mut ScaffoldReport,
) -> anyhow::Result<()> {
    match entry {
        DirEntry::Dir(dir) => {
            for child in dir.entries() {
                extract_entry(child, target, output_root, project_name, report)?;
            }
        }
        DirEntry::File(file) => {
            let template_path = file.path();
            let file_name = template_path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow::anyhow!("Invalid file name: {:?}", template_path))?;

            let (target_name, is_template) = match file_name.strip_suffix(".tmpl") {
                Some(stripped) => (stripped, true),
                None => (file_name, false),
            };

            let relative = match template_path.strip_prefix(OUTPUT_DIR) {
                Ok(inside) => output_root.join(inside),
                Err(_) => template_path.to_path_buf(),
            }
            .with_file_name(target_name);

            let destination = target.join(&relative);
            if destination.exists() {
                tracing::debug!("Keeping existing {}", destination.display());
                report.skipped.push(relative);
                return Ok(());
            }
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)?;
            }

            let content = file
                .contents_utf8()
                .ok_or_else(|| anyhow::anyhow!("Non-UTF8 file: {:?}", template_path))?;
            if is_template {
                fs::write(&destination, content.replace("{{project_name}}", project_name))?;
            } else {
                fs::write(&destination, content)?;
            }
            report.created.push(relative);
        }
    }
    Ok(())
}

fn print_report(project_name: &str, report: &ScaffoldReport, is_current_dir: bool) {
    for path in &report.skipped {
        println!(
            "{} {} {}",
            style("-").yellow(),
            path.display(),
            style("(exists, skipped)").dim()
        );
    }
    println!(
        "{} {} ({} files created)",
        style("Created assetflow project:").green(),
        project_name,
        report.created.len()
    );
    println!();
    println!("Next steps:");
    if !is_current_dir {
        println!("  cd {}", project_name);
    }
    println!("  assetflow");
}
