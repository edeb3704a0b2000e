// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Clean command: delete every output directory and rebuild once.

use assetflow::{Pipeline, PipelineConfig};
use console::style;
use std::path::PathBuf;

/// Deletes all outputs, then rebuilds styles, scripts, icons and images in sequence.
pub async fn run(quiet: bool) -> anyhow::Result<()> {
    if !quiet {
        let config = super::load_config()?;
        for dir in outside_project(&config) {
            println!(
                "{} {}",
                style("Deleting output outside the project:").yellow(),
                dir.display()
            );
        }
    }
    super::execute(Pipeline::clean_rebuild(), quiet).await
}

/// Output directories that do not live below the project root.
fn outside_project(config: &PipelineConfig) -> Vec<PathBuf> {
    let root = config.root();
    config
        .code_outputs()
        .into_iter()
        .chain(config.image_outputs())
        .filter(|dir| {
            let normalized: PathBuf = dir.components().fold(PathBuf::new(), |mut acc, c| {
                match c {
                    std::path::Component::ParentDir => {
                        acc.pop();
                    }
                    std::path::Component::CurDir => {}
                    other => acc.push(other),
                }
                acc
            });
            !normalized.starts_with(root)
        })
        .collect()
}
