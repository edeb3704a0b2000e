// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Integration tests for `assetflow init` and the pipelines that need no
//! external executables.

use std::fs;
use std::path::{Path, PathBuf};

use assetflow::{Orchestrator, Pipeline, PipelineConfig, Stage, Step};
use assetflow_cli::commands::init::scaffold;
use assetflow_cli::toolchain::ExternalTools;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageEncoder, Rgb, RgbImage};
use tempfile::tempdir;

fn png_fixture() -> Vec<u8> {
    let image = RgbImage::from_fn(32, 32, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 64]));
    let mut bytes = Vec::new();
    PngEncoder::new_with_quality(&mut bytes, CompressionType::Fast, FilterType::NoFilter)
        .write_image(image.as_raw(), image.width(), image.height(), image::ColorType::Rgb8)
        .unwrap();
    bytes
}

#[test]
fn init_creates_the_starter_tree() {
    let dir = tempdir().unwrap();
    let report = scaffold(dir.path(), "demo").unwrap();
    let root = dir.path();

    for file in [
        "assetflow.toml",
        "assets/css/main.sass",
        "assets/css/1-setup/_variables.sass",
        "assets/css/3-components/_nav.scss",
        "assets/css/4-pages/_main.sass",
        "assets/js/3-components/_nav.js",
        "_public/index.html",
        "_public/css/main.css",
        "_public/js/main.js",
    ] {
        assert!(root.join(file).is_file(), "missing {}", file);
        assert!(report.created.contains(&PathBuf::from(file)), "unreported {}", file);
    }
    for dir in [
        "assets/js/1-setup",
        "assets/js/2-elements",
        "assets/icons",
        "assets/images",
        "_public/img",
        "_public/ico",
        "_public/fonts",
    ] {
        assert!(root.join(dir).is_dir(), "missing {}", dir);
    }
    assert!(report.skipped.is_empty());

    let config = fs::read_to_string(root.join("assetflow.toml")).unwrap();
    assert!(config.contains("name = \"demo\""));
    assert!(!root.join("assetflow.toml.tmpl").exists());

    let index = fs::read_to_string(root.join("_public/index.html")).unwrap();
    assert_eq!(index.matches("cb=0").count(), 2);

    let loaded = PipelineConfig::load(root).unwrap();
    assert_eq!(loaded.project.name, "demo");
}

#[test]
fn init_never_overwrites_existing_files() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("assets/css")).unwrap();
    fs::write(root.join("assets/css/main.sass"), "// mine").unwrap();

    let report = scaffold(root, "demo").unwrap();
    assert_eq!(report.skipped, vec![PathBuf::from("assets/css/main.sass")]);
    assert_eq!(fs::read_to_string(root.join("assets/css/main.sass")).unwrap(), "// mine");

    let again = scaffold(root, "other").unwrap();
    assert!(again.created.is_empty());
    assert_eq!(again.skipped.len(), report.created.len() + 1);
    assert!(fs::read_to_string(root.join("assetflow.toml"))
        .unwrap()
        .contains("name = \"demo\""));
}

#[test]
fn init_follows_a_configured_output_root() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::write(
        root.join("assetflow.toml"),
        "[paths]\nindex = \"site/index.html\"\nimage_output = \"site/img\"\nicon_output = \"site/ico\"\nstyle_output = \"site/css\"\nscript_output = \"site/js\"\n",
    )
    .unwrap();

    scaffold(root, "demo").unwrap();

    assert!(root.join("site/index.html").is_file());
    assert!(root.join("site/fonts").is_dir());
    assert!(!root.join("_public").exists());
}

async fn run(root: &Path, pipeline: &Pipeline) -> assetflow::Result<()> {
    let config = PipelineConfig::load(root)?;
    let tools = ExternalTools::images_only(root, &config.tools);
    Orchestrator::new(config, tools).run(pipeline).await
}

#[tokio::test]
async fn scaffolded_page_is_cache_busted() {
    let dir = tempdir().unwrap();
    scaffold(dir.path(), "demo").unwrap();

    let bust = Pipeline::new("bust", vec![Stage::single(Step::CacheBust)]);
    run(dir.path(), &bust).await.unwrap();

    let index = fs::read_to_string(dir.path().join("_public/index.html")).unwrap();
    assert!(!index.contains("cb=0\""));
    assert!(index.contains("css/main.css?cb="));
    assert!(index.contains("<nav></nav>"));
}

#[tokio::test]
async fn img_pipeline_compresses_into_the_output_tree() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    scaffold(root, "demo").unwrap();

    let png = png_fixture();
    fs::create_dir_all(root.join("assets/images/gallery")).unwrap();
    fs::write(root.join("assets/images/gallery/photo.png"), &png).unwrap();
    fs::write(root.join("assets/icons/logo.svg"), "<svg/>").unwrap();

    run(root, &Pipeline::images_only()).await.unwrap();

    let published = fs::read(root.join("_public/img/gallery/photo.png")).unwrap();
    assert!(published.len() <= png.len());
    assert_eq!(
        image::load_from_memory(&published).unwrap().to_rgb8(),
        image::load_from_memory(&png).unwrap().to_rgb8()
    );
    assert_eq!(fs::read_to_string(root.join("_public/ico/logo.svg")).unwrap(), "<svg/>");
}

#[tokio::test]
async fn code_steps_fail_without_prepared_tools() {
    let dir = tempdir().unwrap();
    scaffold(dir.path(), "demo").unwrap();

    let err = run(dir.path(), &Pipeline::watch_rebuild()).await.unwrap_err();
    assert!(err.to_string().contains("tool was not prepared"));
}
