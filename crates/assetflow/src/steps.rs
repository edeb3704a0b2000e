// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Transform steps.
//!
//! Each step maps a source glob to an output directory through one external
//! tool reached via [`AssetTools`]. The steps own everything around the tool
//! call: locating inputs, concatenation order, and writing results.
//!
//! Outputs are written to a temporary file in the destination directory and
//! renamed into place, so a failing tool never leaves a half-written file
//! behind.

use crate::config::PipelineConfig;
use crate::error::{AssetError, Result};
use crate::sources::{self, SourceFile};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name of the compiled stylesheet.
pub const STYLE_BUNDLE: &str = "main.css";
/// File name of the stylesheet's source map.
pub const STYLE_MAP: &str = "main.css.map";
/// File name of the script bundle.
pub const SCRIPT_BUNDLE: &str = "main.js";

/// Result of compiling the style entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledStyle {
    /// Minified CSS.
    pub css: String,
    /// Source map for `css`, if the compiler produced one.
    pub source_map: Option<String>,
}

/// The external transformation tools the pipeline delegates to.
///
/// Implementations must be deterministic for identical inputs and must not
/// write into the output tree themselves.
#[allow(async_fn_in_trait)]
pub trait AssetTools {
    /// Compiles a Sass/SCSS entry point to prefixed, minified CSS.
    async fn compile_style(&self, entry: &Path) -> Result<CompiledStyle>;

    /// Minifies an already concatenated script bundle.
    async fn minify_script(&self, bundle: String) -> Result<String>;

    /// Compresses one image or icon, returning the bytes to publish.
    async fn compress_image(&self, path: &Path, bytes: Vec<u8>) -> Result<Vec<u8>>;
}

/// Compiles the style entry point into `main.css` and `main.css.map`.
///
/// Returns the written stylesheet path, or `None` when no entry point exists.
pub async fn compile_style<T: AssetTools>(
    config: &PipelineConfig,
    tools: &T,
) -> Result<Option<PathBuf>> {
    let Some(entry) = config
        .style_entry_candidates()
        .into_iter()
        .find(|candidate| candidate.is_file())
    else {
        tracing::warn!(
            "No style entry point found at {}.{{scss,sass}}, skipping",
            config.paths.style_entry
        );
        return Ok(None);
    };

    tracing::info!("Compiling and compressing styles from {}", entry.display());
    let compiled = tools.compile_style(&entry).await?;

    let out_dir = config.style_output();
    let css_path = out_dir.join(STYLE_BUNDLE);
    let mut css = compiled.css;

    if let Some(map) = compiled.source_map {
        if !css.contains("sourceMappingURL=") {
            if !css.ends_with('\n') {
                css.push('\n');
            }
            css.push_str(&format!("/*# sourceMappingURL={} */\n", STYLE_MAP));
        }
        write_atomic(&out_dir.join(STYLE_MAP), map.as_bytes())?;
    }
    write_atomic(&css_path, css.as_bytes())?;

    Ok(Some(css_path))
}

/// Concatenates script fragments in enumeration order.
///
/// Every fragment is followed by a newline so a missing trailing newline or
/// semicolon-less last line cannot merge with the next file.
pub fn concatenate(files: &[SourceFile]) -> Result<String> {
    let mut bundle = String::new();
    for file in files {
        let content = fs::read_to_string(&file.path)?;
        bundle.push_str(&content);
        if !content.ends_with('\n') {
            bundle.push('\n');
        }
    }
    Ok(bundle)
}

/// Concatenates and minifies scripts into `main.js`.
///
/// Returns the written bundle path, or `None` when no script matched.
pub async fn bundle_script<T: AssetTools>(
    config: &PipelineConfig,
    tools: &T,
) -> Result<Option<PathBuf>> {
    let files = sources::enumerate(&config.script_pattern())?;
    if files.is_empty() {
        tracing::warn!("No scripts match {}, skipping", config.paths.script_input);
        return Ok(None);
    }

    tracing::info!("Concatenating and compressing {} script(s)", files.len());
    let bundle = concatenate(&files)?;
    let minified = tools.minify_script(bundle).await?;

    let out_path = config.script_output().join(SCRIPT_BUNDLE);
    write_atomic(&out_path, minified.as_bytes())?;
    Ok(Some(out_path))
}

/// Compresses every file matching `pattern` into `out_dir`, keeping the
/// directory structure below the glob base.
///
/// Returns the number of files written.
pub async fn compress_images<T: AssetTools>(
    pattern: &str,
    out_dir: &Path,
    tools: &T,
) -> Result<usize> {
    let files = sources::enumerate(pattern)?;
    for file in &files {
        let bytes = fs::read(&file.path)?;
        let original = bytes.len();
        let compressed = tools.compress_image(&file.path, bytes).await?;
        tracing::debug!(
            "{}: {} -> {} bytes",
            file.relative.display(),
            original,
            compressed.len()
        );
        write_atomic(&out_dir.join(&file.relative), &compressed)?;
    }
    Ok(files.len())
}

/// Writes `bytes` to `path` through a sibling temporary file and a rename.
///
/// A replaced file keeps its permissions. A new file gets the mode
/// `fs::write` would give it (0666 minus the umask on unix).
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    #[cfg_attr(not(unix), allow(unused_mut))]
    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let mut tmp = builder.tempfile_in(parent)?;
    if let Ok(existing) = fs::metadata(path) {
        tmp.as_file().set_permissions(existing.permissions())?;
    }
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| AssetError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{project, FakeTools};

    #[tokio::test]
    async fn style_writes_css_and_source_map() {
        let (_dir, config) = project();
        fs::write(config.root().join("assets/css/main.scss"), "a { b: c }").unwrap();

        let written = compile_style(&config, &FakeTools::default()).await.unwrap();

        let css_path = config.style_output().join(STYLE_BUNDLE);
        assert_eq!(written, Some(css_path.clone()));
        let css = fs::read_to_string(&css_path).unwrap();
        assert!(css.starts_with("/*main.scss*/a { b: c }"));
        assert!(css.ends_with("/*# sourceMappingURL=main.css.map */\n"));
        assert!(config.style_output().join(STYLE_MAP).is_file());
    }

    #[tokio::test]
    async fn style_prefers_scss_and_falls_back_to_sass() {
        let (_dir, config) = project();
        fs::write(config.root().join("assets/css/main.sass"), "a\n  b: c").unwrap();

        compile_style(&config, &FakeTools::default()).await.unwrap();
        let css = fs::read_to_string(config.style_output().join(STYLE_BUNDLE)).unwrap();
        assert!(css.starts_with("/*main.sass*/"));
    }

    #[tokio::test]
    async fn missing_style_entry_is_skipped() {
        let (_dir, config) = project();
        let written = compile_style(&config, &FakeTools::default()).await.unwrap();

        assert_eq!(written, None);
        assert!(!config.style_output().exists());
    }

    #[tokio::test]
    async fn failing_style_tool_keeps_previous_output() {
        let (_dir, config) = project();
        fs::write(config.root().join("assets/css/main.scss"), "a {").unwrap();
        fs::create_dir_all(config.style_output()).unwrap();
        fs::write(config.style_output().join(STYLE_BUNDLE), "previous").unwrap();

        let tools = FakeTools::failing_style();
        assert!(compile_style(&config, &tools).await.is_err());

        let css = fs::read_to_string(config.style_output().join(STYLE_BUNDLE)).unwrap();
        assert_eq!(css, "previous");
        let leftovers = fs::read_dir(config.style_output()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[tokio::test]
    async fn script_bundle_preserves_enumeration_order() {
        let (_dir, config) = project();
        let js = config.root().join("assets/js");
        fs::write(js.join("a.js"), "var X = 1;").unwrap();
        fs::write(js.join("b.js"), "console.log(X);\n").unwrap();

        bundle_script(&config, &FakeTools::default()).await.unwrap();

        let bundle = fs::read_to_string(config.script_output().join(SCRIPT_BUNDLE)).unwrap();
        assert_eq!(bundle, "/*min*/var X = 1;\nconsole.log(X);\n");
        assert!(bundle.find("var X").unwrap() < bundle.find("console.log").unwrap());
    }

    #[tokio::test]
    async fn numbered_directories_load_in_order() {
        let (_dir, config) = project();
        let js = config.root().join("assets/js");
        fs::create_dir_all(js.join("1-setup")).unwrap();
        fs::create_dir_all(js.join("3-components")).unwrap();
        fs::write(js.join("3-components/_nav.js"), "nav(X);").unwrap();
        fs::write(js.join("1-setup/z.js"), "var X;").unwrap();

        bundle_script(&config, &FakeTools::default()).await.unwrap();

        let bundle = fs::read_to_string(config.script_output().join(SCRIPT_BUNDLE)).unwrap();
        assert_eq!(bundle, "/*min*/var X;\nnav(X);\n");
    }

    #[tokio::test]
    async fn no_scripts_writes_nothing() {
        let (_dir, config) = project();
        let written = bundle_script(&config, &FakeTools::default()).await.unwrap();

        assert_eq!(written, None);
        assert!(!config.script_output().join(SCRIPT_BUNDLE).exists());
    }

    #[tokio::test]
    async fn images_keep_relative_structure() {
        let (_dir, config) = project();
        let images = config.root().join("assets/images");
        fs::create_dir_all(images.join("gallery")).unwrap();
        fs::write(images.join("logo.png"), b"logo").unwrap();
        fs::write(images.join("gallery/one.jpg"), b"one").unwrap();

        let count = compress_images(
            &config.image_pattern(),
            &config.image_output(),
            &FakeTools::default(),
        )
        .await
        .unwrap();

        assert_eq!(count, 2);
        let out = config.image_output();
        assert_eq!(fs::read(out.join("logo.png")).unwrap(), b"z:logo");
        assert_eq!(fs::read(out.join("gallery/one.jpg")).unwrap(), b"z:one");
    }

    #[test]
    fn atomic_write_replaces_existing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested/out.txt");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn published_files_get_the_regular_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, config) = project();
        fs::write(config.root().join("assets/js/app.js"), "go();").unwrap();
        let reference = config.root().join("reference.txt");
        fs::write(&reference, "x").unwrap();
        let expected = fs::metadata(&reference).unwrap().permissions().mode() & 0o777;

        let bundle = bundle_script(&config, &FakeTools::default())
            .await
            .unwrap()
            .unwrap();

        let mode = fs::metadata(&bundle).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, expected);
    }

    #[cfg(unix)]
    #[test]
    fn replaced_files_keep_their_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("index.html");
        fs::write(&path, "cb=1").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        write_atomic(&path, b"cb=2").unwrap();

        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o640);
    }
}
