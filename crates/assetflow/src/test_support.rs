// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Shared fixtures for unit tests.

use crate::config::PipelineConfig;
use crate::error::{AssetError, Result};
use crate::pipeline::{PipelineObserver, Step};
use crate::steps::{AssetTools, CompiledStyle};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Creates a project with empty source directories and default config.
pub fn project() -> (TempDir, PipelineConfig) {
    let dir = TempDir::new().unwrap();
    for sub in ["assets/css", "assets/js", "assets/icons", "assets/images"] {
        fs::create_dir_all(dir.path().join(sub)).unwrap();
    }
    let config = PipelineConfig::with_defaults(dir.path());
    (dir, config)
}

/// Reads every file below `root` into a map keyed by relative path.
pub fn read_tree(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let relative = path.strip_prefix(root).unwrap().to_path_buf();
                out.insert(relative, fs::read(&path).unwrap());
            }
        }
    }
    let mut out = BTreeMap::new();
    if root.exists() {
        walk(root, root, &mut out);
    }
    out
}

/// Deterministic stand-in for the external tools.
///
/// Styles are prefixed with the entry file name, scripts with `/*min*/`,
/// images with `z:`.
#[derive(Debug, Default)]
pub struct FakeTools {
    style_failures: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl FakeTools {
    /// Tools whose style compiler always fails.
    pub fn failing_style() -> Self {
        Self::failing_style_times(usize::MAX)
    }

    /// Tools whose style compiler fails `times` times, then succeeds.
    pub fn failing_style_times(times: usize) -> Self {
        Self {
            style_failures: AtomicUsize::new(times),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Tool invocations so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl AssetTools for FakeTools {
    async fn compile_style(&self, entry: &Path) -> Result<CompiledStyle> {
        self.record(format!("style {}", entry.display()));
        let remaining = self.style_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != usize::MAX {
                self.style_failures.store(remaining - 1, Ordering::SeqCst);
            }
            return Err(AssetError::tool("styles", "expected \"}\""));
        }
        let name = entry.file_name().unwrap().to_string_lossy();
        let source = fs::read_to_string(entry)?;
        Ok(CompiledStyle {
            css: format!("/*{}*/{}", name, source),
            source_map: Some(r#"{"version":3,"mappings":""}"#.to_string()),
        })
    }

    async fn minify_script(&self, bundle: String) -> Result<String> {
        self.record("script".to_string());
        Ok(format!("/*min*/{}", bundle))
    }

    async fn compress_image(&self, path: &Path, bytes: Vec<u8>) -> Result<Vec<u8>> {
        self.record(format!("image {}", path.display()));
        let mut out = b"z:".to_vec();
        out.extend(bytes);
        Ok(out)
    }
}

/// Observer recording events as `start <step>`, `finish <step>`,
/// `fail <step>`, `rebuild <n>`, `rebuilt`, `rebuild failed`.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
    rebuilds: Arc<AtomicUsize>,
}

impl Recorder {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Number of finished rebuilds, successful or not.
    pub fn rebuilds(&self) -> usize {
        self.rebuilds.load(Ordering::SeqCst)
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl PipelineObserver for Recorder {
    fn step_started(&self, step: Step) {
        self.push(format!("start {}", step));
    }

    fn step_finished(&self, step: Step, _elapsed: Duration, outcome: std::result::Result<(), &AssetError>) {
        match outcome {
            Ok(()) => self.push(format!("finish {}", step)),
            Err(_) => self.push(format!("fail {}", step)),
        }
    }

    fn rebuild_started(&self, changed: &[PathBuf]) {
        self.push(format!("rebuild {}", changed.len()));
    }

    fn rebuild_finished(&self, outcome: std::result::Result<(), &AssetError>) {
        match outcome {
            Ok(()) => self.push("rebuilt".to_string()),
            Err(_) => self.push("rebuild failed".to_string()),
        }
        self.rebuilds.fetch_add(1, Ordering::SeqCst);
    }
}
