// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Source glob enumeration.
//!
//! Matches are yielded in a stable order: directory entries sorted by name,
//! depth first. Script bundling relies on this order, so numbered
//! directories such as `1-setup/` load before `2-elements/`.

use crate::error::Result;
use std::path::{Component, Path, PathBuf};

const GLOB_META: [char; 5] = ['*', '?', '[', ']', '{'];

/// A file matched by a source glob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute (or root-joined) path of the file.
    pub path: PathBuf,
    /// Path relative to the glob's base directory.
    pub relative: PathBuf,
}

/// Returns the wildcard-free prefix of a glob.
///
/// `assets/js/**/*.js` has base `assets/js`; outputs mirror the structure
/// below it. Escaped metacharacters (`[[]`, `[]]`, `[*]`, `[?]`) are taken
/// literally and unescaped in the result.
pub fn glob_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    for component in Path::new(pattern).components() {
        match component {
            Component::Normal(part) => match literal(&part.to_string_lossy()) {
                Some(text) => base.push(text),
                None => break,
            },
            other => base.push(other),
        }
    }
    base
}

/// Enumerates the regular files matching `pattern`.
///
/// Wildcards never match a leading dot, so `.gitkeep` and friends are left
/// out unless the pattern names them.
pub fn enumerate(pattern: &str) -> Result<Vec<SourceFile>> {
    let base = glob_base(pattern);
    let mut files = Vec::new();

    let options = glob::MatchOptions {
        require_literal_leading_dot: true,
        ..glob::MatchOptions::new()
    };
    for entry in glob::glob_with(pattern, options)? {
        let path = entry?;
        if !path.is_file() {
            continue;
        }
        let relative = path
            .strip_prefix(&base)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| {
                path.file_name()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| path.clone())
            });
        files.push(SourceFile { path, relative });
    }

    tracing::debug!("{} matched {} file(s)", pattern, files.len());
    Ok(files)
}

fn literal(part: &str) -> Option<String> {
    let mut out = String::with_capacity(part.len());
    let mut rest = part;
    while let Some(c) = rest.chars().next() {
        if let Some(escaped) = ["[[]", "[]]", "[*]", "[?]"]
            .iter()
            .find(|seq| rest.starts_with(**seq))
        {
            out.push_str(&escaped[1..2]);
            rest = &rest[3..];
            continue;
        }
        if GLOB_META.contains(&c) {
            return None;
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    Some(out)
}
