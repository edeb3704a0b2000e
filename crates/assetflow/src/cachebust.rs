// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Cache-bust token rewriting.
//!
//! The entry page references its assets as `main.css?cb=<n>` and
//! `main.js?cb=<n>`. After every rebuild each `cb=<digits>` token is replaced
//! with a fresh value so browsers fetch the new bundles.

use crate::error::{AssetError, Result};
use crate::steps::write_atomic;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"cb=\d+").expect("cache-bust pattern is valid"))
}

/// Issues cache-bust tokens.
///
/// Tokens are the current time in milliseconds since the Unix epoch, bumped
/// when needed so each token is strictly greater than the previous one
/// issued by the same buster.
#[derive(Debug, Default)]
pub struct CacheBuster {
    last: AtomicU64,
}

impl CacheBuster {
    /// Creates a buster that has issued no tokens yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next token.
    pub fn next_token(&self) -> u64 {
        let now = epoch_millis();
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }

    /// Rewrites the tokens in `page` in place with a fresh token.
    ///
    /// Returns the token written.
    pub fn bust(&self, page: &Path) -> Result<u64> {
        let token = self.next_token();
        rewrite_entry_page(page, token)?;
        Ok(token)
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Replaces every `cb=<digits>` in `page` with `cb=<token>`.
///
/// Returns the rewritten text and the number of tokens replaced.
pub fn rewrite_tokens(page: &str, token: u64) -> (String, usize) {
    let count = token_pattern().find_iter(page).count();
    let replacement = format!("cb={}", token);
    let rewritten = token_pattern()
        .replace_all(page, regex::NoExpand(&replacement))
        .into_owned();
    (rewritten, count)
}

/// Rewrites the tokens of the entry page at `path`.
///
/// Returns the number of tokens replaced. A page without tokens is left
/// untouched.
pub fn rewrite_entry_page(path: &Path, token: u64) -> Result<usize> {
    let page = match fs::read_to_string(path) {
        Ok(page) => page,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AssetError::EntryPageMissing(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };

    let (rewritten, count) = rewrite_tokens(&page, token);
    if count == 0 {
        tracing::warn!("No cb=<n> token found in {}", path.display());
        return Ok(0);
    }

    write_atomic(path, rewritten.as_bytes())?;
    tracing::info!("Cache-bust: {} token(s) set to cb={}", count, token);
    Ok(count)
}
