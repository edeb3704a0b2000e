// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Removal of generated output directories.

use crate::error::Result;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Recursively deletes every directory in `dirs`.
///
/// A directory that does not exist counts as removed. Paths outside the
/// project root are allowed.
pub async fn remove_dirs(dirs: &[PathBuf]) -> Result<()> {
    for dir in dirs {
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => tracing::info!("Removed {}", dir.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("{} does not exist, nothing to remove", dir.display())
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
