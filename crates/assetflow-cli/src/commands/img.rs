// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Image command: compress icons, then images.

use assetflow::Pipeline;

/// Compresses icons and images. No external tools are needed.
pub async fn run(quiet: bool) -> anyhow::Result<()> {
    super::execute(Pipeline::images_only(), quiet).await
}
