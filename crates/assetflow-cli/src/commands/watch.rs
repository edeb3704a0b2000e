// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Watch command: rebuild styles and scripts, cache-bust, then watch.

use assetflow::Pipeline;

/// Rebuilds code once, then serves rebuilds until Ctrl+C.
pub async fn run(quiet: bool) -> anyhow::Result<()> {
    super::execute(Pipeline::watch_only(), quiet).await
}
