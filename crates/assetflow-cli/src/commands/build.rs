// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Full build: clean code outputs, compile, cache-bust, compress images, then watch.

use assetflow::Pipeline;

/// Runs the default pipeline and keeps watching until Ctrl+C.
pub async fn run(quiet: bool) -> anyhow::Result<()> {
    super::execute(Pipeline::full_build(), quiet).await
}
