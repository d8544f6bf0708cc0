// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Content command - writes the viewer's per-element content file

use super::{to_json, write_output, Reporter};
use crate::config::Config;
use crate::content::to_content_map;
use crate::pipeline::analyze;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// Run the content command
pub fn run(config: &Config, reporter: Reporter, input: &Path, output: Option<PathBuf>) -> Result<()> {
    let analysis = analyze(input, config)?;
    reporter.warn_all(&analysis.warnings());

    if !analysis.result.is_ok() {
        anyhow::bail!("{}: {}", input.display(), analysis.result.errors.join("; "));
    }

    let content = to_content_map(&analysis.result);
    info!("Projected {} element(s)", content.len());
    write_output(&to_json(&content)?, output.as_deref())
}
