// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Extract command - builds the description index for a directory of diagrams

use crate::config::Config;
use crate::descriptions::{build_index, write_index};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Run the extract command
pub fn run(config: &Config, dir: &Path, output: &Path) -> Result<()> {
    info!("Extracting descriptions from {}", dir.display());

    let index = build_index(dir, config)
        .with_context(|| format!("Failed to index {}", dir.display()))?;
    write_index(&index, output)?;

    println!(
        "Indexed {} element(s) from {} file(s) into {}",
        index.element_count(),
        index.processes.len(),
        output.display()
    );
    Ok(())
}
