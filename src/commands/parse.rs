// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Parse command - prints the structural parse of a diagram as JSON

use super::{to_json, write_output, Reporter};
use crate::config::Config;
use crate::pipeline::analyze;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Run the parse command
///
/// The result is written even when it carries errors; the exit status
/// reflects them.
pub fn run(config: &Config, reporter: Reporter, input: &Path, output: Option<PathBuf>) -> Result<()> {
    let analysis = analyze(input, config)?;
    reporter.warn_all(&analysis.warnings());

    write_output(&to_json(&analysis.result)?, output.as_deref())?;

    if !analysis.result.is_ok() {
        for error in &analysis.result.errors {
            reporter.error(error);
        }
        anyhow::bail!("{} could not be parsed", input.display());
    }
    Ok(())
}
