// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Convert command - extracts the BPMN document from a Bizagi `.bpm` file

use super::{write_output, Reporter};
use crate::archive::validate;
use crate::config::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Run the convert command
pub fn run(
    config: &Config,
    reporter: Reporter,
    input: &Path,
    output: Option<PathBuf>,
    stdout: bool,
) -> Result<()> {
    info!("Converting {}", input.display());

    let bytes = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let conversion = config.unwrapper().convert(&bytes, &name);
    reporter.warn_all(&conversion.warnings);
    if !conversion.success {
        anyhow::bail!(
            "{}",
            conversion.error.unwrap_or_else(|| "Conversion failed".to_string())
        );
    }

    let xml = conversion
        .bpmn_xml
        .context("Conversion produced no document")?;
    let check = validate(&xml);
    if let Some(error) = check.error {
        reporter.warn(&format!("Extracted document failed validation: {error}"));
    }
    if let Some(entry) = &conversion.source_entry {
        info!("Using archive entry {}", entry);
    }

    if stdout {
        return write_output(&xml, None);
    }

    let target = output.unwrap_or_else(|| {
        input.with_file_name(conversion.bpmn_file_name.unwrap_or_else(|| format!("{name}.bpmn")))
    });
    write_output(&xml, Some(target.as_path()))
}
