// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

use super::{to_json, write_output, Reporter};
use crate::config::Config;
use crate::content::list_performers;
use crate::pipeline::analyze;
use anyhow::Result;
use std::path::Path;

/// Run the performers command
pub fn run(config: &Config, reporter: Reporter, input: &Path, json: bool) -> Result<()> {
    let analysis = analyze(input, config)?;
    reporter.warn_all(&analysis.warnings());

    if !analysis.result.is_ok() {
        anyhow::bail!("{}: {}", input.display(), analysis.result.errors.join("; "));
    }

    let performers = list_performers(&analysis.result);
    if json {
        write_output(&to_json(&performers)?, None)
    } else {
        for performer in &performers {
            println!("{performer}");
        }
        Ok(())
    }
}
