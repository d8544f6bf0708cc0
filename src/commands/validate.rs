// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

use super::Reporter;
use crate::archive::validate;
use crate::config::Config;
use crate::pipeline::load_diagram;
use anyhow::Result;
use std::path::Path;

/// Run the validate command
pub fn run(config: &Config, reporter: Reporter, input: &Path) -> Result<()> {
    let diagram = load_diagram(input, config)?;
    reporter.warn_all(&diagram.warnings);

    let check = validate(&diagram.xml);
    match check.error {
        None => {
            println!("{}: valid", input.display());
            Ok(())
        }
        Some(error) => anyhow::bail!("{}: {}", input.display(), error),
    }
}
