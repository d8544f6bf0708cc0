// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

use crate::config::{to_toml, Config};
use anyhow::{Context, Result};

/// Print the effective configuration, or the value of one dotted key
pub fn run(config: &Config, key: Option<&str>) -> Result<()> {
    let Some(key) = key else {
        print!("{}", to_toml(config)?);
        return Ok(());
    };

    tracing::debug!("Getting {}", key);
    let root = toml::Value::try_from(config).context("Failed to serialize configuration")?;
    let value = key
        .split('.')
        .try_fold(&root, |value, part| value.get(part))
        .ok_or_else(|| anyhow::anyhow!("Unknown configuration key: {}", key))?;

    match value {
        toml::Value::String(s) => println!("{s}"),
        other => println!("{other}"),
    }
    Ok(())
}
