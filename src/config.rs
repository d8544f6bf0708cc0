// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management
//!
//! Built-in defaults, overridden by a TOML file, overridden by
//! `BIZAGI_DOCS__*` environment variables (`__` separates sections, so
//! `BIZAGI_DOCS__ARCHIVE__MAX_DEPTH=2` sets `archive.max_depth`).

use crate::archive::{Limits, Unwrapper};
use crate::parser::{BpmnParser, ParserLimits};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment prefix for configuration overrides
pub const ENV_PREFIX: &str = "BIZAGI_DOCS";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Archive unwrapping limits
    pub archive: Limits,
    /// Parser limits
    pub parser: ParserLimits,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            archive: Limits::default(),
            parser: ParserLimits::default(),
        }
    }
}

impl Config {
    /// Unwrapper honoring the archive limits
    #[must_use]
    pub fn unwrapper(&self) -> Unwrapper {
        Unwrapper::new(self.archive)
    }

    /// Parser honoring the parser limits
    #[must_use]
    pub fn parser(&self) -> BpmnParser {
        BpmnParser::new(self.parser)
    }
}

/// Default location of the configuration file
#[must_use]
pub fn default_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "hyperpolymath", "bizagi-docs")
        .map(|d| d.config_dir().join("config.toml"))
}

/// Load configuration from `path` (or the default location) and the environment
///
/// An explicit `path` must exist; the default location is optional.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let file = match path {
        Some(p) => {
            if !p.exists() {
                anyhow::bail!("Configuration file not found: {}", p.display());
            }
            Some(p.to_path_buf())
        }
        None => default_path().filter(|p| p.exists()),
    };

    let mut builder = ::config::Config::builder();
    if let Some(file) = &file {
        tracing::debug!("Loading configuration from {}", file.display());
        builder = builder.add_source(::config::File::from(file.as_path()).format(::config::FileFormat::Toml));
    }
    builder = builder.add_source(
        ::config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    builder
        .build()
        .context("Failed to read configuration")?
        .try_deserialize()
        .context("Invalid configuration")
}

/// Render configuration as TOML
pub fn to_toml(config: &Config) -> Result<String> {
    toml::to_string_pretty(config).context("Failed to serialize configuration")
}
