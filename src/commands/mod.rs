// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations

pub mod completions;
pub mod config;
pub mod content;
pub mod convert;
pub mod extract;
pub mod parse;
pub mod performers;
pub mod validate;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Writes diagnostics to stderr, colored unless disabled
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    color: bool,
}

impl Reporter {
    /// Create a reporter
    #[must_use]
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Report a warning
    pub fn warn(&self, message: &str) {
        if self.color {
            eprintln!("{} {}", "warning:".yellow().bold(), message);
        } else {
            eprintln!("warning: {message}");
        }
    }

    /// Report a non-fatal error
    pub fn error(&self, message: &str) {
        if self.color {
            eprintln!("{} {}", "error:".red().bold(), message);
        } else {
            eprintln!("error: {message}");
        }
    }

    /// Report each message as a warning
    pub fn warn_all<'a>(&self, messages: impl IntoIterator<Item = &'a String>) {
        for message in messages {
            self.warn(message);
        }
    }
}

/// Write `content` to `output`, or to stdout when there is none
pub fn write_output(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

/// Pretty JSON for command output
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize output")
}
