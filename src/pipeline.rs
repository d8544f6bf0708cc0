// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! File pipeline - from a diagram on disk to a parse result

use crate::archive::{decode_latin1, is_zip};
use crate::config::Config;
use crate::types::{DiagramFormat, ParseResult};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// A diagram document loaded from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDiagram {
    /// Document text
    pub xml: String,
    /// Name the document should be stored under
    pub file_name: String,
    /// Dialect, when known
    pub format: Option<DiagramFormat>,
    /// Advisory messages gathered while loading
    pub warnings: Vec<String>,
}

/// A parsed diagram with everything reported along the way
#[derive(Debug, Clone)]
pub struct Analysis {
    /// The loaded document
    pub diagram: LoadedDiagram,
    /// Parser output
    pub result: ParseResult,
}

impl Analysis {
    /// Loader warnings followed by parser warnings
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.diagram
            .warnings
            .iter()
            .chain(&self.result.warnings)
            .cloned()
            .collect()
    }
}

/// Read a diagram file, unwrapping `.bpm` containers
///
/// Files named `*.bpm` or starting with a ZIP signature go through the
/// unwrapper, whose failure message becomes the error. Anything else is
/// decoded as UTF-8, or as Latin-1 when that fails.
pub fn load_diagram(path: &Path, config: &Config) -> Result<LoadedDiagram> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map_or_else(|| "diagram".to_string(), |n| n.to_string_lossy().into_owned());

    let is_bpm = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("bpm"));

    if is_bpm || is_zip(&bytes) {
        debug!("Unwrapping {}", path.display());
        let conversion = config.unwrapper().convert(&bytes, &name);
        if !conversion.success {
            anyhow::bail!(
                "{}: {}",
                path.display(),
                conversion.error.unwrap_or_else(|| "conversion failed".to_string())
            );
        }
        let xml = conversion.bpmn_xml.context("Conversion produced no document")?;
        return Ok(LoadedDiagram {
            xml,
            file_name: conversion.bpmn_file_name.unwrap_or(name),
            format: conversion.format,
            warnings: conversion.warnings,
        });
    }

    let mut warnings = Vec::new();
    let xml = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            warnings.push(format!("{} is not valid UTF-8; decoded as Latin-1", name));
            decode_latin1(e.as_bytes())
        }
    };

    Ok(LoadedDiagram {
        xml,
        file_name: name,
        format: None,
        warnings,
    })
}

/// Load and parse a diagram file
pub fn analyze(path: &Path, config: &Config) -> Result<Analysis> {
    let diagram = load_diagram(path, config)?;
    let result = config.parser().parse(&diagram.xml);
    info!(
        "{}: {} process(es), {} element(s), {} error(s)",
        path.display(),
        result.processes.len(),
        result.element_count(),
        result.errors.len()
    );
    Ok(Analysis { diagram, result })
}
