// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Bulk description index over a directory of BPMN files

use crate::config::Config;
use crate::pipeline::load_diagram;
use crate::types::{ElementKind, ParseResult};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// One element in the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribedElement {
    /// Element id
    pub id: String,
    /// Element name
    pub name: String,
    /// Element kind
    #[serde(rename = "type")]
    pub kind: ElementKind,
    /// Documentation text
    pub description: String,
    /// Id of the owning process
    pub process_name: String,
    /// File the element was read from
    pub file: String,
}

/// Elements of one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribedFile {
    /// Elements keyed by id
    pub elements: BTreeMap<String, DescribedElement>,
}

/// The whole index, keyed by file stem
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionIndex {
    /// Files keyed by stem
    pub processes: BTreeMap<String, DescribedFile>,
}

impl DescriptionIndex {
    /// Total number of indexed elements
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.processes.values().map(|f| f.elements.len()).sum()
    }

    /// Add the elements of one parsed file
    pub fn insert(&mut self, stem: &str, file: &str, result: &ParseResult) {
        let entry = self.processes.entry(stem.to_string()).or_default();
        for process in result.processes.values() {
            for element in process.elements.values() {
                entry.elements.insert(
                    element.id.clone(),
                    DescribedElement {
                        id: element.id.clone(),
                        name: element.name.clone(),
                        kind: element.kind,
                        description: element.description.clone(),
                        process_name: process.id.clone(),
                        file: file.to_string(),
                    },
                );
            }
        }
    }
}

/// `.bpmn` files under `dir`, sorted by path
pub fn bpmn_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("Not a directory: {}", dir.display());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable path: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("bpmn"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Build the description index for every `.bpmn` file under `dir`
///
/// Files that cannot be read or parsed are logged and left out.
pub fn build_index(dir: &Path, config: &Config) -> Result<DescriptionIndex> {
    let parser = config.parser();
    let mut index = DescriptionIndex::default();

    for path in bpmn_files(dir)? {
        let diagram = match load_diagram(&path, config) {
            Ok(diagram) => diagram,
            Err(e) => {
                warn!("Skipping {}: {:#}", path.display(), e);
                continue;
            }
        };
        for warning in &diagram.warnings {
            warn!("{}", warning);
        }

        let result = parser.parse(&diagram.xml);
        if !result.is_ok() {
            warn!("Skipping {}: {}", path.display(), result.errors.join("; "));
            continue;
        }

        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!("Indexed {} element(s) from {}", result.element_count(), file);
        index.insert(&stem, &file, &result);
    }

    Ok(index)
}

/// Write the index as pretty JSON
pub fn write_index(index: &DescriptionIndex, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(index).context("Failed to serialize descriptions")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
