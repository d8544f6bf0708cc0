// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Archive unwrapping - finds the process definition inside Bizagi `.bpm` files
//!
//! A `.bpm` export is a ZIP container. The process usually lives in a
//! `.diag` entry, which is itself a ZIP holding either BPMN 2.0 or Bizagi's
//! XPDL `diagram.xml`, next to housekeeping files such as `ModelInfo.xml`.
//! Anything that is not a ZIP is tried as plain XML text before giving up.
//!
//! Container formats are recognized by substring markers rather than by
//! parsing every entry. A file that merely mentions `<definitions` inside a
//! comment or CDATA section will be taken for BPMN; the structural parser
//! downstream is what rejects it.

use crate::error::{ArchiveError, ArchiveResult};
use crate::types::{Conversion, DiagramFormat, Validation};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read, Seek};
use tracing::{debug, warn};
use zip::ZipArchive;

/// Failure message for input that is neither a container nor readable XML
pub const PROPRIETARY_FORMAT_ERROR: &str = "The .bpm file could not be converted. \
     Bizagi's proprietary binary format was detected. \
     Please export the diagram as BPMN 2.0 from Bizagi Modeler.";

/// Failure message for a container holding nothing usable
pub const NO_VALID_BPMN_ERROR: &str = "The .bpm file does not contain any valid BPMN files";

/// Entry extensions considered at the top level of a container
const CANDIDATE_EXTENSIONS: [&str; 3] = [".bpmn", ".xml", ".diag"];

/// Resource ceilings applied while unwrapping untrusted uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// How many containers may be opened below the top-level one
    pub max_depth: usize,
    /// Largest decompressed entry that will be inspected
    pub max_entry_bytes: u64,
    /// Decompressed bytes allowed across the whole unwrap
    pub max_total_bytes: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: 4,
            max_entry_bytes: 64 * 1024 * 1024,
            max_total_bytes: 256 * 1024 * 1024,
        }
    }
}

/// Result of searching one container level
#[derive(Debug, Clone, PartialEq, Eq)]
enum Found {
    Bpmn { entry: String, xml: String },
    Xpdl { entry: String, xml: String },
    NotFound,
}

/// Tracks decompressed bytes against [`Limits::max_total_bytes`]
struct Budget {
    limit: u64,
    used: u64,
}

impl Budget {
    fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    fn consume(&mut self, bytes: usize) -> ArchiveResult<()> {
        self.used = self.used.saturating_add(bytes as u64);
        if self.used > self.limit {
            return Err(ArchiveError::Budget { limit: self.limit });
        }
        Ok(())
    }
}

/// Substring heuristics for recognizing diagram dialects
mod markers {
    const DEFINITIONS: [&str; 3] = ["<definitions", "<bpmn:definitions", "<bpmn2:definitions"];
    const PROCESS: [&str; 3] = ["<process", "<bpmn:process", "<bpmn2:process"];

    pub fn has_definitions(text: &str) -> bool {
        DEFINITIONS.iter().any(|m| text.contains(m))
    }

    pub fn is_bpmn(text: &str) -> bool {
        has_definitions(text) && PROCESS.iter().any(|m| text.contains(m))
    }

    pub fn is_xpdl(text: &str) -> bool {
        text.contains("<Package") && text.contains("XPDL")
    }

    /// Weakest acceptable evidence of an XML document
    pub fn looks_like_xml(text: &str) -> bool {
        text.contains("<?xml") || text.contains("<definitions")
    }
}

/// Unwraps uploaded process files under a fixed set of [`Limits`]
#[derive(Debug, Clone, Default)]
pub struct Unwrapper {
    limits: Limits,
}

impl Unwrapper {
    /// Create an unwrapper with the given limits
    #[must_use]
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    /// Extract a BPMN (or XPDL) document from `buffer`
    ///
    /// `original_file_name` is only used to derive the output name. Never
    /// fails: every problem is reported through [`Conversion::error`].
    #[must_use]
    pub fn convert(&self, buffer: &[u8], original_file_name: &str) -> Conversion {
        let mut warnings = Vec::new();

        let mut archive = match ZipArchive::new(Cursor::new(buffer)) {
            Ok(archive) => archive,
            Err(e) => {
                debug!("{} is not a ZIP archive ({}), trying plain text", original_file_name, e);
                return direct_text(buffer, original_file_name, warnings);
            }
        };

        let mut budget = Budget::new(self.limits.max_total_bytes);
        match self.scan_top_level(&mut archive, &mut budget, &mut warnings) {
            Ok(Found::NotFound) => Conversion::failed(NO_VALID_BPMN_ERROR, warnings),
            Ok(found) => success(found, original_file_name, warnings),
            Err(e) => Conversion::failed(format!("Failed to process .bpm file: {e}"), warnings),
        }
    }

    /// Search the outermost container
    ///
    /// Only entries with a candidate extension are considered. `.diag`
    /// entries are opened as nested containers; everything else must carry
    /// both BPMN markers. If nothing qualifies, a relaxed pass accepts any
    /// candidate with an XML prolog and a `<definitions` token.
    fn scan_top_level<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        budget: &mut Budget,
        warnings: &mut Vec<String>,
    ) -> ArchiveResult<Found> {
        let entries = entry_names(archive)?;
        debug!("Entries in archive: {:?}", entries.iter().map(|(_, n)| n).collect::<Vec<_>>());

        let candidates: Vec<(usize, String)> = entries
            .into_iter()
            .filter(|(_, name)| has_candidate_extension(name))
            .collect();
        debug!("Candidate entries: {}", candidates.len());

        let mut inspected: Vec<(String, Vec<u8>)> = Vec::new();
        let mut found = Found::NotFound;

        for (index, name) in &candidates {
            if is_metadata(name) {
                debug!("Skipping metadata entry {}", name);
                continue;
            }
            let Some(bytes) = self.read_entry(archive, *index, name, budget, warnings)? else {
                continue;
            };

            if ends_with_ignore_case(name, ".diag") && self.limits.max_depth > 0 {
                let nested_found = match ZipArchive::new(Cursor::new(bytes.as_slice())) {
                    Ok(mut nested) => {
                        debug!("Opening nested container {}", name);
                        Some(self.scan_nested(&mut nested, name, 1, budget, warnings)?)
                    }
                    Err(_) => None,
                };
                match nested_found {
                    Some(Found::NotFound) => {
                        inspected.push((name.clone(), bytes));
                        continue;
                    }
                    Some(nested_found) => {
                        found = nested_found;
                        break;
                    }
                    None => debug!("{} is not a nested archive, reading it as text", name),
                }
            }

            if markers::is_bpmn(&String::from_utf8_lossy(&bytes)) {
                debug!("Selected BPMN entry {}", name);
                found = Found::Bpmn {
                    entry: name.clone(),
                    xml: into_text(bytes),
                };
                break;
            }
            inspected.push((name.clone(), bytes));
        }

        if found == Found::NotFound {
            found = inspected
                .into_iter()
                .find_map(|(name, bytes)| {
                    let text = String::from_utf8_lossy(&bytes);
                    (text.contains("<?xml") && text.contains("<definitions")).then(|| {
                        debug!("Selected {} on the relaxed pass", name);
                        Found::Bpmn {
                            entry: name,
                            xml: text.into_owned(),
                        }
                    })
                })
                .unwrap_or(Found::NotFound);
        }

        if candidates.len() > 1 {
            if let Found::Bpmn { entry, .. } | Found::Xpdl { entry, .. } = &found {
                warnings.push(format!("Multiple files found in the .bpm. Using: {entry}"));
            }
        }

        Ok(found)
    }

    /// Search a container nested `depth` levels below the top
    ///
    /// Every non-metadata entry is tested. XPDL is accepted here, but only
    /// from an entry whose whole path is `diagram.xml`.
    fn scan_nested<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        prefix: &str,
        depth: usize,
        budget: &mut Budget,
        warnings: &mut Vec<String>,
    ) -> ArchiveResult<Found> {
        for (index, name) in entry_names(archive)? {
            if is_metadata(&name) {
                debug!("Skipping metadata entry {}/{}", prefix, name);
                continue;
            }
            let path = format!("{prefix}/{name}");
            let Some(bytes) = self.read_entry(archive, index, &path, budget, warnings)? else {
                continue;
            };

            if ends_with_ignore_case(&name, ".diag") && depth < self.limits.max_depth {
                if let Ok(mut nested) = ZipArchive::new(Cursor::new(bytes.as_slice())) {
                    match self.scan_nested(&mut nested, &path, depth + 1, budget, warnings)? {
                        Found::NotFound => continue,
                        found => return Ok(found),
                    }
                }
            }

            let text = String::from_utf8_lossy(&bytes);
            if markers::is_bpmn(&text) {
                debug!("Found BPMN inside {}", path);
                return Ok(Found::Bpmn {
                    entry: path,
                    xml: text.into_owned(),
                });
            }
            if markers::is_xpdl(&text) && name.eq_ignore_ascii_case("diagram.xml") {
                debug!("Found XPDL inside {}", path);
                warnings.push(
                    "The .bpm file uses Bizagi's XPDL format. Exported the diagram XML as is."
                        .to_string(),
                );
                return Ok(Found::Xpdl {
                    entry: path,
                    xml: text.into_owned(),
                });
            }
        }
        Ok(Found::NotFound)
    }

    /// Decompress one entry, or `None` when it has to be skipped
    fn read_entry<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        index: usize,
        path: &str,
        budget: &mut Budget,
        warnings: &mut Vec<String>,
    ) -> ArchiveResult<Option<Vec<u8>>> {
        let limit = self.limits.max_entry_bytes;
        let mut file = archive.by_index(index)?;

        if file.size() > limit {
            warnings.push(format!("Skipped {path}: {} bytes exceeds the {limit} byte entry limit", file.size()));
            return Ok(None);
        }

        let mut bytes = Vec::new();
        if let Err(source) = (&mut file).take(limit.saturating_add(1)).read_to_end(&mut bytes) {
            warn!("{}", ArchiveError::Read { name: path.to_string(), source });
            return Ok(None);
        }
        budget.consume(bytes.len())?;

        if bytes.len() as u64 > limit {
            warnings.push(format!("Skipped {path}: content exceeds the {limit} byte entry limit"));
            return Ok(None);
        }
        Ok(Some(bytes))
    }
}

/// Extract a BPMN (or XPDL) document from `buffer` with default [`Limits`]
#[must_use]
pub fn convert(buffer: &[u8], original_file_name: &str) -> Conversion {
    Unwrapper::default().convert(buffer, original_file_name)
}

/// Cheap pre-flight check that `xml` looks like a BPMN or XPDL document
#[must_use]
pub fn validate(xml: &str) -> Validation {
    let invalid = |message: &str| Validation {
        valid: false,
        error: Some(message.to_string()),
    };

    if xml.trim().is_empty() {
        return invalid("Empty XML");
    }
    if !xml.contains("<?xml") {
        return invalid("Not a valid XML file");
    }

    let is_bpmn = xml.contains("bpmn") || xml.contains("BPMN") || xml.contains("<definitions");
    let is_xpdl = xml.contains("XPDL") || xml.contains("<Package");
    if !is_bpmn && !is_xpdl {
        return invalid("XML does not contain BPMN or XPDL elements");
    }

    Validation { valid: true, error: None }
}

/// Replace a trailing `.bpm` (any case) with `.bpmn`
#[must_use]
pub fn bpmn_file_name(original: &str) -> String {
    match original.len().checked_sub(4).and_then(|cut| original.get(cut..).map(|ext| (cut, ext))) {
        Some((cut, ext)) if ext.eq_ignore_ascii_case(".bpm") => format!("{}.bpmn", &original[..cut]),
        _ => original.to_string(),
    }
}

/// True when the bytes start with a ZIP local-file or end-of-directory signature
#[must_use]
pub fn is_zip(buffer: &[u8]) -> bool {
    buffer.starts_with(b"PK\x03\x04") || buffer.starts_with(b"PK\x05\x06")
}

/// Decode bytes as Latin-1, which maps every byte to the code point of the same value
#[must_use]
pub fn decode_latin1(buffer: &[u8]) -> String {
    buffer.iter().map(|&b| char::from(b)).collect()
}

/// Accept the whole buffer as a document, trying UTF-8 then Latin-1
fn direct_text(buffer: &[u8], original_file_name: &str, mut warnings: Vec<String>) -> Conversion {
    if let Ok(text) = std::str::from_utf8(buffer) {
        if markers::looks_like_xml(text) {
            warnings.push("The .bpm file was read as plain XML (not a ZIP archive)".to_string());
            return success(direct(text.to_string()), original_file_name, warnings);
        }
    }

    let latin1 = decode_latin1(buffer);
    if markers::looks_like_xml(&latin1) {
        warnings.push("The .bpm file was converted using Latin-1 encoding".to_string());
        return success(direct(latin1), original_file_name, warnings);
    }

    Conversion::failed(PROPRIETARY_FORMAT_ERROR, warnings)
}

/// Wrap a whole-buffer document, telling XPDL packages apart from BPMN
fn direct(xml: String) -> Found {
    let entry = String::new();
    if markers::is_xpdl(&xml) && !markers::has_definitions(&xml) {
        Found::Xpdl { entry, xml }
    } else {
        Found::Bpmn { entry, xml }
    }
}

fn success(found: Found, original_file_name: &str, warnings: Vec<String>) -> Conversion {
    let (format, entry, xml) = match found {
        Found::Bpmn { entry, xml } => (DiagramFormat::Bpmn, entry, xml),
        Found::Xpdl { entry, xml } => (DiagramFormat::Xpdl, entry, xml),
        Found::NotFound => return Conversion::failed(NO_VALID_BPMN_ERROR, warnings),
    };
    Conversion {
        success: true,
        bpmn_xml: Some(xml),
        bpmn_file_name: Some(bpmn_file_name(original_file_name)),
        format: Some(format),
        source_entry: (!entry.is_empty()).then_some(entry),
        error: None,
        warnings,
    }
}

/// Non-directory entry names in central-directory order
fn entry_names<R: Read + Seek>(archive: &mut ZipArchive<R>) -> ArchiveResult<Vec<(usize, String)>> {
    let mut names = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let file = archive.by_index_raw(index)?;
        if !file.is_dir() {
            names.push((index, file.name().to_string()));
        }
    }
    Ok(names)
}

/// Entry bytes as text, replacing invalid UTF-8 sequences
fn into_text(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

fn has_candidate_extension(name: &str) -> bool {
    CANDIDATE_EXTENSIONS.iter().any(|ext| ends_with_ignore_case(name, ext))
}

/// Vendor housekeeping files never hold the process definition
fn is_metadata(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("modelinfo") || lower.contains("metadata")
}

fn ends_with_ignore_case(name: &str, suffix: &str) -> bool {
    name.len() >= suffix.len()
        && name
            .get(name.len() - suffix.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
}
