// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Error types for the extraction pipeline
//!
//! These never cross the public `convert`/`parse` boundary: they are folded
//! into the message lists of the returned values there.

use thiserror::Error;

/// Failure while walking a BPMN document
#[derive(Debug, Error)]
pub enum ParseError {
    /// The XML reader rejected the document
    #[error("malformed XML at byte {position}: {source}")]
    Xml {
        /// Byte offset where the failing event started
        position: u64,
        /// Underlying reader error
        #[source]
        source: quick_xml::Error,
    },

    /// An attribute list could not be read
    #[error("malformed attribute at byte {position}: {source}")]
    Attribute {
        /// Byte offset of the element carrying the attribute
        position: u64,
        /// Underlying attribute error
        #[source]
        source: quick_xml::events::attributes::AttrError,
    },

    /// The document ended with elements still open
    #[error("unexpected end of document: {open} unclosed element(s), innermost <{innermost}>")]
    Unclosed {
        /// Number of elements left open
        open: usize,
        /// Local name of the innermost open element
        innermost: String,
    },

    /// A second root element, or text outside the root
    #[error("content outside the root element at byte {position}")]
    OutsideRoot {
        /// Byte offset of the stray content
        position: u64,
    },

    /// Nothing but prolog, comments or whitespace
    #[error("document has no root element")]
    NoRoot,

    /// Element nesting went past the configured ceiling
    #[error("element nesting exceeds the limit of {limit} levels")]
    TooDeep {
        /// Configured ceiling
        limit: usize,
    },
}

impl ParseError {
    /// Whether the tree itself is untrustworthy, so no partial output may be kept
    #[must_use]
    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::TooDeep { .. })
    }
}

/// Failure while reading a container
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The ZIP layer failed
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Reading an entry's bytes failed
    #[error("failed to read entry {name}: {source}")]
    Read {
        /// Entry path
        name: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The decompressed byte budget ran out
    #[error("archive exceeds the decompression budget of {limit} bytes")]
    Budget {
        /// Configured budget
        limit: u64,
    },
}

/// Convenience result for archive internals
pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;
