// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Bizagi docs library - process metadata extraction for BPMN/Bizagi diagrams
//!
//! This crate turns uploaded process diagrams into the element-indexed
//! descriptions a documentation viewer consumes:
//!
//! ```text
//! bytes (.bpm / .bpmn) ──archive::convert──▶ BPMN or XPDL text
//!                      ──parser::parse─────▶ ParseResult
//!                      ──content::*────────▶ ContentMap, performer list
//! ```
//!
//! The three core operations never fail from the caller's point of view:
//! problems surface in the `errors`/`warnings`/`error` fields of the
//! returned values.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod archive;
pub mod commands;
pub mod config;
pub mod content;
pub mod descriptions;
pub mod error;
pub mod parser;
pub mod pipeline;

/// Core data types shared by the unwrapper, the parser and the projector
pub mod types {
    use indexmap::IndexMap;
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;

    // =========================================================================
    // Flow Nodes
    // =========================================================================

    /// BPMN flow-node tags the parser recognizes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub enum ElementKind {
        /// `<task>`
        Task,
        /// `<userTask>`
        UserTask,
        /// `<serviceTask>`
        ServiceTask,
        /// `<scriptTask>`
        ScriptTask,
        /// `<manualTask>`
        ManualTask,
        /// `<businessRuleTask>`
        BusinessRuleTask,
        /// `<sendTask>`
        SendTask,
        /// `<receiveTask>`
        ReceiveTask,
        /// `<exclusiveGateway>`
        ExclusiveGateway,
        /// `<parallelGateway>`
        ParallelGateway,
        /// `<inclusiveGateway>`
        InclusiveGateway,
        /// `<eventBasedGateway>`
        EventBasedGateway,
        /// `<startEvent>`
        StartEvent,
        /// `<endEvent>`
        EndEvent,
        /// `<intermediateThrowEvent>`
        IntermediateThrowEvent,
        /// `<intermediateCatchEvent>`
        IntermediateCatchEvent,
        /// `<boundaryEvent>`
        BoundaryEvent,
        /// `<subProcess>`
        SubProcess,
        /// `<callActivity>`
        CallActivity,
    }

    impl ElementKind {
        /// Every recognized kind, in scan order
        pub const ALL: [Self; 19] = [
            Self::Task,
            Self::UserTask,
            Self::ServiceTask,
            Self::ScriptTask,
            Self::ManualTask,
            Self::BusinessRuleTask,
            Self::SendTask,
            Self::ReceiveTask,
            Self::ExclusiveGateway,
            Self::ParallelGateway,
            Self::InclusiveGateway,
            Self::EventBasedGateway,
            Self::StartEvent,
            Self::EndEvent,
            Self::IntermediateThrowEvent,
            Self::IntermediateCatchEvent,
            Self::BoundaryEvent,
            Self::SubProcess,
            Self::CallActivity,
        ];

        /// The XML local name of this kind
        #[must_use]
        pub fn tag(self) -> &'static str {
            match self {
                Self::Task => "task",
                Self::UserTask => "userTask",
                Self::ServiceTask => "serviceTask",
                Self::ScriptTask => "scriptTask",
                Self::ManualTask => "manualTask",
                Self::BusinessRuleTask => "businessRuleTask",
                Self::SendTask => "sendTask",
                Self::ReceiveTask => "receiveTask",
                Self::ExclusiveGateway => "exclusiveGateway",
                Self::ParallelGateway => "parallelGateway",
                Self::InclusiveGateway => "inclusiveGateway",
                Self::EventBasedGateway => "eventBasedGateway",
                Self::StartEvent => "startEvent",
                Self::EndEvent => "endEvent",
                Self::IntermediateThrowEvent => "intermediateThrowEvent",
                Self::IntermediateCatchEvent => "intermediateCatchEvent",
                Self::BoundaryEvent => "boundaryEvent",
                Self::SubProcess => "subProcess",
                Self::CallActivity => "callActivity",
            }
        }

        /// Look up a kind by XML local name (case-sensitive, as XML is)
        #[must_use]
        pub fn from_tag(tag: &[u8]) -> Option<Self> {
            Self::ALL.into_iter().find(|kind| kind.tag().as_bytes() == tag)
        }
    }

    impl std::fmt::Display for ElementKind {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.tag())
        }
    }

    // =========================================================================
    // Parser Output
    // =========================================================================

    /// Custom property keys that carry shape styling rather than content
    pub const COLOR_KEYS: [&str; 3] = ["bgColor", "borderColor", "textColor"];

    /// One BPMN flow node or sub-process
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ParsedElement {
        /// XML `id` attribute
        pub id: String,
        /// XML `name` attribute, falling back to the id
        pub name: String,
        /// Flow-node tag
        #[serde(rename = "type")]
        pub kind: ElementKind,
        /// Same text as `documentation`; the viewer reads this key first
        pub description: String,
        /// Trimmed text of the first descendant `<documentation>`
        pub documentation: String,
        /// Responsible party, absent when nothing resolved
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub performer: Option<String>,
        /// Bizagi background color
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub bg_color: Option<String>,
        /// Bizagi border color
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub border_color: Option<String>,
        /// Bizagi text color
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub text_color: Option<String>,
        /// Every `BizagiProperty` found under the element, in document order.
        /// A repeated name keeps its first position and takes the last value.
        #[serde(default)]
        pub custom_properties: IndexMap<String, String>,
    }

    /// A pool or lane reference
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Partition {
        /// XML `id` attribute
        pub id: String,
        /// XML `name` attribute
        pub name: String,
    }

    /// One `<process>` element
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ParsedProcess {
        /// `id` attribute, or `process_<index>` when absent
        pub id: String,
        /// `name` attribute, or the id
        pub name: String,
        /// Flow nodes keyed by element id
        #[serde(default)]
        pub elements: BTreeMap<String, ParsedElement>,
        /// Collaboration participants referencing this process
        #[serde(default)]
        pub pools: Vec<Partition>,
        /// Lanes of this process's lane sets
        #[serde(default)]
        pub lanes: Vec<Partition>,
    }

    impl ParsedProcess {
        /// Create an empty process
        #[must_use]
        pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
            Self {
                id: id.into(),
                name: name.into(),
                elements: BTreeMap::new(),
                pools: Vec::new(),
                lanes: Vec::new(),
            }
        }
    }

    /// Top-level parser output
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ParseResult {
        /// Processes keyed by process id, in document order
        #[serde(default)]
        pub processes: IndexMap<String, ParsedProcess>,
        /// Fatal messages; non-empty means the result is unusable
        #[serde(default)]
        pub errors: Vec<String>,
        /// Advisory messages
        #[serde(default)]
        pub warnings: Vec<String>,
    }

    impl ParseResult {
        /// True when no fatal error was recorded
        #[must_use]
        pub fn is_ok(&self) -> bool {
            self.errors.is_empty()
        }

        /// Total number of elements across all processes
        #[must_use]
        pub fn element_count(&self) -> usize {
            self.processes.values().map(|p| p.elements.len()).sum()
        }
    }

    // =========================================================================
    // Viewer Content
    // =========================================================================

    /// Display record for one element, keyed by the viewer's field names
    ///
    /// `entradas`, `saidas`, `ferramentas` and `popItReferencia` are filled
    /// in later by user edits, so their entries are kept as free-form JSON.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ContentRecord {
        /// Element id
        pub id: String,
        /// Element name
        pub nome: String,
        /// Element kind
        pub tipo: ElementKind,
        /// Performer, or empty
        pub ator: String,
        /// Description text, or empty
        pub descricao: String,
        /// Inputs
        #[serde(default)]
        pub entradas: Vec<serde_json::Value>,
        /// Outputs
        #[serde(default)]
        pub saidas: Vec<serde_json::Value>,
        /// Tools
        #[serde(default)]
        pub ferramentas: Vec<serde_json::Value>,
        /// Step-by-step instructions
        #[serde(default)]
        pub passo_a_passo: Vec<String>,
        /// Referenced POP/IT documents
        #[serde(default)]
        pub pop_it_referencia: Vec<serde_json::Value>,
        /// Notes, seeded from non-color custom properties
        #[serde(default)]
        pub observacoes: Vec<String>,
    }

    /// Flat element id → display record map
    pub type ContentMap = BTreeMap<String, ContentRecord>;

    // =========================================================================
    // Unwrapper Output
    // =========================================================================

    /// Diagram dialect found inside a container
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum DiagramFormat {
        /// BPMN 2.0 definitions
        Bpmn,
        /// Bizagi's internal XPDL package
        Xpdl,
    }

    /// Outcome of unwrapping an uploaded process file
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Conversion {
        /// Whether a usable document was found
        pub success: bool,
        /// The extracted document text
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub bpmn_xml: Option<String>,
        /// Output filename (`.bpm` replaced with `.bpmn`)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub bpmn_file_name: Option<String>,
        /// Dialect of the extracted document
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub format: Option<DiagramFormat>,
        /// Archive path of the chosen entry, when one was chosen
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub source_entry: Option<String>,
        /// Failure message
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub error: Option<String>,
        /// Advisory messages
        #[serde(default)]
        pub warnings: Vec<String>,
    }

    impl Conversion {
        /// A failed conversion carrying `message`
        #[must_use]
        pub fn failed(message: impl Into<String>, warnings: Vec<String>) -> Self {
            Self {
                success: false,
                error: Some(message.into()),
                warnings,
                ..Self::default()
            }
        }
    }

    /// Outcome of the cheap pre-flight check
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Validation {
        /// Whether the text looks like BPMN or XPDL
        pub valid: bool,
        /// Why it does not
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub error: Option<String>,
    }
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::archive::{convert, validate, Unwrapper};
    pub use crate::content::{list_performers, to_content_map};
    pub use crate::parser::{parse, BpmnParser};
    pub use crate::types::*;
    pub use anyhow::{Context, Result};
}
