// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! BPMN/Bizagi structural parser
//!
//! Walks a BPMN 2.0 document once with a namespace-aware pull reader and
//! collects, per `<process>`, every recognized flow node with its
//! documentation, Bizagi custom properties and performer, plus the pools
//! and lanes that partition it.
//!
//! Flow-node data follows descendant semantics: a sub-process sees the
//! documentation, properties and resource roles of everything nested in
//! it, exactly as a `getElementsByTagName` scan over its subtree would.
//! Every open flow node therefore gets a look at each event, and the first
//! matching descendant wins for single-valued fields.
//!
//! Tags are matched by local name, so `bpmn:`/`bpmn2:` prefixed documents
//! parse the same as default-namespace ones. Bizagi extension elements
//! must resolve to [`BIZAGI_NAMESPACE`].

use crate::error::ParseError;
use crate::types::{ElementKind, ParseResult, ParsedElement, ParsedProcess, Partition};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use serde::{Deserialize, Serialize};
use indexmap::IndexMap;
use tracing::{debug, trace};

/// Namespace of Bizagi's BPMN extension elements
pub const BIZAGI_NAMESPACE: &str = "http://www.bizagi.com/bpmn20";

/// Warning recorded when a well-formed document holds no `<process>`
pub const NO_PROCESSES_WARNING: &str = "No processes found in the BPMN file";

/// Custom property naming the responsible party
const PERFORMER_PROPERTY: &str = "performer";

/// Resource ceilings for the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserLimits {
    /// Deepest element nesting accepted
    pub max_depth: usize,
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self { max_depth: 512 }
    }
}

/// Parses BPMN documents under a fixed set of [`ParserLimits`]
#[derive(Debug, Clone, Default)]
pub struct BpmnParser {
    limits: ParserLimits,
}

impl BpmnParser {
    /// Create a parser with the given limits
    #[must_use]
    pub fn new(limits: ParserLimits) -> Self {
        Self { limits }
    }

    /// Parse `xml` into a [`ParseResult`]
    ///
    /// Never fails. Malformed documents yield an `errors` entry and no
    /// processes; hitting the nesting limit keeps the processes completed
    /// before it.
    #[must_use]
    pub fn parse(&self, xml: &str) -> ParseResult {
        let mut result = ParseResult::default();
        let mut walker = Walker::new(self.limits.max_depth);

        match walker.run(xml) {
            Ok(()) => {
                result.processes = walker.into_processes();
                if result.processes.is_empty() {
                    result.warnings.push(NO_PROCESSES_WARNING.to_string());
                }
            }
            Err(e) if e.is_structural() => {
                debug!("Rejecting malformed document: {}", e);
                result.errors.push(format!("Failed to parse XML: {e}"));
            }
            Err(e) => {
                debug!("Extraction stopped early: {}", e);
                result.processes = walker.into_processes();
                result.errors.push(format!("Failed to process BPMN: {e}"));
            }
        }

        debug!(
            "Parsed {} process(es), {} element(s)",
            result.processes.len(),
            result.element_count()
        );
        result
    }
}

/// Parse `xml` with default [`ParserLimits`]
#[must_use]
pub fn parse(xml: &str) -> ParseResult {
    BpmnParser::default().parse(xml)
}

// =============================================================================
// Walker State
// =============================================================================

/// What an open element contributes to the walker's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Other,
    Process,
    FlowNode,
    ExtensionElements,
    BizagiExtensions,
    BizagiProperties,
    LaneSet,
    Collaboration,
}

#[derive(Debug)]
struct Open {
    local: String,
    role: Role,
}

/// Text content of the first matching descendant
#[derive(Debug, Default)]
enum Capture {
    #[default]
    Idle,
    Active {
        depth: usize,
        text: String,
    },
    Done(String),
}

impl Capture {
    fn start(&mut self, depth: usize) {
        if matches!(self, Self::Idle) {
            *self = Self::Active {
                depth,
                text: String::new(),
            };
        }
    }

    fn text(&mut self, chunk: &str) {
        if let Self::Active { text, .. } = self {
            text.push_str(chunk);
        }
    }

    fn end(&mut self, at: usize) {
        if let Self::Active { depth, text } = self {
            if *depth == at {
                *self = Self::Done(text.trim().to_string());
            }
        }
    }

    fn into_text(self) -> Option<String> {
        match self {
            Self::Done(text) => Some(text),
            _ => None,
        }
    }
}

/// `<resourceRef>` text inside the first `<potentialOwner>`
#[derive(Debug, Default)]
enum Owner {
    #[default]
    Idle,
    Inside {
        depth: usize,
        reference: Capture,
    },
    Done(Option<String>),
}

impl Owner {
    fn end(&mut self, at: usize) {
        if let Self::Inside { depth, reference } = self {
            reference.end(at);
            if *depth == at {
                let resolved = std::mem::take(reference).into_text();
                *self = Self::Done(resolved);
            }
        }
    }

    fn resolved(self) -> Option<String> {
        match self {
            Self::Done(reference) => reference.filter(|r| !r.is_empty()),
            _ => None,
        }
    }
}

/// A flow node whose subtree is still being read
#[derive(Debug)]
struct FlowNode {
    id: String,
    name: String,
    kind: ElementKind,
    properties: IndexMap<String, String>,
    documentation: Capture,
    resource_role: Option<Option<String>>,
    owner: Owner,
}

impl FlowNode {
    fn finish(self) -> ParsedElement {
        let documentation = self.documentation.into_text().unwrap_or_default();
        let performer = self
            .properties
            .get(PERFORMER_PROPERTY)
            .cloned()
            .or_else(|| self.resource_role.flatten())
            .or_else(|| self.owner.resolved());

        ParsedElement {
            bg_color: self.properties.get("bgColor").cloned(),
            border_color: self.properties.get("borderColor").cloned(),
            text_color: self.properties.get("textColor").cloned(),
            id: self.id,
            name: self.name,
            kind: self.kind,
            description: documentation.clone(),
            documentation,
            performer,
            custom_properties: self.properties,
        }
    }
}

/// Every `<process>` node seen, in document order
#[derive(Debug)]
struct ProcessNode {
    id_attr: Option<String>,
    lanes: Vec<Partition>,
}

#[derive(Debug)]
struct OpenProcess {
    node: usize,
    process: ParsedProcess,
}

#[derive(Debug)]
struct Participant {
    id: String,
    name: String,
    process_ref: String,
}

struct Walker {
    max_depth: usize,
    stack: Vec<Open>,
    saw_root: bool,
    nodes: Vec<ProcessNode>,
    open_processes: Vec<OpenProcess>,
    processes: IndexMap<String, ParsedProcess>,
    flow_nodes: Vec<FlowNode>,
    extension_elements: usize,
    bizagi_extensions: usize,
    bizagi_properties: usize,
    lane_sets: usize,
    collaborations: usize,
    participants: Vec<Participant>,
}

impl Walker {
    fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            stack: Vec::new(),
            saw_root: false,
            nodes: Vec::new(),
            open_processes: Vec::new(),
            processes: IndexMap::new(),
            flow_nodes: Vec::new(),
            extension_elements: 0,
            bizagi_extensions: 0,
            bizagi_properties: 0,
            lane_sets: 0,
            collaborations: 0,
            participants: Vec::new(),
        }
    }

    fn run(&mut self, xml: &str) -> Result<(), ParseError> {
        let mut reader = NsReader::from_str(xml);

        loop {
            let position = reader.buffer_position() as u64;
            let (ns, event) = reader
                .read_resolved_event()
                .map_err(|source| ParseError::Xml { position, source })?;
            let bizagi = matches!(
                ns,
                ResolveResult::Bound(Namespace(uri)) if uri == BIZAGI_NAMESPACE.as_bytes()
            );

            match event {
                Event::Start(e) => self.open(&e, bizagi, position)?,
                Event::Empty(e) => {
                    self.open(&e, bizagi, position)?;
                    self.close();
                }
                Event::End(_) => self.close(),
                Event::Text(t) => {
                    let text = t
                        .unescape()
                        .map_err(|source| ParseError::Xml { position, source })?;
                    if self.stack.is_empty() && !is_xml_whitespace(&text) {
                        return Err(ParseError::OutsideRoot { position });
                    }
                    self.text(&text);
                }
                Event::CData(c) => {
                    if self.stack.is_empty() {
                        return Err(ParseError::OutsideRoot { position });
                    }
                    self.text(&String::from_utf8_lossy(&c));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(innermost) = self.stack.last() {
            return Err(ParseError::Unclosed {
                open: self.stack.len(),
                innermost: innermost.local.clone(),
            });
        }
        if !self.saw_root {
            return Err(ParseError::NoRoot);
        }
        Ok(())
    }

    fn open(&mut self, e: &BytesStart<'_>, bizagi: bool, position: u64) -> Result<(), ParseError> {
        if self.stack.is_empty() && self.saw_root {
            return Err(ParseError::OutsideRoot { position });
        }
        // Rejects duplicate and malformed attributes
        for attribute in e.attributes().with_checks(true) {
            attribute.map_err(|source| ParseError::Attribute { position, source })?;
        }
        if self.stack.len() >= self.max_depth {
            return Err(ParseError::TooDeep {
                limit: self.max_depth,
            });
        }
        self.saw_root = true;

        let depth = self.stack.len() + 1;
        let local = e.local_name();
        let tag = local.as_ref();

        // Descendant hooks for flow nodes already open
        match tag {
            b"documentation" => {
                for node in &mut self.flow_nodes {
                    node.documentation.start(depth);
                }
            }
            b"resourceRole" => {
                if self.flow_nodes.iter().any(|n| n.resource_role.is_none()) {
                    let name = attr(e, "name", position)?;
                    for node in self.flow_nodes.iter_mut().filter(|n| n.resource_role.is_none()) {
                        node.resource_role = Some(name.clone());
                    }
                }
            }
            b"potentialOwner" => {
                for node in &mut self.flow_nodes {
                    if matches!(node.owner, Owner::Idle) {
                        node.owner = Owner::Inside {
                            depth,
                            reference: Capture::Idle,
                        };
                    }
                }
            }
            b"resourceRef" => {
                for node in &mut self.flow_nodes {
                    if let Owner::Inside { reference, .. } = &mut node.owner {
                        reference.start(depth);
                    }
                }
            }
            b"BizagiProperty" if bizagi && self.bizagi_properties > 0 => {
                if let (Some(name), Some(value)) = (attr(e, "name", position)?, attr(e, "value", position)?) {
                    for node in &mut self.flow_nodes {
                        node.properties.insert(name.clone(), value.clone());
                    }
                }
            }
            _ => {}
        }

        let role = match tag {
            b"process" => {
                self.open_process(e, position)?;
                Role::Process
            }
            b"extensionElements" => {
                self.extension_elements += 1;
                Role::ExtensionElements
            }
            b"BizagiExtensions" if bizagi && self.extension_elements > 0 => {
                self.bizagi_extensions += 1;
                Role::BizagiExtensions
            }
            b"BizagiProperties" if bizagi && self.bizagi_extensions > 0 => {
                self.bizagi_properties += 1;
                Role::BizagiProperties
            }
            b"laneSet" if !self.open_processes.is_empty() => {
                self.lane_sets += 1;
                Role::LaneSet
            }
            b"lane" if self.lane_sets > 0 => {
                self.record_lane(e, position)?;
                Role::Other
            }
            b"collaboration" => {
                self.collaborations += 1;
                Role::Collaboration
            }
            b"participant" if self.collaborations > 0 => {
                self.record_participant(e, position)?;
                Role::Other
            }
            _ => match ElementKind::from_tag(tag) {
                Some(kind) if !self.open_processes.is_empty() => self.open_flow_node(e, kind, position)?,
                _ => Role::Other,
            },
        };

        self.stack.push(Open {
            local: String::from_utf8_lossy(tag).into_owned(),
            role,
        });
        Ok(())
    }

    fn close(&mut self) {
        let Some(open) = self.stack.pop() else {
            return;
        };
        let depth = self.stack.len() + 1;

        for node in &mut self.flow_nodes {
            node.documentation.end(depth);
            node.owner.end(depth);
        }

        match open.role {
            Role::Process => self.close_process(),
            Role::FlowNode => self.close_flow_node(),
            Role::ExtensionElements => self.extension_elements -= 1,
            Role::BizagiExtensions => self.bizagi_extensions -= 1,
            Role::BizagiProperties => self.bizagi_properties -= 1,
            Role::LaneSet => self.lane_sets -= 1,
            Role::Collaboration => self.collaborations -= 1,
            Role::Other => {}
        }
    }

    fn text(&mut self, chunk: &str) {
        for node in &mut self.flow_nodes {
            node.documentation.text(chunk);
            if let Owner::Inside { reference, .. } = &mut node.owner {
                reference.text(chunk);
            }
        }
    }

    fn open_process(&mut self, e: &BytesStart<'_>, position: u64) -> Result<(), ParseError> {
        let index = self.nodes.len();
        let id_attr = attr(e, "id", position)?;
        let id = id_attr.clone().unwrap_or_else(|| format!("process_{index}"));
        let name = attr(e, "name", position)?.unwrap_or_else(|| id.clone());
        trace!("Entering process {}", id);

        self.nodes.push(ProcessNode {
            id_attr,
            lanes: Vec::new(),
        });
        self.open_processes.push(OpenProcess {
            node: index,
            process: ParsedProcess::new(id, name),
        });
        Ok(())
    }

    fn close_process(&mut self) {
        if let Some(open) = self.open_processes.pop() {
            // A later process with the same id replaces the earlier one
            self.processes.insert(open.process.id.clone(), open.process);
        }
    }

    fn open_flow_node(
        &mut self,
        e: &BytesStart<'_>,
        kind: ElementKind,
        position: u64,
    ) -> Result<Role, ParseError> {
        let Some(id) = attr(e, "id", position)? else {
            return Ok(Role::Other);
        };
        let name = attr(e, "name", position)?.unwrap_or_else(|| id.clone());

        self.flow_nodes.push(FlowNode {
            id,
            name,
            kind,
            properties: IndexMap::new(),
            documentation: Capture::Idle,
            resource_role: None,
            owner: Owner::Idle,
        });
        Ok(Role::FlowNode)
    }

    fn close_flow_node(&mut self) {
        let Some(node) = self.flow_nodes.pop() else {
            return;
        };
        let element = node.finish();
        if let Some(open) = self.open_processes.last_mut() {
            trace!("Extracted {} {} in process {}", element.kind, element.id, open.process.id);
            open.process.elements.insert(element.id.clone(), element);
        }
    }

    fn record_lane(&mut self, e: &BytesStart<'_>, position: u64) -> Result<(), ParseError> {
        let (Some(id), Some(name)) = (attr(e, "id", position)?, attr(e, "name", position)?) else {
            return Ok(());
        };
        if let Some(open) = self.open_processes.last() {
            self.nodes[open.node].lanes.push(Partition { id, name });
        }
        Ok(())
    }

    fn record_participant(&mut self, e: &BytesStart<'_>, position: u64) -> Result<(), ParseError> {
        if let (Some(id), Some(name), Some(process_ref)) = (
            attr(e, "id", position)?,
            attr(e, "name", position)?,
            attr(e, "processRef", position)?,
        ) {
            self.participants.push(Participant { id, name, process_ref });
        }
        Ok(())
    }

    /// Completed processes with their pools and lanes attached
    ///
    /// Pools come from every collaboration in the document. Lanes come from
    /// the first `<process>` node whose `id` attribute matches, so a process
    /// known only by its positional fallback id has none.
    fn into_processes(self) -> IndexMap<String, ParsedProcess> {
        let Self {
            mut processes,
            nodes,
            participants,
            ..
        } = self;

        for participant in participants {
            if let Some(process) = processes.get_mut(&participant.process_ref) {
                process.pools.push(Partition {
                    id: participant.id,
                    name: participant.name,
                });
            }
        }

        for (id, process) in &mut processes {
            if let Some(node) = nodes.iter().find(|n| n.id_attr.as_ref() == Some(id)) {
                process.lanes.clone_from(&node.lanes);
            }
        }

        processes
    }
}

fn is_xml_whitespace(text: &str) -> bool {
    text.chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n' | '\u{feff}'))
}

/// Non-empty, unescaped attribute value
fn attr(e: &BytesStart<'_>, key: &str, position: u64) -> Result<Option<String>, ParseError> {
    let Some(attribute) = e
        .try_get_attribute(key)
        .map_err(|source| ParseError::Xml { position, source })?
    else {
        return Ok(None);
    };
    let value = attribute
        .unescape_value()
        .map_err(|source| ParseError::Xml { position, source })?;
    Ok((!value.is_empty()).then(|| value.into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<definitions xmlns="http://www.omg.org/spec/BPMN/20100524/MODEL" xmlns:bz="http://www.bizagi.com/bpmn20">
{body}
</definitions>"#
        )
    }

    fn bizagi(props: &[(&str, &str)]) -> String {
        let props: String = props
            .iter()
            .map(|(n, v)| format!(r#"<BizagiProperty name="{n}" value="{v}"/>"#))
            .collect();
        format!(
            r#"<extensionElements><BizagiExtensions xmlns="http://www.bizagi.com/bpmn20"><BizagiProperties>{props}</BizagiProperties></BizagiExtensions></extensionElements>"#
        )
    }

    #[test]
    fn test_end_to_end_bizagi_performer() {
        let xml = wrap(
            r#"<process id="P1" name="Sales"><userTask id="T1" name="Approve"><extensionElements><BizagiExtensions xmlns="http://www.bizagi.com/bpmn20"><BizagiProperties><BizagiProperty name="performer" value="Manager"/></BizagiProperties></BizagiExtensions></extensionElements></userTask></process>"#,
        );
        let result = parse(&xml);

        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert!(result.warnings.is_empty());
        let process = &result.processes["P1"];
        assert_eq!(process.name, "Sales");
        let task = &process.elements["T1"];
        assert_eq!(task.id, "T1");
        assert_eq!(task.name, "Approve");
        assert_eq!(task.kind, ElementKind::UserTask);
        assert_eq!(task.performer.as_deref(), Some("Manager"));
        assert_eq!(task.documentation, "");
        assert_eq!(
            task.custom_properties,
            IndexMap::from([("performer".to_string(), "Manager".to_string())])
        );
        assert!(task.bg_color.is_none());
    }

    #[test]
    fn test_custom_property_beats_resource_role() {
        let xml = wrap(&format!(
            r#"<process id="P"><task id="T">{}<resourceRole name="Clerk"/></task></process>"#,
            bizagi(&[("performer", "Manager")])
        ));
        let task = &parse(&xml).processes["P"].elements["T"];
        assert_eq!(task.performer.as_deref(), Some("Manager"));
    }

    #[test]
    fn test_resource_role_then_potential_owner() {
        let xml = wrap(
            r#"<process id="P">
                <task id="A"><resourceRole name="Clerk"/><potentialOwner><resourceRef>Boss</resourceRef></potentialOwner></task>
                <task id="B"><resourceRole/><potentialOwner><resourceRef>  Buyer  </resourceRef></potentialOwner></task>
                <task id="C"><potentialOwner><resourceAssignmentExpression/></potentialOwner></task>
            </process>"#,
        );
        let elements = &parse(&xml).processes["P"].elements;
        assert_eq!(elements["A"].performer.as_deref(), Some("Clerk"));
        assert_eq!(elements["B"].performer.as_deref(), Some("Buyer"));
        assert_eq!(elements["C"].performer, None);
    }

    #[test]
    fn test_documentation_first_descendant_trimmed() {
        let xml = wrap(
            r#"<process id="P"><task id="T"><documentation>
                  Check the <![CDATA[invoice & total]]> first
               </documentation><documentation>second</documentation></task></process>"#,
        );
        let task = &parse(&xml).processes["P"].elements["T"];
        assert_eq!(task.documentation, "Check the invoice & total first");
        assert_eq!(task.description, task.documentation);
    }

    #[test]
    fn test_colors_and_namespace_filter() {
        let xml = wrap(&format!(
            r#"<process id="P"><task id="T">{}<extensionElements><BizagiExtensions><BizagiProperties><BizagiProperty name="ignored" value="x"/></BizagiProperties></BizagiExtensions></extensionElements></task></process>"#,
            bizagi(&[("bgColor", "#FFF"), ("borderColor", "#000"), ("textColor", "#111"), ("Owner", "Ops")])
        ));
        let task = &parse(&xml).processes["P"].elements["T"];
        assert_eq!(task.bg_color.as_deref(), Some("#FFF"));
        assert_eq!(task.border_color.as_deref(), Some("#000"));
        assert_eq!(task.text_color.as_deref(), Some("#111"));
        assert_eq!(task.custom_properties.len(), 4);
        assert!(!task.custom_properties.contains_key("ignored"));
    }

    #[test]
    fn test_prefixed_bizagi_namespace() {
        let xml = wrap(
            r#"<process id="P"><task id="T"><extensionElements><bz:BizagiExtensions><bz:BizagiProperties><bz:BizagiProperty name="k" value="v"/><bz:BizagiProperty name="empty" value=""/></bz:BizagiProperties></bz:BizagiExtensions></extensionElements></task></process>"#,
        );
        let task = &parse(&xml).processes["P"].elements["T"];
        assert_eq!(task.custom_properties, IndexMap::from([("k".to_string(), "v".to_string())]));
    }

    #[test]
    fn test_later_property_blocks_overwrite() {
        let xml = wrap(&format!(
            r#"<process id="P"><task id="T">{}{}</task></process>"#,
            bizagi(&[("Owner", "first")]),
            bizagi(&[("Owner", "second")])
        ));
        let task = &parse(&xml).processes["P"].elements["T"];
        assert_eq!(task.custom_properties["Owner"], "second");
    }

    #[test]
    fn test_pools_are_scoped_to_their_process() {
        let xml = wrap(
            r#"<collaboration id="C">
                 <participant id="Pool1" name="Sales Pool" processRef="P1"/>
                 <participant id="Pool2" name="Finance Pool" processRef="P2"/>
                 <participant id="Pool3" name="Ghost" processRef="Missing"/>
                 <participant id="Pool4" processRef="P1"/>
               </collaboration>
               <process id="P1"/>
               <process id="P2"/>"#,
        );
        let result = parse(&xml);
        assert_eq!(
            result.processes["P1"].pools,
            vec![Partition { id: "Pool1".into(), name: "Sales Pool".into() }]
        );
        assert_eq!(
            result.processes["P2"].pools,
            vec![Partition { id: "Pool2".into(), name: "Finance Pool".into() }]
        );
    }

    #[test]
    fn test_lanes_in_order() {
        let xml = wrap(
            r#"<process id="P"><laneSet id="LS">
                 <lane id="L1" name="Vendas"/>
                 <lane id="L2" name="Financeiro"><childLaneSet><lane id="L3" name="Contas"/></childLaneSet></lane>
                 <lane id="L4"/>
               </laneSet></process>"#,
        );
        let lanes = &parse(&xml).processes["P"].lanes;
        let names: Vec<_> = lanes.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Vendas", "Financeiro", "Contas"]);
    }

    #[test]
    fn test_process_fallbacks() {
        let xml = wrap(r#"<process id="Named"/><process name="Anonymous"/><process/>"#);
        let result = parse(&xml);
        assert_eq!(result.processes["Named"].name, "Named");
        assert_eq!(result.processes["process_1"].name, "Anonymous");
        assert_eq!(result.processes["process_2"].name, "process_2");
    }

    #[test]
    fn test_elements_need_an_id() {
        let xml = wrap(
            r#"<process id="P"><task name="No id"/><task id="T1"/><task id="T2" name=""/><endEvent id="E" name="Done"/></process>"#,
        );
        let elements = &parse(&xml).processes["P"].elements;
        assert_eq!(elements.len(), 3);
        assert_eq!(elements["T1"].name, "T1");
        assert_eq!(elements["T2"].name, "T2");
        assert_eq!(elements["E"].kind, ElementKind::EndEvent);
    }

    #[test]
    fn test_flow_nodes_outside_processes_are_ignored() {
        let xml = wrap(r#"<task id="Loose"/><process id="P"/>"#);
        let result = parse(&xml);
        assert!(result.processes["P"].elements.is_empty());
    }

    #[test]
    fn test_sub_process_sees_nested_content() {
        let xml = wrap(&format!(
            r#"<process id="P"><subProcess id="S" name="Review"><userTask id="U">{}<documentation>Inner</documentation></userTask></subProcess></process>"#,
            bizagi(&[("performer", "Auditor")])
        ));
        let elements = &parse(&xml).processes["P"].elements;
        assert_eq!(elements.len(), 2);
        assert_eq!(elements["U"].performer.as_deref(), Some("Auditor"));
        assert_eq!(elements["S"].kind, ElementKind::SubProcess);
        assert_eq!(elements["S"].documentation, "Inner");
        assert_eq!(elements["S"].performer.as_deref(), Some("Auditor"));
    }

    #[test]
    fn test_prefixed_bpmn_document() {
        let xml = r#"<?xml version="1.0"?>
<bpmn2:definitions xmlns:bpmn2="http://www.omg.org/spec/BPMN/20100524/MODEL">
  <bpmn2:process id="P" name="Prefixed">
    <bpmn2:laneSet><bpmn2:lane id="L" name="Ops"/></bpmn2:laneSet>
    <bpmn2:startEvent id="S"/>
    <bpmn2:exclusiveGateway id="G" name="Ok?"/>
  </bpmn2:process>
</bpmn2:definitions>"#;
        let result = parse(xml);
        let process = &result.processes["P"];
        assert_eq!(process.elements.len(), 2);
        assert_eq!(process.elements["G"].kind, ElementKind::ExclusiveGateway);
        assert_eq!(process.lanes[0].name, "Ops");
    }

    #[test]
    fn test_no_processes_is_a_warning() {
        let result = parse(&wrap(r#"<message id="M"/>"#));
        assert!(result.errors.is_empty());
        assert_eq!(result.warnings, vec![NO_PROCESSES_WARNING.to_string()]);
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        for xml in [
            "<definitions><process id=\"P\"></definitions>",
            "<definitions><process id=\"P\"><task id=\"T\"/></process>",
            "",
            "<?xml version=\"1.0\"?>",
            "<definitions><process id=\"P\" id=\"Q\"/></definitions>",
            "<definitions><task id=\"T\" name=\"a\" name=\"b\"/></definitions>",
            "<definitions><process id=P/></definitions>",
            "<definitions/><process id=\"P\"/>",
            "<definitions></definitions>trailing",
            "stray<definitions/>",
            "<definitions/><![CDATA[x]]>",
        ] {
            let result = parse(xml);
            assert_eq!(result.errors.len(), 1, "{xml}");
            assert!(result.errors[0].starts_with("Failed to parse XML"), "{xml}");
            assert!(result.processes.is_empty(), "{xml}");
            assert!(result.warnings.is_empty(), "{xml}");
        }
    }

    #[test]
    fn test_depth_limit_keeps_completed_processes() {
        let deep = "<a>".repeat(20) + &"</a>".repeat(20);
        let xml = format!(r#"<definitions><process id="P1"><task id="T"/></process><process id="P2">{deep}</process></definitions>"#);

        let result = BpmnParser::new(ParserLimits { max_depth: 10 }).parse(&xml);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("nesting"));
        assert!(result.processes.contains_key("P1"));
        assert!(!result.processes.contains_key("P2"));

        assert!(parse(&xml).is_ok());
    }

    #[test]
    fn test_parse_is_deterministic() {
        let xml = wrap(&format!(
            r#"<process id="P"><laneSet><lane id="L" name="Ops"/></laneSet><task id="T">{}</task></process>"#,
            bizagi(&[("a", "1"), ("b", "2")])
        ));
        assert_eq!(parse(&xml), parse(&xml));
    }
}
