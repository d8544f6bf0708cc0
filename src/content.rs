// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Projection of parse results into the viewer's content schema

use crate::types::{ContentMap, ContentRecord, ParseResult, ParsedElement, COLOR_KEYS};
use std::collections::BTreeSet;
use tracing::warn;

/// Flatten every element of every process into one id-keyed content map
///
/// Processes are visited in document order. An element id used by more
/// than one process keeps the record of the last process in the document.
#[must_use]
pub fn to_content_map(result: &ParseResult) -> ContentMap {
    let mut content = ContentMap::new();

    for process in result.processes.values() {
        for (id, element) in &process.elements {
            if content.insert(id.clone(), record(element)).is_some() {
                warn!("Element {} appears in more than one process; keeping the one from {}", id, process.id);
            }
        }
    }

    content
}

/// Distinct performers and lane names, sorted
#[must_use]
pub fn list_performers(result: &ParseResult) -> Vec<String> {
    let mut performers = BTreeSet::new();

    for process in result.processes.values() {
        performers.extend(process.lanes.iter().map(|lane| lane.name.clone()));
        performers.extend(process.elements.values().filter_map(|e| e.performer.clone()));
    }

    performers.into_iter().filter(|p| !p.is_empty()).collect()
}

fn record(element: &ParsedElement) -> ContentRecord {
    let descricao = if element.description.is_empty() {
        element.documentation.clone()
    } else {
        element.description.clone()
    };

    ContentRecord {
        id: element.id.clone(),
        nome: element.name.clone(),
        tipo: element.kind,
        ator: element.performer.clone().unwrap_or_default(),
        passo_a_passo: if element.description.is_empty() {
            Vec::new()
        } else {
            vec![element.description.clone()]
        },
        descricao,
        entradas: Vec::new(),
        saidas: Vec::new(),
        ferramentas: Vec::new(),
        pop_it_referencia: Vec::new(),
        observacoes: element
            .custom_properties
            .iter()
            .filter(|(key, _)| !COLOR_KEYS.contains(&key.as_str()))
            .map(|(key, value)| format!("{key}: {value}"))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ElementKind, ParsedProcess, Partition};
    use indexmap::IndexMap;

    fn element(id: &str, performer: Option<&str>) -> ParsedElement {
        ParsedElement {
            id: id.into(),
            name: format!("{id} name"),
            kind: ElementKind::Task,
            description: String::new(),
            documentation: String::new(),
            performer: performer.map(String::from),
            bg_color: None,
            border_color: None,
            text_color: None,
            custom_properties: IndexMap::new(),
        }
    }

    fn result_with(processes: Vec<ParsedProcess>) -> ParseResult {
        ParseResult {
            processes: processes.into_iter().map(|p| (p.id.clone(), p)).collect(),
            ..ParseResult::default()
        }
    }

    #[test]
    fn test_bare_element_projects_to_empty_defaults() {
        let mut process = ParsedProcess::new("P", "P");
        process.elements.insert("T".into(), element("T", None));

        let content = to_content_map(&result_with(vec![process]));
        let record = &content["T"];
        assert_eq!(record.nome, "T name");
        assert_eq!(record.tipo, ElementKind::Task);
        assert_eq!(record.ator, "");
        assert_eq!(record.descricao, "");
        assert!(record.passo_a_passo.is_empty());
        assert!(record.observacoes.is_empty());
        assert!(record.entradas.is_empty());
        assert!(record.saidas.is_empty());
        assert!(record.ferramentas.is_empty());
        assert!(record.pop_it_referencia.is_empty());
    }

    #[test]
    fn test_documentation_and_properties_seed_fields() {
        let mut task = element("T", Some("Ana"));
        task.description = "Check stock".into();
        task.documentation = "Check stock".into();
        task.bg_color = Some("#fff".into());
        task.custom_properties = IndexMap::from([
            ("bgColor".to_string(), "#fff".to_string()),
            ("SLA".to_string(), "2d".to_string()),
            ("textColor".to_string(), "#000".to_string()),
        ]);
        let mut process = ParsedProcess::new("P", "P");
        process.elements.insert("T".into(), task);

        let record = &to_content_map(&result_with(vec![process]))["T"];
        assert_eq!(record.ator, "Ana");
        assert_eq!(record.descricao, "Check stock");
        assert_eq!(record.passo_a_passo, vec!["Check stock"]);
        assert_eq!(record.observacoes, vec!["SLA: 2d"]);
    }

    #[test]
    fn test_wire_keys() {
        let mut process = ParsedProcess::new("P", "P");
        process.elements.insert("T".into(), element("T", None));

        let json = serde_json::to_value(to_content_map(&result_with(vec![process]))).unwrap();
        let record = json["T"].as_object().unwrap();
        for key in [
            "id", "nome", "tipo", "ator", "descricao", "entradas", "saidas", "ferramentas",
            "passoAPasso", "popItReferencia", "observacoes",
        ] {
            assert!(record.contains_key(key), "missing {key}");
        }
        assert_eq!(record["tipo"], "task");
    }

    #[test]
    fn test_cross_process_collision_keeps_last_in_document() {
        let mut first = ParsedProcess::new("Z", "Z");
        first.elements.insert("T".into(), element("T", Some("from Z")));
        let mut second = ParsedProcess::new("A", "A");
        second.elements.insert("T".into(), element("T", Some("from A")));

        let content = to_content_map(&result_with(vec![first, second]));
        assert_eq!(content.len(), 1);
        assert_eq!(content["T"].ator, "from A");
    }

    #[test]
    fn test_collision_follows_parsed_document_order() {
        let result = crate::parser::parse(
            r#"<definitions><process id="Z"><task id="T" name="from Z"/></process><process id="A"><task id="T" name="from A"/></process></definitions>"#,
        );
        assert_eq!(result.processes.keys().collect::<Vec<_>>(), ["Z", "A"]);
        assert_eq!(to_content_map(&result)["T"].nome, "from A");
    }

    #[test]
    fn test_notes_keep_property_document_order() {
        let result = crate::parser::parse(
            r##"<definitions><process id="P"><task id="T"><extensionElements><BizagiExtensions xmlns="http://www.bizagi.com/bpmn20"><BizagiProperties><BizagiProperty name="zeta" value="1"/><BizagiProperty name="bgColor" value="#fff"/><BizagiProperty name="alpha" value="2"/><BizagiProperty name="zeta" value="3"/></BizagiProperties></BizagiExtensions></extensionElements></task></process></definitions>"##,
        );
        let record = &to_content_map(&result)["T"];
        assert_eq!(record.observacoes, ["zeta: 3", "alpha: 2"]);
    }

    #[test]
    fn test_performers_sorted_case_sensitive() {
        let mut sales = ParsedProcess::new("P1", "Sales");
        sales.lanes = vec![
            Partition { id: "L1".into(), name: "Vendas".into() },
            Partition { id: "L2".into(), name: "Financeiro".into() },
        ];
        sales.elements.insert("A".into(), element("A", Some("Ana")));
        sales.elements.insert("B".into(), element("B", Some("vendas")));
        sales.elements.insert("C".into(), element("C", None));
        let mut other = ParsedProcess::new("P2", "Other");
        other.elements.insert("D".into(), element("D", Some("Ana")));

        let performers = list_performers(&result_with(vec![sales, other]));
        assert_eq!(performers, ["Ana", "Financeiro", "Vendas", "vendas"]);
    }
}
