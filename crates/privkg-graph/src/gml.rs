//! GML serialization
//!
//! Writes the knowledge graph as a directed multigraph in GML. Numbers and
//! strings are written as GML values; lists and maps are JSON-encoded into a
//! string. Inside strings, `"`, `&` and anything outside printable ASCII
//! become `&#N;` character references.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

use serde_json::{json, Value};

use privkg_core::{PrivKgError, Result};

use crate::knowledge::KnowledgeGraph;

/// Render a graph as GML text
pub fn to_gml_string(graph: &KnowledgeGraph) -> Result<String> {
    let inner = graph.inner();
    let mut out = String::new();
    let mut ids = HashMap::new();

    out.push_str("graph [\n  directed 1\n  multigraph 1\n");

    for (id, index) in inner.node_indices().enumerate() {
        ids.insert(index, id);
        let node = &inner[index];

        out.push_str("  node [\n");
        write_attr(&mut out, "id", &json!(id))?;
        write_attr(&mut out, "label", &json!(node.term))?;
        write_attr(&mut out, "type", &json!(node.semantic_type.as_str()))?;
        out.push_str("  ]\n");
    }

    for index in inner.edge_indices() {
        let (Some((from, to)), Some(edge)) = (inner.edge_endpoints(index), inner.edge_weight(index))
        else {
            continue;
        };
        let relationship = edge.relationship();

        out.push_str("  edge [\n");
        write_attr(&mut out, "source", &json!(ids[&from]))?;
        write_attr(&mut out, "target", &json!(ids[&to]))?;
        write_attr(&mut out, "key", &json!(relationship.as_str()))?;
        write_attr(&mut out, "sources", &to_value(&edge.sources)?)?;
        write_attr(&mut out, "text", &to_value(&edge.text)?)?;
        if relationship == privkg_core::Relationship::Collect {
            let purposes: Vec<[&str; 2]> = edge
                .purposes()
                .iter()
                .map(|p| [p.category.as_str(), p.text.as_str()])
                .collect();
            write_attr(&mut out, "purposes", &to_value(&purposes)?)?;
        }
        out.push_str("  ]\n");
    }

    out.push_str("]\n");
    Ok(out)
}

/// Write a graph as GML
pub fn write_gml<W: Write>(graph: &KnowledgeGraph, mut writer: W) -> Result<()> {
    let text = to_gml_string(graph)?;
    writer.write_all(text.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Write a graph to a GML file, replacing it if present
pub fn save_gml(graph: &KnowledgeGraph, path: impl AsRef<Path>) -> Result<()> {
    let file = std::fs::File::create(path.as_ref())?;
    write_gml(graph, std::io::BufWriter::new(file))
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| PrivKgError::Serialization(e.to_string()))
}

fn write_attr(out: &mut String, key: &str, value: &Value) -> Result<()> {
    let rendered = match value {
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => u8::from(*b).to_string(),
        Value::String(s) => quote(s),
        other => {
            let encoded = serde_json::to_string(other)
                .map_err(|e| PrivKgError::Serialization(e.to_string()))?;
            quote(&encoded)
        }
    };

    writeln!(out, "    {key} {rendered}").map_err(|e| PrivKgError::Serialization(e.to_string()))
}

/// Quote a GML string, escaping with character references
fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        if c == '"' || c == '&' || !(' '..='~').contains(&c) {
            // Writing to a String cannot fail
            let _ = write!(quoted, "&#{};", c as u32);
        } else {
            quoted.push(c);
        }
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::TermEdgeKind;
    use privkg_core::{Purpose, SemanticType, SourceId};

    fn graph() -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        graph.add_term("first party", SemanticType::Actor);
        graph.add_term("géolocation", SemanticType::Data);

        let edge = graph
            .add_edge(
                "first party",
                "géolocation",
                TermEdgeKind::Collect {
                    purposes: vec![Purpose::new("security", "for \"fraud\" prevention")],
                },
            )
            .unwrap();
        edge.sources.push(vec![SourceId(0, 0), SourceId(0, 3)]);
        edge.text.push("We collect it.".to_string());
        graph
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("plain text"), "\"plain text\"");
        assert_eq!(quote("a \"b\" & c"), "\"a &#34;b&#34; &#38; c\"");
        assert_eq!(quote("é\n"), "\"&#233;&#10;\"");
    }

    #[test]
    fn test_gml_layout() {
        let gml = to_gml_string(&graph()).unwrap();
        let expected = concat!(
            "graph [\n",
            "  directed 1\n",
            "  multigraph 1\n",
            "  node [\n",
            "    id 0\n",
            "    label \"first party\"\n",
            "    type \"ACTOR\"\n",
            "  ]\n",
            "  node [\n",
            "    id 1\n",
            "    label \"g&#233;olocation\"\n",
            "    type \"DATA\"\n",
            "  ]\n",
            "  edge [\n",
            "    source 0\n",
            "    target 1\n",
            "    key \"COLLECT\"\n",
            "    sources \"[[[0,0],[0,3]]]\"\n",
            "    text \"[&#34;We collect it.&#34;]\"\n",
            "    purposes \"[[&#34;security&#34;,&#34;for \\&#34;fraud\\&#34; prevention&#34;]]\"\n",
            "  ]\n",
            "]\n",
        );
        assert_eq!(gml, expected);
    }

    #[test]
    fn test_non_collect_edge_has_no_purposes() {
        let mut graph = KnowledgeGraph::new();
        graph.add_term("location data", SemanticType::Data);
        graph.add_term("gps", SemanticType::Data);
        graph.add_edge("location data", "gps", TermEdgeKind::Subsum);

        let gml = to_gml_string(&graph).unwrap();
        assert!(gml.contains("key \"SUBSUM\""));
        assert!(!gml.contains("purposes"));
    }

    #[test]
    fn test_save_gml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.gml");

        save_gml(&graph(), &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, to_gml_string(&graph()).unwrap());
    }
}
