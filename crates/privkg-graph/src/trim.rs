//! Collection-centred subgraph

use std::collections::HashSet;

use petgraph::visit::{Dfs, EdgeRef, IntoEdgeReferences};

use crate::knowledge::KnowledgeGraph;

/// Keep the endpoints of COLLECT/NOT_COLLECT edges and every term reachable
/// from them; everything else is dropped
pub fn trim_graph(graph: &KnowledgeGraph) -> KnowledgeGraph {
    let inner = graph.inner();

    let seeds: Vec<_> = inner
        .edge_references()
        .filter(|e| e.weight().relationship().is_collection())
        .flat_map(|e| [e.source(), e.target()])
        .collect();

    let mut keep = HashSet::new();
    let mut dfs = Dfs::empty(inner);
    for seed in seeds {
        if keep.contains(&seed) {
            continue;
        }
        dfs.move_to(seed);
        while let Some(index) = dfs.next(inner) {
            keep.insert(index);
        }
    }

    let keep: HashSet<&str> = keep.into_iter().map(|i| inner[i].term.as_str()).collect();
    let mut trimmed = graph.clone();
    trimmed.retain_terms(|node| keep.contains(node.term.as_str()));
    trimmed
}
