//! Stage 2: projection onto canonical terms
//!
//! Every stage-1 edge (other than COREF) is replaced by the cross product of
//! the terms on both sides, resolved through coreference. Parallel edges
//! merge their provenance, supporting sentences and purposes.

use std::collections::BTreeSet;

use petgraph::Direction;
use tracing::{debug, warn};

use privkg_core::{
    PolicyDocument, Relationship, Result, SourceId, FIRST_PARTY, THIRD_PARTY, UNSPECIFIC_DATA,
    UNSPECIFIC_ENTITY,
};

use crate::knowledge::{KnowledgeGraph, TermEdgeKind};
use crate::stage1::Stage1Graph;

/// Build the term graph from a stage-1 graph
pub fn build_stage2(
    document: &PolicyDocument,
    stage1: &Stage1Graph,
    sentence_separator: &str,
) -> Result<KnowledgeGraph> {
    let mut graph = KnowledgeGraph::new();

    for node in stage1.nodes() {
        for term in &node.terms {
            graph.add_term(term, node.semantic_type);
        }
    }

    let mut rejected = 0usize;
    for (from, to, edge) in stage1.edges() {
        let Some(kind) = TermEdgeKind::for_relationship(edge.relationship()) else {
            continue;
        };

        let mains_from = coref_main(stage1, from);
        let mains_to = coref_main(stage1, to);
        let terms_from = terms_of(stage1, &mains_from);
        let terms_to = terms_of(stage1, &mains_to);

        let sources: Vec<SourceId> = mains_from.union(&mains_to).copied().collect();
        let text = supporting_text(document, &sources, sentence_separator);

        for term_from in &terms_from {
            for term_to in &terms_to {
                let Some(term_edge) = graph.add_edge(term_from, term_to, kind.clone()) else {
                    rejected += 1;
                    continue;
                };

                term_edge.sources.push(sources.clone());
                term_edge.text.push(text.clone());
                if let TermEdgeKind::Collect { purposes } = &mut term_edge.kind {
                    purposes.extend(edge.purposes().iter().cloned());
                }
            }
        }
    }

    debug!(
        document = document.id(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        rejected,
        "Projected onto terms"
    );

    postprocess(&mut graph);
    Ok(graph)
}

fn coref_main(stage1: &Stage1Graph, src: SourceId) -> BTreeSet<SourceId> {
    stage1
        .node(src)
        .map(|n| n.coref_main.clone())
        .unwrap_or_default()
}

fn terms_of(stage1: &Stage1Graph, sources: &BTreeSet<SourceId>) -> BTreeSet<String> {
    sources
        .iter()
        .filter_map(|&src| stage1.node(src))
        .flat_map(|n| n.terms.iter().cloned())
        .collect()
}

/// Sentences mentioning any of `sources`, segment by segment, joined by `separator`
pub fn supporting_text(document: &PolicyDocument, sources: &[SourceId], separator: &str) -> String {
    let segment_ids: BTreeSet<usize> = sources
        .iter()
        .filter_map(|&src| document.segment_of(src))
        .collect();

    let mut sentences = Vec::new();
    for segment_id in segment_ids {
        let segment = &document.segments()[segment_id];
        for range in segment.sentences() {
            let mentioned = segment.tokens()[range.clone()]
                .iter()
                .any(|t| t.src.is_some_and(|src| sources.contains(&src)));
            if mentioned {
                sentences.push(segment.sentence_text(range.clone()));
            }
        }
    }
    sentences.join(separator)
}

/// Drop structurally invalid edges, then isolated terms
fn postprocess(graph: &mut KnowledgeGraph) {
    // Parties are never subsumed or collected
    for party in [FIRST_PARTY, THIRD_PARTY] {
        for (from, to, relationship) in graph.remove_edges_where(party, Direction::Incoming, |_| true) {
            warn!(%from, %to, %relationship, "Potentially invalid edge removed");
        }
    }

    for unspecific in [UNSPECIFIC_DATA, UNSPECIFIC_ENTITY] {
        let removed = graph.remove_edges_where(unspecific, Direction::Outgoing, |e| {
            e.relationship() == Relationship::Subsum
        });
        for (from, to, _) in removed {
            debug!(%from, %to, "Removed SUBSUM edge from unspecific term");
        }
    }

    let pruned = graph.prune_isolated();
    debug!(pruned, "Pruned isolated terms");
}
