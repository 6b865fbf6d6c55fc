//! Cycle-free edge insertion

use petgraph::algo::has_path_connecting;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};

/// Insert `from -> to` unless it would close a cycle
///
/// Rejects self loops and edges whose target already reaches the source.
/// Returns the new edge, or `None` when rejected.
pub fn dag_add_edge<N, E>(
    graph: &mut StableDiGraph<N, E>,
    from: NodeIndex,
    to: NodeIndex,
    weight: E,
) -> Option<EdgeIndex> {
    if from == to || has_path_connecting(&*graph, to, from, None) {
        return None;
    }
    Some(graph.add_edge(from, to, weight))
}
