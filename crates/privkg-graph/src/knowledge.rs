//! The per-document knowledge graph over canonical terms

use std::collections::HashMap;

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use serde::Serialize;
use tracing::warn;

use privkg_core::{Purpose, Relationship, SemanticType, SourceId};

use crate::dag::dag_add_edge;

/// A canonical term
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermNode {
    pub term: String,
    pub semantic_type: SemanticType,
}

/// Relationship-specific edge payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TermEdgeKind {
    Collect { purposes: Vec<Purpose> },
    NotCollect,
    Subsum,
}

impl TermEdgeKind {
    /// Empty payload for an aggregated relationship; COREF and PURPOSE never aggregate
    pub fn for_relationship(relationship: Relationship) -> Option<Self> {
        match relationship {
            Relationship::Collect => Some(Self::Collect {
                purposes: Vec::new(),
            }),
            Relationship::NotCollect => Some(Self::NotCollect),
            Relationship::Subsum => Some(Self::Subsum),
            Relationship::Coref | Relationship::Purpose => None,
        }
    }

    pub fn relationship(&self) -> Relationship {
        match self {
            Self::Collect { .. } => Relationship::Collect,
            Self::NotCollect => Relationship::NotCollect,
            Self::Subsum => Relationship::Subsum,
        }
    }
}

/// An aggregated edge between two terms
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermEdge {
    pub kind: TermEdgeKind,
    /// One entry per contributing occurrence edge: the sorted sources involved
    pub sources: Vec<Vec<SourceId>>,
    /// One entry per contributing occurrence edge: the supporting sentences
    pub text: Vec<String>,
}

impl TermEdge {
    pub fn new(kind: TermEdgeKind) -> Self {
        Self {
            kind,
            sources: Vec::new(),
            text: Vec::new(),
        }
    }

    pub fn relationship(&self) -> Relationship {
        self.kind.relationship()
    }

    pub fn purposes(&self) -> &[Purpose] {
        match &self.kind {
            TermEdgeKind::Collect { purposes } => purposes,
            _ => &[],
        }
    }
}

/// A term seen with two different types
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermConflict {
    pub term: String,
    pub kept: SemanticType,
    pub rejected: SemanticType,
}

/// Directed multi-relationship graph over canonical terms
///
/// At most one edge per (from, to, relationship); always acyclic when edges
/// are added through [`KnowledgeGraph::add_edge`].
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    graph: StableDiGraph<TermNode, TermEdge>,
    terms: HashMap<String, NodeIndex>,
    conflicts: Vec<TermConflict>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a term, keeping the first-seen type on conflict
    pub fn add_term(&mut self, term: &str, semantic_type: SemanticType) -> NodeIndex {
        if let Some(&index) = self.terms.get(term) {
            let kept = self.graph[index].semantic_type;
            if kept != semantic_type {
                warn!(term, %kept, rejected = %semantic_type, "Term type conflict");
                self.conflicts.push(TermConflict {
                    term: term.to_string(),
                    kept,
                    rejected: semantic_type,
                });
            }
            return index;
        }

        let index = self.graph.add_node(TermNode {
            term: term.to_string(),
            semantic_type,
        });
        self.terms.insert(term.to_string(), index);
        index
    }

    /// Existing edge, or a new one inserted without closing a cycle
    ///
    /// Returns `None` when the edge is new and would close a cycle, or when
    /// either term is unknown.
    pub fn add_edge(&mut self, from: &str, to: &str, kind: TermEdgeKind) -> Option<&mut TermEdge> {
        let (&a, &b) = (self.terms.get(from)?, self.terms.get(to)?);

        let index = match self.find_edge(a, b, kind.relationship()) {
            Some(index) => index,
            None => dag_add_edge(&mut self.graph, a, b, TermEdge::new(kind))?,
        };
        self.graph.edge_weight_mut(index)
    }

    pub fn node(&self, term: &str) -> Option<&TermNode> {
        self.terms.get(term).map(|&i| &self.graph[i])
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms.contains_key(term)
    }

    pub fn edge(&self, from: &str, to: &str, relationship: Relationship) -> Option<&TermEdge> {
        let (&a, &b) = (self.terms.get(from)?, self.terms.get(to)?);
        self.find_edge(a, b, relationship).map(|e| &self.graph[e])
    }

    /// Terms in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &TermNode> + '_ {
        self.graph.node_indices().map(move |i| &self.graph[i])
    }

    /// Edges as (from term, to term, payload)
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &TermEdge)> + '_ {
        self.graph.edge_references().map(|e| {
            (
                self.graph[e.source()].term.as_str(),
                self.graph[e.target()].term.as_str(),
                e.weight(),
            )
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn in_degree(&self, term: &str) -> usize {
        self.degree(term, Direction::Incoming)
    }

    pub fn out_degree(&self, term: &str) -> usize {
        self.degree(term, Direction::Outgoing)
    }

    pub fn conflicts(&self) -> &[TermConflict] {
        &self.conflicts
    }

    pub fn is_acyclic(&self) -> bool {
        !petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Remove the edges of `term` in one direction that satisfy `predicate`
    ///
    /// Returns the removed edges as (from, to, relationship).
    pub fn remove_edges_where<F>(
        &mut self,
        term: &str,
        direction: Direction,
        mut predicate: F,
    ) -> Vec<(String, String, Relationship)>
    where
        F: FnMut(&TermEdge) -> bool,
    {
        let Some(&index) = self.terms.get(term) else {
            return Vec::new();
        };

        let doomed: Vec<EdgeIndex> = self
            .graph
            .edges_directed(index, direction)
            .filter(|e| predicate(e.weight()))
            .map(|e| e.id())
            .collect();

        let mut removed = Vec::with_capacity(doomed.len());
        for edge in doomed {
            if let Some((a, b)) = self.graph.edge_endpoints(edge) {
                let from = self.graph[a].term.clone();
                let to = self.graph[b].term.clone();
                if let Some(weight) = self.graph.remove_edge(edge) {
                    removed.push((from, to, weight.relationship()));
                }
            }
        }
        removed
    }

    /// Remove nodes without edges until none are left; returns how many went
    pub fn prune_isolated(&mut self) -> usize {
        let mut total = 0;
        loop {
            let isolated: Vec<NodeIndex> = self
                .graph
                .node_indices()
                .filter(|&i| self.graph.neighbors_undirected(i).next().is_none())
                .collect();
            if isolated.is_empty() {
                return total;
            }

            total += isolated.len();
            for index in isolated {
                if let Some(node) = self.graph.remove_node(index) {
                    self.terms.remove(&node.term);
                }
            }
        }
    }

    /// Keep only the given terms and the edges among them
    pub fn retain_terms<F>(&mut self, mut keep: F)
    where
        F: FnMut(&TermNode) -> bool,
    {
        let doomed: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&i| !keep(&self.graph[i]))
            .collect();
        for index in doomed {
            if let Some(node) = self.graph.remove_node(index) {
                self.terms.remove(&node.term);
            }
        }
    }

    pub(crate) fn inner(&self) -> &StableDiGraph<TermNode, TermEdge> {
        &self.graph
    }

    fn find_edge(&self, from: NodeIndex, to: NodeIndex, relationship: Relationship) -> Option<EdgeIndex> {
        self.graph
            .edges(from)
            .find(|e| e.target() == to && e.weight().relationship() == relationship)
            .map(|e| e.id())
    }

    fn degree(&self, term: &str, direction: Direction) -> usize {
        self.terms
            .get(term)
            .map_or(0, |&i| self.graph.edges_directed(i, direction).count())
    }
}
