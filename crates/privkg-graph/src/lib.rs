//! privkg Graph - Knowledge graph construction
//!
//! Turns the token relationship graph of an annotated policy into a graph
//! over canonical terms in two stages:
//!
//! 1. [`stage1`]: type every phrase occurrence, resolve COREF/SUBSUM chains
//!    into a DAG, attach purposes, normalize each phrase.
//! 2. [`stage2`]: project occurrences onto terms, merge parallel edges,
//!    prune invalid edges and isolated terms.
//!
//! Every edge that could close a cycle goes through [`dag::dag_add_edge`].

pub mod builder;
pub mod dag;
pub mod gml;
pub mod knowledge;
pub mod stage1;
pub mod stage2;
pub mod trim;

pub use builder::{GraphBuilder, NormalizationServices};
pub use gml::{save_gml, to_gml_string, write_gml};
pub use knowledge::{KnowledgeGraph, TermConflict, TermEdge, TermEdgeKind, TermNode};
pub use stage1::{Stage1Edge, Stage1Graph, Stage1Node};
pub use trim::trim_graph;
