//! Stage 1: per-occurrence graph
//!
//! One node per typed phrase occurrence (keyed by the source id of its head
//! token). Types come from the NER labels, from COLLECT/NOT_COLLECT
//! endpoints, and from propagation along SUBSUM/COREF links. Every node ends
//! up with a set of normalized terms and the set of coreference mains it
//! stands for.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use petgraph::algo::toposort;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use tracing::debug;

use privkg_core::{
    PolicyDocument, PrivKgError, Purpose, Relationship, Result, SemanticType, SourceId,
    UNSPECIFIC_DATA, UNSPECIFIC_ENTITY,
};
use privkg_extractor::keywords::{is_actor_keyword, is_datatype_keyword, is_unspecific_data};
use privkg_extractor::{expand_phrase, simplified_lemma_text};

use crate::builder::NormalizationServices;
use crate::dag::dag_add_edge;

// ============================================================================
// Graph Types
// ============================================================================

/// A typed phrase occurrence
#[derive(Debug, Clone)]
pub struct Stage1Node {
    pub src: SourceId,
    pub semantic_type: SemanticType,
    /// Occurrences this node ultimately refers to (itself unless it has COREF edges)
    pub coref_main: BTreeSet<SourceId>,
    pub terms: BTreeSet<String>,
}

impl Stage1Node {
    fn new(src: SourceId, semantic_type: SemanticType) -> Self {
        Self {
            src,
            semantic_type,
            coref_main: BTreeSet::new(),
            terms: BTreeSet::new(),
        }
    }
}

/// Edge payload, tagged by relationship
#[derive(Debug, Clone, PartialEq)]
pub enum Stage1Edge {
    Collect { purposes: Vec<Purpose> },
    NotCollect,
    Subsum,
    Coref,
}

impl Stage1Edge {
    fn for_relationship(relationship: Relationship) -> Option<Self> {
        match relationship {
            Relationship::Collect => Some(Self::Collect {
                purposes: Vec::new(),
            }),
            Relationship::NotCollect => Some(Self::NotCollect),
            Relationship::Subsum => Some(Self::Subsum),
            Relationship::Coref => Some(Self::Coref),
            Relationship::Purpose => None,
        }
    }

    pub fn relationship(&self) -> Relationship {
        match self {
            Self::Collect { .. } => Relationship::Collect,
            Self::NotCollect => Relationship::NotCollect,
            Self::Subsum => Relationship::Subsum,
            Self::Coref => Relationship::Coref,
        }
    }

    pub fn purposes(&self) -> &[Purpose] {
        match self {
            Self::Collect { purposes } => purposes,
            _ => &[],
        }
    }
}

/// The per-document occurrence graph
#[derive(Debug, Clone, Default)]
pub struct Stage1Graph {
    graph: StableDiGraph<Stage1Node, Stage1Edge>,
    index: HashMap<SourceId, NodeIndex>,
}

impl Stage1Graph {
    pub fn node(&self, src: SourceId) -> Option<&Stage1Node> {
        self.index.get(&src).map(|&i| &self.graph[i])
    }

    pub fn contains(&self, src: SourceId) -> bool {
        self.index.contains_key(&src)
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Stage1Node> + '_ {
        self.graph.node_indices().map(move |i| &self.graph[i])
    }

    /// Edges as (from, to, payload)
    pub fn edges(&self) -> impl Iterator<Item = (SourceId, SourceId, &Stage1Edge)> + '_ {
        self.graph.edge_references().map(|e| {
            (
                self.graph[e.source()].src,
                self.graph[e.target()].src,
                e.weight(),
            )
        })
    }

    /// Payload of the `from -> to` edge with the given relationship
    pub fn edge(&self, from: SourceId, to: SourceId, relationship: Relationship) -> Option<&Stage1Edge> {
        let (&a, &b) = (self.index.get(&from)?, self.index.get(&to)?);
        self.find_edge(a, b, relationship).map(|e| &self.graph[e])
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_acyclic(&self) -> bool {
        !petgraph::algo::is_cyclic_directed(&self.graph)
    }

    fn add_node(&mut self, src: SourceId, semantic_type: SemanticType) -> NodeIndex {
        let index = self.graph.add_node(Stage1Node::new(src, semantic_type));
        self.index.insert(src, index);
        index
    }

    fn type_of(&self, src: SourceId) -> Option<SemanticType> {
        self.node(src).map(|n| n.semantic_type)
    }

    fn find_edge(
        &self,
        from: NodeIndex,
        to: NodeIndex,
        relationship: Relationship,
    ) -> Option<petgraph::stable_graph::EdgeIndex> {
        self.graph
            .edges(from)
            .find(|e| e.target() == to && e.weight().relationship() == relationship)
            .map(|e| e.id())
    }

    /// Plain insertion, at most one edge per (from, to, relationship)
    fn add_edge(&mut self, from: SourceId, to: SourceId, edge: Stage1Edge) -> bool {
        let (Some(&a), Some(&b)) = (self.index.get(&from), self.index.get(&to)) else {
            return false;
        };
        if self.find_edge(a, b, edge.relationship()).is_some() {
            return false;
        }
        self.graph.add_edge(a, b, edge);
        true
    }

    /// Cycle-free insertion, at most one edge per (from, to, relationship)
    fn dag_add_edge(&mut self, from: SourceId, to: SourceId, edge: Stage1Edge) -> bool {
        let (Some(&a), Some(&b)) = (self.index.get(&from), self.index.get(&to)) else {
            return false;
        };
        if self.find_edge(a, b, edge.relationship()).is_some() {
            return false;
        }
        dag_add_edge(&mut self.graph, a, b, edge).is_some()
    }

    fn remove_nodes_where<F>(&mut self, doomed: F) -> usize
    where
        F: Fn(&Stage1Node) -> bool,
    {
        let doomed: Vec<_> = self
            .graph
            .node_indices()
            .filter(|&i| doomed(&self.graph[i]))
            .collect();

        for &i in &doomed {
            if let Some(node) = self.graph.remove_node(i) {
                self.index.remove(&node.src);
            }
        }
        doomed.len()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Build the stage-1 graph of a document
pub fn build_stage1(document: &PolicyDocument, services: &NormalizationServices) -> Result<Stage1Graph> {
    let mut graph = Stage1Graph::default();

    seed_types(document, &mut graph)?;
    add_collection_edges(document, &mut graph);
    attach_purposes(document, services, &mut graph)?;
    propagate_types(document, &mut graph);

    let removed = graph.remove_nodes_where(|n| n.semantic_type == SemanticType::Other);
    debug!(document = document.id(), removed, "Removed OTHER phrases");

    normalize_nodes(document, services, &mut graph)?;

    // Occurrences that normalize to nothing carry no knowledge
    let removed = graph.remove_nodes_where(|n| n.terms.is_empty());
    debug!(document = document.id(), removed, "Removed phrases without terms");

    debug!(
        document = document.id(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "Stage 1 complete"
    );
    Ok(graph)
}

/// Pass 1: node types from NER labels; NN and unlabelled nodes wait
fn seed_types(document: &PolicyDocument, graph: &mut Stage1Graph) -> Result<()> {
    for &src in document.nodes() {
        let token = document.resolve(src)?.token();
        if let Some(semantic_type) = token.entity_label().and_then(|l| l.semantic_type()) {
            graph.add_node(src, semantic_type);
        }
    }

    debug!(document = document.id(), nodes = graph.node_count(), "Seeded node types");
    Ok(())
}

/// Pass 2: COLLECT/NOT_COLLECT endpoints default to ACTOR -> DATA
///
/// The defaulting is a heuristic and a known source of false positives.
fn add_collection_edges(document: &PolicyDocument, graph: &mut Stage1Graph) {
    for link in document.links() {
        if !link.relationship.is_collection() {
            continue;
        }

        if !graph.contains(link.from) {
            graph.add_node(link.from, SemanticType::Actor);
        }
        if !graph.contains(link.to) {
            graph.add_node(link.to, SemanticType::Data);
        }

        let types = (graph.type_of(link.from), graph.type_of(link.to));
        if types == (Some(SemanticType::Actor), Some(SemanticType::Data)) {
            // ACTOR -> DATA edges cannot close a cycle
            if let Some(edge) = Stage1Edge::for_relationship(link.relationship) {
                graph.add_edge(link.from, link.to, edge);
            }
        }
    }

    debug!(document = document.id(), edges = graph.edge_count(), "Added collection edges");
}

/// Pass 3: classify purpose phrases and attach them to inbound COLLECT edges
fn attach_purposes(
    document: &PolicyDocument,
    services: &NormalizationServices,
    graph: &mut Stage1Graph,
) -> Result<()> {
    let mut data_purposes: Vec<(NodeIndex, Vec<String>)> = Vec::new();
    let mut all_texts = Vec::new();
    let mut seen = HashSet::new();

    for index in graph.graph.node_indices() {
        let node = &graph.graph[index];
        if node.semantic_type != SemanticType::Data {
            continue;
        }

        let mut texts = Vec::new();
        for link in document.outgoing(node.src) {
            if link.relationship != Relationship::Purpose {
                continue;
            }
            let purpose = document.resolve(link.to)?;
            let end = purpose
                .segment
                .subtree(purpose.index)
                .last()
                .map_or(purpose.index + 1, |&last| last + 1);
            let text = purpose.segment.span_text(purpose.index..end);

            if seen.insert(text.clone()) {
                all_texts.push(text.clone());
            }
            texts.push(text);
        }

        if !texts.is_empty() {
            data_purposes.push((index, texts));
        }
    }

    if all_texts.is_empty() {
        return Ok(());
    }

    let labels = services.purpose_classifier.classify(&all_texts)?;
    if labels.len() != all_texts.len() {
        return Err(PrivKgError::Classifier(format!(
            "{} returned {} labels for {} texts",
            services.purpose_classifier.name(),
            labels.len(),
            all_texts.len()
        )));
    }
    let label_of: HashMap<&str, &str> = all_texts
        .iter()
        .map(String::as_str)
        .zip(labels.iter().map(String::as_str))
        .collect();

    for (index, texts) in data_purposes {
        let purposes: Vec<Purpose> = texts
            .iter()
            .map(|text| Purpose::new(label_of[text.as_str()], text.as_str()))
            .collect();

        let inbound: Vec<_> = graph
            .graph
            .edges_directed(index, Direction::Incoming)
            .map(|e| e.id())
            .collect();
        for edge in inbound {
            if let Stage1Edge::Collect { purposes: slot } = &mut graph.graph[edge] {
                *slot = purposes.clone();
            }
        }
    }

    debug!(
        document = document.id(),
        texts = all_texts.len(),
        classifier = services.purpose_classifier.name(),
        "Attached purposes"
    );
    Ok(())
}

/// Pass 4: spread types along SUBSUM/COREF links, breadth first
fn propagate_types(document: &PolicyDocument, graph: &mut Stage1Graph) {
    let mut queue: VecDeque<SourceId> = graph.nodes().map(|n| n.src).collect();
    let mut rejected = 0usize;

    while let Some(src) = queue.pop_front() {
        let Some(semantic_type) = graph.type_of(src) else {
            continue;
        };
        if semantic_type == SemanticType::Other {
            continue;
        }

        for link in document.incoming(src).chain(document.outgoing(src)) {
            if !link.relationship.is_hierarchical() {
                continue;
            }
            let other = if link.from == src { link.to } else { link.from };

            if !graph.contains(other) {
                graph.add_node(other, semantic_type);
                queue.push_back(other);
            }

            if graph.type_of(other) == Some(semantic_type) {
                if let Some(edge) = Stage1Edge::for_relationship(link.relationship) {
                    if !graph.dag_add_edge(link.from, link.to, edge) {
                        rejected += 1;
                    }
                }
            }
        }
    }

    debug!(
        document = document.id(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        rejected,
        "Propagated types"
    );
}

/// Pass 5: normalize in reverse topological order so COREF targets come first
fn normalize_nodes(
    document: &PolicyDocument,
    services: &NormalizationServices,
    graph: &mut Stage1Graph,
) -> Result<()> {
    let order = toposort(&graph.graph, None).map_err(|_| PrivKgError::CycleDetected("stage 1"))?;

    for &index in order.iter().rev() {
        let mut coref_main = BTreeSet::new();
        let mut terms = BTreeSet::new();

        for edge in graph.graph.edges(index) {
            if *edge.weight() == Stage1Edge::Coref {
                let target = &graph.graph[edge.target()];
                coref_main.extend(target.coref_main.iter().copied());
                terms.extend(target.terms.iter().cloned());
            }
        }

        let node = &graph.graph[index];
        if coref_main.is_empty() {
            coref_main.insert(node.src);
            terms = normalize_occurrence(document, services, node.src, node.semantic_type)?;
        }

        let node = &mut graph.graph[index];
        node.coref_main = coref_main;
        node.terms = terms;
    }

    debug!(document = document.id(), "Normalized phrases");
    Ok(())
}

/// Canonical terms of the phrase(s) headed by one token
pub fn normalize_occurrence(
    document: &PolicyDocument,
    services: &NormalizationServices,
    src: SourceId,
    semantic_type: SemanticType,
) -> Result<BTreeSet<String>> {
    let head = document.resolve(src)?;
    let mut terms = BTreeSet::new();

    for phrase in expand_phrase(head.segment, head.index) {
        match semantic_type {
            SemanticType::Data => {
                let mut found = services.data_normalizer.normalize(&phrase);

                if found.is_empty() {
                    let simplified = simplified_lemma_text(&phrase);
                    if is_unspecific_data(&simplified) {
                        found.push(UNSPECIFIC_DATA.to_string());
                    } else if !simplified.is_empty() && !is_datatype_keyword(&simplified) {
                        found.push(simplified);
                    }
                }
                terms.extend(found);
            }
            SemanticType::Actor => {
                let mut found = services.actor_normalizer.normalize(&phrase);

                if phrase.tokens().any(|(_, t)| t.pos == "PROPN") {
                    if let Some(name) = services.entity_matcher.match_name(&phrase.text()) {
                        found.push(name);
                    }
                }

                if found.is_empty() {
                    let simplified = simplified_lemma_text(&phrase);
                    if is_actor_keyword(&simplified) {
                        found.push(UNSPECIFIC_ENTITY.to_string());
                    } else if !simplified.is_empty() && simplified != "you" {
                        found.push(simplified);
                    }
                }
                terms.extend(found);
            }
            SemanticType::Other => {
                return Err(PrivKgError::InvalidNodeType {
                    source_id: src,
                    node_type: semantic_type,
                });
            }
        }
    }

    Ok(terms)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::tests::services;
    use privkg_core::testing::{link, SegmentFixture};
    use privkg_core::Relationship::*;

    /// We collect your location data and device identifiers for fraud prevention .
    fn collect_document() -> PolicyDocument {
        let segment = SegmentFixture::new(0)
            .token("We", "we", "PRON", "nsubj", 1)
            .ent("ACTOR")
            .token("collect", "collect", "VERB", "ROOT", 1)
            .token("your", "your", "PRON", "poss", 4)
            .token("location", "location", "NOUN", "compound", 4)
            .token("data", "datum", "NOUN", "dobj", 1)
            .ent("DATA")
            .token("and", "and", "CCONJ", "cc", 4)
            .token("device", "device", "NOUN", "compound", 7)
            .token("identifiers", "identifier", "NOUN", "conj", 4)
            .token("for", "for", "ADP", "prep", 1)
            .token("fraud", "fraud", "NOUN", "compound", 10)
            .token("prevention", "prevention", "NOUN", "pobj", 8)
            .no_space()
            .token(".", ".", "PUNCT", "punct", 1)
            .build();

        PolicyDocument::new(
            "test",
            vec![segment],
            vec![],
            vec![
                link((0, 0), (0, 4), Collect),
                link((0, 0), (0, 7), Collect),
                link((0, 4), (0, 8), Purpose),
                link((0, 4), (0, 7), Subsum),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_collection_defaults_and_purposes() {
        let document = collect_document();
        let graph = build_stage1(&document, &services()).unwrap();

        // (0, 7) has no NER label; the COLLECT edge makes it DATA
        assert_eq!(
            graph.node(SourceId(0, 7)).unwrap().semantic_type,
            SemanticType::Data
        );

        let edge = graph.edge(SourceId(0, 0), SourceId(0, 4), Collect).unwrap();
        assert_eq!(
            edge.purposes(),
            &[Purpose::new("security", "for fraud prevention")]
        );
        let edge = graph.edge(SourceId(0, 0), SourceId(0, 7), Collect).unwrap();
        assert!(edge.purposes().is_empty());

        assert!(graph.edge(SourceId(0, 4), SourceId(0, 7), Subsum).is_some());
        assert!(graph.is_acyclic());
    }

    #[test]
    fn test_normalized_terms() {
        let document = collect_document();
        let graph = build_stage1(&document, &services()).unwrap();

        let terms = |src| graph.node(src).unwrap().terms.iter().cloned().collect::<Vec<_>>();
        assert_eq!(terms(SourceId(0, 0)), vec!["first party"]);
        // the DATA head expands into both conjuncts
        assert_eq!(terms(SourceId(0, 4)), vec!["device identifier", "location data"]);
        assert_eq!(terms(SourceId(0, 7)), vec!["device identifier"]);

        let node = graph.node(SourceId(0, 4)).unwrap();
        assert_eq!(node.coref_main, BTreeSet::from([SourceId(0, 4)]));
    }

    #[test]
    fn test_mismatched_collection_types_skip_edge() {
        // "cookies" is tagged ACTOR by the NER, so the COLLECT edge is not (ACTOR, DATA)
        let segment = SegmentFixture::new(0)
            .token("We", "we", "PRON", "nsubj", 1)
            .ent("ACTOR")
            .token("use", "use", "VERB", "ROOT", 1)
            .token("cookies", "cookie", "NOUN", "dobj", 1)
            .ent("ACTOR")
            .build();
        let document = PolicyDocument::new(
            "test",
            vec![segment],
            vec![],
            vec![link((0, 0), (0, 2), NotCollect)],
        )
        .unwrap();

        let graph = build_stage1(&document, &services()).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_propagation_and_other_removal() {
        // Partners include Acme . the service features
        let segment = SegmentFixture::new(0)
            .token("Partners", "partner", "NOUN", "nsubj", 1)
            .ent("ACTOR")
            .token("include", "include", "VERB", "ROOT", 1)
            .token("Acme", "Acme", "PROPN", "dobj", 1)
            .ent("NN")
            .no_space()
            .token(".", ".", "PUNCT", "punct", 1)
            .token("the", "the", "DET", "det", 5)
            .sent_start()
            .token("service", "service", "NOUN", "ROOT", 5)
            .ent("OTHER")
            .token("features", "feature", "NOUN", "dobj", 5)
            .build();
        let document = PolicyDocument::new(
            "test",
            vec![segment],
            vec![SourceId(0, 5)],
            vec![
                link((0, 0), (0, 2), Subsum),
                // an OTHER node does not spread its type
                link((0, 5), (0, 6), Subsum),
            ],
        )
        .unwrap();

        let graph = build_stage1(&document, &services()).unwrap();
        assert_eq!(
            graph.node(SourceId(0, 2)).unwrap().semantic_type,
            SemanticType::Actor
        );
        assert!(graph.edge(SourceId(0, 0), SourceId(0, 2), Subsum).is_some());
        assert!(!graph.contains(SourceId(0, 5)));
        assert!(!graph.contains(SourceId(0, 6)));

        let terms = &graph.node(SourceId(0, 0)).unwrap().terms;
        assert_eq!(terms, &BTreeSet::from([UNSPECIFIC_ENTITY.to_string()]));
        let terms = &graph.node(SourceId(0, 2)).unwrap().terms;
        assert_eq!(terms, &BTreeSet::from(["Acme".to_string()]));
    }

    #[test]
    fn test_coref_copies_target_terms() {
        // We collect your email address . We use this information .
        let segment = SegmentFixture::new(0)
            .token("We", "we", "PRON", "nsubj", 1)
            .ent("ACTOR")
            .token("collect", "collect", "VERB", "ROOT", 1)
            .token("your", "your", "PRON", "poss", 4)
            .token("email", "email", "NOUN", "compound", 4)
            .token("address", "address", "NOUN", "dobj", 1)
            .ent("DATA")
            .no_space()
            .token(".", ".", "PUNCT", "punct", 1)
            .token("We", "we", "PRON", "nsubj", 7)
            .sent_start()
            .token("use", "use", "VERB", "ROOT", 7)
            .token("this", "this", "DET", "det", 9)
            .token("information", "information", "NOUN", "dobj", 7)
            .build();
        let document = PolicyDocument::new(
            "test",
            vec![segment],
            vec![],
            vec![
                link((0, 0), (0, 4), Collect),
                link((0, 9), (0, 4), Coref),
            ],
        )
        .unwrap();

        let graph = build_stage1(&document, &services()).unwrap();
        let referrer = graph.node(SourceId(0, 9)).unwrap();
        let target = graph.node(SourceId(0, 4)).unwrap();

        assert_eq!(referrer.semantic_type, SemanticType::Data);
        assert_eq!(referrer.terms, target.terms);
        assert_eq!(referrer.terms, BTreeSet::from(["email address".to_string()]));
        assert_eq!(referrer.coref_main, BTreeSet::from([SourceId(0, 4)]));
    }

    #[test]
    fn test_coref_with_several_targets_takes_union() {
        // We collect location . We store email . We share them
        let segment = SegmentFixture::new(0)
            .token("We", "we", "PRON", "nsubj", 1)
            .ent("ACTOR")
            .token("collect", "collect", "VERB", "ROOT", 1)
            .token("location", "location", "NOUN", "dobj", 1)
            .ent("DATA")
            .no_space()
            .token(".", ".", "PUNCT", "punct", 1)
            .token("We", "we", "PRON", "nsubj", 5)
            .ent("ACTOR")
            .sent_start()
            .token("store", "store", "VERB", "ROOT", 5)
            .token("email", "email", "NOUN", "dobj", 5)
            .ent("DATA")
            .no_space()
            .token(".", ".", "PUNCT", "punct", 5)
            .token("We", "we", "PRON", "nsubj", 9)
            .sent_start()
            .token("share", "share", "VERB", "ROOT", 9)
            .token("them", "they", "PRON", "dobj", 9)
            .build();
        let document = PolicyDocument::new(
            "test",
            vec![segment],
            vec![],
            vec![
                link((0, 0), (0, 2), Collect),
                link((0, 4), (0, 6), Collect),
                link((0, 10), (0, 2), Coref),
                link((0, 10), (0, 6), Coref),
            ],
        )
        .unwrap();

        let graph = build_stage1(&document, &services()).unwrap();
        let referrer = graph.node(SourceId(0, 10)).unwrap();

        assert_eq!(referrer.semantic_type, SemanticType::Data);
        assert_eq!(
            referrer.coref_main,
            BTreeSet::from([SourceId(0, 2), SourceId(0, 6)])
        );
        assert_eq!(
            referrer.terms,
            BTreeSet::from(["email address".to_string(), "location data".to_string()])
        );
        assert!(graph.edge(SourceId(0, 10), SourceId(0, 2), Coref).is_some());
        assert!(graph.edge(SourceId(0, 10), SourceId(0, 6), Coref).is_some());
    }

    #[test]
    fn test_unspecific_and_generic_data() {
        // information ; identifiers
        let segment = SegmentFixture::new(0)
            .token("information", "information", "NOUN", "ROOT", 0)
            .ent("DATA")
            .token("identifiers", "identifier", "NOUN", "ROOT", 1)
            .ent("DATA")
            .sent_start()
            .build();
        let document = PolicyDocument::new(
            "test",
            vec![segment],
            vec![SourceId(0, 0), SourceId(0, 1)],
            vec![],
        )
        .unwrap();

        let graph = build_stage1(&document, &services()).unwrap();
        assert_eq!(
            graph.node(SourceId(0, 0)).unwrap().terms,
            BTreeSet::from([UNSPECIFIC_DATA.to_string()])
        );
        // a bare data-type keyword is too generic to be a term, so the node is dropped
        assert!(!graph.contains(SourceId(0, 1)));
        assert!(graph.nodes().all(|n| !n.terms.is_empty()));
    }

    #[test]
    fn test_renormalizing_is_stable() {
        let document = collect_document();
        let services = services();
        let graph = build_stage1(&document, &services).unwrap();

        for node in graph.nodes() {
            if node.coref_main.contains(&node.src) {
                let again =
                    normalize_occurrence(&document, &services, node.src, node.semantic_type)
                        .unwrap();
                assert_eq!(again, node.terms);
            }
        }
    }

    #[test]
    fn test_other_type_is_invalid() {
        let document = collect_document();
        let err = normalize_occurrence(&document, &services(), SourceId(0, 4), SemanticType::Other)
            .unwrap_err();
        assert!(matches!(
            err,
            PrivKgError::InvalidNodeType {
                source_id: SourceId(0, 4),
                node_type: SemanticType::Other
            }
        ));
    }
}
