//! Annotated document model
//!
//! A policy document is a list of segments. Each segment is an immutable
//! arena of tokens whose dependency tree is given by head indices; child
//! lists, depths and sentence boundaries are derived once at construction.
//! The relationship graph produced by the upstream annotators refers to
//! tokens through their [`SourceId`].

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::{EntityLabel, PrivKgError, Relationship, Result};

// ============================================================================
// Source Identifiers
// ============================================================================

/// Identifies a token in the original policy text: (segment, position)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub usize, pub usize);

impl SourceId {
    pub fn new(segment: usize, position: usize) -> Self {
        Self(segment, position)
    }

    pub fn segment(&self) -> usize {
        self.0
    }

    pub fn position(&self) -> usize {
        self.1
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.0, self.1)
    }
}

// ============================================================================
// Tokens and Segments
// ============================================================================

fn default_true() -> bool {
    true
}

/// A token record as produced by the annotation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Verbatim token text
    pub text: String,

    /// Whether the token is followed by whitespace
    #[serde(default = "default_true")]
    pub trailing_space: bool,

    /// Lemma
    pub lemma: String,

    /// Coarse part-of-speech tag (NOUN, PROPN, VERB, ...)
    pub pos: String,

    /// Dependency label towards the head
    pub dep: String,

    /// Index of the head token within the segment (self for the root)
    pub head: usize,

    /// NER tag, if the token is part of a recognized entity
    #[serde(default)]
    pub ent_type: Option<String>,

    /// Position in the original text; `None` for context tokens
    #[serde(default)]
    pub src: Option<SourceId>,

    /// Whether this token starts a sentence
    #[serde(default)]
    pub sent_start: bool,
}

impl Token {
    /// Entity label derived from the NER tag
    pub fn entity_label(&self) -> Option<EntityLabel> {
        self.ent_type.as_deref().and_then(EntityLabel::from_tag)
    }

    pub fn has_entity(&self) -> bool {
        self.ent_type.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn whitespace(&self) -> &'static str {
        if self.trailing_space {
            " "
        } else {
            ""
        }
    }
}

/// One segment of a policy: a token arena with its dependency tree
#[derive(Debug, Clone)]
pub struct Segment {
    tokens: Vec<Token>,
    children: Vec<Vec<usize>>,
    depths: Vec<usize>,
    sentences: Vec<Range<usize>>,
}

impl Segment {
    /// Build a segment, validating the dependency tree
    pub fn new(tokens: Vec<Token>) -> Result<Self> {
        let len = tokens.len();
        let mut children = vec![Vec::new(); len];

        for (i, token) in tokens.iter().enumerate() {
            if token.head >= len {
                return Err(PrivKgError::InvalidDocument(format!(
                    "token {i} ({}) has head {} outside segment of {len} tokens",
                    token.text, token.head
                )));
            }
            if token.head != i {
                children[token.head].push(i);
            }
        }

        let mut depths = vec![0; len];
        for (i, depth) in depths.iter_mut().enumerate() {
            let mut current = i;
            let mut steps = 0;
            while tokens[current].head != current {
                current = tokens[current].head;
                steps += 1;
                if steps > len {
                    return Err(PrivKgError::InvalidDocument(format!(
                        "dependency cycle through token {i}"
                    )));
                }
            }
            *depth = steps;
        }

        let mut sentences = Vec::new();
        let mut start = 0;
        for (i, token) in tokens.iter().enumerate().skip(1) {
            if token.sent_start {
                sentences.push(start..i);
                start = i;
            }
        }
        if len > 0 {
            sentences.push(start..len);
        }

        Ok(Self {
            tokens,
            children,
            depths,
            sentences,
        })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn token(&self, index: usize) -> &Token {
        &self.tokens[index]
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Children of a token, in ascending index order
    pub fn children(&self, index: usize) -> &[usize] {
        &self.children[index]
    }

    /// Children to the left of a token, in ascending index order
    pub fn lefts(&self, index: usize) -> impl DoubleEndedIterator<Item = usize> + '_ {
        self.children[index]
            .iter()
            .copied()
            .filter(move |&c| c < index)
    }

    /// Children to the right of a token, in ascending index order
    pub fn rights(&self, index: usize) -> impl DoubleEndedIterator<Item = usize> + '_ {
        self.children[index]
            .iter()
            .copied()
            .filter(move |&c| c > index)
    }

    /// Distance from a token to the root of its tree
    pub fn depth(&self, index: usize) -> usize {
        self.depths[index]
    }

    /// All tokens dominated by `index` (inclusive), sorted by position
    pub fn subtree(&self, index: usize) -> Vec<usize> {
        let mut result = Vec::new();
        let mut stack = vec![index];

        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children[current].iter().copied());
        }

        result.sort_unstable();
        result
    }

    /// Sentence boundaries as half-open token ranges
    pub fn sentences(&self) -> &[Range<usize>] {
        &self.sentences
    }

    /// Text of a token range, without the trailing whitespace of the last token
    pub fn span_text(&self, range: Range<usize>) -> String {
        join_tokens(self.tokens[range].iter(), |t| &t.text)
    }

    /// Lemmas of a token range joined with the original whitespace
    pub fn span_lemma(&self, range: Range<usize>) -> String {
        join_tokens(self.tokens[range].iter(), |t| &t.lemma)
    }

    /// Sentence text, leaving out context tokens that have no source
    pub fn sentence_text(&self, range: Range<usize>) -> String {
        join_tokens(
            self.tokens[range].iter().filter(|t| t.src.is_some()),
            |t| &t.text,
        )
    }
}

fn join_tokens<'a, I, F>(tokens: I, field: F) -> String
where
    I: Iterator<Item = &'a Token>,
    F: Fn(&'a Token) -> &'a str,
{
    let mut text = String::new();
    for token in tokens {
        text.push_str(field(token));
        text.push_str(token.whitespace());
    }
    text.truncate(text.trim_end().len());
    text
}

/// A token resolved inside its segment
#[derive(Debug, Clone, Copy)]
pub struct TokenRef<'a> {
    pub segment: &'a Segment,
    pub index: usize,
}

impl<'a> TokenRef<'a> {
    pub fn token(&self) -> &'a Token {
        self.segment.token(self.index)
    }
}

// ============================================================================
// Phrases
// ============================================================================

/// A contiguous span of tokens within one segment
#[derive(Debug, Clone, Copy)]
pub struct Phrase<'a> {
    segment: &'a Segment,
    start: usize,
    end: usize,
}

impl<'a> Phrase<'a> {
    /// Create a phrase over `range`; the range must be non-empty and in bounds
    pub fn new(segment: &'a Segment, range: Range<usize>) -> Self {
        debug_assert!(range.start < range.end && range.end <= segment.len());
        Self {
            segment,
            start: range.start,
            end: range.end,
        }
    }

    pub fn segment(&self) -> &'a Segment {
        self.segment
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        self.range().contains(&index)
    }

    /// Tokens of the phrase with their segment indices
    pub fn tokens(&self) -> impl Iterator<Item = (usize, &'a Token)> + '_ {
        let segment = self.segment;
        self.range().map(move |i| (i, segment.token(i)))
    }

    pub fn text(&self) -> String {
        self.segment.span_text(self.range())
    }

    pub fn lemma_text(&self) -> String {
        self.segment.span_lemma(self.range())
    }

    /// Syntactic root: the shallowest token whose head lies outside the phrase
    pub fn root(&self) -> usize {
        self.range()
            .filter(|&i| {
                let head = self.segment.token(i).head;
                head == i || !self.contains(head)
            })
            .min_by_key(|&i| (self.segment.depth(i), i))
            .unwrap_or(self.start)
    }

    pub fn root_token(&self) -> &'a Token {
        self.segment.token(self.root())
    }
}

// ============================================================================
// Relationship Graph
// ============================================================================

/// A labeled edge of the token relationship graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipLink {
    pub from: SourceId,
    pub to: SourceId,
    pub relationship: Relationship,
}

impl RelationshipLink {
    pub fn new(from: SourceId, to: SourceId, relationship: Relationship) -> Self {
        Self {
            from,
            to,
            relationship,
        }
    }
}

/// On-disk representation of an annotated segment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedSegment {
    pub tokens: Vec<Token>,
}

/// On-disk representation of an annotated document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedDocument {
    /// Document identifier; the loader falls back to the directory name
    #[serde(default)]
    pub id: Option<String>,

    pub segments: Vec<AnnotatedSegment>,

    /// Relationship graph nodes, including ones without any edge
    #[serde(default)]
    pub nodes: Vec<SourceId>,

    #[serde(default)]
    pub relationships: Vec<RelationshipLink>,
}

/// A policy document with its token relationship graph
#[derive(Debug, Clone)]
pub struct PolicyDocument {
    id: String,
    segments: Vec<Segment>,
    nodes: Vec<SourceId>,
    links: Vec<RelationshipLink>,
    locations: HashMap<SourceId, (usize, usize)>,
    outgoing: HashMap<SourceId, Vec<usize>>,
    incoming: HashMap<SourceId, Vec<usize>>,
}

impl PolicyDocument {
    /// Build a document, indexing tokens by source and validating the graph
    pub fn new(
        id: impl Into<String>,
        segments: Vec<Segment>,
        nodes: Vec<SourceId>,
        links: Vec<RelationshipLink>,
    ) -> Result<Self> {
        let mut locations = HashMap::new();
        for (segment_index, segment) in segments.iter().enumerate() {
            for (token_index, token) in segment.tokens().iter().enumerate() {
                if let Some(src) = token.src {
                    if locations.insert(src, (segment_index, token_index)).is_some() {
                        return Err(PrivKgError::InvalidDocument(format!(
                            "duplicate source identifier {src}"
                        )));
                    }
                }
            }
        }

        // Node order is first appearance: explicit nodes, then link endpoints
        let mut seen = HashSet::new();
        let mut ordered_nodes = Vec::new();
        let endpoints = links.iter().flat_map(|l| [l.from, l.to]);
        for src in nodes.into_iter().chain(endpoints) {
            if seen.insert(src) {
                if !locations.contains_key(&src) {
                    return Err(PrivKgError::TokenNotFound(src));
                }
                ordered_nodes.push(src);
            }
        }

        let mut outgoing: HashMap<SourceId, Vec<usize>> = HashMap::new();
        let mut incoming: HashMap<SourceId, Vec<usize>> = HashMap::new();
        for (i, link) in links.iter().enumerate() {
            outgoing.entry(link.from).or_default().push(i);
            incoming.entry(link.to).or_default().push(i);
        }

        Ok(Self {
            id: id.into(),
            segments,
            nodes: ordered_nodes,
            links,
            locations,
            outgoing,
            incoming,
        })
    }

    /// Build a document from its on-disk form
    pub fn from_annotations(fallback_id: &str, annotated: AnnotatedDocument) -> Result<Self> {
        let segments = annotated
            .segments
            .into_iter()
            .map(|s| Segment::new(s.tokens))
            .collect::<Result<Vec<_>>>()?;

        let id = annotated.id.unwrap_or_else(|| fallback_id.to_string());
        Self::new(id, segments, annotated.nodes, annotated.relationships)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Nodes of the relationship graph in order of first appearance
    pub fn nodes(&self) -> &[SourceId] {
        &self.nodes
    }

    pub fn links(&self) -> &[RelationshipLink] {
        &self.links
    }

    /// Segment index holding the token with this source
    pub fn segment_of(&self, src: SourceId) -> Option<usize> {
        self.locations.get(&src).map(|&(segment, _)| segment)
    }

    pub fn token_ref(&self, src: SourceId) -> Option<TokenRef<'_>> {
        self.locations.get(&src).map(|&(segment, index)| TokenRef {
            segment: &self.segments[segment],
            index,
        })
    }

    /// Like [`token_ref`](Self::token_ref), failing with `TokenNotFound`
    pub fn resolve(&self, src: SourceId) -> Result<TokenRef<'_>> {
        self.token_ref(src).ok_or(PrivKgError::TokenNotFound(src))
    }

    pub fn outgoing(&self, src: SourceId) -> impl Iterator<Item = &RelationshipLink> + '_ {
        self.link_indices(&self.outgoing, src)
    }

    pub fn incoming(&self, src: SourceId) -> impl Iterator<Item = &RelationshipLink> + '_ {
        self.link_indices(&self.incoming, src)
    }

    fn link_indices<'s>(
        &'s self,
        index: &'s HashMap<SourceId, Vec<usize>>,
        src: SourceId,
    ) -> impl Iterator<Item = &'s RelationshipLink> + 's {
        index
            .get(&src)
            .into_iter()
            .flatten()
            .map(move |&i| &self.links[i])
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{link, SegmentFixture};

    /// "We collect your location data ."
    fn sample_segment() -> Segment {
        SegmentFixture::new(0)
            .token("We", "we", "PRON", "nsubj", 1)
            .token("collect", "collect", "VERB", "ROOT", 1)
            .token("your", "your", "PRON", "poss", 4)
            .token("location", "location", "NOUN", "compound", 4)
            .token("data", "datum", "NOUN", "dobj", 1)
            .no_space()
            .token(".", ".", "PUNCT", "punct", 1)
            .build()
    }

    #[test]
    fn test_children_and_sides() {
        let segment = sample_segment();
        assert_eq!(segment.children(1), &[0, 4, 5]);
        assert_eq!(segment.lefts(4).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(segment.rights(1).collect::<Vec<_>>(), vec![4, 5]);
        assert_eq!(segment.depth(1), 0);
        assert_eq!(segment.depth(3), 2);
    }

    #[test]
    fn test_subtree_sorted() {
        let segment = sample_segment();
        assert_eq!(segment.subtree(4), vec![2, 3, 4]);
        assert_eq!(segment.subtree(1), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_span_text_and_lemma() {
        let segment = sample_segment();
        assert_eq!(segment.span_text(2..5), "your location data");
        assert_eq!(segment.span_lemma(2..5), "your location datum");
        assert_eq!(segment.span_text(0..6), "We collect your location data.");
    }

    #[test]
    fn test_phrase_root() {
        let segment = sample_segment();
        let phrase = Phrase::new(&segment, 2..5);
        assert_eq!(phrase.root(), 4);
        assert_eq!(phrase.root_token().lemma, "datum");
        assert!(phrase.contains(3));
        assert!(!phrase.contains(5));
    }

    #[test]
    fn test_invalid_head_rejected() {
        let mut tokens = SegmentFixture::new(0)
            .token("a", "a", "DET", "ROOT", 0)
            .into_tokens();
        tokens[0].head = 3;
        assert!(matches!(
            Segment::new(tokens),
            Err(PrivKgError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_dependency_cycle_rejected() {
        let tokens = SegmentFixture::new(0)
            .token("a", "a", "NOUN", "dep", 1)
            .token("b", "b", "NOUN", "dep", 0)
            .into_tokens();
        assert!(Segment::new(tokens).is_err());
    }

    #[test]
    fn test_sentences_split_on_start_flag() {
        let segment = SegmentFixture::new(0)
            .token("Hi", "hi", "INTJ", "ROOT", 0)
            .no_space()
            .token(".", ".", "PUNCT", "punct", 0)
            .token("Bye", "bye", "INTJ", "ROOT", 2)
            .sent_start()
            .build();
        assert_eq!(segment.sentences(), &[0..2, 2..3]);
        assert_eq!(segment.sentence_text(0..2), "Hi.");
    }

    #[test]
    fn test_sentence_text_skips_context() {
        let segment = SegmentFixture::new(0)
            .token("Cookies", "cookie", "NOUN", "ROOT", 0)
            .context()
            .token("We", "we", "PRON", "nsubj", 2)
            .sent_start()
            .token("collect", "collect", "VERB", "ROOT", 2)
            .build();
        assert_eq!(segment.sentence_text(0..3), "We collect");
    }

    #[test]
    fn test_document_indexes_links() {
        let doc = PolicyDocument::new(
            "doc",
            vec![sample_segment()],
            vec![SourceId::new(0, 3)],
            vec![link((0, 0), (0, 4), Relationship::Collect)],
        )
        .unwrap();

        assert_eq!(
            doc.nodes(),
            &[SourceId::new(0, 3), SourceId::new(0, 0), SourceId::new(0, 4)]
        );
        assert_eq!(doc.outgoing(SourceId::new(0, 0)).count(), 1);
        assert_eq!(doc.incoming(SourceId::new(0, 4)).count(), 1);
        assert_eq!(doc.outgoing(SourceId::new(0, 4)).count(), 0);
        assert_eq!(doc.resolve(SourceId::new(0, 4)).unwrap().token().text, "data");
    }

    #[test]
    fn test_document_rejects_unknown_source() {
        let result = PolicyDocument::new(
            "doc",
            vec![sample_segment()],
            vec![],
            vec![link((0, 0), (3, 1), Relationship::Collect)],
        );
        assert!(matches!(result, Err(PrivKgError::TokenNotFound(_))));
    }

    #[test]
    fn test_document_rejects_duplicate_source() {
        let mut tokens = sample_segment().tokens().to_vec();
        tokens[1].src = tokens[0].src;
        let segment = Segment::new(tokens).unwrap();
        assert!(PolicyDocument::new("doc", vec![segment], vec![], vec![]).is_err());
    }

    #[test]
    fn test_annotated_document_json() {
        let json = r#"{
            "segments": [{"tokens": [
                {"text": "We", "lemma": "we", "pos": "PRON", "dep": "ROOT", "head": 0,
                 "ent_type": "ACTOR", "src": [0, 0], "sent_start": true}
            ]}],
            "relationships": []
        }"#;
        let annotated: AnnotatedDocument = serde_json::from_str(json).unwrap();
        let doc = PolicyDocument::from_annotations("fallback", annotated).unwrap();

        assert_eq!(doc.id(), "fallback");
        let token = doc.resolve(SourceId::new(0, 0)).unwrap().token();
        assert!(token.trailing_space);
        assert_eq!(token.entity_label(), Some(EntityLabel::Actor));
    }
}
