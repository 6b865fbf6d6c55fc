//! Fixture builders for annotated segments
//!
//! Available to other crates through the `test-utils` feature.

use crate::{Relationship, RelationshipLink, Segment, SourceId, Token};

/// Builds a segment token by token; every token gets the source
/// `(segment_id, index)` unless marked as context
pub struct SegmentFixture {
    segment_id: usize,
    tokens: Vec<Token>,
}

impl SegmentFixture {
    pub fn new(segment_id: usize) -> Self {
        Self {
            segment_id,
            tokens: Vec::new(),
        }
    }

    /// Append a token; `head` is an absolute index within the segment
    pub fn token(mut self, text: &str, lemma: &str, pos: &str, dep: &str, head: usize) -> Self {
        let index = self.tokens.len();
        self.tokens.push(Token {
            text: text.to_string(),
            trailing_space: true,
            lemma: lemma.to_string(),
            pos: pos.to_string(),
            dep: dep.to_string(),
            head,
            ent_type: None,
            src: Some(SourceId::new(self.segment_id, index)),
            sent_start: index == 0,
        });
        self
    }

    /// Set the NER tag of the last token
    pub fn ent(mut self, tag: &str) -> Self {
        self.last().ent_type = Some(tag.to_string());
        self
    }

    /// The last token is not followed by whitespace
    pub fn no_space(mut self) -> Self {
        self.last().trailing_space = false;
        self
    }

    /// The last token starts a new sentence
    pub fn sent_start(mut self) -> Self {
        self.last().sent_start = true;
        self
    }

    /// The last token is context without a source mapping
    pub fn context(mut self) -> Self {
        self.last().src = None;
        self
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    pub fn build(self) -> Segment {
        Segment::new(self.tokens).expect("fixture segment must be valid")
    }

    fn last(&mut self) -> &mut Token {
        self.tokens
            .last_mut()
            .expect("fixture modifier called before any token")
    }
}

/// Shorthand for a relationship link between two sources
pub fn link(from: (usize, usize), to: (usize, usize), relationship: Relationship) -> RelationshipLink {
    RelationshipLink::new(
        SourceId::new(from.0, from.1),
        SourceId::new(to.0, to.1),
        relationship,
    )
}
