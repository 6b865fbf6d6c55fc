//! Phrase expansion
//!
//! Grows a head token into the contiguous span of its noun/verb phrase by
//! absorbing dependents whose whole subtree is acceptable and adjacent to
//! the current boundary. Coordinated and appositive dependents are not
//! absorbed; they seed phrases of their own, so "X and Y" yields two spans.

use std::collections::VecDeque;

use privkg_core::{Phrase, Segment};

/// Labels that make a left dependent a modifier of its head
const LEFT_MODIFIER_DEPS: &[&str] = &["amod", "nmod", "nummod", "compound"];

/// Labels that start a new phrase instead of extending the current one
const CONTINUATION_DEPS: &[&str] = &["conj", "appos"];

/// Lazily expand `head` into its phrase and the phrases of its conjuncts
pub fn expand_phrase(segment: &Segment, head: usize) -> PhraseExpansion<'_> {
    PhraseExpansion {
        segment,
        queue: VecDeque::from([head]),
    }
}

/// Breadth-first phrase expansion; see [`expand_phrase`]
pub struct PhraseExpansion<'a> {
    segment: &'a Segment,
    queue: VecDeque<usize>,
}

impl<'a> Iterator for PhraseExpansion<'a> {
    type Item = Phrase<'a>;

    fn next(&mut self) -> Option<Phrase<'a>> {
        while let Some(token) = self.queue.pop_front() {
            if let Some(phrase) = self.expand_one(token) {
                return Some(phrase);
            }
        }
        None
    }
}

impl<'a> PhraseExpansion<'a> {
    fn expand_one(&mut self, index: usize) -> Option<Phrase<'a>> {
        let segment = self.segment;

        let mut left = index;
        for child in segment.lefts(index).rev() {
            if !should_include(segment, child) {
                break;
            }
            let indices = segment.subtree(child);
            match block_bounds(&indices) {
                Some((first, last)) if last + 1 == left => left = first,
                _ => break,
            }
        }

        let mut right = index + 1;
        for child in segment.rights(index) {
            if CONTINUATION_DEPS.contains(&segment.token(child).dep.as_str()) {
                self.queue.push_back(child);
                break;
            }
            if !should_include(segment, child) {
                break;
            }
            let indices = segment.subtree(child);
            match block_bounds(&indices) {
                Some((first, last)) if first == right => right = last + 1,
                _ => break,
            }
        }

        // "X and" -> "X"
        if right > left && segment.token(right - 1).dep == "cc" {
            right -= 1;
        }

        while left < right && is_opening_mark(&segment.token(left).lemma) {
            left += 1;
        }
        while right > left && is_closing_mark(&segment.token(right - 1).lemma) {
            right -= 1;
        }

        (left < right).then(|| Phrase::new(segment, left..right))
    }
}

/// Bounds of a sorted index list, if it forms one contiguous block
fn block_bounds(indices: &[usize]) -> Option<(usize, usize)> {
    let (&first, &last) = (indices.first()?, indices.last()?);
    (last - first + 1 == indices.len()).then_some((first, last))
}

/// Whether every token of the subtree rooted at `index` may join a phrase
pub fn should_include(segment: &Segment, index: usize) -> bool {
    let mut stack = vec![(index, false)];

    while let Some((current, mut in_left_modifier)) = stack.pop() {
        let token = segment.token(current);

        if token.src.is_none() {
            return false;
        }

        match token.dep.as_str() {
            // Parser glitches: keep only entity tokens, do not look further down
            "dep" | "meta" => {
                if token.has_entity() {
                    continue;
                }
                return false;
            }
            "punct" => {
                let keep =
                    joins_words(segment, current) || token.has_entity() || in_left_modifier;
                if !keep {
                    return false;
                }
            }
            _ => {}
        }

        if LEFT_MODIFIER_DEPS.contains(&token.dep.as_str()) && current < token.head {
            in_left_modifier = true;
        }

        stack.extend(
            segment
                .children(current)
                .iter()
                .map(|&child| (child, in_left_modifier)),
        );
    }

    true
}

/// Punctuation glued between two alphabetic tokens, e.g. "health-related"
fn joins_words(segment: &Segment, index: usize) -> bool {
    if index == 0 || index + 1 >= segment.len() {
        return false;
    }

    let prev = segment.token(index - 1);
    let current = segment.token(index);
    let next = segment.token(index + 1);

    !prev.trailing_space && has_alpha(&prev.text) && !current.trailing_space && has_alpha(&next.text)
}

fn has_alpha(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_alphabetic())
}

fn is_opening_mark(lemma: &str) -> bool {
    matches!(lemma, "\"" | "'" | "(" | "[")
}

fn is_closing_mark(lemma: &str) -> bool {
    matches!(lemma, "\"" | "'" | ")" | "]")
}
