//! Phrase simplification
//!
//! Reduces a phrase to its load-bearing tokens by walking the dependency
//! tree from the phrase root and following only a small set of relation
//! transitions. Two walks are provided:
//!
//! - [`simplify_phrase`]: driven by the dependency label of the edge that led
//!   to each token; used by the graph builder as a last-resort term.
//! - [`trim_phrase`]: driven by the part of speech of each token; used by the
//!   rule-based normalizer to compute a phrase "stem".

use privkg_core::Phrase;

use crate::keywords::is_trivial_word;

const NOMINAL_STATES: &[&str] = &["compound", "amod", "nmod", "prep", "relcl", "acl"];
const PREP_STATES: &[&str] = &["pobj"];
const AMOD_STATES: &[&str] = &["advmod", "npadvmod"];
const CLAUSE_STATES: &[&str] = &["nsubj", "dobj"];

const NOUN_TRIM: &[&str] = &["neg", "compound", "nmod", "amod", "prep", "relcl", "acl"];
const VERB_TRIM: &[&str] = &["neg", "nsubj", "dobj", "pobj", "dative", "prep"];
const ADP_TRIM: &[&str] = &["neg", "pobj"];
const ADJ_TRIM: &[&str] = &["neg", "advmod", "npadvmod"];

/// Next permitted dependency labels for a simplification state
fn simplify_transitions(state: &str) -> Option<&'static [&'static str]> {
    match state {
        "compound" | "nmod" | "pobj" | "nsubj" | "dobj" => Some(NOMINAL_STATES),
        "prep" => Some(PREP_STATES),
        "amod" => Some(AMOD_STATES),
        "relcl" | "acl" => Some(CLAUSE_STATES),
        _ => None,
    }
}

/// Next permitted dependency labels below a token with the given POS
fn trim_transitions(pos: &str) -> Option<&'static [&'static str]> {
    match pos {
        "NOUN" | "PROPN" | "PRON" => Some(NOUN_TRIM),
        "VERB" => Some(VERB_TRIM),
        "ADP" => Some(ADP_TRIM),
        "ADJ" => Some(ADJ_TRIM),
        _ => None,
    }
}

/// Content tokens of a phrase, sorted by position
///
/// Trivial words are never entered, so a trivial root yields nothing.
pub fn simplify_phrase(phrase: &Phrase<'_>) -> Vec<usize> {
    let segment = phrase.segment();
    let mut result = Vec::new();
    let mut stack: Vec<(usize, &str)> = vec![(phrase.root(), "compound")];

    while let Some((index, state)) = stack.pop() {
        let token = segment.token(index);
        if is_trivial_word(&token.lemma) {
            continue;
        }

        result.push(index);

        let Some(next_states) = simplify_transitions(state) else {
            continue;
        };

        for &child in segment.children(index) {
            let dep = segment.token(child).dep.as_str();
            if phrase.contains(child) && next_states.contains(&dep) {
                stack.push((child, dep));
            }
        }
    }

    result.sort_unstable();
    result.dedup();
    result
}

/// Lemmas of [`simplify_phrase`] joined by single spaces
pub fn simplified_lemma_text(phrase: &Phrase<'_>) -> String {
    join_lemmas(phrase, &simplify_phrase(phrase))
}

/// Aggressively trimmed tokens of a phrase, sorted by position
pub fn trim_phrase(phrase: &Phrase<'_>) -> Vec<usize> {
    let segment = phrase.segment();
    let mut result = Vec::new();
    let mut stack = vec![phrase.root()];

    while let Some(index) = stack.pop() {
        result.push(index);

        let Some(next_states) = trim_transitions(&segment.token(index).pos) else {
            continue;
        };

        for &child in segment.children(index) {
            let token = segment.token(child);
            if phrase.contains(child)
                && next_states.contains(&token.dep.as_str())
                && !is_trivial_word(&token.lemma)
            {
                stack.push(child);
            }
        }
    }

    result.sort_unstable();
    result.dedup();
    result
}

/// Lemmas of [`trim_phrase`] joined by single spaces
pub fn phrase_stem(phrase: &Phrase<'_>) -> String {
    join_lemmas(phrase, &trim_phrase(phrase))
}

fn join_lemmas(phrase: &Phrase<'_>, indices: &[usize]) -> String {
    let segment = phrase.segment();
    indices
        .iter()
        .map(|&i| segment.token(i).lemma.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
