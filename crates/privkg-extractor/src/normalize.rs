//! Rule-based phrase normalization
//!
//! Maps data/actor phrases onto canonical terms using the phrase-map rule
//! file. Rule syntax (one regex per list entry):
//! - `!rule`: negative rule, vetoes the term when it matches
//! - `=rule`: case-sensitive (rules are case-insensitive otherwise)
//! - word boundaries are added unless the rule is anchored with `^` / `$`
//! - a space matches any run of whitespace

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use privkg_core::{Phrase, PhraseNormalizer, PrivKgError, Result, UNSPECIFIED};

use crate::simplify::phrase_stem;

// ============================================================================
// Phrase Map
// ============================================================================

/// Rules for one semantic type: canonical term -> regex rules
pub type PhraseMapRules = BTreeMap<String, Option<Vec<String>>>;

/// The phrase-map rule file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhraseMap {
    #[serde(rename = "DATA", default)]
    pub data: PhraseMapRules,

    #[serde(rename = "ACTOR", default)]
    pub actor: PhraseMapRules,
}

impl PhraseMap {
    /// Load from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content).map_err(|e| {
            PrivKgError::Normalizer(format!("{}: {e}", path.display()))
        })
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| PrivKgError::Normalizer(format!("invalid phrase map: {e}")))
    }
}

// ============================================================================
// Rule-based Normalizer
// ============================================================================

/// Compiled rules for one canonical term
#[derive(Debug, Clone)]
struct TermRule {
    term: String,
    positive: Option<Regex>,
    negative: Option<Regex>,
}

impl TermRule {
    fn matches(&self, text: &str) -> bool {
        self.positive.as_ref().is_some_and(|r| r.is_match(text))
    }

    fn vetoes(&self, text: &str) -> bool {
        self.negative.as_ref().is_some_and(|r| r.is_match(text))
    }
}

/// Rule-based phrase normalizer for one semantic type
#[derive(Debug, Clone)]
pub struct RuleBasedPhraseNormalizer {
    rules: Vec<TermRule>,
    /// Emit the lower-cased stem when no rule matches
    fallback_to_stem: bool,
}

impl RuleBasedPhraseNormalizer {
    /// Compile the rules of one phrase-map section
    pub fn new(rules: &PhraseMapRules) -> Result<Self> {
        let mut normalizer = Self {
            rules: Vec::with_capacity(rules.len()),
            fallback_to_stem: false,
        };

        for (term, patterns) in rules {
            normalizer.add_term(term, patterns.as_deref().unwrap_or_default())?;
        }

        Ok(normalizer)
    }

    /// Enable or disable the stem fallback
    pub fn with_stem_fallback(mut self, enabled: bool) -> Self {
        self.fallback_to_stem = enabled;
        self
    }

    /// Compile and add the rules of a canonical term
    fn add_term(&mut self, term: &str, patterns: &[String]) -> Result<()> {
        let mut positive = Vec::new();
        let mut negative = Vec::new();

        for pattern in patterns {
            let (is_negative, compiled) = compile_rule(pattern)
                .ok_or_else(|| PrivKgError::Normalizer(format!("empty rule for {term}")))?;
            if is_negative {
                negative.push(compiled);
            } else {
                positive.push(compiled);
            }
        }

        self.rules.push(TermRule {
            term: term.to_string(),
            positive: join_rules(term, &positive)?,
            negative: join_rules(term, &negative)?,
        });
        Ok(())
    }

    /// Normalize a phrase into canonical terms
    pub fn normalize_phrase(&self, phrase: &Phrase<'_>) -> Vec<String> {
        let root = phrase.root_token();
        if root.pos == "PRON" && !matches!(root.lemma.as_str(), "I" | "we" | "you") {
            return vec![UNSPECIFIED.to_string()];
        }

        let original_text = phrase.text();
        let original_text = trim_punctuation(&original_text);
        let lemma_text = phrase.lemma_text();
        let lemma_text = trim_punctuation(&lemma_text);

        let mut vetoed = HashSet::new();
        let mut terms = Vec::new();

        // First try the full phrase and its lemmatized form
        for rule in &self.rules {
            if rule.vetoes(original_text) || rule.vetoes(lemma_text) {
                vetoed.insert(rule.term.as_str());
            } else if rule.matches(original_text) || rule.matches(lemma_text) {
                terms.push(rule.term.clone());
            }
        }

        if !terms.is_empty() {
            return terms;
        }

        // Then the aggressively trimmed stem
        let stem = phrase_stem(phrase);
        for rule in &self.rules {
            if !vetoed.contains(rule.term.as_str()) && rule.matches(&stem) && !rule.vetoes(&stem) {
                terms.push(rule.term.clone());
            }
        }

        if terms.is_empty() && self.fallback_to_stem && !stem.is_empty() {
            terms.push(stem.to_lowercase());
        }

        terms
    }

    /// Number of canonical terms
    pub fn term_count(&self) -> usize {
        self.rules.len()
    }
}

impl PhraseNormalizer for RuleBasedPhraseNormalizer {
    fn normalize(&self, phrase: &Phrase<'_>) -> Vec<String> {
        self.normalize_phrase(phrase)
    }
}

/// Translate one rule into a regex fragment; `None` for an empty rule
fn compile_rule(rule: &str) -> Option<(bool, String)> {
    let (is_negative, rule) = match rule.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, rule),
    };
    let (case_sensitive, rule) = match rule.strip_prefix('=') {
        Some(rest) => (true, rest),
        None => (false, rule),
    };
    if rule.is_empty() {
        return None;
    }

    let mut pattern = String::new();
    if !rule.starts_with('^') {
        pattern.push_str(r"\b");
    }
    pattern.push_str(rule);
    if !rule.ends_with('$') {
        pattern.push_str(r"\b");
    }
    let pattern = pattern.replace(' ', r"\s+");

    let flags = if case_sensitive { "" } else { "i" };
    Some((is_negative, format!("(?{flags}:{pattern})")))
}

fn join_rules(term: &str, fragments: &[String]) -> Result<Option<Regex>> {
    if fragments.is_empty() {
        return Ok(None);
    }
    Regex::new(&fragments.join("|"))
        .map(Some)
        .map_err(|e| PrivKgError::Normalizer(format!("invalid rule for {term}: {e}")))
}

fn trim_punctuation(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_ascii_punctuation())
}

// ============================================================================
// Tests
// ============================================================================
