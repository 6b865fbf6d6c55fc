//! Entity (company) name matching
//!
//! Resolves proper-noun actor phrases such as "Google Analytics" or
//! "facebook.com" to a canonical entity name using `entity_info.json`.
//! When several entities share a domain or skipgram, the one listed first in
//! the file owns it.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use privkg_core::{EntityNameMatcher, PrivKgError, Result};

/// Per-entity record of `entity_info.json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EntityInfo {
    /// Full names of the entity
    pub aliases: Vec<String>,
    /// Domains owned by the entity
    pub domains: Vec<String>,
    /// Name fragments; the flag is true for out-of-vocabulary fragments
    pub skipgrams: BTreeMap<String, bool>,
}

#[derive(Debug, Clone)]
struct Skipgram {
    entity: String,
    out_of_vocabulary: bool,
}

/// Fuzzy entity name matcher
#[derive(Debug, Clone)]
pub struct EntityMatcher {
    aliases: HashMap<String, Vec<String>>,
    domains: HashMap<String, String>,
    skipgrams: HashMap<String, Skipgram>,
    keyword_regex: Option<Regex>,
}

impl EntityMatcher {
    /// Build from entries in file order; earlier entries win shared keys
    pub fn new(entity_info: Vec<(String, EntityInfo)>) -> Result<Self> {
        let mut aliases = HashMap::new();
        let mut domains = HashMap::new();
        let mut skipgrams = HashMap::new();

        for (entity, info) in entity_info {
            for domain in info.domains {
                domains
                    .entry(domain.to_lowercase())
                    .or_insert_with(|| entity.clone());
            }
            for (gram, out_of_vocabulary) in info.skipgrams {
                skipgrams
                    .entry(gram.to_lowercase())
                    .or_insert_with(|| Skipgram {
                        entity: entity.clone(),
                        out_of_vocabulary,
                    });
            }
            aliases.insert(entity, info.aliases);
        }

        let keyword_regex = build_keyword_regex(skipgrams.keys().map(String::as_str), true)?;

        debug!(
            entities = aliases.len(),
            domains = domains.len(),
            skipgrams = skipgrams.len(),
            "Entity matcher loaded"
        );

        Ok(Self {
            aliases,
            domains,
            skipgrams,
            keyword_regex,
        })
    }

    /// Parse `entity_info.json` content, keeping entity order
    pub fn from_json_str(content: &str) -> Result<Self> {
        let entries: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(content).map_err(|e| PrivKgError::Normalizer(e.to_string()))?;

        let entity_info = entries
            .into_iter()
            .map(|(name, value)| {
                serde_json::from_value(value)
                    .map(|info| (name.clone(), info))
                    .map_err(|e| PrivKgError::Normalizer(format!("entity {name}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(entity_info)
    }

    /// Load from an `entity_info.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content).map_err(|e| match e {
            PrivKgError::Normalizer(message) => {
                PrivKgError::Normalizer(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    /// All entities matching `name`, in match order
    pub fn match_names(&self, name: &str) -> Vec<String> {
        if let Some(entity) = self.domains.get(&name.to_lowercase()) {
            return vec![entity.clone()];
        }

        let Some(regex) = &self.keyword_regex else {
            return Vec::new();
        };

        let mut entities = Vec::new();
        for m in regex.find_iter(name) {
            let Some(skipgram) = self.skipgrams.get(&m.as_str().to_lowercase()) else {
                continue;
            };

            // A common word only counts when it is part of a full name
            if skipgram.out_of_vocabulary || self.alias_contains(&skipgram.entity, m.as_str()) {
                entities.push(skipgram.entity.clone());
            }
        }
        entities
    }

    fn alias_contains(&self, entity: &str, gram: &str) -> bool {
        let Ok(Some(regex)) = build_keyword_regex(std::iter::once(gram), false) else {
            return false;
        };
        self.aliases
            .get(entity)
            .is_some_and(|names| names.iter().any(|n| regex.is_match(n)))
    }

    pub fn entity_count(&self) -> usize {
        self.aliases.len()
    }
}

impl EntityNameMatcher for EntityMatcher {
    fn match_name(&self, name: &str) -> Option<String> {
        self.match_names(name).into_iter().next()
    }
}

/// Word-bounded alternation of literal keywords, longest first
fn build_keyword_regex<'a>(
    keywords: impl Iterator<Item = &'a str>,
    case_insensitive: bool,
) -> Result<Option<Regex>> {
    let mut keywords: Vec<&str> = keywords.filter(|k| !k.is_empty()).collect();
    if keywords.is_empty() {
        return Ok(None);
    }
    keywords.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

    let alternation = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    let flags = if case_insensitive { "(?i)" } else { "" };

    Regex::new(&format!(r"{flags}\b(?:{alternation})\b"))
        .map(Some)
        .map_err(|e| PrivKgError::Normalizer(format!("invalid entity keyword: {e}")))
}
