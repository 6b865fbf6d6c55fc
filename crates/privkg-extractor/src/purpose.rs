//! Purpose classification
//!
//! Labels purpose phrases ("for fraud prevention purposes", "to show you
//! relevant ads") with a coarse category. Rules are ordered; the first
//! category with a matching pattern wins.

use std::path::Path;

use regex::Regex;
use tracing::debug;

use privkg_core::{PrivKgError, PurposeClassifier, Result};

/// Label for texts that match no rule
pub const DEFAULT_CATEGORY: &str = "other";

/// Rule file name inside the model directory
pub const PURPOSE_RULES_FILE: &str = "purpose_rules.yml";

/// Patterns of one purpose category
#[derive(Debug, Clone)]
pub struct PurposeRule {
    pub category: String,
    pattern: Regex,
}

/// Keyword-rule purpose classifier
#[derive(Debug, Clone)]
pub struct KeywordPurposeClassifier {
    rules: Vec<PurposeRule>,
}

impl KeywordPurposeClassifier {
    /// Create a classifier with the built-in rules
    pub fn new() -> Self {
        let mut classifier = Self { rules: Vec::new() };
        classifier.init_default_rules();
        classifier
    }

    /// Create a classifier from (category, patterns) pairs, in priority order
    pub fn from_rules<C, P>(rules: impl IntoIterator<Item = (C, Vec<P>)>) -> Result<Self>
    where
        C: Into<String>,
        P: AsRef<str>,
    {
        let mut classifier = Self { rules: Vec::new() };
        for (category, patterns) in rules {
            classifier.add_rule(category.into(), &patterns)?;
        }
        Ok(classifier)
    }

    /// Load rules from a YAML mapping of category to regex list
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mapping: serde_yaml::Mapping = serde_yaml::from_str(&content)
            .map_err(|e| PrivKgError::Classifier(format!("{}: {e}", path.display())))?;

        let mut rules = Vec::with_capacity(mapping.len());
        for (category, patterns) in mapping {
            let category: String = serde_yaml::from_value(category)
                .map_err(|e| PrivKgError::Classifier(format!("invalid category: {e}")))?;
            let patterns: Vec<String> = serde_yaml::from_value(patterns).map_err(|e| {
                PrivKgError::Classifier(format!("invalid patterns for {category}: {e}"))
            })?;
            rules.push((category, patterns));
        }

        Self::from_rules(rules)
    }

    /// Use `<model_dir>/purpose_rules.yml` when present, built-in rules otherwise
    pub fn from_model_dir(model_dir: Option<&Path>) -> Result<Self> {
        match model_dir.map(|dir| dir.join(PURPOSE_RULES_FILE)) {
            Some(path) if path.is_file() => {
                debug!(path = %path.display(), "Loading purpose rules");
                Self::from_file(path)
            }
            _ => Ok(Self::new()),
        }
    }

    fn init_default_rules(&mut self) {
        let defaults: [(&str, &[&str]); 5] = [
            (
                "security",
                &[
                    "fraud", "security", "secure", "protect", "safety", "abuse", "spam",
                    "malicious", "unauthori[sz]ed", "prevent",
                ],
            ),
            (
                "legal",
                &[
                    "law", "legal", "comply", "compliance", "regulat\\w*", "court", "subpoena",
                    "enforce", "rights",
                ],
            ),
            (
                "advertising",
                &[
                    "advertis\\w*", "ads?", "marketing", "promotion\\w*", "sponsored",
                    "personali[sz]ed (content|offers?)",
                ],
            ),
            (
                "analytics",
                &[
                    "analytics?", "analy[sz]e", "statistic\\w*", "measure\\w*", "research",
                    "understand how", "usage trends?",
                ],
            ),
            (
                "services",
                &[
                    "provide", "deliver", "service", "operate", "maintain", "improve",
                    "customer support", "process (your )?(order|payment|transaction)s?",
                    "account", "functionality", "features?",
                ],
            ),
        ];

        for (category, patterns) in defaults {
            // Built-in patterns are known to compile
            if let Err(e) = self.add_rule(category.to_string(), patterns) {
                debug!(category, error = %e, "Skipping built-in purpose rule");
            }
        }
    }

    /// Add a category with word-bounded, case-insensitive patterns
    fn add_rule<P: AsRef<str>>(&mut self, category: String, patterns: &[P]) -> Result<()> {
        let alternation = patterns
            .iter()
            .map(|p| p.as_ref())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>();
        if alternation.is_empty() {
            return Ok(());
        }

        let pattern = Regex::new(&format!(r"(?i)\b(?:{})\b", alternation.join("|")))
            .map_err(|e| PrivKgError::Classifier(format!("invalid pattern for {category}: {e}")))?;
        self.rules.push(PurposeRule { category, pattern });
        Ok(())
    }

    /// Classify a single text
    pub fn classify_one(&self, text: &str) -> &str {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(text))
            .map(|rule| rule.category.as_str())
            .unwrap_or(DEFAULT_CATEGORY)
    }

    /// Categories in priority order
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.category.as_str())
    }
}

impl Default for KeywordPurposeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl PurposeClassifier for KeywordPurposeClassifier {
    fn classify(&self, texts: &[String]) -> Result<Vec<String>> {
        Ok(texts
            .iter()
            .map(|text| self.classify_one(text).to_string())
            .collect())
    }

    fn name(&self) -> &str {
        "keyword"
    }
}
