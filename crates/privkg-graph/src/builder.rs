//! Knowledge graph builder
//!
//! Ties the two stages together behind a single entry point.

use tracing::{debug, info};

use privkg_core::{
    EntityNameMatcher, PhraseNormalizer, PolicyDocument, PurposeClassifier, ResourceConfig, Result,
};
use privkg_extractor::{EntityMatcher, KeywordPurposeClassifier, PhraseMap, RuleBasedPhraseNormalizer};

use crate::knowledge::KnowledgeGraph;
use crate::stage1::{build_stage1, Stage1Graph};
use crate::stage2::build_stage2;

// ============================================================================
// Services
// ============================================================================

/// Read-only normalization services shared by every document
pub struct NormalizationServices {
    pub data_normalizer: Box<dyn PhraseNormalizer>,
    pub actor_normalizer: Box<dyn PhraseNormalizer>,
    pub entity_matcher: Box<dyn EntityNameMatcher>,
    pub purpose_classifier: Box<dyn PurposeClassifier>,
}

impl NormalizationServices {
    pub fn new(
        data_normalizer: impl PhraseNormalizer + 'static,
        actor_normalizer: impl PhraseNormalizer + 'static,
        entity_matcher: impl EntityNameMatcher + 'static,
        purpose_classifier: impl PurposeClassifier + 'static,
    ) -> Self {
        Self {
            data_normalizer: Box::new(data_normalizer),
            actor_normalizer: Box::new(actor_normalizer),
            entity_matcher: Box::new(entity_matcher),
            purpose_classifier: Box::new(purpose_classifier),
        }
    }

    /// Rule-based services built from a parsed phrase map
    ///
    /// The normalizers run without their stem fallback; the builder applies
    /// its own fallback on the simplified phrase.
    pub fn from_phrase_map(
        phrase_map: &PhraseMap,
        entity_matcher: EntityMatcher,
        purpose_classifier: KeywordPurposeClassifier,
    ) -> Result<Self> {
        let data = RuleBasedPhraseNormalizer::new(&phrase_map.data)?.with_stem_fallback(false);
        let actor = RuleBasedPhraseNormalizer::new(&phrase_map.actor)?.with_stem_fallback(false);

        debug!(
            data_terms = data.term_count(),
            actor_terms = actor.term_count(),
            entities = entity_matcher.entity_count(),
            "Normalization services ready"
        );
        Ok(Self::new(data, actor, entity_matcher, purpose_classifier))
    }

    /// Load the rule-based services from the configured resource files
    pub fn rule_based(resources: &ResourceConfig) -> Result<Self> {
        let phrase_map = PhraseMap::from_file(resources.phrase_map_path()?)?;
        let entity_matcher = EntityMatcher::from_file(resources.entity_info_path()?)?;
        let purpose_classifier =
            KeywordPurposeClassifier::from_model_dir(resources.model_dir.as_deref())?;

        Self::from_phrase_map(&phrase_map, entity_matcher, purpose_classifier)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builds one knowledge graph per policy document
pub struct GraphBuilder {
    services: NormalizationServices,
    sentence_separator: String,
}

impl GraphBuilder {
    pub fn new(services: NormalizationServices) -> Self {
        Self {
            services,
            sentence_separator: " | ".to_string(),
        }
    }

    /// Separator between supporting sentences on an edge
    pub fn with_sentence_separator(mut self, separator: impl Into<String>) -> Self {
        self.sentence_separator = separator.into();
        self
    }

    pub fn services(&self) -> &NormalizationServices {
        &self.services
    }

    /// Run both stages on a document
    pub fn build_graph(&self, document: &PolicyDocument) -> Result<KnowledgeGraph> {
        info!(document = document.id(), "Building knowledge graph");

        let stage1 = self.build_stage1(document)?;
        let graph = build_stage2(document, &stage1, &self.sentence_separator)?;

        info!(
            document = document.id(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            conflicts = graph.conflicts().len(),
            "Knowledge graph built"
        );
        Ok(graph)
    }

    /// Only the per-occurrence stage
    pub fn build_stage1(&self, document: &PolicyDocument) -> Result<Stage1Graph> {
        build_stage1(document, &self.services)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    use privkg_core::testing::{link, SegmentFixture};
    use privkg_core::{PrivKgError, Relationship, SourceId};

    pub(crate) const PHRASE_MAP: &str = r#"
DATA:
  location data:
    - location
    - geo-?location
    - gps
  email address:
    - e-?mail( address)?
  device identifier:
    - device id(entifier)?s?
ACTOR:
  first party:
    - ^we$
    - ^us$
    - ^our company$
  third party:
    - third[- ]part(y|ies)
  advertiser:
    - advertisers?
    - advertising (network|partner)s?
"#;

    pub(crate) fn services() -> NormalizationServices {
        let phrase_map = PhraseMap::from_yaml_str(PHRASE_MAP).unwrap();
        NormalizationServices::from_phrase_map(
            &phrase_map,
            EntityMatcher::new(Vec::new()).unwrap(),
            KeywordPurposeClassifier::new(),
        )
        .unwrap()
    }

    /// Returns fewer labels than texts
    struct BrokenClassifier;

    impl PurposeClassifier for BrokenClassifier {
        fn classify(&self, _texts: &[String]) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    /// We collect data for ads
    fn purpose_document() -> PolicyDocument {
        let segment = SegmentFixture::new(0)
            .token("We", "we", "PRON", "nsubj", 1)
            .ent("ACTOR")
            .token("collect", "collect", "VERB", "ROOT", 1)
            .token("cookies", "cookie", "NOUN", "dobj", 1)
            .ent("DATA")
            .token("for", "for", "ADP", "prep", 1)
            .token("ads", "ad", "NOUN", "pobj", 3)
            .build();
        PolicyDocument::new(
            "test",
            vec![segment],
            vec![],
            vec![
                link((0, 0), (0, 2), Relationship::Collect),
                link((0, 2), (0, 3), Relationship::Purpose),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_build_graph_with_custom_separator() {
        let builder = GraphBuilder::new(services()).with_sentence_separator(" || ");
        let graph = builder.build_graph(&purpose_document()).unwrap();

        let edge = graph
            .edge("first party", "cookie", Relationship::Collect)
            .unwrap();
        assert_eq!(edge.sources, vec![vec![SourceId(0, 0), SourceId(0, 2)]]);
        assert_eq!(edge.text, vec!["We collect cookies for ads"]);
        assert_eq!(edge.purposes().len(), 1);
        assert_eq!(edge.purposes()[0].category, "advertising");
        assert_eq!(edge.purposes()[0].text, "for ads");
    }

    #[test]
    fn test_classifier_label_mismatch_fails_document() {
        let phrase_map = PhraseMap::from_yaml_str(PHRASE_MAP).unwrap();
        let data = RuleBasedPhraseNormalizer::new(&phrase_map.data).unwrap();
        let actor = RuleBasedPhraseNormalizer::new(&phrase_map.actor).unwrap();
        let services = NormalizationServices::new(
            data,
            actor,
            EntityMatcher::new(Vec::new()).unwrap(),
            BrokenClassifier,
        );

        let err = GraphBuilder::new(services)
            .build_graph(&purpose_document())
            .unwrap_err();
        assert!(matches!(err, PrivKgError::Classifier(_)));
    }

    #[test]
    fn test_rule_based_requires_resources() {
        let err = NormalizationServices::rule_based(&ResourceConfig::default()).err().unwrap();
        assert!(matches!(err, PrivKgError::ConfigError(_)));
    }

    #[test]
    fn test_rule_based_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let phrase_map = dir.path().join("phrase_map.yml");
        let entity_info = dir.path().join("entity_info.json");
        std::fs::write(&phrase_map, PHRASE_MAP).unwrap();
        std::fs::write(
            &entity_info,
            r#"{"Google LLC": {"aliases": ["Google"], "domains": ["google.com"], "skipgrams": {"google": true}}}"#,
        )
        .unwrap();

        let resources = ResourceConfig {
            phrase_map: Some(phrase_map),
            entity_info: Some(entity_info),
            model_dir: Some(PathBuf::from(dir.path())),
        };
        let services = NormalizationServices::rule_based(&resources).unwrap();

        assert_eq!(services.entity_matcher.match_name("Google"), Some("Google LLC".to_string()));
        assert_eq!(services.purpose_classifier.name(), "keyword");
    }
}
