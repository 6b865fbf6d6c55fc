//! privkg Extractor - phrase-level services for the knowledge graph builder
//!
//! Works on the dependency trees of annotated policy documents:
//! - [`expand`]: grow a head token into its phrase span(s)
//! - [`simplify`]: reduce a phrase to its content tokens
//! - [`normalize`], [`entity`], [`purpose`]: rule-based normalization services
//! - [`loader`]: read `document.json`

pub mod entity;
pub mod expand;
pub mod keywords;
pub mod loader;
pub mod normalize;
pub mod purpose;
pub mod simplify;

pub use entity::{EntityInfo, EntityMatcher};
pub use expand::{expand_phrase, PhraseExpansion};
pub use loader::{load_document, read_annotations};
pub use normalize::{PhraseMap, RuleBasedPhraseNormalizer};
pub use purpose::{KeywordPurposeClassifier, DEFAULT_CATEGORY};
pub use simplify::{phrase_stem, simplified_lemma_text, simplify_phrase};
