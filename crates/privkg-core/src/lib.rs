//! privkg Core - Annotation model, service traits, and shared types
//!
//! This crate defines the core abstractions used throughout privkg:
//! - Semantic types and relationship labels of the knowledge graph
//! - The annotated document model (token arenas per segment)
//! - Common error types
//! - Traits for the normalization and classification services
//! - Configuration management

pub mod config;
pub mod document;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::{AppConfig, ConfigError, GraphConfig, LoggingConfig, ResourceConfig};
pub use document::{
    AnnotatedDocument, AnnotatedSegment, Phrase, PolicyDocument, RelationshipLink, Segment,
    SourceId, Token, TokenRef,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for privkg operations
#[derive(Error, Debug)]
pub enum PrivKgError {
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Token not found for source {0}")]
    TokenNotFound(SourceId),

    #[error("Invalid node type {node_type} for node {source_id}")]
    InvalidNodeType {
        source_id: SourceId,
        node_type: SemanticType,
    },

    #[error("Cycle detected in {0} graph")]
    CycleDetected(&'static str),

    #[error("Normalizer error: {0}")]
    Normalizer(String),

    #[error("Purpose classifier error: {0}")]
    Classifier(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PrivKgError>;

// ============================================================================
// Sentinel Terms
// ============================================================================

/// Placeholder term for data phrases that name no specific data type
pub const UNSPECIFIC_DATA: &str = "UNSPECIFIC_DATA";

/// Placeholder term for actor phrases that name no specific entity
pub const UNSPECIFIC_ENTITY: &str = "UNSPECIFIC_ENTITY";

/// Term produced for pronoun phrases other than I/we/you
pub const UNSPECIFIED: &str = "UNSPECIFIED";

/// The policy owner
pub const FIRST_PARTY: &str = "first party";

/// Any party other than the policy owner and the user
pub const THIRD_PARTY: &str = "third party";

// ============================================================================
// Semantic Model
// ============================================================================

/// Semantic type of a phrase in the knowledge graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SemanticType {
    /// A kind of personal data
    Data,
    /// An entity that collects or receives data
    Actor,
    /// Neither; removed before normalization
    Other,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Data => "DATA",
            Self::Actor => "ACTOR",
            Self::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Entity-type label attached to a token by the upstream NER
///
/// `Nn` marks noun phrases whose type the recognizer could not decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityLabel {
    Data,
    Actor,
    Other,
    Nn,
}

impl EntityLabel {
    /// Parse a raw NER tag; unknown tags carry no entity label
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "DATA" => Some(Self::Data),
            "ACTOR" => Some(Self::Actor),
            "OTHER" => Some(Self::Other),
            "NN" => Some(Self::Nn),
            _ => None,
        }
    }

    /// Semantic type implied by this label, `None` for ambiguous phrases
    pub fn semantic_type(&self) -> Option<SemanticType> {
        match self {
            Self::Data => Some(SemanticType::Data),
            Self::Actor => Some(SemanticType::Actor),
            Self::Other => Some(SemanticType::Other),
            Self::Nn => None,
        }
    }
}

/// Relationship label on an edge of the token relationship graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relationship {
    Collect,
    NotCollect,
    Subsum,
    Coref,
    Purpose,
}

impl Relationship {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collect => "COLLECT",
            Self::NotCollect => "NOT_COLLECT",
            Self::Subsum => "SUBSUM",
            Self::Coref => "COREF",
            Self::Purpose => "PURPOSE",
        }
    }

    /// COLLECT and NOT_COLLECT link an actor to a data type
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Collect | Self::NotCollect)
    }

    /// SUBSUM and COREF link phrases of the same type
    pub fn is_hierarchical(&self) -> bool {
        matches!(self, Self::Subsum | Self::Coref)
    }
}

impl std::fmt::Display for Relationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Relationship {
    type Err = PrivKgError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "COLLECT" => Ok(Self::Collect),
            "NOT_COLLECT" => Ok(Self::NotCollect),
            "SUBSUM" => Ok(Self::Subsum),
            "COREF" => Ok(Self::Coref),
            "PURPOSE" => Ok(Self::Purpose),
            _ => Err(PrivKgError::InvalidDocument(format!(
                "unknown relationship: {s}"
            ))),
        }
    }
}

/// A classified purpose attached to a collection edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Purpose {
    /// Category label from the purpose classifier
    pub category: String,

    /// Purpose phrase as it appears in the policy
    pub text: String,
}

impl Purpose {
    pub fn new(category: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            text: text.into(),
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Maps a phrase onto zero or more canonical terms
pub trait PhraseNormalizer: Send + Sync {
    /// Normalize a phrase; an empty result means no rule applied
    fn normalize(&self, phrase: &Phrase<'_>) -> Vec<String>;
}

/// Resolves proper-noun text to a canonical entity (company) name
pub trait EntityNameMatcher: Send + Sync {
    fn match_name(&self, name: &str) -> Option<String>;
}

/// Batch classifier for purpose phrases
pub trait PurposeClassifier: Send + Sync {
    /// Classify every text; the result is parallel to `texts`
    fn classify(&self, texts: &[String]) -> Result<Vec<String>>;

    /// Get classifier name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================
