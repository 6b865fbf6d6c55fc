//! privkg Configuration Management
//!
//! Handles configuration from environment variables, config files,
//! and command-line arguments with defaults matching the corpus layout
//! (`document.json` in, `graph.gml` out, per input directory).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Normalization resources
    pub resources: ResourceConfig,

    /// Graph input/output settings
    pub graph: GraphConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("PRIVKG_PHRASE_MAP") {
            config.resources.phrase_map = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("PRIVKG_ENTITY_INFO") {
            config.resources.entity_info = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("PRIVKG_MODEL_DIR") {
            config.resources.model_dir = Some(PathBuf::from(path));
        }

        if let Ok(file) = std::env::var("PRIVKG_OUTPUT_FILE") {
            if file.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "PRIVKG_OUTPUT_FILE".to_string(),
                    value: file,
                });
            }
            config.graph.output_file = file;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(json) = std::env::var("LOG_JSON") {
            config.logging.json_format = parse_bool("LOG_JSON", &json)?;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;
        let defaults = Self::default();

        if env_config.resources.phrase_map.is_some() {
            self.resources.phrase_map = env_config.resources.phrase_map;
        }
        if env_config.resources.entity_info.is_some() {
            self.resources.entity_info = env_config.resources.entity_info;
        }
        if env_config.resources.model_dir.is_some() {
            self.resources.model_dir = env_config.resources.model_dir;
        }

        // Only override if env values differ from defaults
        if env_config.graph.output_file != defaults.graph.output_file {
            self.graph.output_file = env_config.graph.output_file;
        }
        if env_config.logging.level != defaults.logging.level {
            self.logging.level = env_config.logging.level;
        }
        if env_config.logging.json_format {
            self.logging.json_format = true;
        }

        Ok(self)
    }

    /// Check that every resource needed to build graphs is configured
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.resources.phrase_map_path()?;
        self.resources.entity_info_path()?;
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Paths of the external normalization resources
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ResourceConfig {
    /// Phrase-map rule file (YAML with DATA and ACTOR sections)
    pub phrase_map: Option<PathBuf>,

    /// Entity info file (JSON) for the entity-name matcher
    pub entity_info: Option<PathBuf>,

    /// Model directory holding the purpose classifier rules
    pub model_dir: Option<PathBuf>,
}

impl ResourceConfig {
    pub fn phrase_map_path(&self) -> Result<&Path, ConfigError> {
        self.phrase_map
            .as_deref()
            .ok_or_else(|| ConfigError::MissingRequired("phrase_map".to_string()))
    }

    pub fn entity_info_path(&self) -> Result<&Path, ConfigError> {
        self.entity_info
            .as_deref()
            .ok_or_else(|| ConfigError::MissingRequired("entity_info".to_string()))
    }
}

/// Graph input/output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Annotated document file name inside each input directory
    pub document_file: String,

    /// Output graph file name inside each input directory
    pub output_file: String,

    /// Optional trimmed graph file name (collection-centred subgraph)
    pub trimmed_output_file: Option<String>,

    /// Separator between supporting sentences on an edge
    pub sentence_separator: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            document_file: "document.json".to_string(),
            output_file: "graph.gml".to_string(),
            trimmed_output_file: None,
            sentence_separator: " | ".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
