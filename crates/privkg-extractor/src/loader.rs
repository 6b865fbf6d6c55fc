//! Document Loader module
//!
//! Reads the annotated `document.json` of a policy directory and turns it
//! into a validated [`PolicyDocument`].

use std::path::Path;

use tracing::debug;

use privkg_core::{AnnotatedDocument, PolicyDocument, PrivKgError, Result};

/// Read the raw annotations without validating the dependency trees
pub fn read_annotations(path: impl AsRef<Path>) -> Result<AnnotatedDocument> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;

    serde_json::from_str(&content).map_err(|e| {
        PrivKgError::InvalidDocument(format!("{}: {e}", path.display()))
    })
}

/// Load `<dir>/<file_name>`; the directory name is the fallback document id
pub fn load_document(dir: impl AsRef<Path>, file_name: &str) -> Result<PolicyDocument> {
    let dir = dir.as_ref();
    let annotated = read_annotations(dir.join(file_name))?;

    let fallback_id = document_id(dir);
    let document = PolicyDocument::from_annotations(&fallback_id, annotated)?;

    debug!(
        document = document.id(),
        segments = document.segments().len(),
        nodes = document.nodes().len(),
        links = document.links().len(),
        "Document loaded"
    );

    Ok(document)
}

/// Last path component of a policy directory, or the whole path
pub fn document_id(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use privkg_core::{Relationship, SourceId};

    const DOCUMENT: &str = r#"{
        "segments": [
            {
                "tokens": [
                    {"text": "We", "lemma": "we", "pos": "PRON", "dep": "nsubj", "head": 1,
                     "ent_type": "ACTOR", "src": [0, 0], "sent_start": true},
                    {"text": "collect", "lemma": "collect", "pos": "VERB", "dep": "ROOT", "head": 1,
                     "src": [0, 1]},
                    {"text": "cookies", "lemma": "cookie", "pos": "NOUN", "dep": "dobj", "head": 1,
                     "ent_type": "DATA", "src": [0, 2], "trailing_space": false},
                    {"text": ".", "lemma": ".", "pos": "PUNCT", "dep": "punct", "head": 1,
                     "src": [0, 3]}
                ]
            }
        ],
        "relationships": [
            {"from": [0, 0], "to": [0, 2], "relationship": "COLLECT"}
        ]
    }"#;

    #[test]
    fn test_load_document_uses_dir_name() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("example.com");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("document.json"), DOCUMENT).unwrap();

        let document = load_document(&dir, "document.json").unwrap();
        assert_eq!(document.id(), "example.com");
        assert_eq!(document.nodes(), &[SourceId(0, 0), SourceId(0, 2)]);
        assert_eq!(document.links()[0].relationship, Relationship::Collect);

        let segment = &document.segments()[0];
        assert_eq!(segment.sentence_text(0..segment.len()), "We collect cookies.");
    }

    #[test]
    fn test_explicit_id_wins() {
        let dir = tempfile::tempdir().unwrap();
        let with_id = DOCUMENT.replacen('{', r#"{"id": "policy-1","#, 1);
        std::fs::write(dir.path().join("document.json"), with_id).unwrap();

        let document = load_document(dir.path(), "document.json").unwrap();
        assert_eq!(document.id(), "policy-1");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_document(dir.path(), "document.json").unwrap_err();
        assert!(matches!(err, PrivKgError::Io(_)));
    }

    #[test]
    fn test_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("document.json"), "{\"segments\": 3}").unwrap();

        let err = load_document(dir.path(), "document.json").unwrap_err();
        assert!(matches!(err, PrivKgError::InvalidDocument(_)));
    }

    #[test]
    fn test_unresolvable_link_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let broken = DOCUMENT.replace(r#""to": [0, 2]"#, r#""to": [4, 2]"#);
        std::fs::write(dir.path().join("document.json"), broken).unwrap();

        let err = load_document(dir.path(), "document.json").unwrap_err();
        assert!(matches!(err, PrivKgError::TokenNotFound(SourceId(4, 2))));
    }

    #[test]
    fn test_document_id_fallback() {
        assert_eq!(document_id(Path::new("/data/policies/app.example")), "app.example");
        assert_eq!(document_id(Path::new("/")), "/");
    }
}
