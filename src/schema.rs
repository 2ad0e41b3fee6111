//! Schema validation for extracted frames.
//!
//! A schema definition is a JSON file with a single `required_columns` key
//! holding the column names an artifact must carry. Validation only checks
//! presence — no typing, no coercion — and an empty frame always passes,
//! since a zero-row extraction has no guaranteed columns.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use crate::frame::Frame;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Schema file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read schema file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse schema file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Schema file {0} has no 'required_columns' key")]
    MissingRequiredColumns(PathBuf),

    #[error("Missing required columns: {}", .missing.join(", "))]
    Validation { missing: Vec<String> },
}

/// Check a frame against the schema definition at `schema_path`.
///
/// Succeeds if the frame is empty or every required column is present;
/// otherwise fails naming every missing column, not just the first.
/// Extra columns are always permitted.
#[allow(dead_code)] // Certification entry point for callers outside the pipeline's happy path
pub fn validate(frame: &Frame, schema_path: &Path) -> Result<(), SchemaError> {
    let required = required_columns(schema_path)?;

    if frame.is_empty() {
        return Ok(());
    }

    let mut missing: Vec<String> = required
        .into_iter()
        .filter(|column| !frame.has_column(column))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        missing.sort();
        Err(SchemaError::Validation { missing })
    }
}

fn required_columns(schema_path: &Path) -> Result<Vec<String>, SchemaError> {
    let contents = fs::read_to_string(schema_path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            SchemaError::NotFound(schema_path.to_path_buf())
        } else {
            SchemaError::Io {
                path: schema_path.to_path_buf(),
                source,
            }
        }
    })?;

    let definition: Value =
        serde_json::from_str(&contents).map_err(|source| SchemaError::Parse {
            path: schema_path.to_path_buf(),
            source,
        })?;

    let Some(required) = definition.get("required_columns") else {
        return Err(SchemaError::MissingRequiredColumns(
            schema_path.to_path_buf(),
        ));
    };
    serde_json::from_value(required.clone()).map_err(|source| SchemaError::Parse {
        path: schema_path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};
    use tempfile::tempdir;

    fn write_schema(dir: &Path, name: &str, definition: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, definition).unwrap();
        path
    }

    fn frame_with_columns(columns: &[&str]) -> Frame {
        let mut record = Map::new();
        for column in columns {
            record.insert(column.to_string(), json!("x"));
        }
        Frame::from_records(vec![record])
    }

    #[test]
    fn test_all_required_columns_present_passes() {
        let dir = tempdir().unwrap();
        let path = write_schema(
            dir.path(),
            "repos.json",
            r#"{"required_columns": ["full_name", "default_branch"]}"#,
        );
        let frame = frame_with_columns(&["full_name", "default_branch", "open_prs"]);
        validate(&frame, &path).unwrap();
    }

    #[test]
    fn test_extra_columns_are_permitted() {
        let dir = tempdir().unwrap();
        let path = write_schema(dir.path(), "s.json", r#"{"required_columns": ["a"]}"#);
        let frame = frame_with_columns(&["a", "b", "c"]);
        validate(&frame, &path).unwrap();
    }

    #[test]
    fn test_failure_names_every_missing_column() {
        let dir = tempdir().unwrap();
        let path = write_schema(
            dir.path(),
            "s.json",
            r#"{"required_columns": ["a", "b", "c"]}"#,
        );
        let frame = frame_with_columns(&["c"]);

        let err = validate(&frame, &path).unwrap_err();
        let SchemaError::Validation { missing } = &err else {
            panic!("expected validation failure, got {err:?}");
        };
        assert_eq!(missing, &["a", "b"]);
        let message = err.to_string();
        assert!(message.contains("a"));
        assert!(message.contains("b"));
    }

    #[test]
    fn test_empty_frame_always_passes() {
        let dir = tempdir().unwrap();
        let path = write_schema(
            dir.path(),
            "s.json",
            r#"{"required_columns": ["anything", "at", "all"]}"#,
        );
        validate(&Frame::new(), &path).unwrap();
    }

    #[test]
    fn test_missing_schema_file_is_not_found() {
        let dir = tempdir().unwrap();
        let err = validate(&Frame::new(), &dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SchemaError::NotFound(_)));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = write_schema(dir.path(), "bad.json", "{not json");
        let err = validate(&Frame::new(), &path).unwrap_err();
        assert!(matches!(err, SchemaError::Parse { .. }));
    }

    #[test]
    fn test_missing_required_columns_key_is_structural_error() {
        let dir = tempdir().unwrap();
        let path = write_schema(dir.path(), "s.json", r#"{"columns": ["a"]}"#);
        let err = validate(&Frame::new(), &path).unwrap_err();
        assert!(matches!(err, SchemaError::MissingRequiredColumns(_)));
    }

    #[test]
    fn test_shipped_schemas_accept_extracted_shapes() {
        let schemas = Path::new(env!("CARGO_MANIFEST_DIR")).join("schemas");
        let repos = frame_with_columns(&["full_name", "default_branch", "created_at"]);
        validate(&repos, &schemas.join("repos.json")).unwrap();

        let commits = frame_with_columns(&[
            "commitHash",
            "userEmail",
            "repoName",
            "tabLinesAdded",
            "composerLinesAdded",
            "nonAiLinesAdded",
            "commitTs",
        ]);
        validate(&commits, &schemas.join("commits.json")).unwrap();

        let pull_requests = frame_with_columns(&[
            "number",
            "repo_name",
            "author_email",
            "state",
            "additions",
            "deletions",
            "ai_ratio",
            "was_reverted",
            "created_at",
        ]);
        validate(&pull_requests, &schemas.join("pull_requests.json")).unwrap();

        let reviews = frame_with_columns(&["id", "repo_name", "pr_number", "state", "submitted_at"]);
        validate(&reviews, &schemas.join("reviews.json")).unwrap();
    }
}
