//! Timestamped result snapshots
//!
//! Every successful annotation or synthesis response is also written to a
//! JSON file under the results directory, named
//! `{kind}_{task}{round}_{timestamp}.json`.

use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes result snapshots under a fixed directory
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    /// Create a writer rooted at `dir`, creating the directory if needed
    pub fn new<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    /// Write one snapshot; returns the path written
    pub fn write(
        &self,
        kind: &str,
        task_id: &str,
        round_suffix: &str,
        payload: &Value,
    ) -> io::Result<PathBuf> {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = self
            .dir
            .join(format!("{}_{}{}_{}.json", kind, task_id, round_suffix, timestamp));
        let contents = serde_json::to_string_pretty(payload)?;
        std::fs::write(&path, contents)?;
        info!(path = %path.display(), "wrote result snapshot");
        Ok(path)
    }
}

/// Replace non-finite floats with JSON null, recursively.
///
/// serde_json already maps non-finite f64 to null during serialization;
/// this pass makes the wire contract explicit for payloads assembled from
/// raw `Value`s.
pub fn sanitize(value: Value) -> Value {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if !f.is_finite() => Value::Null,
            _ => Value::Number(n),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize).collect()),
        Value::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, sanitize(v))).collect())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_finite_floats_become_null() {
        // serde_json cannot represent NaN/Infinity as numbers: conversion
        // from f64 already yields null, and sanitize keeps it that way.
        let value = serde_json::to_value(f64::NAN).unwrap();
        assert!(value.is_null());
        assert!(sanitize(value).is_null());

        let value = serde_json::to_value(f64::INFINITY).unwrap();
        assert!(sanitize(value).is_null());
    }

    #[test]
    fn test_finite_values_untouched() {
        let value = json!({"a": 1.5, "b": [1, 2, {"c": "text"}]});
        assert_eq!(sanitize(value.clone()), value);
    }

    #[test]
    fn test_snapshot_write_names_file_by_kind_task_round() {
        let dir = tempfile::TempDir::new().unwrap();
        let writer = SnapshotWriter::new(dir.path()).unwrap();
        let path = writer
            .write("annotation", "t1", "_2", &json!({"annotations": []}))
            .unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("annotation_t1_2_"));
        assert!(name.ends_with(".json"));
        assert!(path.exists());
    }
}
