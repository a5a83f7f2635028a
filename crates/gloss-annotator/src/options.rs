//! Engine options

use serde::{Deserialize, Serialize};

/// Tunables for the annotation engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatorOptions {
    /// Model alias used for annotation completions
    pub annotation_model: String,

    /// Model used for text embeddings
    pub embedding_model: String,

    /// Completion batch size
    pub batch_size: usize,

    /// Number of topical clusters fit on the first batch for a task
    pub topical_clusters: usize,
}

impl Default for AnnotatorOptions {
    fn default() -> Self {
        Self {
            annotation_model: "gpt-4.1".to_string(),
            embedding_model: "text-embedding-3-large".to_string(),
            batch_size: 20,
            topical_clusters: 4,
        }
    }
}

impl AnnotatorOptions {
    /// Validate the options
    pub fn validate(&self) -> Result<(), String> {
        if self.annotation_model.is_empty() {
            return Err("annotation_model must not be empty".to_string());
        }
        if self.embedding_model.is_empty() {
            return Err("embedding_model must not be empty".to_string());
        }
        if self.batch_size == 0 {
            return Err("batch_size must be greater than 0".to_string());
        }
        if self.topical_clusters == 0 {
            return Err("topical_clusters must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Load options from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_valid() {
        assert!(AnnotatorOptions::default().validate().is_ok());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut options = AnnotatorOptions::default();
        options.batch_size = 0;
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let options = AnnotatorOptions::default();
        let toml_str = toml::to_string(&options).unwrap();
        let parsed = AnnotatorOptions::from_toml(&toml_str).unwrap();
        assert_eq!(parsed.batch_size, options.batch_size);
        assert_eq!(parsed.annotation_model, options.annotation_model);
    }
}
