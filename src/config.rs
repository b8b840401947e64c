//! Configuration loading for the pipeline.
//!
//! Configuration is a YAML file with environment-variable interpolation:
//! a string value of the form `${VAR}` is replaced by the value of the
//! environment variable `VAR`, or by the literal sentinel
//! `MissingEnvVar: VAR` when the variable is not set. Interpolation never
//! fails the load; validation of the resolved values happens separately.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Which pipeline variant to run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RagMode {
    /// Full corpus, semantic chunking, metadata annotation, hybrid retrieval.
    Super,
    /// Single document, recursive character chunking, dense-only retrieval.
    Naive,
}

impl RagMode {
    /// The lowercase name used to tag persisted files (`results_super.csv`).
    pub fn as_str(&self) -> &'static str {
        match self {
            RagMode::Super => "super",
            RagMode::Naive => "naive",
        }
    }
}

impl std::fmt::Display for RagMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_buffer_size() -> usize {
    1
}

fn default_threshold() -> f32 {
    0.5
}

fn default_max_previous_chunks() -> usize {
    100
}

fn default_num_samples() -> usize {
    15
}

fn default_questions_file() -> String {
    "data/evaluation_data.csv".to_string()
}

fn default_use_existing_questions() -> bool {
    true
}

/// Process-wide configuration, loaded once per pipeline (re)initialization.
///
/// The `rag` mode may be toggled between runs by an external caller, so
/// pipeline construction takes the configuration by reference per call
/// rather than capturing it at process start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// The pipeline variant to initialize.
    pub rag: RagMode,
    /// Embedding model identifier.
    pub model_name: String,
    /// Generation model identifier.
    pub model: String,
    /// Generation temperature.
    pub temperature: f32,
    /// OpenAI API key; supports `${VAR}` interpolation.
    pub openai_api_key: String,
    /// Corpus folder for super mode.
    #[serde(default)]
    pub directory_path: Option<String>,
    /// Single source document for naive mode.
    #[serde(default)]
    pub file_path: Option<String>,
    /// Number of neighbor sentences combined on each side for embedding.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Cosine-distance boundary threshold, in `[0, 2]`.
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    /// Lookback window (in chunks) for metadata propagation.
    #[serde(default = "default_max_previous_chunks")]
    pub max_previous_chunks: usize,
    /// Number of documents sampled when generating a benchmark.
    #[serde(default = "default_num_samples")]
    pub num_samples: usize,
    /// Number of trailing chunks persisted to the preview file; 0 disables it.
    #[serde(default)]
    pub show_chunks: usize,
    /// Whether to run the evaluation harness after initialization.
    #[serde(default)]
    pub evaluation: bool,
    /// Whether evaluation reuses the persisted benchmark file.
    #[serde(default = "default_use_existing_questions")]
    pub use_existing_questions: bool,
    /// Path of the persisted benchmark file (CSV, `question,answer`).
    #[serde(default = "default_questions_file")]
    pub questions_file: String,
}

impl AppConfig {
    /// Load configuration from a YAML file, interpolating `${VAR}` values.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the file cannot be read or the
    /// YAML does not deserialize (including an invalid `rag` value).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RagError::ConfigError(format!("cannot read config file '{}': {e}", path.display()))
        })?;

        let mut value: serde_yaml::Value = serde_yaml::from_str(&raw)
            .map_err(|e| RagError::ConfigError(format!("invalid YAML in '{}': {e}", path.display())))?;

        if let serde_yaml::Value::Mapping(map) = &mut value {
            for (_, v) in map.iter_mut() {
                if let serde_yaml::Value::String(s) = v {
                    *s = interpolate_env(s);
                }
            }
        }

        let config: AppConfig = serde_yaml::from_value(value)
            .map_err(|e| RagError::ConfigError(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate mode-specific requirements and parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - super mode is missing `directory_path`
    /// - naive mode is missing `file_path`
    /// - `threshold` is outside `[0, 2]`
    /// - `temperature` is negative
    pub fn validate(&self) -> Result<()> {
        match self.rag {
            RagMode::Super if self.directory_path.is_none() => {
                return Err(RagError::ConfigError(
                    "'directory_path' is required when rag is 'super'".to_string(),
                ));
            }
            RagMode::Naive if self.file_path.is_none() => {
                return Err(RagError::ConfigError(
                    "'file_path' is required when rag is 'naive'".to_string(),
                ));
            }
            _ => {}
        }
        if !(0.0..=2.0).contains(&self.threshold) {
            return Err(RagError::ConfigError(format!(
                "threshold ({}) must be within [0, 2]",
                self.threshold
            )));
        }
        if self.temperature < 0.0 {
            return Err(RagError::ConfigError(format!(
                "temperature ({}) must be non-negative",
                self.temperature
            )));
        }
        Ok(())
    }
}

/// Replace a whole-string `${VAR}` reference with the environment value, or
/// the `MissingEnvVar: VAR` sentinel when the variable is unset.
fn interpolate_env(value: &str) -> String {
    if let Some(var) = value.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        return std::env::var(var).unwrap_or_else(|_| format!("MissingEnvVar: {var}"));
    }
    value.to_string()
}
