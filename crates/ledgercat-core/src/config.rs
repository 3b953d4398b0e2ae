//! Ensemble manifest: where the four artifact bundles live and how to vote.
//!
//! The manifest is a JSON file (conventionally `ensemble.json`) sitting next
//! to the artifacts. Relative paths resolve against the manifest's directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Conventional manifest file name inside a model directory.
pub const MANIFEST_FILE: &str = "ensemble.json";

/// Number of classifiers in the ensemble.
pub const ENSEMBLE_SIZE: usize = 4;

/// Production consensus rule: strictly more than two of four agree.
pub const DEFAULT_MIN_AGREEMENT: usize = 3;

/// Sequence length the neural classifier pads/truncates to.
pub const DEFAULT_MAX_LEN: usize = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("manifest not found: {0}")]
    NotFound(PathBuf),

    #[error("reading manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("min_agreement must be between 1 and 4, got {0}")]
    InvalidThreshold(usize),

    #[error("max_len must be positive")]
    InvalidMaxLen,
}

/// Full ensemble manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleConfig {
    pub linear_a: LinearArtifacts,
    pub linear_b: LinearArtifacts,
    pub naive_bayes: NaiveBayesArtifacts,
    pub neural: NeuralArtifacts,
    #[serde(default)]
    pub voting: VotingConfig,
}

/// Model backend behind a linear text classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelBackend {
    /// Coefficients + intercepts in JSON, evaluated in-process.
    #[default]
    Linear,
    /// ONNX graph emitting class probabilities (e.g. an exported random forest).
    Onnx,
}

/// Vectorizer + model pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearArtifacts {
    pub vectorizer: PathBuf,
    pub model: PathBuf,
    #[serde(default)]
    pub backend: ModelBackend,
    /// Ordered class list for the ONNX backend's probability output.
    #[serde(default)]
    pub labels: Option<PathBuf>,
    #[serde(default = "default_linear_input")]
    pub input: String,
    #[serde(default = "default_linear_output")]
    pub output: String,
}

/// Naive Bayes pipeline with its vectorizer embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NaiveBayesArtifacts {
    pub pipeline: PathBuf,
}

/// Tokenizer + network + label encoder triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuralArtifacts {
    pub tokenizer: PathBuf,
    pub network: PathBuf,
    pub label_encoder: PathBuf,
    #[serde(default = "default_max_len")]
    pub max_len: usize,
    #[serde(default = "default_neural_input")]
    pub input: String,
    #[serde(default = "default_neural_output")]
    pub output: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingConfig {
    /// Minimum number of identical ballots for a label to win.
    #[serde(default = "default_min_agreement")]
    pub min_agreement: usize,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            min_agreement: DEFAULT_MIN_AGREEMENT,
        }
    }
}

impl VotingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if (1..=ENSEMBLE_SIZE).contains(&self.min_agreement) {
            Ok(())
        } else {
            Err(ConfigError::InvalidThreshold(self.min_agreement))
        }
    }
}

fn default_min_agreement() -> usize {
    DEFAULT_MIN_AGREEMENT
}

fn default_max_len() -> usize {
    DEFAULT_MAX_LEN
}

fn default_linear_input() -> String {
    "input".to_string()
}

fn default_linear_output() -> String {
    "probabilities".to_string()
}

fn default_neural_input() -> String {
    "input".to_string()
}

fn default_neural_output() -> String {
    "output".to_string()
}

impl EnsembleConfig {
    /// Read a manifest file, resolve its paths and validate it.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_paths(base);
        config.validate()?;
        Ok(config)
    }

    /// Read `ensemble.json` from a model directory.
    pub fn from_dir(model_dir: &Path) -> Result<Self, ConfigError> {
        Self::from_file(&model_dir.join(MANIFEST_FILE))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.voting.validate()?;
        if self.neural.max_len == 0 {
            return Err(ConfigError::InvalidMaxLen);
        }
        Ok(())
    }

    /// Join every relative artifact path onto `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for linear in [&mut self.linear_a, &mut self.linear_b] {
            resolve(base, &mut linear.vectorizer);
            resolve(base, &mut linear.model);
            if let Some(labels) = linear.labels.as_mut() {
                resolve(base, labels);
            }
        }
        resolve(base, &mut self.naive_bayes.pipeline);
        resolve(base, &mut self.neural.tokenizer);
        resolve(base, &mut self.neural.network);
        resolve(base, &mut self.neural.label_encoder);
    }
}

fn resolve(base: &Path, path: &mut PathBuf) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "linear_a": { "vectorizer": "lr_vectorizer.json", "model": "lr_model.json" },
        "linear_b": {
            "vectorizer": "rf_vectorizer.json",
            "model": "rf_model.onnx",
            "backend": "onnx",
            "labels": "rf_labels.json"
        },
        "naive_bayes": { "pipeline": "nb_pipeline.json" },
        "neural": {
            "tokenizer": "cnn/tokenizer.json",
            "network": "/opt/models/cnn.onnx",
            "label_encoder": "cnn/labels.json"
        }
    }"#;

    fn write_manifest(body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        std::fs::write(&path, body).unwrap();
        (dir, path)
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let (_dir, path) = write_manifest(MANIFEST);
        let config = EnsembleConfig::from_file(&path).unwrap();

        assert_eq!(config.voting.min_agreement, DEFAULT_MIN_AGREEMENT);
        assert_eq!(config.neural.max_len, DEFAULT_MAX_LEN);
        assert_eq!(config.linear_a.backend, ModelBackend::Linear);
        assert_eq!(config.linear_b.backend, ModelBackend::Onnx);
        assert_eq!(config.linear_b.output, "probabilities");
        assert_eq!(config.neural.input, "input");
    }

    #[test]
    fn relative_paths_resolve_against_manifest_dir() {
        let (dir, path) = write_manifest(MANIFEST);
        let config = EnsembleConfig::from_file(&path).unwrap();

        assert_eq!(config.linear_a.model, dir.path().join("lr_model.json"));
        assert_eq!(
            config.linear_b.labels.as_deref(),
            Some(dir.path().join("rf_labels.json").as_path())
        );
        assert_eq!(config.neural.tokenizer, dir.path().join("cnn/tokenizer.json"));
        // Absolute paths are left alone.
        assert_eq!(config.neural.network, PathBuf::from("/opt/models/cnn.onnx"));
    }

    #[test]
    fn from_dir_reads_conventional_name() {
        let (dir, _path) = write_manifest(MANIFEST);
        assert!(EnsembleConfig::from_dir(dir.path()).is_ok());
    }

    #[test]
    fn missing_manifest_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = EnsembleConfig::from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn malformed_manifest_is_parse_error() {
        let (_dir, path) = write_manifest("{ \"linear_a\": ");
        let err = EnsembleConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        let body = MANIFEST.replacen('{', r#"{ "voting": { "min_agreement": 5 },"#, 1);
        let (_dir, path) = write_manifest(&body);
        let err = EnsembleConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThreshold(5)));

        assert!(VotingConfig { min_agreement: 0 }.validate().is_err());
        assert!(VotingConfig { min_agreement: 2 }.validate().is_ok());
    }
}
