//! The four trained classifiers, loaded once at startup.

use std::sync::Arc;

use ledgercat_core::{EnsembleConfig, NeuralArtifacts};
use tracing::info;

use crate::classifier::TextClassifier;
use crate::linear::LinearTextClassifier;
use crate::naive_bayes::NaiveBayesClassifier;
use crate::RegistryError;

pub const LINEAR_A: &str = "linear-a";
pub const LINEAR_B: &str = "linear-b";
pub const NAIVE_BAYES: &str = "naive-bayes";
pub const NEURAL_SEQUENCE: &str = "neural-sequence";

/// Immutable holder of the ensemble members.
///
/// Either fully loaded or not constructed at all; there is no way to build
/// a registry with fewer than four classifiers.
pub struct ModelRegistry {
    linear_a: Arc<dyn TextClassifier>,
    linear_b: Arc<dyn TextClassifier>,
    naive_bayes: Arc<dyn TextClassifier>,
    neural: Arc<dyn TextClassifier>,
}

impl ModelRegistry {
    /// Load every artifact bundle named in the manifest.
    pub fn load(config: &EnsembleConfig) -> Result<Self, RegistryError> {
        config.validate()?;

        let linear_a = LinearTextClassifier::load(LINEAR_A, &config.linear_a)
            .map_err(|cause| load_error(LINEAR_A, cause))?;
        let linear_b = LinearTextClassifier::load(LINEAR_B, &config.linear_b)
            .map_err(|cause| load_error(LINEAR_B, cause))?;
        let naive_bayes = NaiveBayesClassifier::load(NAIVE_BAYES, &config.naive_bayes)
            .map_err(|cause| load_error(NAIVE_BAYES, cause))?;
        let neural =
            load_neural(&config.neural).map_err(|cause| load_error(NEURAL_SEQUENCE, cause))?;

        let registry = Self::from_classifiers(
            Arc::new(linear_a),
            Arc::new(linear_b),
            Arc::new(naive_bayes),
            neural,
        );
        info!(classifiers = ?registry.names(), "model registry ready");
        Ok(registry)
    }

    /// Assemble a registry from already-built classifiers, in voting order.
    pub fn from_classifiers(
        linear_a: Arc<dyn TextClassifier>,
        linear_b: Arc<dyn TextClassifier>,
        naive_bayes: Arc<dyn TextClassifier>,
        neural: Arc<dyn TextClassifier>,
    ) -> Self {
        Self {
            linear_a,
            linear_b,
            naive_bayes,
            neural,
        }
    }

    /// The classifiers in voting order: linear-a, linear-b, naive-bayes,
    /// neural-sequence. Tie-breaking depends on this order.
    pub fn in_vote_order(&self) -> [&Arc<dyn TextClassifier>; 4] {
        [&self.linear_a, &self.linear_b, &self.naive_bayes, &self.neural]
    }

    pub fn names(&self) -> [&str; 4] {
        self.in_vote_order().map(|c| c.name())
    }
}

fn load_error(classifier: &'static str, cause: anyhow::Error) -> RegistryError {
    RegistryError::Load { classifier, cause }
}

#[cfg(feature = "onnx")]
fn load_neural(artifacts: &NeuralArtifacts) -> anyhow::Result<Arc<dyn TextClassifier>> {
    let clf = crate::neural::SequenceClassifier::load(NEURAL_SEQUENCE, artifacts)?;
    Ok(Arc::new(clf))
}

#[cfg(not(feature = "onnx"))]
fn load_neural(artifacts: &NeuralArtifacts) -> anyhow::Result<Arc<dyn TextClassifier>> {
    for path in [
        &artifacts.tokenizer,
        &artifacts.network,
        &artifacts.label_encoder,
    ] {
        anyhow::ensure!(path.exists(), "artifact not found: {}", path.display());
    }
    anyhow::bail!("the neural sequence classifier needs the onnx backend; rebuild with `--features onnx`")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::fakes::FixedClassifier;
    use ledgercat_core::{ConfigError, VotingConfig};
    use std::path::Path;

    fn write(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    /// Manifest with valid linear and naive Bayes artifacts on disk.
    fn model_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path();
        write(p, "vectorizer.json", r#"{"vocabulary": {"luz": 0, "netflix": 1}}"#);
        write(
            p,
            "model.json",
            r#"{"classes": ["LUZ", "STR"], "coef": [[1.0, 0.0], [0.0, 1.0]], "intercept": [0.0, 0.0]}"#,
        );
        write(
            p,
            "nb.json",
            r#"{
                "vectorizer": {"vocabulary": {"luz": 0, "netflix": 1}},
                "classes": ["LUZ", "STR"],
                "class_log_prior": [-0.7, -0.7],
                "feature_log_prob": [[-0.1, -3.0], [-3.0, -0.1]]
            }"#,
        );
        write(
            p,
            "ensemble.json",
            r#"{
                "linear_a": {"vectorizer": "vectorizer.json", "model": "model.json"},
                "linear_b": {"vectorizer": "vectorizer.json", "model": "model.json"},
                "naive_bayes": {"pipeline": "nb.json"},
                "neural": {
                    "tokenizer": "cnn/tokenizer.json",
                    "network": "cnn/model.onnx",
                    "label_encoder": "cnn/labels.json"
                }
            }"#,
        );
        dir
    }

    #[test]
    fn from_classifiers_keeps_vote_order() {
        let registry = ModelRegistry::from_classifiers(
            Arc::new(FixedClassifier::new("a", "X")),
            Arc::new(FixedClassifier::new("b", "X")),
            Arc::new(FixedClassifier::new("c", "X")),
            Arc::new(FixedClassifier::new("d", "X")),
        );
        assert_eq!(registry.names(), ["a", "b", "c", "d"]);
    }

    #[test]
    fn missing_neural_artifacts_fail_the_whole_load() {
        let dir = model_dir();
        let config = EnsembleConfig::from_dir(dir.path()).unwrap();

        // Three of four would load fine; the registry must still refuse.
        let err = ModelRegistry::load(&config).err().unwrap();
        assert_eq!(err.classifier(), Some(NEURAL_SEQUENCE));
    }

    #[test]
    fn missing_linear_model_names_its_slot() {
        let dir = model_dir();
        std::fs::remove_file(dir.path().join("model.json")).unwrap();
        let config = EnsembleConfig::from_dir(dir.path()).unwrap();

        let err = ModelRegistry::load(&config).err().unwrap();
        assert_eq!(err.classifier(), Some(LINEAR_A));
        assert!(err.to_string().contains("model not found"));
    }

    #[test]
    fn malformed_naive_bayes_pipeline_fails() {
        let dir = model_dir();
        write(dir.path(), "nb.json", "{ not json");
        let config = EnsembleConfig::from_dir(dir.path()).unwrap();

        let err = ModelRegistry::load(&config).err().unwrap();
        assert_eq!(err.classifier(), Some(NAIVE_BAYES));
    }

    #[test]
    fn invalid_threshold_is_config_error() {
        let dir = model_dir();
        let mut config = EnsembleConfig::from_dir(dir.path()).unwrap();
        config.voting = VotingConfig { min_agreement: 9 };

        let err = ModelRegistry::load(&config).err().unwrap();
        assert!(matches!(
            err,
            RegistryError::Config(ConfigError::InvalidThreshold(9))
        ));
        assert_eq!(err.classifier(), None);
    }
}
