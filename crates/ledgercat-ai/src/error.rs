use thiserror::Error;

use ledgercat_core::ConfigError;

/// Failure inside a single text classifier.
///
/// Never crosses the [`TextClassifier::predict`](crate::TextClassifier::predict)
/// boundary; it is logged there and turned into a `NoPrediction` ballot.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("feature vector has {got} features, model expects {expected}")]
    FeatureMismatch { expected: usize, got: usize },

    #[error("class index {index} out of range for {classes} classes")]
    ClassIndex { index: usize, classes: usize },

    #[error("model produced no usable scores")]
    EmptyScores,

    #[error("tokenize: {0}")]
    Tokenize(String),

    #[error("onnx runtime: {0}")]
    Onnx(String),

    #[error("{0}")]
    Other(String),
}

/// Fatal startup failure: the ensemble cannot be served.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("ensemble config: {0}")]
    Config(#[from] ConfigError),

    #[error("loading {classifier}: {cause:#}")]
    Load {
        classifier: &'static str,
        cause: anyhow::Error,
    },
}

impl RegistryError {
    /// Name of the classifier slot that failed, if the failure was an artifact load.
    pub fn classifier(&self) -> Option<&'static str> {
        match self {
            Self::Load { classifier, .. } => Some(classifier),
            Self::Config(_) => None,
        }
    }
}
