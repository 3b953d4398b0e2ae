//! The text classifier capability shared by all four ensemble members.
//!
//! Each family implements [`TextClassifier::infer`], which may fail. Callers
//! go through [`TextClassifier::predict`] instead: it is the one place where
//! failures (errors and panics alike) are logged and turned into
//! [`Outcome::NoPrediction`].

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use ledgercat_core::{CategoryLabel, Outcome, truncate_for_log};
use tracing::{debug, warn};

use crate::ClassifierError;

/// Characters of the description kept in log fields.
pub const LOG_DESCRIPTION_CHARS: usize = 50;

/// Model family behind a classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    /// Vectorizer + linear or tree-ensemble model.
    Linear,
    /// Naive Bayes pipeline with an embedded vectorizer.
    NaiveBayes,
    /// Tokenizer + neural network + label encoder.
    NeuralSequence,
}

impl ClassifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::NaiveBayes => "naive_bayes",
            Self::NeuralSequence => "neural_sequence",
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One trained model plus its frozen preprocessing.
///
/// Implementations must not mutate observable state during inference so that
/// repeated calls with the same text give the same answer.
pub trait TextClassifier: Send + Sync {
    /// Identity used in logs and explain output (e.g. `linear-a`).
    fn name(&self) -> &str;

    fn kind(&self) -> ClassifierKind;

    /// Run the family-specific pipeline. May fail.
    fn infer(&self, description: &str) -> Result<CategoryLabel, ClassifierError>;

    /// Predict a label, absorbing every failure into `NoPrediction`.
    fn predict(&self, description: &str) -> Outcome {
        match panic::catch_unwind(AssertUnwindSafe(|| self.infer(description))) {
            Ok(Ok(label)) => {
                debug!(classifier = self.name(), label = %label, "prediction");
                Outcome::Label(label)
            }
            Ok(Err(err)) => {
                warn!(
                    classifier = self.name(),
                    kind = %self.kind(),
                    description = %truncate_for_log(description, LOG_DESCRIPTION_CHARS),
                    error = %err,
                    "prediction failed"
                );
                Outcome::NoPrediction
            }
            Err(payload) => {
                warn!(
                    classifier = self.name(),
                    kind = %self.kind(),
                    description = %truncate_for_log(description, LOG_DESCRIPTION_CHARS),
                    panic = panic_message(payload.as_ref()),
                    "classifier panicked"
                );
                Outcome::NoPrediction
            }
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
