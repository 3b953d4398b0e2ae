//! Transaction categorization: four text classifiers and the vote that
//! combines them. ONNX Runtime backends sit behind the `onnx` feature.

mod error;
pub use error::{ClassifierError, RegistryError};

pub mod classifier;
pub mod ensemble;
pub mod labels;
pub mod linear;
pub mod naive_bayes;
pub mod registry;
pub mod vectorizer;

#[cfg(feature = "onnx")]
pub mod neural;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use classifier::{ClassifierKind, TextClassifier};
pub use ensemble::{Ballot, EnsembleDecision, EnsembleVoter, VoteTally};
pub use registry::ModelRegistry;
