pub mod config;
pub mod label;

pub use config::{
    ConfigError, ENSEMBLE_SIZE, EnsembleConfig, LinearArtifacts, ModelBackend,
    NaiveBayesArtifacts, NeuralArtifacts, VotingConfig,
};
pub use label::{CategoryLabel, NO_CONSENSUS, Outcome, description_text, truncate_for_log};
