//! Stand-in ensemble for command tests.

use std::sync::Arc;

use ledgercat_ai::{
    ClassifierError, ClassifierKind, EnsembleVoter, ModelRegistry, TextClassifier,
};
use ledgercat_core::{CategoryLabel, VotingConfig};

/// Votes the description's first word, upper-cased. Fails on empty text.
struct FirstWord(&'static str);

impl TextClassifier for FirstWord {
    fn name(&self) -> &str {
        self.0
    }

    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Linear
    }

    fn infer(&self, description: &str) -> Result<CategoryLabel, ClassifierError> {
        description
            .split_whitespace()
            .next()
            .map(|w| CategoryLabel::new(w.to_uppercase()))
            .ok_or_else(|| ClassifierError::Other("empty description".into()))
    }
}

/// Four identical first-word classifiers under the default threshold.
pub fn first_word_voter() -> EnsembleVoter {
    let registry = ModelRegistry::from_classifiers(
        Arc::new(FirstWord("linear-a")),
        Arc::new(FirstWord("linear-b")),
        Arc::new(FirstWord("naive-bayes")),
        Arc::new(FirstWord("neural-sequence")),
    );
    EnsembleVoter::new(Arc::new(registry), VotingConfig::default())
}
