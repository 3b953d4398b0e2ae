//! Ensemble voting over the four registered classifiers.
//!
//! Every description gets exactly four ballots, cast in registry order. The
//! ballot value with the highest count wins, ties going to whichever value
//! appeared first. The winner only becomes the category if it is a real
//! label backed by at least `min_agreement` ballots; otherwise the answer is
//! the `CND` sentinel.
//!
//! `NoPrediction` ballots are tallied like any other value. They can take the
//! plurality (and so block a tied label that appeared later), but they never
//! become the category: a `NoPrediction` plurality always resolves to `CND`.

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use ledgercat_core::{CategoryLabel, Outcome, VotingConfig, truncate_for_log};
use serde::Serialize;
use tracing::{info, warn};

use crate::classifier::{LOG_DESCRIPTION_CHARS, TextClassifier, panic_message};
use crate::registry::ModelRegistry;

/// One classifier's contribution to a vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ballot {
    pub classifier: String,
    pub outcome: Outcome,
}

/// Ballot counts in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteTally {
    entries: Vec<(Outcome, usize)>,
}

impl VoteTally {
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a Outcome>) -> Self {
        let mut entries: Vec<(Outcome, usize)> = Vec::new();
        for outcome in outcomes {
            match entries.iter_mut().find(|(seen, _)| seen == outcome) {
                Some((_, count)) => *count += 1,
                None => entries.push((outcome.clone(), 1)),
            }
        }
        Self { entries }
    }

    pub fn count(&self, outcome: &Outcome) -> usize {
        self.entries
            .iter()
            .find(|(seen, _)| seen == outcome)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    /// Most common value; among equal counts the earliest-seen wins.
    pub fn plurality(&self) -> Option<(&Outcome, usize)> {
        let mut best: Option<(&Outcome, usize)> = None;
        for (outcome, count) in &self.entries {
            match best {
                Some((_, top)) if *count <= top => {}
                _ => best = Some((outcome, *count)),
            }
        }
        best
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Outcome, usize)> {
        self.entries.iter().map(|(o, c)| (o, *c))
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, c)| c).sum()
    }
}

impl fmt::Display for VoteTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (outcome, count)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{outcome}={count}")?;
        }
        Ok(())
    }
}

/// Final answer for one description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnsembleDecision {
    /// Winning category, or `CND`.
    pub label: CategoryLabel,
    /// Ballots behind the plurality value (the label itself when `consensus`).
    pub votes: usize,
    pub consensus: bool,
    /// Ballots in voting order.
    pub ballots: Vec<Ballot>,
}

impl EnsembleDecision {
    pub fn tally(&self) -> VoteTally {
        VoteTally::from_outcomes(self.ballots.iter().map(|b| &b.outcome))
    }

    /// Each classifier's outcome in voting order, e.g. `linear-a=MER, naive-bayes=<none>`.
    pub fn ballot_summary(&self) -> String {
        self.ballots
            .iter()
            .map(|b| format!("{}={}", b.classifier, b.outcome))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Apply the plurality-with-threshold rule to a full set of ballots.
pub fn decide(ballots: Vec<Ballot>, min_agreement: usize) -> EnsembleDecision {
    let tally = VoteTally::from_outcomes(ballots.iter().map(|b| &b.outcome));
    let (label, votes, consensus) = match tally.plurality() {
        Some((Outcome::Label(label), votes)) if votes >= min_agreement => {
            (label.clone(), votes, true)
        }
        Some((_, votes)) => (CategoryLabel::no_consensus(), votes, false),
        None => (CategoryLabel::no_consensus(), 0, false),
    };
    EnsembleDecision {
        label,
        votes,
        consensus,
        ballots,
    }
}

/// Combines the registry's four classifiers into one category per description.
#[derive(Clone)]
pub struct EnsembleVoter {
    registry: Arc<ModelRegistry>,
    voting: VotingConfig,
}

impl EnsembleVoter {
    pub fn new(registry: Arc<ModelRegistry>, voting: VotingConfig) -> Self {
        Self { registry, voting }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn min_agreement(&self) -> usize {
        self.voting.min_agreement
    }

    /// Category for one description: a registered code or `CND`. Never fails.
    pub fn classify(&self, description: &str) -> CategoryLabel {
        self.decide(description).label
    }

    /// Full decision with every ballot, classifiers run one after another.
    pub fn decide(&self, description: &str) -> EnsembleDecision {
        let ballots = self
            .registry
            .in_vote_order()
            .iter()
            .map(|clf| Ballot {
                classifier: clf.name().to_string(),
                outcome: clf.predict(description),
            })
            .collect();
        self.finish(description, ballots)
    }

    /// Classify each description independently; results follow input order.
    pub fn classify_batch<S: AsRef<str>>(&self, descriptions: &[S]) -> Vec<CategoryLabel> {
        descriptions
            .iter()
            .map(|d| self.classify(d.as_ref()))
            .collect()
    }

    /// Like [`decide`](Self::decide), but runs the four classifiers in
    /// parallel on the blocking pool. All four finish before the tally.
    pub async fn decide_concurrent(&self, description: &str) -> EnsembleDecision {
        let tasks = self.registry.in_vote_order().map(|clf| {
            let clf = Arc::clone(clf);
            let text = description.to_string();
            tokio::task::spawn_blocking(move || clf.predict(&text))
        });
        let names = self.registry.names().map(str::to_string);

        let results = join_all(tasks).await;
        let ballots = names
            .into_iter()
            .zip(results)
            .map(|(classifier, joined)| {
                let outcome = joined.unwrap_or_else(|err| {
                    let reason = if err.is_panic() {
                        panic_message(err.into_panic().as_ref()).to_string()
                    } else {
                        "task cancelled".to_string()
                    };
                    warn!(classifier = %classifier, reason = %reason, "classifier task failed");
                    Outcome::NoPrediction
                });
                Ballot {
                    classifier,
                    outcome,
                }
            })
            .collect();
        self.finish(description, ballots)
    }

    pub async fn classify_concurrent(&self, description: &str) -> CategoryLabel {
        self.decide_concurrent(description).await.label
    }

    fn finish(&self, description: &str, ballots: Vec<Ballot>) -> EnsembleDecision {
        let decision = decide(ballots, self.voting.min_agreement);
        info!(
            description = %truncate_for_log(description, LOG_DESCRIPTION_CHARS),
            ballots = %decision.ballot_summary(),
            tally = %decision.tally(),
            label = %decision.label,
            votes = decision.votes,
            consensus = decision.consensus,
            "ensemble decision"
        );
        decision
    }
}
