//! Human-readable rendering of ensemble decisions.
//!
//! One block per description: every ballot in voting order, the tally, and
//! the final label with how it was reached.

use ledgercat_ai::EnsembleDecision;
use ledgercat_core::ENSEMBLE_SIZE;

const NAME_WIDTH: usize = 16;

pub fn print_decision(description: &str, decision: &EnsembleDecision, min_agreement: usize) {
    print!("{}", format_decision(description, decision, min_agreement));
}

pub fn format_decision(description: &str, decision: &EnsembleDecision, min_agreement: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("{description}\n"));

    // ── Ballots ──
    for ballot in &decision.ballots {
        out.push_str(&format!(
            "  {:<NAME_WIDTH$} {}\n",
            ballot.classifier, ballot.outcome
        ));
    }

    // ── Outcome ──
    out.push_str(&format!("  {:<NAME_WIDTH$} {}\n", "tally", decision.tally()));
    let verdict = if decision.consensus {
        format!(
            "{} ({}/{ENSEMBLE_SIZE}, consensus)",
            decision.label, decision.votes
        )
    } else {
        format!(
            "{} (plurality {}/{ENSEMBLE_SIZE}, need {min_agreement})",
            decision.label, decision.votes
        )
    };
    out.push_str(&format!("  {:<NAME_WIDTH$} {verdict}\n", "decision"));
    out
}
