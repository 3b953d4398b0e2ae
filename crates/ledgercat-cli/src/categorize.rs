//! Batch categorization: JSON array of transactions in, one category each out.

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use ledgercat_ai::EnsembleVoter;
use ledgercat_core::{CategoryLabel, description_text};
use serde::Serialize;
use serde_json::Value;

pub const DESCRIPTION_FIELD: &str = "transaction_description";
pub const ID_FIELD: &str = "transaction_id";

#[derive(Debug, Serialize)]
pub struct Categorized {
    pub transaction_id: Value,
    pub category_id: CategoryLabel,
}

/// A record that could not be categorized, with its position in the input.
#[derive(Debug)]
pub struct Skipped {
    pub index: usize,
    pub reason: &'static str,
}

pub struct CategorizeStats {
    pub total: usize,
    pub no_consensus: usize,
    pub elapsed_secs: f64,
}

pub struct CategorizeReport {
    pub results: Vec<Categorized>,
    pub skipped: Vec<Skipped>,
    pub stats: CategorizeStats,
}

/// Read `path` and categorize every transaction in it.
pub fn run_categorize(voter: &EnsembleVoter, path: &Path) -> anyhow::Result<CategorizeReport> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let records: Vec<Value> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of transactions", path.display()))?;
    eprintln!("  Read {} transactions from {}", records.len(), path.display());
    Ok(categorize_records(voter, &records))
}

pub fn categorize_records(voter: &EnsembleVoter, records: &[Value]) -> CategorizeReport {
    let start = Instant::now();
    let mut results = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();

    for (index, record) in records.iter().enumerate() {
        let Some(fields) = record.as_object() else {
            skipped.push(Skipped {
                index,
                reason: "not a JSON object",
            });
            continue;
        };
        let Some(description) = fields.get(DESCRIPTION_FIELD) else {
            skipped.push(Skipped {
                index,
                reason: "missing transaction_description",
            });
            continue;
        };

        let category_id = voter.classify(&description_text(description));
        results.push(Categorized {
            transaction_id: fields.get(ID_FIELD).cloned().unwrap_or(Value::Null),
            category_id,
        });
    }

    let stats = CategorizeStats {
        total: records.len(),
        no_consensus: results
            .iter()
            .filter(|r| r.category_id.is_no_consensus())
            .count(),
        elapsed_secs: start.elapsed().as_secs_f64(),
    };
    CategorizeReport {
        results,
        skipped,
        stats,
    }
}
