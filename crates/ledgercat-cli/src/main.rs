mod categorize;
mod display;
mod interactive;
#[cfg(test)]
mod testing;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ledgercat_ai::{EnsembleVoter, ModelRegistry};
use ledgercat_core::EnsembleConfig;
use tracing_subscriber::EnvFilter;

/// Descriptions exercised by `ledgercat smoke`.
const SMOKE_DESCRIPTIONS: [&str; 8] = [
    "Compra no supermercado",
    "Pagamento de conta de luz",
    "Transferência recebida",
    "Restaurante japonês",
    "Assinatura Netflix",
    "Combustível posto Shell",
    "Consulta médica",
    "Passagem aérea para SP",
];

#[derive(Parser)]
#[command(name = "ledgercat", version, about = "Ensemble categorization of transaction descriptions.")]
struct Cli {
    /// Model directory containing ensemble.json
    #[arg(long, global = true, env = "LEDGERCAT_MODELS", default_value = "models")]
    models: PathBuf,

    /// Votes a label needs to win (overrides the manifest)
    #[arg(long, global = true)]
    min_agreement: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load all four classifiers and report readiness.
    Check,
    /// Categorize one or more descriptions.
    Classify {
        #[arg(required = true)]
        descriptions: Vec<String>,
        /// Print every ballot and the tally
        #[arg(long)]
        explain: bool,
        /// Run the classifiers in parallel
        #[arg(long)]
        concurrent: bool,
    },
    /// Run the built-in sample descriptions through the ensemble.
    Smoke,
    /// Read descriptions from stdin, one per line, until `sair` or end of input.
    Interactive,
    /// Categorize a JSON array of transactions.
    Categorize {
        /// File with objects carrying transaction_id and transaction_description
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("ledgercat v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let voter = load_voter(&cli.models, cli.min_agreement)?;

    match cli.command {
        Command::Check => {
            println!("Model directory: {}", cli.models.display());
            for clf in voter.registry().in_vote_order() {
                println!("  {:<16} {:?}", clf.name(), clf.kind());
            }
            println!("Ready (min agreement {})", voter.min_agreement());
        }
        Command::Classify {
            descriptions,
            explain,
            concurrent,
        } => {
            for description in &descriptions {
                let decision = if concurrent {
                    voter.decide_concurrent(description).await
                } else {
                    voter.decide(description)
                };
                if explain {
                    display::print_decision(description, &decision, voter.min_agreement());
                } else {
                    println!("{}\t{description}", decision.label);
                }
            }
        }
        Command::Smoke => {
            let mut no_consensus = 0usize;
            for description in SMOKE_DESCRIPTIONS {
                let decision = voter.decide_concurrent(description).await;
                no_consensus += usize::from(!decision.consensus);
                display::print_decision(description, &decision, voter.min_agreement());
                println!();
            }
            println!(
                "{} samples, {} without consensus",
                SMOKE_DESCRIPTIONS.len(),
                no_consensus
            );
        }
        Command::Interactive => {
            eprintln!(
                "Type a transaction description per line; '{}' to quit.",
                interactive::QUIT_WORDS[0]
            );
            let stdin = std::io::stdin();
            let n = interactive::run_interactive(&voter, stdin.lock(), std::io::stdout())?;
            eprintln!("  Classified {n} descriptions");
        }
        Command::Categorize { file } => {
            let report = categorize::run_categorize(&voter, &file)?;
            for result in &report.results {
                println!("{}", serde_json::to_string(result)?);
            }
            for skipped in &report.skipped {
                eprintln!("  Skipped record {}: {}", skipped.index, skipped.reason);
            }
            eprintln!(
                "  Categorized {} of {} transactions ({} CND, {} skipped) in {:.2}s",
                report.results.len(),
                report.stats.total,
                report.stats.no_consensus,
                report.skipped.len(),
                report.stats.elapsed_secs
            );
        }
    }

    Ok(())
}

/// Load the manifest and all four classifiers; any failure aborts startup.
fn load_voter(models: &Path, min_agreement: Option<usize>) -> anyhow::Result<EnsembleVoter> {
    let mut config = EnsembleConfig::from_dir(models)
        .with_context(|| format!("reading ensemble manifest in {}", models.display()))?;
    if let Some(n) = min_agreement {
        config.voting.min_agreement = n;
    }
    let registry = ModelRegistry::load(&config).context("loading classifier ensemble")?;
    Ok(EnsembleVoter::new(Arc::new(registry), config.voting))
}
