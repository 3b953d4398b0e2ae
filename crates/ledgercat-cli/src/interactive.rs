//! Line-at-a-time session: one description per line, explain block per answer.

use std::io::{BufRead, Write};

use ledgercat_ai::EnsembleVoter;

use crate::display;

/// Typed alone on a line, ends the session.
pub const QUIT_WORDS: [&str; 2] = ["sair", "exit"];

const PROMPT: &str = "description> ";

/// Classify lines from `input` until a quit word or end of input.
///
/// Blank lines are skipped. Returns how many descriptions were classified.
pub fn run_interactive<R: BufRead, W: Write>(
    voter: &EnsembleVoter,
    input: R,
    mut output: W,
) -> anyhow::Result<usize> {
    let mut classified = 0usize;
    write!(output, "{PROMPT}")?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        let description = line.trim();
        if QUIT_WORDS.iter().any(|q| description.eq_ignore_ascii_case(q)) {
            break;
        }
        if !description.is_empty() {
            let decision = voter.decide(description);
            writeln!(
                output,
                "{}",
                display::format_decision(description, &decision, voter.min_agreement())
            )?;
            classified += 1;
        }
        write!(output, "{PROMPT}")?;
        output.flush()?;
    }

    writeln!(output)?;
    Ok(classified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::first_word_voter;

    fn session(input: &str) -> (usize, String) {
        let mut out = Vec::new();
        let n = run_interactive(&first_word_voter(), input.as_bytes(), &mut out).unwrap();
        (n, String::from_utf8(out).unwrap())
    }

    #[test]
    fn classifies_each_line_until_quit() {
        let (n, out) = session("Restaurante japonês\nConsulta médica\nSAIR\nPosto Shell\n");
        assert_eq!(n, 2);
        assert!(out.contains("  decision         RESTAURANTE (4/4, consensus)"));
        assert!(out.contains("  decision         CONSULTA (4/4, consensus)"));
        assert!(!out.contains("POSTO"));
    }

    #[test]
    fn blank_lines_are_skipped_and_eof_ends_session() {
        let (n, out) = session("\n   \nNetflix\n");
        assert_eq!(n, 1);
        assert!(out.contains("  neural-sequence  NETFLIX"));
        assert_eq!(out.matches(PROMPT).count(), 4);
    }
}
