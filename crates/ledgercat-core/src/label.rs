//! Category labels and per-classifier outcomes shared across the ensemble.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel label returned when the ensemble cannot agree on a category.
pub const NO_CONSENSUS: &str = "CND";

/// Short category code (e.g. `MER`, `AGU`) or the [`NO_CONSENSUS`] sentinel.
///
/// Membership in the category vocabulary is owned by the training pipeline
/// and is not checked here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryLabel(String);

impl CategoryLabel {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// The `CND` sentinel.
    pub fn no_consensus() -> Self {
        Self(NO_CONSENSUS.to_string())
    }

    pub fn is_no_consensus(&self) -> bool {
        self.0 == NO_CONSENSUS
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CategoryLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CategoryLabel {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for CategoryLabel {
    fn from(code: String) -> Self {
        Self(code)
    }
}

impl AsRef<str> for CategoryLabel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// What one classifier contributed to a vote.
///
/// `NoPrediction` means the classifier failed internally; the failure itself
/// is only visible in the logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Label(CategoryLabel),
    NoPrediction,
}

impl Outcome {
    pub fn label(&self) -> Option<&CategoryLabel> {
        match self {
            Self::Label(label) => Some(label),
            Self::NoPrediction => None,
        }
    }

    pub fn is_prediction(&self) -> bool {
        matches!(self, Self::Label(_))
    }
}

impl From<CategoryLabel> for Outcome {
    fn from(label: CategoryLabel) -> Self {
        Self::Label(label)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(label) => label.fmt(f),
            Self::NoPrediction => f.write_str("<none>"),
        }
    }
}

/// Coerce a JSON value into description text.
///
/// Strings pass through untouched. Booleans follow the training data's text
/// form (`True`/`False`). Numbers and composite values use their JSON
/// rendering. `null` becomes the empty string rather than the word `None`,
/// so a missing description is classified as empty text.
pub fn description_text(value: &serde_json::Value) -> Cow<'_, str> {
    match value {
        serde_json::Value::String(s) => Cow::Borrowed(s.as_str()),
        serde_json::Value::Null => Cow::Borrowed(""),
        serde_json::Value::Bool(true) => Cow::Borrowed("True"),
        serde_json::Value::Bool(false) => Cow::Borrowed("False"),
        other => Cow::Owned(other.to_string()),
    }
}

/// Shorten a description for log fields, respecting char boundaries.
pub fn truncate_for_log(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        None => Cow::Borrowed(text),
        Some((idx, _)) => Cow::Owned(format!("{}…", &text[..idx])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sentinel_is_recognised() {
        assert!(CategoryLabel::no_consensus().is_no_consensus());
        assert!(!CategoryLabel::from("MER").is_no_consensus());
        assert_eq!(CategoryLabel::no_consensus().as_str(), "CND");
    }

    #[test]
    fn label_serializes_as_bare_string() {
        let json = serde_json::to_string(&CategoryLabel::from("AGU")).unwrap();
        assert_eq!(json, "\"AGU\"");
    }

    #[test]
    fn outcome_display() {
        assert_eq!(Outcome::from(CategoryLabel::from("MER")).to_string(), "MER");
        assert_eq!(Outcome::NoPrediction.to_string(), "<none>");
        assert!(Outcome::NoPrediction.label().is_none());
    }

    #[test]
    fn description_text_coerces_non_strings() {
        assert_eq!(description_text(&json!("Padaria")), "Padaria");
        assert_eq!(description_text(&json!(12345)), "12345");
        assert_eq!(description_text(&json!(true)), "True");
        assert_eq!(description_text(&json!(false)), "False");
        assert_eq!(description_text(&json!(12.5)), "12.5");
        assert_eq!(description_text(&json!(null)), "");
    }

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate_for_log("Compra", 50), "Compra");
    }

    #[test]
    fn truncate_respects_multibyte_chars() {
        let text = "Transferência recebida";
        let short = truncate_for_log(text, 10);
        assert_eq!(short, "Transferên…");
    }
}
