//! Frozen label encoder: maps class indices back to category codes.
//!
//! The training pipeline exports the encoder's ordered class list as JSON,
//! either `{"classes": [...]}` or a bare array.

use std::path::Path;

use ledgercat_core::CategoryLabel;
use serde::Deserialize;

use crate::ClassifierError;

#[derive(Deserialize)]
#[serde(untagged)]
enum EncoderExport {
    Object { classes: Vec<String> },
    Bare(Vec<String>),
}

/// Ordered class list; index `i` decodes to `classes[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoder {
    classes: Vec<CategoryLabel>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<CategoryLabel>) -> anyhow::Result<Self> {
        anyhow::ensure!(!classes.is_empty(), "label encoder has no classes");
        Ok(Self { classes })
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        anyhow::ensure!(path.exists(), "label encoder not found: {}", path.display());
        let raw = std::fs::read_to_string(path)?;
        let export: EncoderExport = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("parse label encoder {}: {e}", path.display()))?;
        let classes = match export {
            EncoderExport::Object { classes } | EncoderExport::Bare(classes) => classes,
        };
        Self::new(classes.into_iter().map(CategoryLabel::from).collect())
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn classes(&self) -> &[CategoryLabel] {
        &self.classes
    }

    /// Inverse transform of a single class index.
    pub fn decode(&self, index: usize) -> Result<CategoryLabel, ClassifierError> {
        self.classes
            .get(index)
            .cloned()
            .ok_or(ClassifierError::ClassIndex {
                index,
                classes: self.classes.len(),
            })
    }

    /// Decode the highest-scoring class of a score vector.
    pub fn decode_argmax(&self, scores: &[f32]) -> Result<CategoryLabel, ClassifierError> {
        let index = argmax(scores).ok_or(ClassifierError::EmptyScores)?;
        self.decode(index)
    }
}

/// Index of the largest score; the first one wins ties. NaN scores never win.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &s) in scores.iter().enumerate() {
        if s.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if s <= b => {}
            _ => best = Some((i, s)),
        }
    }
    best.map(|(i, _)| i)
}
