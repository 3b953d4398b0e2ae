//! Multinomial naive Bayes pipeline with an embedded vectorizer.
//!
//! The artifact is a single JSON export holding the vectorizer state next to
//! the model parameters, so the classifier accepts raw text directly.

use std::path::Path;

use ledgercat_core::{CategoryLabel, NaiveBayesArtifacts};
use serde::Deserialize;
use tracing::info;

use crate::classifier::{ClassifierKind, TextClassifier};
use crate::labels::LabelEncoder;
use crate::vectorizer::{TextVectorizer, VectorizerSpec};
use crate::ClassifierError;

#[derive(Deserialize)]
struct PipelineExport {
    vectorizer: VectorizerSpec,
    classes: Vec<String>,
    class_log_prior: Vec<f32>,
    feature_log_prob: Vec<Vec<f32>>,
}

pub struct NaiveBayesClassifier {
    name: String,
    vectorizer: TextVectorizer,
    labels: LabelEncoder,
    class_log_prior: Vec<f32>,
    feature_log_prob: Vec<Vec<f32>>,
}

impl NaiveBayesClassifier {
    pub fn new(
        name: impl Into<String>,
        vectorizer: TextVectorizer,
        labels: LabelEncoder,
        class_log_prior: Vec<f32>,
        feature_log_prob: Vec<Vec<f32>>,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            class_log_prior.len() == labels.len(),
            "class_log_prior has {} entries for {} classes",
            class_log_prior.len(),
            labels.len()
        );
        anyhow::ensure!(
            feature_log_prob.len() == labels.len(),
            "feature_log_prob has {} rows for {} classes",
            feature_log_prob.len(),
            labels.len()
        );
        let width = vectorizer.n_features();
        anyhow::ensure!(
            feature_log_prob.iter().all(|row| row.len() == width),
            "feature_log_prob rows must have {width} columns"
        );

        Ok(Self {
            name: name.into(),
            vectorizer,
            labels,
            class_log_prior,
            feature_log_prob,
        })
    }

    pub fn load(name: &str, artifacts: &NaiveBayesArtifacts) -> anyhow::Result<Self> {
        let path: &Path = &artifacts.pipeline;
        anyhow::ensure!(path.exists(), "pipeline not found: {}", path.display());
        let raw = std::fs::read_to_string(path)?;
        let export: PipelineExport = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("parse naive bayes pipeline {}: {e}", path.display()))?;

        let vectorizer = TextVectorizer::from_spec(export.vectorizer)?;
        let labels = LabelEncoder::new(export.classes.into_iter().map(CategoryLabel::from).collect())?;
        let clf = Self::new(
            name,
            vectorizer,
            labels,
            export.class_log_prior,
            export.feature_log_prob,
        )?;
        info!(
            classifier = name,
            classes = clf.labels.len(),
            features = clf.vectorizer.n_features(),
            pipeline = %path.display(),
            "loaded naive bayes classifier"
        );
        Ok(clf)
    }

    /// Joint log-likelihood per class.
    pub fn joint_log_likelihood(&self, description: &str) -> Vec<f32> {
        let x = self.vectorizer.transform(description);
        self.class_log_prior
            .iter()
            .zip(&self.feature_log_prob)
            .map(|(prior, row)| prior + x.dot(row))
            .collect()
    }
}

impl TextClassifier for NaiveBayesClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ClassifierKind {
        ClassifierKind::NaiveBayes
    }

    fn infer(&self, description: &str) -> Result<CategoryLabel, ClassifierError> {
        let jll = self.joint_log_likelihood(description);
        self.labels.decode_argmax(&jll)
    }
}
