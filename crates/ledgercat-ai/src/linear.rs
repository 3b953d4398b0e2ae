//! Vectorizer + model text classifiers (two ensemble slots).

use std::path::Path;

use ledgercat_core::{CategoryLabel, LinearArtifacts, ModelBackend};
use serde::Deserialize;
use tracing::info;

use crate::classifier::{ClassifierKind, TextClassifier};
use crate::labels::LabelEncoder;
use crate::vectorizer::{SparseVector, TextVectorizer};
use crate::ClassifierError;

/// A frozen model that maps a feature vector to a category.
pub trait FeatureModel: Send + Sync {
    /// Width of the feature space the model was trained on.
    fn n_features(&self) -> usize;

    fn predict(&self, features: &SparseVector) -> Result<CategoryLabel, ClassifierError>;
}

#[derive(Deserialize)]
struct LinearExport {
    classes: Vec<String>,
    coef: Vec<Vec<f32>>,
    intercept: Vec<f32>,
}

/// Linear decision function (e.g. logistic regression) evaluated in-process.
///
/// Follows sklearn's layout: `coef` is `[n_classes, n_features]`, except for
/// binary problems where a single row scores the second class.
#[derive(Debug, Clone)]
pub struct LinearModel {
    labels: LabelEncoder,
    coef: Vec<Vec<f32>>,
    intercept: Vec<f32>,
    n_features: usize,
}

impl LinearModel {
    pub fn new(
        classes: Vec<CategoryLabel>,
        coef: Vec<Vec<f32>>,
        intercept: Vec<f32>,
    ) -> anyhow::Result<Self> {
        let labels = LabelEncoder::new(classes)?;
        let binary = labels.len() == 2 && coef.len() == 1;
        anyhow::ensure!(
            binary || coef.len() == labels.len(),
            "coef has {} rows for {} classes",
            coef.len(),
            labels.len()
        );
        anyhow::ensure!(
            intercept.len() == coef.len(),
            "intercept has {} values for {} coef rows",
            intercept.len(),
            coef.len()
        );
        let n_features = coef.first().map(Vec::len).unwrap_or(0);
        anyhow::ensure!(n_features > 0, "coef rows are empty");
        anyhow::ensure!(
            coef.iter().all(|row| row.len() == n_features),
            "coef rows have differing widths"
        );

        Ok(Self {
            labels,
            coef,
            intercept,
            n_features,
        })
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        anyhow::ensure!(path.exists(), "model not found: {}", path.display());
        let raw = std::fs::read_to_string(path)?;
        let export: LinearExport = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("parse linear model {}: {e}", path.display()))?;
        Self::new(
            export.classes.into_iter().map(CategoryLabel::from).collect(),
            export.coef,
            export.intercept,
        )
    }

    /// Per-row decision scores.
    pub fn decision_function(&self, features: &SparseVector) -> Vec<f32> {
        self.coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, b)| features.dot(row) + b)
            .collect()
    }
}

impl FeatureModel for LinearModel {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: &SparseVector) -> Result<CategoryLabel, ClassifierError> {
        if let Some(&(idx, _)) = features.entries.last()
            && idx >= self.n_features
        {
            return Err(ClassifierError::FeatureMismatch {
                expected: self.n_features,
                got: idx + 1,
            });
        }

        let scores = self.decision_function(features);
        if scores.len() == 1 {
            let index = usize::from(scores[0] > 0.0);
            return self.labels.decode(index);
        }
        self.labels.decode_argmax(&scores)
    }
}

/// Text classifier made of a TF-IDF vectorizer and a [`FeatureModel`].
pub struct LinearTextClassifier {
    name: String,
    vectorizer: TextVectorizer,
    model: Box<dyn FeatureModel>,
}

impl LinearTextClassifier {
    pub fn new(
        name: impl Into<String>,
        vectorizer: TextVectorizer,
        model: Box<dyn FeatureModel>,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            vectorizer.n_features() == model.n_features(),
            "vectorizer produces {} features, model expects {}",
            vectorizer.n_features(),
            model.n_features()
        );
        Ok(Self {
            name: name.into(),
            vectorizer,
            model,
        })
    }

    /// Load the vectorizer + model pair named in the manifest.
    pub fn load(name: &str, artifacts: &LinearArtifacts) -> anyhow::Result<Self> {
        let vectorizer = TextVectorizer::load(&artifacts.vectorizer)?;
        let model: Box<dyn FeatureModel> = match artifacts.backend {
            ModelBackend::Linear => Box::new(LinearModel::load(&artifacts.model)?),
            ModelBackend::Onnx => load_onnx_model(artifacts, vectorizer.n_features())?,
        };
        let clf = Self::new(name, vectorizer, model)?;
        info!(
            classifier = name,
            backend = ?artifacts.backend,
            features = clf.vectorizer.n_features(),
            model = %artifacts.model.display(),
            "loaded linear classifier"
        );
        Ok(clf)
    }
}

#[cfg(feature = "onnx")]
fn load_onnx_model(
    artifacts: &LinearArtifacts,
    n_features: usize,
) -> anyhow::Result<Box<dyn FeatureModel>> {
    let labels_path = artifacts
        .labels
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("onnx backend needs a `labels` class list"))?;
    let labels = LabelEncoder::load(labels_path)?;
    let model = crate::onnx::OnnxFeatureModel::load(
        &artifacts.model,
        &artifacts.input,
        &artifacts.output,
        labels,
        n_features,
    )?;
    Ok(Box::new(model))
}

#[cfg(not(feature = "onnx"))]
fn load_onnx_model(
    artifacts: &LinearArtifacts,
    _n_features: usize,
) -> anyhow::Result<Box<dyn FeatureModel>> {
    anyhow::bail!(
        "{} needs the onnx backend; rebuild with `--features onnx`",
        artifacts.model.display()
    )
}

impl TextClassifier for LinearTextClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Linear
    }

    fn infer(&self, description: &str) -> Result<CategoryLabel, ClassifierError> {
        let features = self.vectorizer.transform(description);
        self.model.predict(&features)
    }
}
