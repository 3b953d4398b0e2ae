//! ONNX Runtime plumbing shared by the tree-ensemble and neural classifiers.
//!
//! `Session::run` needs exclusive access, so each loaded graph sits behind
//! its own mutex. Concurrent votes only contend on the same classifier, never
//! across the ensemble. A panicked run poisons only that call: the session
//! holds no state between runs, so the next caller takes the lock back.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use ledgercat_core::CategoryLabel;
use ort::session::Session;
use ort::value::Tensor;
use tracing::{info, warn};

use crate::labels::LabelEncoder;
use crate::linear::FeatureModel;
use crate::vectorizer::SparseVector;
use crate::ClassifierError;

fn onnx_err(e: impl std::fmt::Display) -> ClassifierError {
    ClassifierError::Onnx(e.to_string())
}

/// A loaded ONNX graph with one float input and one float score output.
pub struct OnnxSession {
    session: Mutex<Session>,
    input: String,
    output: String,
    path: PathBuf,
}

impl OnnxSession {
    pub fn load(path: &Path, input: &str, output: &str) -> anyhow::Result<Self> {
        anyhow::ensure!(path.exists(), "onnx model not found: {}", path.display());

        let session = Session::builder()
            .map_err(|e| anyhow::anyhow!("session builder: {e}"))?
            .commit_from_file(path)
            .map_err(|e| anyhow::anyhow!("load {}: {e}", path.display()))?;

        anyhow::ensure!(
            session.inputs().iter().any(|i| i.name() == input),
            "{} has no input named {input:?}",
            path.display()
        );
        anyhow::ensure!(
            session.outputs().iter().any(|o| o.name() == output),
            "{} has no output named {output:?}",
            path.display()
        );

        Ok(Self {
            session: Mutex::new(session),
            input: input.to_string(),
            output: output.to_string(),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a single-row batch `[1, width]` and return the flattened scores.
    pub fn run_row(&self, row: Vec<f32>) -> Result<Vec<f32>, ClassifierError> {
        let shape = [1i64, row.len() as i64];
        let tensor = Tensor::from_array((shape, row.into_boxed_slice())).map_err(onnx_err)?;

        let mut session = lock_recovering(&self.session, &self.path);
        let outputs = session
            .run(ort::inputs![self.input.as_str() => tensor])
            .map_err(onnx_err)?;

        let (_shape, scores) = outputs[self.output.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(onnx_err)?;
        Ok(scores.to_vec())
    }
}

/// Lock `mutex`, clearing poison left by an earlier panicked run.
fn lock_recovering<'a, T>(mutex: &'a Mutex<T>, path: &Path) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        warn!(model = %path.display(), "recovering onnx session after a panicked run");
        mutex.clear_poison();
        poisoned.into_inner()
    })
}

/// Tree ensemble (or any sklearn estimator) exported to ONNX with a
/// probability output, e.g. via `skl2onnx` with `zipmap=False`.
pub struct OnnxFeatureModel {
    session: OnnxSession,
    labels: LabelEncoder,
    n_features: usize,
}

impl OnnxFeatureModel {
    pub fn load(
        path: &Path,
        input: &str,
        output: &str,
        labels: LabelEncoder,
        n_features: usize,
    ) -> anyhow::Result<Self> {
        let session = OnnxSession::load(path, input, output)?;
        info!(
            model = %path.display(),
            classes = labels.len(),
            n_features,
            "loaded onnx feature model"
        );
        Ok(Self {
            session,
            labels,
            n_features,
        })
    }
}

impl FeatureModel for OnnxFeatureModel {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: &SparseVector) -> Result<CategoryLabel, ClassifierError> {
        let probabilities = self.session.run_row(features.to_dense(self.n_features))?;
        if probabilities.len() != self.labels.len() {
            return Err(ClassifierError::Other(format!(
                "{} returned {} probabilities for {} classes",
                self.session.path().display(),
                probabilities.len(),
                self.labels.len()
            )));
        }
        self.labels.decode_argmax(&probabilities)
    }
}
