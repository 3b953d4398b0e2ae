//! Neural sequence classifier: tokenizer → fixed-length id sequence →
//! ONNX network → label encoder.
//!
//! Sequences follow Keras `pad_sequences` defaults: too-long inputs keep
//! their last `max_len` tokens and short inputs are left-padded with 0.

use ledgercat_core::{CategoryLabel, NeuralArtifacts};
use tokenizers::Tokenizer;
use tracing::info;

use crate::classifier::{ClassifierKind, TextClassifier};
use crate::labels::LabelEncoder;
use crate::onnx::OnnxSession;
use crate::ClassifierError;

pub struct SequenceClassifier {
    name: String,
    tokenizer: Tokenizer,
    network: OnnxSession,
    labels: LabelEncoder,
    max_len: usize,
}

impl SequenceClassifier {
    /// Load the tokenizer + network + label encoder triple.
    pub fn load(name: &str, artifacts: &NeuralArtifacts) -> anyhow::Result<Self> {
        anyhow::ensure!(
            artifacts.tokenizer.exists(),
            "tokenizer not found: {}",
            artifacts.tokenizer.display()
        );
        let labels = LabelEncoder::load(&artifacts.label_encoder)?;

        let mut tokenizer = Tokenizer::from_file(&artifacts.tokenizer)
            .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: artifacts.max_len,
                direction: tokenizers::TruncationDirection::Left,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("set truncation: {e}"))?;
        tokenizer.with_padding(None);

        let network = OnnxSession::load(&artifacts.network, &artifacts.input, &artifacts.output)?;

        info!(
            classifier = name,
            max_len = artifacts.max_len,
            classes = labels.len(),
            network = %artifacts.network.display(),
            "loaded neural sequence classifier"
        );
        Ok(Self {
            name: name.to_string(),
            tokenizer,
            network,
            labels,
            max_len: artifacts.max_len,
        })
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    fn encode(&self, description: &str) -> Result<Vec<f32>, ClassifierError> {
        let encoding = self
            .tokenizer
            .encode(description, false)
            .map_err(|e| ClassifierError::Tokenize(e.to_string()))?;
        Ok(pad_sequence(encoding.get_ids(), self.max_len))
    }
}

impl TextClassifier for SequenceClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ClassifierKind {
        ClassifierKind::NeuralSequence
    }

    fn infer(&self, description: &str) -> Result<CategoryLabel, ClassifierError> {
        let sequence = self.encode(description)?;
        let probabilities = self.network.run_row(sequence)?;
        self.labels.decode_argmax(&probabilities)
    }
}

/// Pre-truncate and pre-pad token ids to exactly `max_len` network inputs.
pub fn pad_sequence(ids: &[u32], max_len: usize) -> Vec<f32> {
    let kept = &ids[ids.len().saturating_sub(max_len)..];
    let mut padded = vec![0.0f32; max_len - kept.len()];
    padded.extend(kept.iter().map(|&id| id as f32));
    padded
}
