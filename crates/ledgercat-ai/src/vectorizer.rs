//! Frozen bag-of-words / TF-IDF vectorizer.
//!
//! Reproduces the transform step of scikit-learn's `CountVectorizer` and
//! `TfidfVectorizer` from exported state: vocabulary, idf weights and the
//! handful of flags that change the output. Fitting is done offline.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Deserializer};

/// sklearn's default `token_pattern`.
pub const DEFAULT_TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

/// Exported vectorizer state as written by the training pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct VectorizerSpec {
    pub vocabulary: HashMap<String, usize>,
    /// Present for TF-IDF vectorizers, absent for plain count vectorizers.
    #[serde(default)]
    pub idf: Option<Vec<f32>>,
    #[serde(default = "default_true")]
    pub lowercase: bool,
    #[serde(default = "default_token_pattern")]
    pub token_pattern: String,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default)]
    pub binary: bool,
    #[serde(default)]
    pub sublinear_tf: bool,
    /// `None` when the export leaves the key out: TF-IDF exports then get
    /// `l2`, count exports no norm. An explicit `null` disables it.
    #[serde(default, deserialize_with = "explicit_norm")]
    pub norm: Option<Option<Norm>>,
}

fn explicit_norm<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Option<Norm>>, D::Error> {
    Option::<Norm>::deserialize(d).map(Some)
}

fn default_true() -> bool {
    true
}

fn default_token_pattern() -> String {
    DEFAULT_TOKEN_PATTERN.to_string()
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

/// Sparse feature vector: `(feature index, value)` pairs sorted by index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    pub entries: Vec<(usize, f32)>,
}

impl SparseVector {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dot product with a dense weight row.
    pub fn dot(&self, dense: &[f32]) -> f32 {
        self.entries
            .iter()
            .filter_map(|&(idx, val)| dense.get(idx).map(|w| w * val))
            .sum()
    }

    pub fn to_dense(&self, n_features: usize) -> Vec<f32> {
        let mut dense = vec![0.0f32; n_features];
        for &(idx, val) in &self.entries {
            if let Some(slot) = dense.get_mut(idx) {
                *slot = val;
            }
        }
        dense
    }
}

/// Compiled, immutable vectorizer.
#[derive(Debug, Clone)]
pub struct TextVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Option<Vec<f32>>,
    token_re: Regex,
    lowercase: bool,
    ngram_range: (usize, usize),
    binary: bool,
    sublinear_tf: bool,
    norm: Option<Norm>,
    n_features: usize,
}

impl TextVectorizer {
    /// Load a vectorizer from its JSON export.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        anyhow::ensure!(path.exists(), "vectorizer not found: {}", path.display());
        let raw = std::fs::read_to_string(path)?;
        let spec: VectorizerSpec = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("parse vectorizer {}: {e}", path.display()))?;
        Self::from_spec(spec)
    }

    /// Compile an exported spec, checking that its parts agree.
    pub fn from_spec(spec: VectorizerSpec) -> anyhow::Result<Self> {
        anyhow::ensure!(!spec.vocabulary.is_empty(), "vocabulary is empty");
        let (min_n, max_n) = spec.ngram_range;
        anyhow::ensure!(
            min_n >= 1 && min_n <= max_n,
            "invalid ngram_range ({min_n}, {max_n})"
        );

        let max_index = spec.vocabulary.values().copied().max().unwrap_or(0);
        let n_features = match &spec.idf {
            Some(idf) => {
                anyhow::ensure!(
                    idf.len() > max_index,
                    "idf has {} weights but vocabulary uses index {max_index}",
                    idf.len()
                );
                idf.len()
            }
            None => max_index + 1,
        };

        let norm = match spec.norm {
            Some(explicit) => explicit,
            None if spec.idf.is_some() => Some(Norm::L2),
            None => None,
        };

        let token_re = Regex::new(&spec.token_pattern)
            .map_err(|e| anyhow::anyhow!("token_pattern {:?}: {e}", spec.token_pattern))?;

        Ok(Self {
            vocabulary: spec.vocabulary,
            idf: spec.idf,
            token_re,
            lowercase: spec.lowercase,
            ngram_range: spec.ngram_range,
            binary: spec.binary,
            sublinear_tf: spec.sublinear_tf,
            norm,
            n_features,
        })
    }

    /// Width of the dense feature space.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Turn one description into a feature vector.
    ///
    /// Terms outside the vocabulary are dropped; an empty or all-unknown
    /// description yields an empty vector.
    pub fn transform(&self, text: &str) -> SparseVector {
        let prepared = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        let tokens: Vec<&str> = self
            .token_re
            .find_iter(&prepared)
            .map(|m| m.as_str())
            .collect();

        let mut counts: BTreeMap<usize, f32> = BTreeMap::new();
        let (min_n, max_n) = self.ngram_range;
        for n in min_n..=max_n {
            if n > tokens.len() {
                break;
            }
            for window in tokens.windows(n) {
                let term = window.join(" ");
                if let Some(&idx) = self.vocabulary.get(&term) {
                    *counts.entry(idx).or_insert(0.0) += 1.0;
                }
            }
        }

        let mut entries: Vec<(usize, f32)> = counts
            .into_iter()
            .map(|(idx, tf)| {
                let mut v = if self.binary { 1.0 } else { tf };
                if self.sublinear_tf {
                    v = 1.0 + v.ln();
                }
                if let Some(idf) = &self.idf {
                    v *= idf[idx];
                }
                (idx, v)
            })
            .collect();

        if let Some(norm) = self.norm {
            normalize(&mut entries, norm);
        }

        SparseVector { entries }
    }
}

fn normalize(entries: &mut [(usize, f32)], norm: Norm) {
    let total: f32 = match norm {
        Norm::L1 => entries.iter().map(|(_, v)| v.abs()).sum(),
        Norm::L2 => entries.iter().map(|(_, v)| v * v).sum::<f32>().sqrt(),
    };
    if total > 0.0 {
        for (_, v) in entries.iter_mut() {
            *v /= total;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(terms: &[&str]) -> VectorizerSpec {
        VectorizerSpec {
            vocabulary: terms
                .iter()
                .enumerate()
                .map(|(i, t)| (t.to_string(), i))
                .collect(),
            idf: None,
            lowercase: true,
            token_pattern: DEFAULT_TOKEN_PATTERN.to_string(),
            ngram_range: (1, 1),
            binary: false,
            sublinear_tf: false,
            norm: None,
        }
    }

    #[test]
    fn counts_known_terms_and_drops_unknown() {
        let v = TextVectorizer::from_spec(spec(&["compra", "supermercado"])).unwrap();
        let x = v.transform("Compra no SUPERMERCADO, compra rápida");
        assert_eq!(x.entries, vec![(0, 2.0), (1, 1.0)]);
    }

    #[test]
    fn single_char_tokens_are_ignored_by_default_pattern() {
        let v = TextVectorizer::from_spec(spec(&["a", "luz"])).unwrap();
        let x = v.transform("a luz");
        assert_eq!(x.entries, vec![(1, 1.0)]);
    }

    #[test]
    fn empty_description_gives_empty_vector() {
        let v = TextVectorizer::from_spec(spec(&["compra"])).unwrap();
        assert!(v.transform("").is_empty());
        assert!(v.transform("   ").is_empty());
    }

    #[test]
    fn bigrams_joined_with_space() {
        let mut s = spec(&["conta", "conta de", "de luz"]);
        s.ngram_range = (1, 2);
        let v = TextVectorizer::from_spec(s).unwrap();
        let x = v.transform("Conta de luz");
        assert_eq!(x.entries, vec![(0, 1.0), (1, 1.0), (2, 1.0)]);
    }

    #[test]
    fn tfidf_with_l2_norm() {
        let mut s = spec(&["posto", "shell"]);
        s.idf = Some(vec![1.0, 2.0]);
        s.norm = Some(Some(Norm::L2));
        let v = TextVectorizer::from_spec(s).unwrap();
        let x = v.transform("posto shell");

        // Raw [1, 2] normalized to unit length.
        let norm = 5.0f32.sqrt();
        assert!((x.entries[0].1 - 1.0 / norm).abs() < 1e-6);
        assert!((x.entries[1].1 - 2.0 / norm).abs() < 1e-6);
    }

    #[test]
    fn tfidf_export_without_norm_defaults_to_l2() {
        let implicit: VectorizerSpec =
            serde_json::from_str(r#"{"vocabulary": {"posto": 0, "shell": 1}, "idf": [3.0, 4.0]}"#)
                .unwrap();
        let x = TextVectorizer::from_spec(implicit).unwrap().transform("posto shell");
        assert!((x.entries[0].1 - 0.6).abs() < 1e-6);
        assert!((x.entries[1].1 - 0.8).abs() < 1e-6);

        let disabled: VectorizerSpec = serde_json::from_str(
            r#"{"vocabulary": {"posto": 0, "shell": 1}, "idf": [3.0, 4.0], "norm": null}"#,
        )
        .unwrap();
        let x = TextVectorizer::from_spec(disabled).unwrap().transform("posto shell");
        assert_eq!(x.entries, vec![(0, 3.0), (1, 4.0)]);
    }

    #[test]
    fn count_export_without_norm_stays_raw() {
        let counts: VectorizerSpec =
            serde_json::from_str(r#"{"vocabulary": {"pix": 0}}"#).unwrap();
        let x = TextVectorizer::from_spec(counts).unwrap().transform("pix pix");
        assert_eq!(x.entries, vec![(0, 2.0)]);
    }

    #[test]
    fn sublinear_and_binary_tf() {
        let mut s = spec(&["pix"]);
        s.sublinear_tf = true;
        let v = TextVectorizer::from_spec(s).unwrap();
        let x = v.transform("pix pix pix");
        assert!((x.entries[0].1 - (1.0 + 3.0f32.ln())).abs() < 1e-6);

        let mut s = spec(&["pix"]);
        s.binary = true;
        let v = TextVectorizer::from_spec(s).unwrap();
        assert_eq!(v.transform("pix pix pix").entries, vec![(0, 1.0)]);
    }

    #[test]
    fn rejects_short_idf() {
        let mut s = spec(&["a1", "b2", "c3"]);
        s.idf = Some(vec![1.0, 1.0]);
        assert!(TextVectorizer::from_spec(s).is_err());
    }

    #[test]
    fn rejects_bad_ngram_range() {
        let mut s = spec(&["x1"]);
        s.ngram_range = (2, 1);
        assert!(TextVectorizer::from_spec(s).is_err());
    }

    #[test]
    fn dense_and_dot() {
        let x = SparseVector {
            entries: vec![(0, 1.0), (2, 3.0)],
        };
        assert_eq!(x.to_dense(4), vec![1.0, 0.0, 3.0, 0.0]);
        assert!((x.dot(&[2.0, 9.0, 1.0]) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn load_from_json_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectorizer.json");
        std::fs::write(
            &path,
            r#"{"vocabulary": {"netflix": 0, "assinatura": 1}, "idf": [1.5, 1.2], "norm": "l2"}"#,
        )
        .unwrap();

        let v = TextVectorizer::load(&path).unwrap();
        assert_eq!(v.n_features(), 2);
        assert_eq!(v.transform("Assinatura Netflix").entries.len(), 2);

        assert!(TextVectorizer::load(&dir.path().join("missing.json")).is_err());
    }
}
