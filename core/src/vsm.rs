//! TF-IDF vector space model over word n-grams.
//!
//! Weights are raw term counts times the smoothed inverse document frequency
//! `ln((1 + N) / (1 + df)) + 1`, and every row is scaled to unit L2 length.
//! Columns are the vocabulary terms in sorted order.

use crate::error::IndexError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub type Column = u32;

pub const DEFAULT_NGRAM_RANGE: (usize, usize) = (1, 3);

lazy_static! {
    // Words of two or more word characters.
    static ref WORD_RE: Regex = Regex::new(r"(?u)\b\w\w+\b").expect("valid regex");
}

/// Sparse vector of `(column, weight)` pairs sorted by column. Zero weights are
/// never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVec {
    entries: Vec<(Column, f32)>,
}

impl SparseVec {
    fn from_counts(mut entries: Vec<(Column, f32)>) -> Self {
        entries.retain(|&(_, w)| w != 0.0);
        entries.sort_by_key(|&(c, _)| c);
        Self { entries }
    }

    pub fn entries(&self) -> &[(Column, f32)] { &self.entries }

    pub fn nnz(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn norm(&self) -> f32 { self.entries.iter().map(|&(_, w)| w * w).sum::<f32>().sqrt() }

    pub fn dot(&self, other: &SparseVec) -> f32 {
        let (mut i, mut j, mut acc) = (0, 0, 0.0f32);
        while i < self.entries.len() && j < other.entries.len() {
            let (ci, wi) = self.entries[i];
            let (cj, wj) = other.entries[j];
            match ci.cmp(&cj) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    acc += wi * wj;
                    i += 1;
                    j += 1;
                }
            }
        }
        acc
    }

    /// True cosine similarity; 0 when either side is the zero vector.
    pub fn cosine(&self, other: &SparseVec) -> f32 {
        let denom = self.norm() * other.norm();
        if denom == 0.0 {
            return 0.0;
        }
        self.dot(other) / denom
    }

    fn normalize_l2(&mut self) {
        let norm = self.norm();
        if norm == 0.0 {
            return;
        }
        for (_, w) in self.entries.iter_mut() {
            *w /= norm;
        }
    }
}

/// Sorted term list and its term -> column lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    terms: Vec<String>,
    columns: HashMap<String, Column>,
}

impl Vocabulary {
    fn from_sorted(terms: Vec<String>) -> Self {
        let columns = terms.iter().enumerate().map(|(i, t)| (t.clone(), i as Column)).collect();
        Self { terms, columns }
    }

    pub fn len(&self) -> usize { self.terms.len() }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }

    pub fn column(&self, term: &str) -> Option<Column> { self.columns.get(term).copied() }

    pub fn term(&self, column: Column) -> Option<&str> { self.terms.get(column as usize).map(String::as_str) }

    pub fn terms(&self) -> &[String] { &self.terms }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentTermMatrix {
    rows: Vec<SparseVec>,
    n_cols: usize,
}

impl DocumentTermMatrix {
    pub fn n_rows(&self) -> usize { self.rows.len() }

    pub fn n_cols(&self) -> usize { self.n_cols }

    pub fn rows(&self) -> &[SparseVec] { &self.rows }
}

/// Vocabulary, IDF and weighted matrix produced by one `fit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    pub vocabulary: Vocabulary,
    pub idf: Vec<f32>,
    pub matrix: DocumentTermMatrix,
    pub ngram_range: (usize, usize),
}

impl FittedModel {
    /// Project `text` into the fitted space. Terms outside the vocabulary are
    /// ignored; the result is unit length or the zero vector.
    pub fn transform(&self, text: &str) -> SparseVec {
        let mut counts: HashMap<Column, u32> = HashMap::new();
        for term in analyze(text, self.ngram_range) {
            if let Some(col) = self.vocabulary.column(&term) {
                *counts.entry(col).or_insert(0) += 1;
            }
        }
        let entries = counts
            .into_iter()
            .map(|(col, tf)| (col, tf as f32 * self.idf[col as usize]))
            .collect();
        let mut v = SparseVec::from_counts(entries);
        v.normalize_l2();
        v
    }
}

/// Lowercase, split into words of two or more characters, and emit every
/// contiguous n-gram in `ngram_range` joined by single spaces.
pub fn analyze(text: &str, ngram_range: (usize, usize)) -> Vec<String> {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = WORD_RE.find_iter(&lowered).map(|m| m.as_str()).collect();
    let (min_n, max_n) = ngram_range;
    let mut out = Vec::new();
    for n in min_n.max(1)..=max_n {
        if n > words.len() {
            break;
        }
        out.extend(words.windows(n).map(|w| w.join(" ")));
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TfidfVectorizer {
    pub ngram_range: (usize, usize),
}

impl Default for TfidfVectorizer {
    fn default() -> Self { Self { ngram_range: DEFAULT_NGRAM_RANGE } }
}

impl TfidfVectorizer {
    pub fn new(ngram_range: (usize, usize)) -> Self { Self { ngram_range } }

    /// Learn vocabulary and IDF from `texts` and weight every document.
    pub fn fit<S: AsRef<str>>(&self, texts: &[S]) -> Result<FittedModel, IndexError> {
        if texts.is_empty() {
            return Err(IndexError::EmptyCorpus);
        }

        let mut doc_counts: Vec<HashMap<String, u32>> = Vec::with_capacity(texts.len());
        let mut df: BTreeMap<String, u32> = BTreeMap::new();
        for text in texts {
            let mut counts: HashMap<String, u32> = HashMap::new();
            for term in analyze(text.as_ref(), self.ngram_range) {
                *counts.entry(term).or_insert(0) += 1;
            }
            for term in counts.keys() {
                *df.entry(term.clone()).or_insert(0) += 1;
            }
            doc_counts.push(counts);
        }
        if df.is_empty() {
            return Err(IndexError::EmptyVocabulary { documents: texts.len() });
        }

        let n = texts.len() as f32;
        let idf: Vec<f32> = df.values().map(|&d| ((1.0 + n) / (1.0 + d as f32)).ln() + 1.0).collect();
        let vocabulary = Vocabulary::from_sorted(df.into_keys().collect());

        let rows = doc_counts
            .into_iter()
            .map(|counts| {
                let entries = counts
                    .into_iter()
                    .filter_map(|(term, tf)| vocabulary.column(&term).map(|c| (c, tf as f32 * idf[c as usize])))
                    .collect();
                let mut row = SparseVec::from_counts(entries);
                row.normalize_l2();
                row
            })
            .collect();

        let n_cols = vocabulary.len();
        tracing::info!(num_docs = texts.len(), num_terms = n_cols, "fitted tf-idf model");
        Ok(FittedModel {
            vocabulary,
            idf,
            matrix: DocumentTermMatrix { rows, n_cols },
            ngram_range: self.ngram_range,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_emits_unigrams_through_trigrams() {
        let terms = analyze("supply chain risk", (1, 3));
        assert_eq!(
            terms,
            vec!["supply", "chain", "risk", "supply chain", "chain risk", "supply chain risk"]
        );
    }

    #[test]
    fn analyze_drops_single_character_words() {
        assert_eq!(analyze("a b finance", (1, 1)), vec!["finance"]);
    }

    #[test]
    fn smoothed_idf_matches_formula() {
        let model = TfidfVectorizer::new((1, 1)).fit(&["alpha beta", "alpha"]).unwrap();
        let alpha = model.vocabulary.column("alpha").unwrap() as usize;
        let beta = model.vocabulary.column("beta").unwrap() as usize;
        assert!((model.idf[alpha] - 1.0).abs() < 1e-6);
        assert!((model.idf[beta] - ((3.0f32 / 2.0).ln() + 1.0)).abs() < 1e-6);
    }

    #[test]
    fn rows_are_unit_length_and_shaped() {
        let model = TfidfVectorizer::default().fit(&["marketing strategy", "consumer behavior marketing"]).unwrap();
        assert_eq!(model.matrix.n_rows(), 2);
        assert_eq!(model.matrix.n_cols(), model.vocabulary.len());
        for row in model.matrix.rows() {
            assert!((row.norm() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn vocabulary_columns_are_sorted() {
        let model = TfidfVectorizer::new((1, 1)).fit(&["zeta alpha mu"]).unwrap();
        assert_eq!(model.vocabulary.terms(), &["alpha", "mu", "zeta"]);
        assert_eq!(model.vocabulary.term(2), Some("zeta"));
    }

    #[test]
    fn transform_ignores_unknown_terms() {
        let model = TfidfVectorizer::default().fit(&["quantum cryptography"]).unwrap();
        let v = model.transform("cryptography zebra");
        assert_eq!(v.nnz(), 1);
        assert!((v.norm() - 1.0).abs() < 1e-6);
        assert!(model.transform("zebra").is_empty());
        assert!(model.transform("").is_empty());
    }

    #[test]
    fn fit_rejects_empty_inputs() {
        let none: [&str; 0] = [];
        assert_eq!(TfidfVectorizer::default().fit(&none), Err(IndexError::EmptyCorpus));
        assert_eq!(
            TfidfVectorizer::default().fit(&["", "a"]),
            Err(IndexError::EmptyVocabulary { documents: 2 })
        );
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        let model = TfidfVectorizer::default().fit(&["finance"]).unwrap();
        let zero = SparseVec::default();
        assert_eq!(zero.cosine(&model.matrix.rows()[0]), 0.0);
    }
}
