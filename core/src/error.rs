use thiserror::Error;

/// Corpus-level failures. Normalizing, transforming and ranking never fail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("empty corpus: no documents left to fit after filtering")]
    EmptyCorpus,
    #[error("empty vocabulary: {documents} documents produced no indexable terms")]
    EmptyVocabulary { documents: usize },
}
