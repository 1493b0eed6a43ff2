use crate::corpus::build_corpus;
use crate::error::IndexError;
use crate::index::{materialize, TermIndexRecord};
use crate::normalize::{EnglishNormalizer, Normalizer};
use crate::rank::{search, RankedResult};
use crate::record::{Document, FacultyRecord};
use crate::vsm::{FittedModel, TfidfVectorizer};

/// Everything one indexing run produces.
#[derive(Debug, Clone)]
pub struct IndexBuild {
    pub documents: Vec<Document>,
    pub skipped: usize,
    pub model: FittedModel,
    pub term_records: Vec<TermIndexRecord>,
}

/// Corpus -> fit -> materialize over the whole record set.
pub fn build_index(
    records: &[FacultyRecord],
    normalizer: &dyn Normalizer,
    vectorizer: &TfidfVectorizer,
) -> Result<IndexBuild, IndexError> {
    let corpus = build_corpus(records, normalizer);
    if corpus.is_empty() {
        tracing::warn!(records = records.len(), skipped = corpus.skipped, "no documents to index");
        return Err(IndexError::EmptyCorpus);
    }
    let model = vectorizer.fit(&corpus.texts())?;
    let term_records = materialize(&model, &corpus.documents, normalizer);
    Ok(IndexBuild { documents: corpus.documents, skipped: corpus.skipped, model, term_records })
}

/// A fitted model together with the documents it was fitted on and the
/// normalizer queries must go through. Read-only once built.
#[derive(Debug)]
pub struct SearchContext {
    pub normalizer: EnglishNormalizer,
    pub model: FittedModel,
    pub documents: Vec<Document>,
}

impl SearchContext {
    pub fn new(normalizer: EnglishNormalizer, model: FittedModel, documents: Vec<Document>) -> Self {
        Self { normalizer, model, documents }
    }

    pub fn from_build(normalizer: EnglishNormalizer, build: IndexBuild) -> Self {
        Self::new(normalizer, build.model, build.documents)
    }

    pub fn search(&self, query: &str) -> Vec<RankedResult> {
        search(query, &self.normalizer, &self.model, &self.documents)
    }

    pub fn num_docs(&self) -> usize { self.documents.len() }

    pub fn num_terms(&self) -> usize { self.model.vocabulary.len() }
}
