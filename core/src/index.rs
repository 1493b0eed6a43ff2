use crate::normalize::Normalizer;
use crate::record::Document;
use crate::vsm::FittedModel;
use serde::{Deserialize, Serialize};

/// One non-zero cell of the document-term matrix, keyed for lookup by term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermIndexRecord {
    pub term: String,
    pub tfidf: f32,
    pub professor_name: String,
    pub professor_id: String,
    pub profile_link: String,
}

/// Emit a record for every stored weight of every row. Vocabulary terms are
/// re-normalized because the analyzer splits on its own word boundaries.
pub fn materialize(model: &FittedModel, documents: &[Document], normalizer: &dyn Normalizer) -> Vec<TermIndexRecord> {
    let mut out = Vec::new();
    for (row, doc) in model.matrix.rows().iter().zip(documents) {
        for &(col, weight) in row.entries() {
            let Some(term) = model.vocabulary.term(col) else { continue };
            out.push(TermIndexRecord {
                term: normalizer.normalize(term),
                tfidf: weight,
                professor_name: doc.name.clone(),
                professor_id: doc.id.clone(),
                profile_link: doc.profile_link.clone(),
            });
        }
    }
    tracing::info!(records = out.len(), "materialized term index");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::EnglishNormalizer;
    use crate::vsm::TfidfVectorizer;

    fn doc(id: &str, text: &str) -> Document {
        Document {
            id: id.into(),
            name: format!("Prof {id}"),
            profile_link: format!("https://example.edu/{id}"),
            about: String::new(),
            text: text.into(),
        }
    }

    #[test]
    fn one_record_per_nonzero_cell() {
        let docs = vec![doc("a", "finance risk"), doc("b", "marketing")];
        let model = TfidfVectorizer::default().fit(&["finance risk", "marketing"]).unwrap();
        let records = materialize(&model, &docs, &EnglishNormalizer::default());
        // finance, risk, "finance risk" for a; marketing for b
        assert_eq!(records.len(), 4);
        assert!(records[..3].iter().all(|r| r.professor_id == "a"));
        assert_eq!(records[3].term, "marketing");
        assert_eq!(records[3].profile_link, "https://example.edu/b");
        assert!(records.iter().all(|r| r.tfidf > 0.0));
    }

    #[test]
    fn rows_without_terms_emit_nothing() {
        let docs = vec![doc("a", "x y"), doc("b", "finance")];
        let model = TfidfVectorizer::default().fit(&["x y", "finance"]).unwrap();
        assert!(model.matrix.rows()[0].is_empty());
        let records = materialize(&model, &docs, &EnglishNormalizer::default());
        assert_eq!(records.len(), 1);
        assert!(records.iter().all(|r| r.professor_id == "b"));
        assert!(!records.iter().any(|r| r.professor_id == "a"));
    }

    #[test]
    fn terms_are_renormalized() {
        let docs = vec![doc("a", "the classes")];
        let model = TfidfVectorizer::new((1, 1)).fit(&["the classes"]).unwrap();
        let terms: Vec<_> = materialize(&model, &docs, &EnglishNormalizer::default())
            .into_iter()
            .map(|r| r.term)
            .collect();
        assert_eq!(terms, vec!["class", ""]);
    }
}
