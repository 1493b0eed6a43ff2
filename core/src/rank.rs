use crate::normalize::Normalizer;
use crate::record::Document;
use crate::vsm::FittedModel;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const TOP_K: usize = 5;
pub const SNIPPET_WORDS: usize = 50;
pub const NO_RESULT_NAME: &str = "No relevant document";
const NO_ABOUT: &str = "No about section available";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub name: String,
    pub profile_link: String,
    pub snippet: String,
    pub similarity: f32,
}

impl RankedResult {
    /// Returned alone when nothing in the corpus shares a term with the query.
    pub fn no_relevant_document() -> Self {
        Self { name: NO_RESULT_NAME.to_string(), profile_link: String::new(), snippet: String::new(), similarity: 0.0 }
    }
}

/// First line of the about-text, cut to `SNIPPET_WORDS` words with a trailing
/// ellipsis when longer.
pub fn snippet(about: &str) -> String {
    if about.is_empty() {
        return NO_ABOUT.to_string();
    }
    let first_line = about.split('\n').next().unwrap_or("");
    let words: Vec<&str> = first_line.split_whitespace().collect();
    if words.len() > SNIPPET_WORDS {
        format!("{}...", words[..SNIPPET_WORDS].join(" "))
    } else {
        first_line.to_string()
    }
}

/// Rank `documents` against `query`, best first, at most `TOP_K` distinct
/// (name, profile link) pairs. Falls back to the single no-relevant-document
/// result when every admitted score is zero.
pub fn search(query: &str, normalizer: &dyn Normalizer, model: &FittedModel, documents: &[Document]) -> Vec<RankedResult> {
    let query_vec = model.transform(&normalizer.normalize(query));
    let scores: Vec<f32> = model.matrix.rows().iter().map(|row| query_vec.cosine(row)).collect();

    // stable: equal scores keep document order
    let mut order: Vec<usize> = (0..scores.len().min(documents.len())).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut results = Vec::with_capacity(TOP_K);
    for idx in order {
        let doc = &documents[idx];
        if !seen.insert((doc.name.as_str(), doc.profile_link.as_str())) {
            continue;
        }
        results.push(RankedResult {
            name: doc.name.clone(),
            profile_link: doc.profile_link.clone(),
            snippet: snippet(&doc.about),
            similarity: scores[idx],
        });
        if results.len() == TOP_K {
            break;
        }
    }

    if results.iter().all(|r| r.similarity == 0.0) {
        tracing::debug!(query, "no document shares a term with the query");
        return vec![RankedResult::no_relevant_document()];
    }
    results
}
