use crate::normalize::Normalizer;
use crate::record::{Document, FacultyRecord};

#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub documents: Vec<Document>,
    /// Records dropped because about + accolades was blank.
    pub skipped: usize,
}

impl Corpus {
    pub fn texts(&self) -> Vec<&str> { self.documents.iter().map(|d| d.text.as_str()).collect() }

    pub fn len(&self) -> usize { self.documents.len() }

    pub fn is_empty(&self) -> bool { self.documents.is_empty() }
}

/// Concatenate each record's about-text and accolade values and keep the
/// non-blank ones, in record order.
pub fn build_corpus<'a, I>(records: I, normalizer: &dyn Normalizer) -> Corpus
where
    I: IntoIterator<Item = &'a FacultyRecord>,
{
    let mut corpus = Corpus::default();
    for record in records {
        let accolades = record.accolade_values().collect::<Vec<_>>().join(" ");
        let raw = format!("{} {}", record.about_text(), accolades);
        if raw.trim().is_empty() {
            tracing::debug!(id = %record.id, name = %record.name, "skipping record with no text");
            corpus.skipped += 1;
            continue;
        }
        corpus.documents.push(Document {
            id: record.id.clone(),
            name: record.name.clone(),
            profile_link: record.profile_link_or_empty().to_string(),
            about: record.about_text().to_string(),
            text: normalizer.normalize(&raw),
        });
    }
    tracing::info!(documents = corpus.documents.len(), skipped = corpus.skipped, "built corpus");
    corpus
}
