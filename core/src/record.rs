use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A faculty entry as written by the crawler into the record store.
/// Missing or `null` fields are treated as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacultyRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub profile_link: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub office: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub about: Option<String>,
    /// Section header -> section text, in page order.
    #[serde(default)]
    pub accolades: Option<IndexMap<String, String>>,
}

impl FacultyRecord {
    pub fn about_text(&self) -> &str { self.about.as_deref().unwrap_or("") }

    pub fn profile_link_or_empty(&self) -> &str { self.profile_link.as_deref().unwrap_or("") }

    pub fn accolade_values(&self) -> impl Iterator<Item = &str> {
        self.accolades.iter().flat_map(|m| m.values().map(String::as_str))
    }
}

/// One indexed profile. Row `i` of the document-term matrix belongs to the
/// document at position `i` of the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub profile_link: String,
    /// Raw about-text, kept for result snippets.
    pub about: String,
    /// Normalized about + accolades, the input to vectorization.
    pub text: String,
}
