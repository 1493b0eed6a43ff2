//! Text indexing and ranking for faculty profile search: normalization,
//! TF-IDF over word n-grams, term index materialization and cosine ranking.

pub mod corpus;
pub mod error;
pub mod index;
pub mod normalize;
pub mod persist;
pub mod pipeline;
pub mod rank;
pub mod record;
pub mod vsm;

pub use corpus::{build_corpus, Corpus};
pub use error::IndexError;
pub use index::{materialize, TermIndexRecord};
pub use normalize::{EnglishNormalizer, LemmatizerKind, Normalizer};
pub use pipeline::{build_index, IndexBuild, SearchContext};
pub use rank::{search, RankedResult, SNIPPET_WORDS, TOP_K};
pub use record::{Document, FacultyRecord};
pub use vsm::{FittedModel, SparseVec, TfidfVectorizer, Vocabulary};
