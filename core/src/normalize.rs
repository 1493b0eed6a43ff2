use lazy_static::lazy_static;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization;

/// Shortest base form the rule-based lemmatizer is allowed to produce.
const MIN_STEM_CHARS: usize = 3;
/// Upper bound on strip/lemmatize passes per token.
const MAX_CANONICAL_PASSES: usize = 8;

lazy_static! {
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "i","me","my","myself","we","our","ours","ourselves","you","you're","you've","you'll","you'd",
            "your","yours","yourself","yourselves","he","him","his","himself","she","she's","her","hers","herself",
            "it","it's","its","itself","they","them","their","theirs","themselves",
            "what","which","who","whom","this","that","that'll","these","those",
            "am","is","are","was","were","be","been","being","have","has","had","having","do","does","did","doing",
            "a","an","the","and","but","if","or","because","as","until","while","of","at","by","for","with","about",
            "against","between","into","through","during","before","after","above","below","to","from","up","down",
            "in","out","on","off","over","under","again","further","then","once","here","there","when","where","why",
            "how","all","any","both","each","few","more","most","other","some","such","no","nor","not","only","own",
            "same","so","than","too","very","s","t","can","will","just","don","don't","should","should've","now",
            "d","ll","m","o","re","ve","y","ain","aren","aren't","couldn","couldn't","didn","didn't","doesn","doesn't",
            "hadn","hadn't","hasn","hasn't","haven","haven't","isn","isn't","ma","mightn","mightn't","mustn","mustn't",
            "needn","needn't","shan","shan't","shouldn","shouldn't","wasn","wasn't","weren","weren't","won","won't",
            "wouldn","wouldn't"
        ];
        words.iter().copied().collect()
    };
    static ref IRREGULAR: HashMap<&'static str, &'static str> = {
        let pairs: &[(&str, &str)] = &[
            ("children","child"),("men","man"),("women","woman"),("people","person"),("mice","mouse"),
            ("geese","goose"),("feet","foot"),("teeth","tooth"),("analyses","analysis"),("theses","thesis"),
            ("hypotheses","hypothesis"),("crises","crisis"),("criteria","criterion"),("phenomena","phenomenon"),
            ("indices","index"),("appendices","appendix"),("alumni","alumnus"),("curricula","curriculum"),
            ("syllabi","syllabus"),("leaves","leaf"),("lives","life"),("wives","wife"),("halves","half"),
            ("buses","bus"),("campuses","campus"),("viruses","virus"),("focuses","focus"),("bonuses","bonus"),
            ("statuses","status"),("censuses","census"),("consensuses","consensus"),("corpuses","corpus"),
        ];
        pairs.iter().copied().collect()
    };
    static ref PROTECTED: HashSet<&'static str> = {
        let words: &[&str] = &[
            "news","series","species","bias","lens","gas","always","perhaps","whereas","thus","yes","canvas",
            "atlas","alias","texas","kansas","arkansas","paris","physics","economics","mathematics","statistics",
            "politics","ethics","logistics","analytics","robotics","genetics","electronics","linguistics",
            "informatics","dynamics","graphics","athletics",
        ];
        words.iter().copied().collect()
    };
}

pub fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

fn is_numeric(token: &str) -> bool { token.chars().all(char::is_numeric) }

fn strip_punctuation(token: &str) -> &str { token.trim_matches(|c: char| c.is_ascii_punctuation()) }

/// Reduces a lowercased token to its base form.
pub trait Lemmatizer: Send + Sync {
    fn lemmatize(&self, token: &str) -> String;
}

/// WordNet-style noun lemmatizer: irregular forms, then suffix detachment.
///
/// There is no dictionary to validate candidates against, so detachment is
/// guarded: `ss`/`us`/`is` endings and a list of protected words are left
/// alone and no rule may leave fewer than three characters.
#[derive(Debug, Default, Clone, Copy)]
pub struct MorphyLemmatizer;

const DETACHMENT_RULES: &[(&str, &str)] = &[
    ("'s", ""),
    ("ies", "y"),
    ("sses", "ss"),
    ("ches", "ch"),
    ("shes", "sh"),
    ("xes", "x"),
    ("zzes", "zz"),
];

fn detach(token: &str, suffix: &str, replacement: &str) -> Option<String> {
    let stem = token.strip_suffix(suffix)?;
    if stem.chars().count() + replacement.chars().count() < MIN_STEM_CHARS {
        return None;
    }
    Some(format!("{stem}{replacement}"))
}

impl Lemmatizer for MorphyLemmatizer {
    fn lemmatize(&self, token: &str) -> String {
        if let Some(base) = IRREGULAR.get(token) {
            return (*base).to_string();
        }
        if PROTECTED.contains(token) {
            return token.to_string();
        }
        // gases, biases, lenses
        if let Some(base) = token.strip_suffix("es").filter(|b| PROTECTED.contains(b)) {
            return base.to_string();
        }
        for (suffix, replacement) in DETACHMENT_RULES {
            if let Some(base) = detach(token, suffix, replacement) {
                return base;
            }
        }
        if ["ss", "us", "is"].iter().any(|end| token.ends_with(end)) {
            return token.to_string();
        }
        detach(token, "s", "").unwrap_or_else(|| token.to_string())
    }
}

/// Snowball (Porter2) English stemmer behind the lemmatizer interface.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnowballLemmatizer;

impl Lemmatizer for SnowballLemmatizer {
    fn lemmatize(&self, token: &str) -> String { STEMMER.stem(token).to_string() }
}

/// Which lemmatizer a normalizer was built with. Persisted alongside a fitted
/// model so queries are reduced the same way the corpus was.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LemmatizerKind {
    #[default]
    Morphy,
    Snowball,
}

impl FromStr for LemmatizerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "morphy" => Ok(Self::Morphy),
            "snowball" => Ok(Self::Snowball),
            other => Err(format!("unknown lemmatizer '{other}' (expected morphy or snowball)")),
        }
    }
}

impl fmt::Display for LemmatizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Morphy => f.write_str("morphy"),
            Self::Snowball => f.write_str("snowball"),
        }
    }
}

/// Canonical text form shared by indexing and querying.
pub trait Normalizer: Send + Sync {
    fn normalize(&self, text: &str) -> String;
}

/// Lowercases, strips ASCII punctuation, drops stop-words and numeric tokens,
/// and lemmatizes what is left. Output tokens are joined by single spaces in
/// input order.
pub struct EnglishNormalizer {
    kind: LemmatizerKind,
    lemmatizer: Box<dyn Lemmatizer>,
}

impl EnglishNormalizer {
    pub fn new(kind: LemmatizerKind) -> Self {
        let lemmatizer: Box<dyn Lemmatizer> = match kind {
            LemmatizerKind::Morphy => Box::new(MorphyLemmatizer),
            LemmatizerKind::Snowball => Box::new(SnowballLemmatizer),
        };
        Self { kind, lemmatizer }
    }

    pub fn kind(&self) -> LemmatizerKind { self.kind }

    /// Strip and lemmatize until the token stops changing, so a normalized
    /// token is a fixed point and `normalize` is idempotent.
    fn canonical_token(&self, raw: &str) -> Option<String> {
        let mut token = strip_punctuation(&raw.to_lowercase()).to_string();
        for _ in 0..MAX_CANONICAL_PASSES {
            if token.is_empty() || is_stopword(&token) || is_numeric(&token) {
                return None;
            }
            let next = strip_punctuation(&self.lemmatizer.lemmatize(&token)).to_string();
            if next == token {
                return Some(token);
            }
            token = next;
        }
        tracing::debug!(raw, token = %token, "lemmatizer did not settle");
        (!token.is_empty() && !is_stopword(&token) && !is_numeric(&token)).then_some(token)
    }
}

impl Default for EnglishNormalizer {
    fn default() -> Self { Self::new(LemmatizerKind::default()) }
}

impl fmt::Debug for EnglishNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnglishNormalizer").field("kind", &self.kind).finish()
    }
}

impl Normalizer for EnglishNormalizer {
    fn normalize(&self, text: &str) -> String {
        let composed = text.nfkc().collect::<String>();
        composed
            .split_whitespace()
            .filter_map(|raw| self.canonical_token(raw))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
