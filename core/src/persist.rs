use crate::index::TermIndexRecord;
use crate::normalize::{EnglishNormalizer, LemmatizerKind};
use crate::pipeline::{IndexBuild, SearchContext};
use crate::record::{Document, FacultyRecord};
use crate::vsm::FittedModel;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{create_dir_all, rename, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const INDEX_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub skipped_records: u32,
    pub lemmatizer: LemmatizerKind,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn model(&self) -> PathBuf { self.root.join("model.bin") }
    fn docs(&self) -> PathBuf { self.root.join("docs.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    fn terms(&self) -> PathBuf { self.root.join("terms.sled") }
}

fn write_bincode<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let bytes = bincode::serialize(value)?;
    f.write_all(&bytes)?;
    f.sync_all()?;
    Ok(())
}

fn staging(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn read_bincode<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let mut f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    Ok(bincode::deserialize(&buf)?)
}

pub fn save_model(paths: &IndexPaths, model: &FittedModel) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_bincode(&paths.model(), model)
}

pub fn load_model(paths: &IndexPaths) -> Result<FittedModel> { read_bincode(&paths.model()) }

pub fn load_docs(paths: &IndexPaths) -> Result<Vec<Document>> { read_bincode(&paths.docs()) }

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta()).with_context(|| format!("opening {}", paths.meta().display()))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Term -> records sled tree. Every write replaces the whole collection.
#[derive(Clone)]
pub struct TermStore {
    db: sled::Db,
}

impl TermStore {
    pub fn open(paths: &IndexPaths) -> Result<Self> {
        create_dir_all(&paths.root)?;
        let db = sled::open(paths.terms()).with_context(|| format!("opening {}", paths.terms().display()))?;
        Ok(Self { db })
    }

    /// Drop every stored term and write `records` grouped by term, as one
    /// atomic batch. Returns the number of distinct terms written.
    pub fn replace_all(&self, records: &[TermIndexRecord]) -> Result<usize> {
        let mut grouped: BTreeMap<&str, Vec<&TermIndexRecord>> = BTreeMap::new();
        for r in records {
            grouped.entry(r.term.as_str()).or_default().push(r);
        }
        let mut batch = sled::Batch::default();
        for key in self.db.iter().keys() {
            batch.remove(key?);
        }
        for (term, recs) in &grouped {
            batch.insert(term.as_bytes(), bincode::serialize(recs)?);
        }
        self.db.apply_batch(batch)?;
        self.db.flush()?;
        Ok(grouped.len())
    }

    pub fn lookup(&self, term: &str) -> Result<Vec<TermIndexRecord>> {
        match self.db.get(term.as_bytes())? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn len(&self) -> usize { self.db.len() }

    pub fn is_empty(&self) -> bool { self.db.is_empty() }
}

/// Persist one indexing run: model, documents, metadata and the term store.
///
/// Model and documents are both written to staging files before either
/// replaces the live copy, and `meta.json` is written last. `load_context`
/// checks the metadata counts against the files it loads.
pub fn save_index(paths: &IndexPaths, build: &IndexBuild, lemmatizer: LemmatizerKind, terms: &TermStore) -> Result<MetaFile> {
    create_dir_all(&paths.root)?;
    let (model_tmp, docs_tmp) = (staging(&paths.model()), staging(&paths.docs()));
    write_bincode(&model_tmp, &build.model)?;
    write_bincode(&docs_tmp, &build.documents)?;
    rename(&model_tmp, paths.model())?;
    rename(&docs_tmp, paths.docs())?;
    let distinct_terms = terms.replace_all(&build.term_records)?;
    let meta = MetaFile {
        num_docs: build.documents.len() as u32,
        num_terms: build.model.vocabulary.len() as u32,
        skipped_records: build.skipped as u32,
        lemmatizer,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        version: INDEX_VERSION,
    };
    save_meta(paths, &meta)?;
    tracing::info!(
        root = %paths.root.display(),
        num_docs = meta.num_docs,
        num_terms = meta.num_terms,
        distinct_terms,
        "saved index"
    );
    Ok(meta)
}

/// Load the structures required to search: model, documents and the
/// normalizer recorded in the metadata.
pub fn load_context(paths: &IndexPaths) -> Result<(SearchContext, MetaFile)> {
    let meta = load_meta(paths)?;
    if meta.version != INDEX_VERSION {
        bail!("index version {} is not supported (expected {})", meta.version, INDEX_VERSION);
    }
    let model = load_model(paths)?;
    let docs = load_docs(paths)?;
    if model.matrix.n_rows() != docs.len() {
        bail!("index is inconsistent: {} matrix rows for {} documents", model.matrix.n_rows(), docs.len());
    }
    if meta.num_docs as usize != docs.len() || meta.num_terms as usize != model.vocabulary.len() {
        bail!(
            "index is inconsistent: meta.json records {} documents and {} terms, files hold {} and {}",
            meta.num_docs,
            meta.num_terms,
            docs.len(),
            model.vocabulary.len()
        );
    }
    let ctx = SearchContext::new(EnglishNormalizer::new(meta.lemmatizer), model, docs);
    Ok((ctx, meta))
}

/// Read faculty records from a `.jsonl` / `.json` file, or from every such
/// file under a directory in path order.
pub fn load_records<P: AsRef<Path>>(input: P) -> Result<Vec<FacultyRecord>> {
    let input = input.as_ref();
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        bail!("record store {} does not exist", input.display());
    }

    let mut records = Vec::new();
    for file in &files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(file, &mut records)?;
        } else {
            read_json(file, &mut records)?;
        }
    }
    tracing::debug!(files = files.len(), records = records.len(), "loaded records");
    Ok(records)
}

fn read_jsonl(file: &Path, out: &mut Vec<FacultyRecord>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let record: FacultyRecord = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: malformed record", file.display(), lineno + 1))?;
        out.push(record);
    }
    Ok(())
}

fn read_json(file: &Path, out: &mut Vec<FacultyRecord>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                out.push(serde_json::from_value(v)?);
            }
        }
        serde_json::Value::Object(_) => out.push(serde_json::from_value(json)?),
        _ => tracing::warn!(file = %file.display(), "ignoring json that is neither an object nor an array"),
    }
    Ok(())
}

/// Write records as JSON lines, replacing `path`.
pub fn write_records<P: AsRef<Path>>(path: P, records: &[FacultyRecord]) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_dir_all(dir)?;
    }
    let mut out = BufWriter::new(File::create(path)?);
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
