use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use facsearch_core::persist::{save_index, write_records, IndexPaths, TermStore};
use facsearch_core::{build_index, EnglishNormalizer, FacultyRecord, TfidfVectorizer};
use facsearch_server::{router, AppConfig, AppState};
use http_body_util::BodyExt;
use serde_json::Value;
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

const TOKEN: &str = "s3cret";

fn record(id: &str, name: &str, about: &str) -> FacultyRecord {
    FacultyRecord {
        id: id.into(),
        name: name.into(),
        profile_link: Some(format!("https://www.cpp.edu/faculty/{id}")),
        about: Some(about.into()),
        ..Default::default()
    }
}

/// Index `records` under `dir/index`, keep them in `dir/faculty.jsonl`, and
/// return a router serving that index.
fn tiny_app(dir: &Path, records: &[FacultyRecord]) -> Router {
    let records_path = dir.join("faculty.jsonl");
    write_records(&records_path, records).unwrap();

    let paths = IndexPaths::new(dir.join("index"));
    let terms = TermStore::open(&paths).unwrap();
    let normalizer = EnglishNormalizer::default();
    let build = build_index(records, &normalizer, &TfidfVectorizer::default()).unwrap();
    save_index(&paths, &build, normalizer.kind(), &terms).unwrap();

    let config = AppConfig {
        index_dir: dir.join("index"),
        records: Some(records_path),
        admin_token: Some(TOKEN.into()),
    };
    router(AppState::new(config, terms).unwrap())
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn rebuild(token: Option<&str>) -> Request<Body> {
    let mut req = Request::post("/index/rebuild");
    if let Some(t) = token {
        req = req.header("X-ADMIN-TOKEN", t);
    }
    req.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    let app = tiny_app(
        dir.path(),
        &[
            record("1", "Ada", "Quantum computing researcher specializing in cryptography."),
            record("2", "Bo", "Marketing strategy and consumer behavior expert."),
        ],
    );

    let (status, json) = call(app, get("/search?q=cryptography%20research")).await;
    assert_eq!(status, StatusCode::OK);
    let results = json["results"].as_array().unwrap();
    assert_eq!(results[0]["name"], "Ada");
    assert_eq!(results[0]["profile_link"], "https://www.cpp.edu/faculty/1");
    assert!(results[0]["similarity"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn stopword_query_returns_the_sentinel() {
    let dir = tempdir().unwrap();
    let app = tiny_app(dir.path(), &[record("1", "Ada", "Cryptography.")]);

    let (status, json) = call(app, get("/search?q=the%20and")).await;
    assert_eq!(status, StatusCode::OK);
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["name"], "No relevant document");
    assert_eq!(results[0]["profile_link"], "");
    assert_eq!(results[0]["similarity"], 0.0);
}

#[tokio::test]
async fn terms_are_looked_up_by_normalized_form() {
    let dir = tempdir().unwrap();
    let app = tiny_app(dir.path(), &[record("1", "Ada", "Teaches finance classes.")]);

    let (status, json) = call(app.clone(), get("/terms/Classes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["term"], "class");
    let records = json["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["professor_id"], "1");

    let (_, json) = call(app, get("/terms/zebra")).await;
    assert!(json["records"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn rebuild_requires_the_admin_token() {
    let dir = tempdir().unwrap();
    let app = tiny_app(dir.path(), &[record("1", "Ada", "Cryptography.")]);

    let (status, _) = call(app.clone(), rebuild(None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(app, rebuild(Some("wrong"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rebuild_swaps_in_the_new_model() {
    let dir = tempdir().unwrap();
    let app = tiny_app(dir.path(), &[record("1", "Ada", "Cryptography.")]);

    write_records(
        dir.path().join("faculty.jsonl"),
        &[record("1", "Ada", "Cryptography."), record("2", "Cy", "Export finance."), FacultyRecord {
            id: "3".into(),
            name: "Blank".into(),
            ..Default::default()
        }],
    )
    .unwrap();

    let (status, json) = call(app.clone(), rebuild(Some(TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["num_docs"], 2);
    assert_eq!(json["skipped"], 1);

    let (_, json) = call(app, get("/search?q=finance")).await;
    assert_eq!(json["results"][0]["name"], "Cy");
}

#[tokio::test]
async fn rebuild_of_empty_corpus_is_rejected() {
    let dir = tempdir().unwrap();
    let app = tiny_app(dir.path(), &[record("1", "Ada", "Cryptography.")]);
    write_records(dir.path().join("faculty.jsonl"), &[]).unwrap();

    let (status, _) = call(app.clone(), rebuild(Some(TOKEN))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // the old model keeps serving
    let (_, json) = call(app, get("/search?q=cryptography")).await;
    assert_eq!(json["results"][0]["name"], "Ada");
}
