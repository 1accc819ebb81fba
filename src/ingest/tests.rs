use super::*;
use crate::config::{ChatConfig, Config, OllamaConfig, RetrievalConfig};
use std::io::Write;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_DIM: u32 = 4;

fn config_for(dir: &TempDir, server_url: &str) -> Config {
    let url = Url::parse(server_url).expect("mock server URL should parse");
    Config {
        ollama: OllamaConfig {
            protocol: url.scheme().to_string(),
            host: url
                .host_str()
                .expect("mock server should have a host")
                .to_string(),
            port: url.port().expect("mock server should have a port"),
            model: "test-embed".to_string(),
            batch_size: 16,
            embedding_dimension: TEST_DIM,
        },
        chat: ChatConfig::default(),
        retrieval: RetrievalConfig::default(),
        base_dir: dir.path().to_path_buf(),
        chat_api_key: None,
    }
}

fn corpus_file(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).expect("Failed to create corpus file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write corpus file");
    path
}

#[test]
fn articles_parse_from_their_json_shape() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = corpus_file(
        &dir,
        "articles.json",
        r#"[{"title": "Diabetes Care", "abstract": "Managing type 2 diabetes."}]"#,
    );

    let articles = read_articles(&path).expect("Failed to parse articles");
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].title, "Diabetes Care");
    assert_eq!(articles[0].summary, "Managing type 2 diabetes.");
}

#[test]
fn cases_parse_from_their_json_shape() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = corpus_file(
        &dir,
        "cases.json",
        r#"[{
            "patient_id": "P001",
            "name": "Jordan Doe",
            "age": 54,
            "diagnosis": "Hypertension",
            "symptoms": "Headache, dizziness",
            "medications": "Lisinopril",
            "doctor_notes": "Monitor blood pressure weekly.",
            "lab_results": "BP 150/95"
        }]"#,
    );

    let cases = read_cases(&path).expect("Failed to parse cases");
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].patient_id, "P001");
    assert_eq!(cases[0].age, 54);
    assert_eq!(cases[0].diagnosis, "Hypertension");
}

#[test]
fn malformed_corpus_is_an_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = corpus_file(&dir, "broken.json", "{ not json");

    assert!(read_articles(&path).is_err());
}

#[test]
fn missing_corpus_file_is_an_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    assert!(read_articles(dir.path().join("absent.json")).is_err());
}

#[tokio::test]
async fn articles_land_in_both_stores() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embeddings": [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = config_for(&dir, &server.uri());

    let embedder = OllamaClient::new(&config).expect("Failed to create client");
    let vectors = VectorStore::open(&config)
        .await
        .expect("Failed to open vector store");
    let database = Database::new(config.database_path())
        .await
        .expect("Failed to open database");

    let articles = vec![
        Article {
            title: "One".to_string(),
            summary: "First article.".to_string(),
        },
        Article {
            title: "Two".to_string(),
            summary: "Second article.".to_string(),
        },
    ];

    let loader = Loader::new(&embedder, &vectors, &database);
    let loaded = loader
        .load_articles(&articles)
        .await
        .expect("Failed to load articles");

    assert_eq!(loaded, 2);
    assert_eq!(vectors.article_count().await.expect("count"), 2);
    assert_eq!(database.article_count().await.expect("count"), 2);
}

#[tokio::test]
async fn cases_land_in_both_stores() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embedding": [0.5, 0.5, 0.0, 0.0]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = config_for(&dir, &server.uri());

    let embedder = OllamaClient::new(&config).expect("Failed to create client");
    let vectors = VectorStore::open(&config)
        .await
        .expect("Failed to open vector store");
    let database = Database::new(config.database_path())
        .await
        .expect("Failed to open database");

    let cases = vec![PatientCase {
        patient_id: "P001".to_string(),
        name: "Jordan Doe".to_string(),
        age: 54,
        diagnosis: "Hypertension".to_string(),
        symptoms: "Headache".to_string(),
        medications: "Lisinopril".to_string(),
        doctor_notes: "Monitor weekly.".to_string(),
        lab_results: "BP 150/95".to_string(),
    }];

    let loader = Loader::new(&embedder, &vectors, &database);
    let loaded = loader.load_cases(&cases).await.expect("Failed to load cases");

    assert_eq!(loaded, 1);
    assert_eq!(vectors.case_count().await.expect("count"), 1);
    assert_eq!(database.patient_count().await.expect("count"), 1);
}

#[tokio::test]
async fn empty_corpus_loads_nothing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = config_for(&dir, &server.uri());

    let embedder = OllamaClient::new(&config).expect("Failed to create client");
    let vectors = VectorStore::open(&config)
        .await
        .expect("Failed to open vector store");
    let database = Database::new(config.database_path())
        .await
        .expect("Failed to open database");

    let loader = Loader::new(&embedder, &vectors, &database);
    let loaded = loader
        .load_articles(&[])
        .await
        .expect("Empty load should succeed");

    assert_eq!(loaded, 0);
    assert_eq!(vectors.article_count().await.expect("count"), 0);
}
