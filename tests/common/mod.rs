// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use acctbot::{
    ai::{AiGateway, FallbackPolicy, ModelBackend, ModelError, Part},
    config::Config,
    extract::SystemExtractor,
    routes,
    state::AppState,
};
use async_trait::async_trait;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use tempfile::TempDir;

pub const SOLVE_REPLY: &str = r#"Here is the solution:
{
  "topic": "Journal Entries",
  "explanation": "Cash sales increase cash and sales.",
  "solution": "| Date | Particulars | L.F. | Debit (₹) | Credit (₹) |\n|---|---|---|---|---|\n| 1 | Cash A/c Dr. | | 1,000 | |\n| | To Sales A/c | | | 1,000 |",
  "workingNotes": "",
  "tips": "Write the narration.",
  "marksBreakdown": "1 mark per line"
}"#;

pub const CHECK_REPLY: &str = r#"```json
{
  "score": 4,
  "maxMarks": 5,
  "percentage": 80,
  "overallFeedback": "Correct entry, narration missing.",
  "mistakes": [
    {"description": "No narration", "correction": "Add (Being goods sold for cash)", "marksLost": 1}
  ],
  "correctParts": ["Debit and credit accounts are right"],
  "markingBreakdown": [
    {"step": "Debit Cash A/c", "marksAvailable": 2, "marksAwarded": 2, "comment": "Correct"}
  ],
  "improvementTips": ["Always write a narration"]
}
```"#;

/// Answers solve prompts and check prompts with canned replies.
pub struct CannedBackend;

#[async_trait]
impl ModelBackend for CannedBackend {
    async fn generate(&self, _model: &str, parts: &[Part]) -> Result<String, ModelError> {
        let is_check = parts.iter().any(|part| match part {
            Part::Text(text) => text.contains("Student's Answer"),
            _ => false,
        });
        Ok(if is_check { CHECK_REPLY } else { SOLVE_REPLY }.to_string())
    }
}

/// Every model is out of quota.
pub struct ExhaustedBackend;

#[async_trait]
impl ModelBackend for ExhaustedBackend {
    async fn generate(&self, model: &str, _parts: &[Part]) -> Result<String, ModelError> {
        Err(ModelError::Quota {
            model: model.to_string(),
            message: "RESOURCE_EXHAUSTED".to_string(),
        })
    }
}

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub upload_dir: TempDir,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Registers a fresh user and returns its bearer token.
    pub async fn register(&self, client: &reqwest::Client, email: &str) -> String {
        let body: serde_json::Value = client
            .post(self.url("/api/auth/register"))
            .json(&serde_json::json!({
                "name": "Test Student",
                "email": email,
                "password": "password123"
            }))
            .send()
            .await
            .expect("Failed to execute request")
            .json()
            .await
            .expect("Register response is not JSON");

        body["token"].as_str().expect("token missing").to_string()
    }
}

pub fn test_config(upload_dir: &TempDir) -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        gemini_api_key: "test-key".to_string(),
        gemini_api_base: "http://127.0.0.1:9/".to_string(),
        gemini_models: vec!["model-a".to_string(), "model-b".to_string()],
        fallback_policy: FallbackPolicy::All,
        upload_dir: upload_dir.path().to_path_buf(),
        max_upload_bytes: 1024 * 1024,
        ocr_lang: "eng".to_string(),
        tesseract_bin: "tesseract".to_string(),
        pdftotext_bin: "pdftotext".to_string(),
        cors_origins: vec!["http://localhost:5173".to_string()],
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        rust_log: "error".to_string(),
    }
}

/// Spawns the app on a random port with an in-memory database and a canned
/// model backend.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(Arc::new(CannedBackend)).await
}

pub async fn spawn_app_with(backend: Arc<dyn ModelBackend>) -> TestApp {
    // A single connection that never expires keeps the in-memory database alive.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let upload_dir = tempfile::tempdir().expect("Failed to create upload dir");
    let config = test_config(&upload_dir);

    let gateway = AiGateway::new(
        backend,
        config.gemini_models.clone(),
        config.fallback_policy,
    );

    let state = AppState {
        pool: pool.clone(),
        config,
        gateway: Arc::new(gateway),
        extractor: Arc::new(SystemExtractor::default()),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        pool,
        upload_dir,
    }
}
