// src/config.rs

use std::{env, net::SocketAddr, path::PathBuf, str::FromStr};

use dotenvy::dotenv;

use crate::ai::{DEFAULT_MODELS, FallbackPolicy};

const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/";
const DEFAULT_JWT_EXPIRATION: u64 = 7 * 24 * 60 * 60;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub gemini_api_key: String,
    pub gemini_api_base: String,
    /// Model identifiers tried in order by the AI gateway.
    pub gemini_models: Vec<String>,
    pub fallback_policy: FallbackPolicy,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub ocr_lang: String,
    pub tesseract_bin: String,
    pub pdftotext_bin: String,
    pub cors_origins: Vec<String>,
    pub bind_addr: SocketAddr,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = var_or("DATABASE_URL", "sqlite://acctbot.db");
        let jwt_secret = required("JWT_SECRET")?;
        let jwt_expiration = parsed_or("JWT_EXPIRATION", DEFAULT_JWT_EXPIRATION)?;
        let gemini_api_key = required("GEMINI_API_KEY")?;
        let gemini_api_base = var_or("GEMINI_API_BASE", DEFAULT_GEMINI_API_BASE);

        let gemini_models = match env::var("GEMINI_MODELS") {
            Ok(list) => split_list(&list),
            Err(_) => DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
        };
        if gemini_models.is_empty() {
            return Err(ConfigError::Invalid {
                name: "GEMINI_MODELS",
                value: String::new(),
            });
        }

        let fallback_policy = parsed_or("AI_FALLBACK_POLICY", FallbackPolicy::All)?;
        let upload_dir = PathBuf::from(var_or("UPLOAD_DIR", "uploads"));
        let max_upload_bytes = parsed_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;

        let ocr_lang = var_or("OCR_LANG", "eng");
        let tesseract_bin = var_or("TESSERACT_BIN", "tesseract");
        let pdftotext_bin = var_or("PDFTOTEXT_BIN", "pdftotext");

        let cors_origins = split_list(&var_or(
            "CORS_ORIGINS",
            "http://localhost:5173,http://127.0.0.1:5173",
        ));
        let bind_addr = parsed_or("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?;

        let rust_log = var_or("RUST_LOG", "info");

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            gemini_api_key,
            gemini_api_base,
            gemini_models,
            fallback_policy,
            upload_dir,
            max_upload_bytes,
            ocr_lang,
            tesseract_bin,
            pdftotext_bin,
            cors_origins,
            bind_addr,
            rust_log,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
