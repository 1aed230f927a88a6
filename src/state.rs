// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::{
    ai::{AiGateway, GeminiBackend},
    config::Config,
    extract::{SystemExtractor, TextExtractor},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub gateway: Arc<AiGateway>,
    pub extractor: Arc<dyn TextExtractor>,
}

impl AppState {
    /// Wires the production collaborators from configuration.
    pub fn from_config(pool: SqlitePool, config: Config) -> Result<Self, url::ParseError> {
        let backend = GeminiBackend::new(config.gemini_api_key.clone(), &config.gemini_api_base)?;
        let gateway = AiGateway::new(
            Arc::new(backend),
            config.gemini_models.clone(),
            config.fallback_policy,
        );
        let extractor = SystemExtractor {
            tesseract_bin: config.tesseract_bin.clone(),
            pdftotext_bin: config.pdftotext_bin.clone(),
            ocr_lang: config.ocr_lang.clone(),
        };

        Ok(Self {
            pool,
            config,
            gateway: Arc::new(gateway),
            extractor: Arc::new(extractor),
        })
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<AiGateway> {
    fn from_ref(state: &AppState) -> Self {
        state.gateway.clone()
    }
}

impl FromRef<AppState> for Arc<dyn TextExtractor> {
    fn from_ref(state: &AppState) -> Self {
        state.extractor.clone()
    }
}
