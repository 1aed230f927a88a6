// src/ai/mod.rs

//! AI gateway: prompt building, ordered model fallback and response parsing.

pub mod backend;
pub mod gateway;
pub mod gemini;
pub mod json;
pub mod prompts;

pub use backend::{ModelBackend, ModelError, Part};
pub use gateway::{AiError, AiGateway, FallbackPolicy};
pub use gemini::GeminiBackend;

/// Models tried in order. Each has its own quota bucket on the Gemini API.
pub const DEFAULT_MODELS: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-2.5-pro",
    "gemini-2.0-flash",
    "gemini-2.0-flash-lite",
    "gemini-1.5-flash",
];
