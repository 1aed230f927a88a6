// src/ai/backend.rs

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};

/// One piece of a generation request.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    /// Base64 image data sent inline with the prompt.
    InlineImage { mime_type: String, data: String },
}

impl Part {
    /// Builds an inline image part from client-supplied base64.
    ///
    /// Accepts either bare base64 or a `data:<mime>;base64,` URL. When no mime
    /// type is declared it is sniffed from the decoded header bytes.
    pub fn inline_image(raw: &str) -> Self {
        let raw = raw.trim();

        if let Some(rest) = raw.strip_prefix("data:") {
            if let Some((meta, data)) = rest.split_once(',') {
                let mime_type = meta.trim_end_matches(";base64");
                if mime_type.starts_with("image/") {
                    return Part::InlineImage {
                        mime_type: mime_type.to_string(),
                        data: data.to_string(),
                    };
                }
                return Part::InlineImage {
                    mime_type: sniff_image_mime(data).to_string(),
                    data: data.to_string(),
                };
            }
        }

        Part::InlineImage {
            mime_type: sniff_image_mime(raw).to_string(),
            data: raw.to_string(),
        }
    }
}

/// Guesses an image mime type from the first bytes of base64 data.
fn sniff_image_mime(data: &str) -> &'static str {
    // 16 base64 chars decode to 12 bytes, enough for every signature below.
    let head: String = data.chars().filter(|c| !c.is_whitespace()).take(16).collect();
    let Ok(bytes) = STANDARD.decode(head) else {
        return "image/png";
    };

    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(b"WEBP".as_slice()) {
        "image/webp"
    } else if bytes.starts_with(b"BM") {
        "image/bmp"
    } else {
        "image/png"
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    #[error("model {model} is out of quota: {message}")]
    Quota { model: String, message: String },

    #[error("model {model} is unavailable (HTTP {status}): {message}")]
    Unavailable {
        model: String,
        status: u16,
        message: String,
    },

    #[error("model {model} rejected the request (HTTP {status}): {message}")]
    Rejected {
        model: String,
        status: u16,
        message: String,
    },

    #[error("request to model {model} failed: {message}")]
    Transport { model: String, message: String },

    #[error("model {model} returned no text")]
    EmptyResponse { model: String },
}

impl ModelError {
    /// Quota, availability, transport and empty-output failures may succeed on
    /// another model. A rejected request will fail the same way everywhere.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ModelError::Rejected { .. })
    }

    pub fn model(&self) -> &str {
        match self {
            ModelError::Quota { model, .. }
            | ModelError::Unavailable { model, .. }
            | ModelError::Rejected { model, .. }
            | ModelError::Transport { model, .. }
            | ModelError::EmptyResponse { model } => model,
        }
    }
}

/// A generative model service reachable by model identifier.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Runs one generation request against `model` and returns the response text.
    async fn generate(&self, model: &str, parts: &[Part]) -> Result<String, ModelError>;
}
