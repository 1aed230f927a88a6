// src/ai/gemini.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use super::backend::{ModelBackend, ModelError, Part};

/// `ModelBackend` for the Gemini `generateContent` REST endpoint.
#[derive(Clone)]
pub struct GeminiBackend {
    http: reqwest::Client,
    api_key: String,
    base_url: Url,
}

impl GeminiBackend {
    /// `base_url` is the API root, e.g. `https://generativelanguage.googleapis.com/`.
    pub fn new(api_key: impl Into<String>, base_url: &str) -> Result<Self, url::ParseError> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: Url::parse(&base)?,
        })
    }

    fn endpoint(&self, model: &str) -> Result<Url, url::ParseError> {
        self.base_url
            .join(&format!("v1beta/models/{}:generateContent", model))
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

impl<'a> From<&'a Part> for RequestPart<'a> {
    fn from(part: &'a Part) -> Self {
        match part {
            Part::Text(text) => RequestPart::Text { text },
            Part::InlineImage { mime_type, data } => RequestPart::Inline {
                inline_data: InlineData { mime_type, data },
            },
        }
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    async fn generate(&self, model: &str, parts: &[Part]) -> Result<String, ModelError> {
        let url = self.endpoint(model).map_err(|e| ModelError::Rejected {
            model: model.to_string(),
            status: 0,
            message: format!("invalid model endpoint: {}", e),
        })?;

        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: parts.iter().map(RequestPart::from).collect(),
            }],
        };

        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ModelError::Transport {
                model: model.to_string(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| ModelError::Transport {
            model: model.to_string(),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(classify_failure(model, status.as_u16(), body));
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|_| ModelError::EmptyResponse {
                model: model.to_string(),
            })?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ModelError::EmptyResponse {
                model: model.to_string(),
            });
        }

        Ok(text)
    }
}

fn classify_failure(model: &str, status: u16, body: String) -> ModelError {
    let model = model.to_string();
    let message: String = body.chars().take(300).collect();

    if status == 429 || body.contains("RESOURCE_EXHAUSTED") || body.contains("quota") {
        ModelError::Quota { model, message }
    } else if status >= 500 {
        ModelError::Unavailable {
            model,
            status,
            message,
        }
    } else {
        ModelError::Rejected {
            model,
            status,
            message,
        }
    }
}
