// src/utils/upload.rs

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use axum::{
    Json,
    extract::{FromRef, FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use serde_json::Value;

use crate::{
    config::Config,
    error::AppError,
    extract::{Extracted, TextExtractor},
};

/// Extensions accepted for uploaded question/answer files.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "webp", "pdf", "docx", "txt",
];

/// An uploaded file on disk. The file is removed when the guard is dropped.
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
    pub original_name: String,
    pub content_type: Option<String>,
}

impl TempUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove upload {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Text fields and files of a solve/check request.
///
/// Accepts `multipart/form-data` (fields plus files) or a JSON object whose
/// values become text fields.
#[derive(Debug, Default)]
pub struct SubmissionForm {
    fields: HashMap<String, String>,
    files: HashMap<String, TempUpload>,
}

impl SubmissionForm {
    /// Trimmed, non-empty text field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn take_file(&mut self, name: &str) -> Option<TempUpload> {
        self.files.remove(name)
    }
}

fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

impl<S> FromRequest<S> for SubmissionForm
where
    S: Send + Sync,
    Config: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !is_multipart {
            let Json(body) = Json::<HashMap<String, Value>>::from_request(req, state).await?;
            let fields = body
                .into_iter()
                .filter_map(|(k, v)| match v {
                    Value::String(s) => Some((k, s)),
                    Value::Number(n) => Some((k, n.to_string())),
                    _ => None,
                })
                .collect();
            return Ok(Self {
                fields,
                files: HashMap::new(),
            });
        }

        let config = Config::from_ref(state);
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let mut form = SubmissionForm::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            let Some(file_name) = field.file_name().map(str::to_string) else {
                let value = field.text().await?;
                form.fields.insert(name, value);
                continue;
            };

            let content_type = field.content_type().map(str::to_string);

            // An untouched file input arrives as an unnamed, empty part.
            if file_name.is_empty() {
                let bytes = field.bytes().await?;
                if bytes.is_empty() {
                    continue;
                }
                return Err(AppError::BadRequest("Unsupported file type".to_string()));
            }

            let ext = extension_of(&file_name)
                .filter(|e| ALLOWED_EXTENSIONS.contains(&e.as_str()))
                .ok_or_else(|| AppError::BadRequest("Unsupported file type".to_string()))?;
            let bytes = field.bytes().await?;

            tokio::fs::create_dir_all(&config.upload_dir)
                .await
                .map_err(|e| AppError::InternalServerError(e.to_string()))?;
            let path = config
                .upload_dir
                .join(format!("{}.{}", uuid::Uuid::new_v4(), ext));

            // Guard first so a failed write still cleans up.
            let upload = TempUpload {
                path,
                original_name: file_name,
                content_type,
            };
            tokio::fs::write(upload.path(), &bytes)
                .await
                .map_err(|e| AppError::InternalServerError(e.to_string()))?;

            tracing::debug!(
                "Stored upload '{}' ({} bytes) at {}",
                upload.original_name,
                bytes.len(),
                upload.path().display()
            );
            form.files.insert(name, upload);
        }

        Ok(form)
    }
}

/// Extracts text from an upload, then deletes it whatever the outcome.
pub async fn extract_upload(
    extractor: &dyn TextExtractor,
    upload: TempUpload,
) -> Result<Extracted, AppError> {
    let result = extractor
        .extract(upload.path(), upload.content_type.as_deref())
        .await;
    drop(upload);
    Ok(result?)
}

/// Appends extracted text below any typed text, separated by a blank line.
pub fn combine_text(typed: Option<&str>, extracted: &str) -> String {
    let extracted = extracted.trim();
    match typed {
        Some(t) if !extracted.is_empty() => format!("{}\n\n{}", t, extracted),
        Some(t) => t.to_string(),
        None => extracted.to_string(),
    }
}
