// src/handlers/solver.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    ai::AiGateway,
    error::AppError,
    extract::TextExtractor,
    models::submission::question_preview,
    utils::{
        jwt::Claims,
        upload::{SubmissionForm, combine_text, extract_upload},
    },
};

/// Solves a question given as text, a base64 image, or an uploaded file.
///
/// * Extracts text from the `file` upload (deleted afterwards).
/// * Asks the AI gateway for a structured solution.
/// * Appends a `solve` row to the submission log.
pub async fn solve(
    State(pool): State<SqlitePool>,
    State(gateway): State<Arc<AiGateway>>,
    State(extractor): State<Arc<dyn TextExtractor>>,
    Extension(claims): Extension<Claims>,
    mut form: SubmissionForm,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let mut question_text = form.text("question").unwrap_or_default().to_string();
    let mut image_base64: Option<String> = None;

    if let Some(upload) = form.take_file("file") {
        let parsed = extract_upload(extractor.as_ref(), upload).await?;
        question_text = combine_text(Some(question_text.as_str()).filter(|t| !t.is_empty()), &parsed.text);
        image_base64 = parsed.image_base64;
    }

    // An image pasted by the client wins over one derived from the upload.
    if let Some(pasted) = form.text("imageBase64") {
        image_base64 = Some(pasted.to_string());
    }

    if question_text.is_empty() && image_base64.is_none() {
        return Err(AppError::BadRequest(
            "Please provide a question (text, image, or file)".to_string(),
        ));
    }

    let solution = gateway
        .solve(&question_text, image_base64.as_deref())
        .await?;

    sqlx::query(
        r#"
        INSERT INTO submissions (user_id, type, question_text, solution, created_at)
        VALUES (?, 'solve', ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(question_preview(&question_text))
    .bind(serde_json::to_string(&solution)?)
    .bind(chrono::Utc::now())
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to record solve submission: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(json!({ "solution": solution })))
}
