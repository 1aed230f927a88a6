// src/handlers/checker.rs

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

const DEFAULT_MAX_MARKS: f64 = 5.0;

/// Positive mark totals only; anything else falls back to the default.
fn parse_max_marks(raw: Option<&str>) -> f64 {
    raw.and_then(|v| v.parse::<f64>().ok())
        .filter(|m| m.is_finite() && *m > 0.0)
        .unwrap_or(DEFAULT_MAX_MARKS)
}

/// Grades a student's answer against a question.
///
/// * `questionFile` contributes text only; `answerFile` contributes text and,
///   for images, the picture itself.
/// * Appends a `check` row holding the score, the requested max marks and the
///   full evaluation.
pub async fn check(
    State(pool): State<SqlitePool>,
    State(gateway): State<Arc<AiGateway>>,
    State(extractor): State<Arc<dyn TextExtractor>>,
    Extension(claims): Extension<Claims>,
    mut form: SubmissionForm,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let max_marks = parse_max_marks(form.text("maxMarks"));

    let mut question_text = form.text("question").unwrap_or_default().to_string();
    let mut student_answer = form.text("answer").unwrap_or_default().to_string();
    let mut answer_image: Option<String> = None;

    if let Some(upload) = form.take_file("questionFile") {
        let parsed = extract_upload(extractor.as_ref(), upload).await?;
        question_text = combine_text(Some(question_text.as_str()).filter(|t| !t.is_empty()), &parsed.text);
    }

    if let Some(upload) = form.take_file("answerFile") {
        let parsed = extract_upload(extractor.as_ref(), upload).await?;
        student_answer = combine_text(Some(student_answer.as_str()).filter(|t| !t.is_empty()), &parsed.text);
        answer_image = parsed.image_base64;
    }

    if let Some(pasted) = form.text("answerImageBase64") {
        answer_image = Some(pasted.to_string());
    }

    if question_text.is_empty() {
        return Err(AppError::BadRequest("Please provide the question".to_string()));
    }
    if student_answer.is_empty() && answer_image.is_none() {
        return Err(AppError::BadRequest(
            "Please provide the student answer (text, image, or file)".to_string(),
        ));
    }

    let result = gateway
        .check(&question_text, &student_answer, max_marks, answer_image.as_deref())
        .await?;

    sqlx::query(
        r#"
        INSERT INTO submissions (user_id, type, question_text, score, max_marks, feedback, created_at)
        VALUES (?, 'check', ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(question_preview(&question_text))
    .bind(result.score)
    .bind(max_marks)
    .bind(serde_json::to_string(&result)?)
    .bind(chrono::Utc::now())
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to record check submission: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(json!({ "result": result })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_marks_defaults_on_bad_input() {
        assert_eq!(parse_max_marks(None), 5.0);
        assert_eq!(parse_max_marks(Some("abc")), 5.0);
        assert_eq!(parse_max_marks(Some("0")), 5.0);
        assert_eq!(parse_max_marks(Some("-3")), 5.0);
        assert_eq!(parse_max_marks(Some("8")), 8.0);
    }
}
