// src/handlers/submissions.rs

use axum::{
    Extension, Json,
    extract::State,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use sqlx::SqlitePool;

use crate::{
    docx::{evaluation_document, solution_document},
    error::AppError,
    handlers::export::docx_response,
    models::{
        result::{CheckResult, SolutionResult},
        submission::{HistoryParams, Submission, SubmissionKind},
    },
    utils::{
        jwt::Claims,
        payload::{AppPath, AppQuery},
    },
};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Lists the caller's submissions, newest first.
///
/// Supports `?type=solve|check` and `?limit=` (default 20, capped at 100).
pub async fn list_submissions(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    AppQuery(params): AppQuery<HistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let limit = clamp_limit(params.limit);

    let submissions = sqlx::query_as::<_, Submission>(
        r#"
        SELECT id, user_id, type, question_text, solution, score, max_marks, feedback, created_at
        FROM submissions
        WHERE user_id = ? AND (? IS NULL OR type = ?)
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(params.kind)
    .bind(params.kind)
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({ "submissions": submissions })))
}

async fn fetch_owned(pool: &SqlitePool, user_id: i64, id: i64) -> Result<Submission, AppError> {
    sqlx::query_as::<_, Submission>(
        r#"
        SELECT id, user_id, type, question_text, solution, score, max_marks, feedback, created_at
        FROM submissions
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Submission not found".to_string()))
}

/// Get a single submission. Other users' rows look exactly like missing ones.
pub async fn get_submission(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let submission = fetch_owned(&pool, user_id, id).await?;

    Ok(Json(json!({ "submission": submission })))
}

fn stored_payload<T: serde::de::DeserializeOwned>(
    payload: Option<sqlx::types::Json<Value>>,
    id: i64,
) -> Result<T, AppError> {
    let value = payload
        .map(|json| json.0)
        .ok_or_else(|| AppError::NotFound("Submission has no stored result".to_string()))?;

    serde_json::from_value(value).map_err(|e| {
        tracing::error!("Stored result for submission {} is unreadable: {:?}", id, e);
        AppError::InternalServerError(e.to_string())
    })
}

/// Re-exports a stored submission as a `.docx` document.
pub async fn submission_docx(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
) -> Result<Response, AppError> {
    let user_id = claims.user_id()?;
    let submission = fetch_owned(&pool, user_id, id).await?;

    match submission.kind {
        SubmissionKind::Solve => {
            let solution: SolutionResult = stored_payload(submission.solution, id)?;
            docx_response(&solution_document(&solution), "CBSE_Solution")
        }
        SubmissionKind::Check => {
            let result: CheckResult = stored_payload(submission.feedback, id)?;
            docx_response(&evaluation_document(&result), "CBSE_Evaluation")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_defaulted_and_capped() {
        assert_eq!(clamp_limit(None), 20);
        assert_eq!(clamp_limit(Some(500)), 100);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(7)), 7);
    }
}
