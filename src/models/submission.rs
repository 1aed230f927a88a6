// src/models/submission.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

/// Stored question text is cut to this many characters.
pub const QUESTION_PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SubmissionKind {
    Solve,
    Check,
}

/// Represents the 'submissions' table in the database.
/// Rows are append-only.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Submission {
    pub id: i64,
    pub user_id: i64,

    /// Mapped from the column 'type' since `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: SubmissionKind,

    pub question_text: Option<String>,

    /// Serialized `SolutionResult`, set on solve rows.
    pub solution: Option<Json<serde_json::Value>>,

    /// Marks awarded, set on check rows.
    pub score: Option<f64>,
    pub max_marks: Option<f64>,

    /// Serialized `CheckResult`, set on check rows.
    pub feedback: Option<Json<serde_json::Value>>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Query parameters for listing history.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    #[serde(rename = "type")]
    pub kind: Option<SubmissionKind>,
    pub limit: Option<i64>,
}

/// Truncates on a character boundary.
pub fn question_preview(text: &str) -> String {
    text.chars().take(QUESTION_PREVIEW_CHARS).collect()
}
