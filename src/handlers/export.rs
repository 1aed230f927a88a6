// src/handlers/export.rs

use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    docx::{DOCX_CONTENT_TYPE, Document, evaluation_document, solution_document, write_docx},
    error::AppError,
    models::result::{CheckResult, SolutionResult},
    utils::payload::AppJson,
};

/// Body of an export request: either a solution or an evaluation.
#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub solution: Option<SolutionResult>,
    pub result: Option<CheckResult>,
}

/// Builds an attachment response for a laid-out document.
pub fn docx_response(doc: &Document, file_stem: &str) -> Result<Response, AppError> {
    let bytes = write_docx(doc)?;
    let disposition = format!("attachment; filename={}.docx", file_stem);

    Ok((
        [
            (header::CONTENT_TYPE, DOCX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// Exports a solution or an evaluation to a `.docx` download.
pub async fn export_docx(AppJson(req): AppJson<ExportRequest>) -> Result<Response, AppError> {
    match (req.solution, req.result) {
        (Some(solution), _) => docx_response(&solution_document(&solution), "CBSE_Solution"),
        (None, Some(result)) => docx_response(&evaluation_document(&result), "CBSE_Evaluation"),
        (None, None) => Err(AppError::BadRequest(
            "No solution data provided".to_string(),
        )),
    }
}
