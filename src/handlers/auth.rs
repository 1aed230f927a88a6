// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::{
        submission::Submission,
        user::{AuthResponse, LoginRequest, RegisterRequest, StatsResponse, User, UserSummary},
    },
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt},
        payload::AppJson,
    },
};

const RECENT_SUBMISSIONS: i64 = 10;

/// Joins the messages of every failed validation rule.
fn validation_message(errors: validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .collect();
    messages.sort();
    messages.dedup();

    if messages.is_empty() {
        errors.to_string()
    } else {
        messages.join(" ")
    }
}

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created with a session token and the user summary.
pub async fn register(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = RegisterRequest {
        name: payload.name.trim().to_string(),
        email: payload.email.trim().to_lowercase(),
        password: payload.password,
    };

    if payload.name.is_empty() || payload.email.is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest("All fields are required".to_string()));
    }
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_message(validation_errors)));
    }

    let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE email = ?")
        .bind(&payload.email)
        .fetch_optional(&pool)
        .await?;
    if existing.is_some() {
        return Err(AppError::BadRequest("Email already registered".to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, email, password_hash, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING id, name, email, password_hash, created_at
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&hashed_password)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        // A concurrent registration can still hit the UNIQUE constraint.
        if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
            AppError::BadRequest("Email already registered".to_string())
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    tracing::info!("Registered user {} ({})", user.id, user.email);

    let token = sign_jwt(
        user.id,
        &user.name,
        &user.email,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: UserSummary::from(&user),
        }),
    ))
}

/// Authenticates a user and returns a JWT token.
///
/// Unknown emails and wrong passwords produce the same 401 response.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.validate().is_err() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password_hash, created_at
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(payload.email.trim().to_lowercase())
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let is_valid = verify_password(
        &payload.password,
        user.as_ref().map(|u| u.password_hash.as_str()),
    )?;

    let user = match user {
        Some(user) if is_valid => user,
        _ => {
            return Err(AppError::AuthError(
                "Invalid email or password".to_string(),
            ));
        }
    };

    let token = sign_jwt(
        user.id,
        &user.name,
        &user.email,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(AuthResponse {
        token,
        user: UserSummary::from(&user),
    }))
}

/// Get current user's profile.
pub async fn me(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let user = sqlx::query_as::<_, User>(
        "SELECT id, name, email, password_hash, created_at FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({ "user": user })))
}

/// Usage statistics for the current user.
pub async fn stats(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let (questions_solved, answers_checked): (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(CASE WHEN type = 'solve' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN type = 'check' THEN 1 ELSE 0 END), 0)
        FROM submissions
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    let avg_score: Option<f64> = sqlx::query_scalar(
        r#"
        SELECT AVG(score * 100.0 / max_marks)
        FROM submissions
        WHERE user_id = ? AND type = 'check' AND score IS NOT NULL AND max_marks > 0
        "#,
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    let recent_submissions = sqlx::query_as::<_, Submission>(
        r#"
        SELECT id, user_id, type, question_text, solution, score, max_marks, feedback, created_at
        FROM submissions
        WHERE user_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(RECENT_SUBMISSIONS)
    .fetch_all(&pool)
    .await?;

    Ok(Json(StatsResponse {
        questions_solved,
        answers_checked,
        avg_score: avg_score.map(|avg| avg.round() as i64),
        recent_submissions,
    }))
}
