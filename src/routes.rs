// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, checker, export, solver, submissions},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Builds the CORS layer from the configured origins.
/// Entries that are not valid header values are logged and skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::CONTENT_DISPOSITION])
}

/// Assembles the main application router.
///
/// * Public: register and login.
/// * Everything else sits behind the JWT middleware.
/// * Applies global middleware (body limit, Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        // Protected auth routes
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .route("/stats", get(auth::stats))
                .route_layer(auth_layer.clone()),
        );

    let protected_routes = Router::new()
        .route("/solve", post(solver::solve))
        .route("/check", post(checker::check))
        .route("/submissions", get(submissions::list_submissions))
        .route("/submissions/{id}", get(submissions::get_submission))
        .route("/submissions/{id}/docx", get(submissions::submission_docx))
        .route("/export/docx", post(export::export_docx))
        .route_layer(auth_layer);

    let cors = cors_layer(&state.config.cors_origins);
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api", protected_routes)
        // Global Middleware (applied from inside out)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
