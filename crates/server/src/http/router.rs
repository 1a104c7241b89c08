use super::handlers::{comments, profiles, sse};
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

const METHODS: [Method; 3] = [Method::GET, Method::POST, Method::PUT];

pub fn build_router(state: AppState, allowed_origins: &str) -> Router {
    let cors = if allowed_origins == "*" {
        CorsLayer::new()
            .allow_methods(METHODS)
            .allow_origin(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse::<HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("CORS config is invalid or empty, falling back to allow ANY.");
            CorsLayer::new()
                .allow_methods(METHODS)
                .allow_origin(Any)
                .allow_headers(Any)
        } else {
            tracing::info!("CORS enabled for origins: {:?}", origins);
            CorsLayer::new()
                .allow_methods(METHODS)
                .allow_origin(origins)
                .allow_headers(Any)
        }
    };

    Router::new()
        .route(
            "/api/posts/:post_id/comments",
            get(comments::list_comments).post(comments::post_comment),
        )
        .route("/api/posts/:post_id/reply-counts", post(comments::reply_counts))
        .route("/api/posts/:post_id/events", get(sse::sse_handler))
        .route("/api/comments/:comment_id/replies", get(comments::list_replies))
        .route("/api/profiles/batch", post(profiles::batch_profiles))
        .route(
            "/api/profiles/:user_id",
            get(profiles::get_profile).put(profiles::put_profile),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
