use axum::http::StatusCode;

pub mod comments;
pub mod profiles;
pub mod sse;

pub type ApiError = (StatusCode, String);

pub(crate) fn internal(e: anyhow::Error) -> ApiError {
    tracing::error!("Internal error: {:#}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Server Error".to_string(),
    )
}
