use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use domain::protocol::{ProfileMap, ProfilesRequest, UpsertProfileRequest, REQUESTING_USER_HEADER};
use domain::{AuthorProfile, UserId};

use super::{internal, ApiError};
use crate::state::AppState;

const MAX_BATCH: usize = 100;

pub async fn batch_profiles(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ProfilesRequest>,
) -> Result<Json<ProfileMap>, ApiError> {
    let requester = headers
        .get(REQUESTING_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or((
            StatusCode::UNAUTHORIZED,
            "Missing requesting user".to_string(),
        ))?;

    if payload.author_ids.len() > MAX_BATCH {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("At most {} author ids per request", MAX_BATCH),
        ));
    }

    tracing::debug!(
        "{} resolving {} profile(s)",
        requester,
        payload.author_ids.len()
    );
    let profiles = state
        .db
        .get_profiles(&payload.author_ids)
        .await
        .map_err(internal)?;

    Ok(Json(profiles))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Option<AuthorProfile>>, ApiError> {
    let profile = state
        .db
        .get_profile(&UserId::new(user_id))
        .await
        .map_err(internal)?;
    Ok(Json(profile))
}

pub async fn put_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<UpsertProfileRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .db
        .upsert_profile(
            &UserId::new(user_id),
            payload.display_name.as_deref(),
            payload.avatar_ref.as_deref(),
        )
        .await
        .map_err(internal)?;
    Ok(StatusCode::NO_CONTENT)
}
