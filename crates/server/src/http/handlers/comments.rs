use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::protocol::{CommentPage, NewCommentRequest, PageQuery, ReplyCounts, ReplyCountsRequest};
use domain::{
    Comment, CommentEvent, CommentId, NewComment, PostId, ValidationError, COMMENT_PAGE_SIZE,
    REPLY_PAGE_SIZE,
};

use super::{internal, ApiError};
use crate::state::AppState;

const MAX_COUNT_IDS: usize = 100;

fn parse_post_id(raw: String) -> Result<PostId, ApiError> {
    PostId::new(raw).map_err(|e| (StatusCode::BAD_REQUEST, e))
}

fn sql_offset(offset: usize) -> Result<i64, ApiError> {
    i64::try_from(offset)
        .map_err(|_| (StatusCode::BAD_REQUEST, format!("Offset {} out of range", offset)))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<CommentPage>, ApiError> {
    let post_id = parse_post_id(post_id)?;
    let limit = page.clamped_limit(COMMENT_PAGE_SIZE);
    let offset = sql_offset(page.offset)?;

    let (items, total) = state
        .db
        .list_top_level(&post_id, limit as i64, offset)
        .await
        .map_err(internal)?;

    Ok(Json(CommentPage {
        items,
        total_count: total.map(|t| t.max(0) as u64),
    }))
}

pub async fn post_comment(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Json(payload): Json<NewCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let post_id = parse_post_id(post_id)?;
    let new = NewComment {
        post_id,
        author_id: payload.author_id,
        text: payload.text,
        parent_comment_id: payload.parent_comment_id,
    };

    let comment = match state.db.insert_comment(&new).await {
        Ok(c) => c,
        Err(e) => {
            if let Some(v) = e.downcast_ref::<ValidationError>() {
                return Err((StatusCode::BAD_REQUEST, v.to_string()));
            }
            return Err(internal(e));
        }
    };

    tracing::info!(
        "Comment {} saved on post {} (reply: {})",
        comment.id,
        comment.post_id,
        comment.is_reply()
    );
    if state
        .tx_events
        .send(CommentEvent::added(comment.clone()))
        .is_err()
    {
        tracing::debug!("No subscribers for comment {}", comment.id);
    }

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn reply_counts(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Json(payload): Json<ReplyCountsRequest>,
) -> Result<Json<ReplyCounts>, ApiError> {
    let post_id = parse_post_id(post_id)?;
    if payload.comment_ids.len() > MAX_COUNT_IDS {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("At most {} comment ids per request", MAX_COUNT_IDS),
        ));
    }

    let counts = state
        .db
        .count_replies(&post_id, &payload.comment_ids)
        .await
        .map_err(internal)?;

    Ok(Json(
        counts
            .into_iter()
            .map(|(id, n)| (id, n.max(0) as u64))
            .collect(),
    ))
}

pub async fn list_replies(
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let limit = page.clamped_limit(REPLY_PAGE_SIZE);
    let offset = sql_offset(page.offset)?;
    let replies = state
        .db
        .list_replies(&CommentId::new(comment_id), limit as i64, offset)
        .await
        .map_err(internal)?;

    Ok(Json(replies))
}
