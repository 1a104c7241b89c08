use crate::models::{AuthorProfile, Comment, CommentId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Header carrying the identity on whose behalf profiles are resolved.
pub const REQUESTING_USER_HEADER: &str = "x-requesting-user";

pub const MAX_PAGE_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentPage {
    pub items: Vec<Comment>,
    // 只在 offset = 0 时返回
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
}

impl PageQuery {
    pub fn clamped_limit(&self, default: usize) -> usize {
        self.limit.unwrap_or(default).clamp(1, MAX_PAGE_LIMIT)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCommentRequest {
    pub author_id: UserId,
    pub text: String,
    pub parent_comment_id: Option<CommentId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyCountsRequest {
    pub comment_ids: Vec<CommentId>,
}

pub type ReplyCounts = HashMap<CommentId, u64>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilesRequest {
    pub author_ids: Vec<UserId>,
}

pub type ProfileMap = HashMap<UserId, AuthorProfile>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertProfileRequest {
    pub display_name: Option<String>,
    pub avatar_ref: Option<String>,
}
