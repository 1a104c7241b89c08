use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const COMMENT_PAGE_SIZE: usize = 10;
pub const REPLY_PAGE_SIZE: usize = 5;
pub const FALLBACK_DISPLAY_NAME: &str = "Utilizator";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    pub fn new(s: impl Into<String>) -> Result<Self, String> {
        let s = s.into();
        if s.is_empty() {
            return Err("Post ID cannot be empty.".to_string());
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err("Post ID contains invalid characters.".to_string());
        }
        if s.len() > 128 {
            return Err("Post ID is too long (max 128 chars).".to_string());
        }
        Ok(Self(s))
    }

    pub fn new_unchecked(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(String);

impl CommentId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted comment. `parent_comment_id == None` means top-level;
/// replies never have replies of their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub parent_comment_id: Option<CommentId>,
    pub author_id: UserId,
    pub text: String,
    pub created_at: NaiveDateTime,
}

impl Comment {
    pub fn is_reply(&self) -> bool {
        self.parent_comment_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorProfile {
    pub display_name: String,
    pub avatar_ref: Option<String>,
}

impl AuthorProfile {
    /// Shown whenever an author cannot be resolved.
    pub fn placeholder() -> Self {
        Self {
            display_name: FALLBACK_DISPLAY_NAME.to_string(),
            avatar_ref: None,
        }
    }
}

/// A comment as displayed: the row, its resolved author and (for top-level
/// comments) the denormalized reply count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
    pub comment: Comment,
    pub author: AuthorProfile,
    pub reply_count: u64,
}

impl CommentView {
    pub fn id(&self) -> &CommentId {
        &self.comment.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    pub post_id: PostId,
    pub author_id: UserId,
    pub text: String,
    pub parent_comment_id: Option<CommentId>,
}
