use crate::models::{Comment, CommentId, PostId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommentEvent {
    Added {
        post_id: PostId,
        parent_comment_id: Option<CommentId>,
        comment: Comment,
    },
}

impl CommentEvent {
    pub fn added(comment: Comment) -> Self {
        CommentEvent::Added {
            post_id: comment.post_id.clone(),
            parent_comment_id: comment.parent_comment_id.clone(),
            comment,
        }
    }

    pub fn post_id(&self) -> &PostId {
        match self {
            CommentEvent::Added { post_id, .. } => post_id,
        }
    }
}
