mod error;
mod events;
mod models;
pub mod protocol;

pub use error::{validate_text, ThreadError, ValidationError, MAX_COMMENT_CHARS};
pub use events::CommentEvent;
pub use models::{
    AuthorProfile, Comment, CommentId, CommentView, NewComment, PostId, UserId,
    COMMENT_PAGE_SIZE, FALLBACK_DISPLAY_NAME, REPLY_PAGE_SIZE,
};
