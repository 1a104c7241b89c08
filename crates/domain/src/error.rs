use thiserror::Error;

pub const MAX_COMMENT_CHARS: usize = 2000;

/// Rejections that happen before (or instead of) any write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("comment text is empty")]
    EmptyText,
    #[error("comment text is too long ({len} chars, max {max})")]
    TextTooLong { len: usize, max: usize },
    #[error("an authenticated author is required")]
    MissingAuthor,
    #[error("parent comment {0} does not exist")]
    ParentNotFound(String),
    #[error("parent comment {0} belongs to another post")]
    ParentOnOtherPost(String),
    #[error("comment {0} is a reply and cannot be replied to")]
    NestedReply(String),
}

#[derive(Debug, Error)]
pub enum ThreadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("fetch failed: {0}")]
    TransientFetch(String),
    #[error("write failed: {0}")]
    WriteFailure(String),
    #[error("no thread is open")]
    NoThread,
    #[error("unknown comment {0}")]
    UnknownComment(String),
    #[error("a page load is already in flight")]
    Busy,
}

/// Trims `text` and checks it against the length bound.
pub fn validate_text(text: &str) -> Result<String, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyText);
    }
    let len = trimmed.chars().count();
    if len > MAX_COMMENT_CHARS {
        return Err(ValidationError::TextTooLong {
            len,
            max: MAX_COMMENT_CHARS,
        });
    }
    Ok(trimmed.to_string())
}
