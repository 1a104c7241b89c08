use anyhow::Result;
use async_trait::async_trait;
use domain::protocol::{CommentPage, ProfileMap, ReplyCounts};
use domain::{AuthorProfile, Comment, CommentId, CommentView, NewComment, PostId, UserId};

/// Read/write access to persisted comments.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Newest first; `total_count` is expected when `offset == 0`.
    async fn fetch_top_level_comments(
        &self,
        post_id: &PostId,
        offset: usize,
        limit: usize,
    ) -> Result<CommentPage>;

    async fn fetch_reply_counts(
        &self,
        post_id: &PostId,
        comment_ids: &[CommentId],
    ) -> Result<ReplyCounts>;

    /// Oldest first.
    async fn fetch_replies(
        &self,
        comment_id: &CommentId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Comment>>;

    async fn insert_comment(&self, new: &NewComment) -> Result<Comment>;
}

/// Resolves user ids to display profiles.
#[async_trait]
pub trait AuthorDirectory: Send + Sync {
    async fn resolve_author_profiles(
        &self,
        requesting_user: &UserId,
        author_ids: &[UserId],
    ) -> Result<ProfileMap>;

    async fn resolve_single_profile(&self, author_id: &UserId) -> Result<Option<AuthorProfile>>;
}

/// Told about every comment or reply the thread manager persisted, so
/// counters outside the thread can follow along without querying the store.
pub trait ThreadListener: Send + Sync {
    fn comment_added(&self, comment: &CommentView, parent_comment_id: Option<&CommentId>);
}
