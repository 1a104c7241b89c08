use anyhow::{Context, Result};
use async_trait::async_trait;
use domain::protocol::{CommentPage, ProfileMap, ReplyCounts};
use domain::{AuthorProfile, Comment, CommentId, NewComment, PostId, UserId};
use storage::Db;

use crate::traits::{AuthorDirectory, ContentStore};

/// Collaborators backed directly by the local database.
#[derive(Clone)]
pub struct DbStore {
    db: Db,
}

impl DbStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

/// SQLite reads a negative OFFSET as 0, so out-of-range values must not wrap.
fn window(offset: usize, limit: usize) -> Result<(i64, i64)> {
    let offset = i64::try_from(offset).with_context(|| format!("offset {} out of range", offset))?;
    let limit = i64::try_from(limit).with_context(|| format!("limit {} out of range", limit))?;
    Ok((offset, limit))
}

#[async_trait]
impl ContentStore for DbStore {
    async fn fetch_top_level_comments(
        &self,
        post_id: &PostId,
        offset: usize,
        limit: usize,
    ) -> Result<CommentPage> {
        let (offset, limit) = window(offset, limit)?;
        let (items, total) = self.db.list_top_level(post_id, limit, offset).await?;
        Ok(CommentPage {
            items,
            total_count: total.map(|t| t.max(0) as u64),
        })
    }

    async fn fetch_reply_counts(
        &self,
        post_id: &PostId,
        comment_ids: &[CommentId],
    ) -> Result<ReplyCounts> {
        let counts = self.db.count_replies(post_id, comment_ids).await?;
        Ok(counts
            .into_iter()
            .map(|(id, n)| (id, n.max(0) as u64))
            .collect())
    }

    async fn fetch_replies(
        &self,
        comment_id: &CommentId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Comment>> {
        let (offset, limit) = window(offset, limit)?;
        self.db.list_replies(comment_id, limit, offset).await
    }

    async fn insert_comment(&self, new: &NewComment) -> Result<Comment> {
        self.db.insert_comment(new).await
    }
}

#[async_trait]
impl AuthorDirectory for DbStore {
    // 本地库没有行级权限，请求者身份只用于日志
    async fn resolve_author_profiles(
        &self,
        requesting_user: &UserId,
        author_ids: &[UserId],
    ) -> Result<ProfileMap> {
        tracing::debug!(
            "Resolving {} profile(s) for {}",
            author_ids.len(),
            requesting_user
        );
        self.db.get_profiles(author_ids).await
    }

    async fn resolve_single_profile(&self, author_id: &UserId) -> Result<Option<AuthorProfile>> {
        self.db.get_profile(author_id).await
    }
}
