use anyhow::{bail, Result};
use async_trait::async_trait;
use domain::protocol::{
    CommentPage, NewCommentRequest, ProfileMap, ProfilesRequest, ReplyCounts, ReplyCountsRequest,
    REQUESTING_USER_HEADER,
};
use domain::{AuthorProfile, Comment, CommentId, NewComment, PostId, UserId};
use reqwest::{Client, Response};

use crate::traits::{AuthorDirectory, ContentStore};

/// Collaborators backed by the hosted data API (see the `server` crate).
#[derive(Clone)]
pub struct HttpStore {
    client: Client,
    base_url: String,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn checked(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    bail!("request failed ({}): {}", status, body)
}

#[async_trait]
impl ContentStore for HttpStore {
    async fn fetch_top_level_comments(
        &self,
        post_id: &PostId,
        offset: usize,
        limit: usize,
    ) -> Result<CommentPage> {
        let resp = self
            .client
            .get(self.url(&format!("/api/posts/{}/comments", post_id)))
            .query(&[("offset", offset), ("limit", limit)])
            .send()
            .await?;
        Ok(checked(resp).await?.json().await?)
    }

    async fn fetch_reply_counts(
        &self,
        post_id: &PostId,
        comment_ids: &[CommentId],
    ) -> Result<ReplyCounts> {
        let resp = self
            .client
            .post(self.url(&format!("/api/posts/{}/reply-counts", post_id)))
            .json(&ReplyCountsRequest {
                comment_ids: comment_ids.to_vec(),
            })
            .send()
            .await?;
        Ok(checked(resp).await?.json().await?)
    }

    async fn fetch_replies(
        &self,
        comment_id: &CommentId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Comment>> {
        let resp = self
            .client
            .get(self.url(&format!("/api/comments/{}/replies", comment_id)))
            .query(&[("offset", offset), ("limit", limit)])
            .send()
            .await?;
        Ok(checked(resp).await?.json().await?)
    }

    async fn insert_comment(&self, new: &NewComment) -> Result<Comment> {
        let payload = NewCommentRequest {
            author_id: new.author_id.clone(),
            text: new.text.clone(),
            parent_comment_id: new.parent_comment_id.clone(),
        };
        let resp = self
            .client
            .post(self.url(&format!("/api/posts/{}/comments", new.post_id)))
            .json(&payload)
            .send()
            .await?;
        Ok(checked(resp).await?.json().await?)
    }
}

#[async_trait]
impl AuthorDirectory for HttpStore {
    async fn resolve_author_profiles(
        &self,
        requesting_user: &UserId,
        author_ids: &[UserId],
    ) -> Result<ProfileMap> {
        let resp = self
            .client
            .post(self.url("/api/profiles/batch"))
            .header(REQUESTING_USER_HEADER, requesting_user.as_str())
            .json(&ProfilesRequest {
                author_ids: author_ids.to_vec(),
            })
            .send()
            .await?;
        Ok(checked(resp).await?.json().await?)
    }

    async fn resolve_single_profile(&self, author_id: &UserId) -> Result<Option<AuthorProfile>> {
        let resp = self
            .client
            .get(self.url(&format!("/api/profiles/{}", author_id)))
            .send()
            .await?;
        Ok(checked(resp).await?.json().await?)
    }
}
