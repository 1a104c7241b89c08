use domain::protocol::{CommentPage, ProfileMap, ReplyCounts};
use domain::{
    validate_text, AuthorProfile, Comment, CommentId, CommentView, NewComment, PostId,
    ThreadError, UserId, ValidationError, COMMENT_PAGE_SIZE, REPLY_PAGE_SIZE,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::state::{ExpansionState, RepliesState, Session, ThreadState};
use crate::traits::{AuthorDirectory, ContentStore, ThreadListener};

/// Drives the two-level comment tree of one post: paginated top-level
/// comments, lazily fetched reply pages per comment, and local insertion of
/// whatever the viewer writes once the store has accepted it.
///
/// Reads fail soft: the error is logged and returned, and the displayed state
/// stays as it was. Writes fail closed: nothing is shown until the store has
/// acknowledged the insert.
pub struct ThreadManager<S, D> {
    store: Arc<S>,
    directory: Arc<D>,
    viewer: Option<UserId>,
    listeners: Vec<Arc<dyn ThreadListener>>,
    state: RwLock<ThreadState>,
}

impl<S, D> ThreadManager<S, D>
where
    S: ContentStore,
    D: AuthorDirectory,
{
    pub fn new(store: Arc<S>, directory: Arc<D>) -> Self {
        Self {
            store,
            directory,
            viewer: None,
            listeners: Vec::new(),
            state: RwLock::new(ThreadState::default()),
        }
    }

    /// Identity used when asking the directory for author profiles.
    pub fn with_viewer(mut self, viewer: UserId) -> Self {
        self.viewer = Some(viewer);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn ThreadListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    // --- 生命周期 ---

    pub async fn open_thread(&self, post_id: PostId) -> Result<(), ThreadError> {
        {
            let mut st = self.state.write().await;
            if let Some(old) = st.session.take() {
                old.token.cancel();
            }
            *st = ThreadState::default();
            st.session = Some(Session {
                post_id: post_id.clone(),
                token: CancellationToken::new(),
            });
        }
        info!("Opened comment thread for post {}", post_id);
        self.load_page(0, false).await
    }

    /// Late results from requests still in flight are dropped.
    pub async fn close_thread(&self) {
        let mut st = self.state.write().await;
        if let Some(old) = st.session.take() {
            old.token.cancel();
            info!("Closed comment thread for post {}", old.post_id);
        }
        *st = ThreadState::default();
    }

    // --- 顶层评论 ---

    pub async fn load_page(&self, offset: usize, append: bool) -> Result<(), ThreadError> {
        let (post_id, token) = {
            let mut st = self.state.write().await;
            let session = st.session.as_ref().ok_or(ThreadError::NoThread)?;
            let current = (session.post_id.clone(), session.token.clone());
            if st.page_in_flight {
                return Err(ThreadError::Busy);
            }
            st.page_in_flight = true;
            current
        };

        let result = self.fetch_page(&post_id, offset).await;

        let mut st = self.state.write().await;
        if token.is_cancelled() {
            debug!("Discarding page at offset {} for closed thread {}", offset, post_id);
            return Ok(());
        }
        st.page_in_flight = false;
        match result {
            Ok((page, counts, authors)) => {
                st.apply_page(offset, append, page, counts, authors);
                debug!(
                    "Post {}: {} comment(s) shown, offset {}, has_more {:?}",
                    post_id,
                    st.comments.len(),
                    st.offset,
                    st.has_more
                );
                Ok(())
            }
            Err(e) => {
                warn!("Failed to load comments for post {} at offset {}: {:#}", post_id, offset, e);
                Err(ThreadError::TransientFetch(format!("{:#}", e)))
            }
        }
    }

    /// Next page after the cursor. No-op once the store is exhausted.
    pub async fn load_more(&self) -> Result<(), ThreadError> {
        let offset = {
            let st = self.state.read().await;
            if st.session.is_none() {
                return Err(ThreadError::NoThread);
            }
            if st.has_more == Some(false) {
                return Ok(());
            }
            st.offset
        };
        self.load_page(offset, true).await
    }

    async fn fetch_page(
        &self,
        post_id: &PostId,
        offset: usize,
    ) -> anyhow::Result<(CommentPage, ReplyCounts, ProfileMap)> {
        let page = self
            .store
            .fetch_top_level_comments(post_id, offset, COMMENT_PAGE_SIZE)
            .await?;

        let ids: Vec<CommentId> = page.items.iter().map(|c| c.id.clone()).collect();
        let counts = if ids.is_empty() {
            ReplyCounts::new()
        } else {
            match self.store.fetch_reply_counts(post_id, &ids).await {
                Ok(counts) => counts,
                Err(e) => {
                    warn!("Reply counts unavailable for post {}: {:#}", post_id, e);
                    ReplyCounts::new()
                }
            }
        };

        let authors = self.resolve_authors(&page.items).await;
        Ok((page, counts, authors))
    }

    pub async fn submit_comment(
        &self,
        text: &str,
        author: Option<&UserId>,
    ) -> Result<CommentView, ThreadError> {
        let author = author.ok_or(ValidationError::MissingAuthor)?;
        let text = validate_text(text)?;
        let (post_id, token) = self.current_session().await?;

        let new = NewComment {
            post_id,
            author_id: author.clone(),
            text,
            parent_comment_id: None,
        };
        let view = self.persist(&new).await?;

        {
            let mut st = self.state.write().await;
            if token.is_cancelled() {
                debug!("Comment {} saved after its thread was closed", view.id());
                return Ok(view);
            }
            st.prepend_comment(view.clone());
        }
        self.notify(&view, None);
        Ok(view)
    }

    // --- 回复 ---

    pub async fn expand_replies(&self, comment_id: &CommentId) -> Result<(), ThreadError> {
        let needs_load = {
            let mut st = self.state.write().await;
            if st.session.is_none() {
                return Err(ThreadError::NoThread);
            }
            if !st.has_comment(comment_id) {
                return Err(ThreadError::UnknownComment(comment_id.to_string()));
            }
            let entry = st.replies.entry(comment_id.clone()).or_default();
            match entry.expansion {
                ExpansionState::Loading => return Ok(()),
                ExpansionState::Expanded => {
                    entry.expansion = ExpansionState::Collapsed;
                    false
                }
                ExpansionState::Collapsed if entry.loaded => {
                    entry.expansion = ExpansionState::Expanded;
                    false
                }
                ExpansionState::Collapsed => {
                    entry.expansion = ExpansionState::Loading;
                    true
                }
            }
        };

        if needs_load {
            self.load_replies(comment_id, 0, false).await?;
        }
        Ok(())
    }

    pub async fn load_replies(
        &self,
        comment_id: &CommentId,
        offset: usize,
        append: bool,
    ) -> Result<(), ThreadError> {
        let token = {
            let mut st = self.state.write().await;
            let token = st
                .session
                .as_ref()
                .map(|s| s.token.clone())
                .ok_or(ThreadError::NoThread)?;
            if !st.has_comment(comment_id) {
                return Err(ThreadError::UnknownComment(comment_id.to_string()));
            }
            let entry = st.replies.entry(comment_id.clone()).or_default();
            if entry.in_flight {
                return Err(ThreadError::Busy);
            }
            entry.in_flight = true;
            token
        };

        let result = match self
            .store
            .fetch_replies(comment_id, offset, REPLY_PAGE_SIZE)
            .await
        {
            Ok(replies) => {
                let authors = self.resolve_authors(&replies).await;
                Ok((replies, authors))
            }
            Err(e) => Err(e),
        };

        let mut st = self.state.write().await;
        if token.is_cancelled() {
            debug!("Discarding replies of {} for closed thread", comment_id);
            return Ok(());
        }
        match result {
            Ok((replies, authors)) => {
                st.apply_replies(comment_id, offset, append, replies, authors);
                Ok(())
            }
            Err(e) => {
                let entry = st.replies.entry(comment_id.clone()).or_default();
                entry.in_flight = false;
                // 首次加载失败时回到折叠态，下次展开会重试
                if entry.expansion == ExpansionState::Loading {
                    entry.expansion = ExpansionState::Collapsed;
                }
                warn!("Failed to load replies of {} at offset {}: {:#}", comment_id, offset, e);
                Err(ThreadError::TransientFetch(format!("{:#}", e)))
            }
        }
    }

    pub async fn load_more_replies(&self, comment_id: &CommentId) -> Result<(), ThreadError> {
        let (offset, append) = {
            let st = self.state.read().await;
            match st.replies.get(comment_id) {
                Some(entry) if entry.loaded => (entry.offset, true),
                _ => (0, false),
            }
        };
        self.load_replies(comment_id, offset, append).await
    }

    pub async fn submit_reply(
        &self,
        comment_id: &CommentId,
        text: &str,
        author: Option<&UserId>,
    ) -> Result<CommentView, ThreadError> {
        let author = author.ok_or(ValidationError::MissingAuthor)?;
        let text = validate_text(text)?;
        let (post_id, token) = {
            let st = self.state.read().await;
            let session = st.session.as_ref().ok_or(ThreadError::NoThread)?;
            if !st.has_comment(comment_id) {
                return Err(ThreadError::UnknownComment(comment_id.to_string()));
            }
            (session.post_id.clone(), session.token.clone())
        };

        let new = NewComment {
            post_id,
            author_id: author.clone(),
            text,
            parent_comment_id: Some(comment_id.clone()),
        };
        let view = self.persist(&new).await?;

        {
            let mut st = self.state.write().await;
            if token.is_cancelled() {
                debug!("Reply {} saved after its thread was closed", view.id());
                return Ok(view);
            }
            st.append_reply(comment_id, view.clone());
        }
        self.notify(&view, Some(comment_id));
        Ok(view)
    }

    // --- 内部 ---

    async fn current_session(&self) -> Result<(PostId, CancellationToken), ThreadError> {
        let st = self.state.read().await;
        st.session
            .as_ref()
            .map(|s| (s.post_id.clone(), s.token.clone()))
            .ok_or(ThreadError::NoThread)
    }

    /// Inserts, then builds the view from the author's own profile.
    async fn persist(&self, new: &NewComment) -> Result<CommentView, ThreadError> {
        let comment = self.store.insert_comment(new).await.map_err(|e| {
            error!("Failed to save comment on post {}: {:#}", new.post_id, e);
            ThreadError::WriteFailure(format!("{:#}", e))
        })?;

        let author = self.own_profile(&new.author_id).await;
        Ok(CommentView {
            comment,
            author,
            reply_count: 0,
        })
    }

    async fn own_profile(&self, author_id: &UserId) -> AuthorProfile {
        if let Some(p) = self.state.read().await.authors.get(author_id) {
            return p.clone();
        }

        match self.directory.resolve_single_profile(author_id).await {
            Ok(Some(profile)) => {
                self.state
                    .write()
                    .await
                    .authors
                    .insert(author_id.clone(), profile.clone());
                profile
            }
            Ok(None) => {
                warn!("No profile for author {}, using placeholder", author_id);
                AuthorProfile::placeholder()
            }
            Err(e) => {
                warn!("Profile lookup failed for author {}: {:#}", author_id, e);
                AuthorProfile::placeholder()
            }
        }
    }

    /// Resolves the authors of `comments` that are not cached yet. Anything
    /// that cannot be resolved is left out and renders as the placeholder.
    async fn resolve_authors(&self, comments: &[Comment]) -> ProfileMap {
        let missing: Vec<UserId> = {
            let st = self.state.read().await;
            let mut seen = HashSet::new();
            let missing = comments
                .iter()
                .map(|c| &c.author_id)
                .filter(|id| !st.authors.contains_key(*id) && seen.insert(*id))
                .cloned()
                .collect();
            missing
        };
        if missing.is_empty() {
            return ProfileMap::new();
        }

        let Some(viewer) = &self.viewer else {
            warn!("No signed-in viewer, {} author(s) shown as placeholder", missing.len());
            return ProfileMap::new();
        };

        match self.directory.resolve_author_profiles(viewer, &missing).await {
            Ok(found) => {
                let gaps = missing.iter().filter(|id| !found.contains_key(*id)).count();
                if gaps > 0 {
                    warn!("{} author(s) could not be resolved, using placeholder", gaps);
                }
                found
            }
            Err(e) => {
                warn!("Author resolution failed for {} id(s): {:#}", missing.len(), e);
                ProfileMap::new()
            }
        }
    }

    fn notify(&self, view: &CommentView, parent: Option<&CommentId>) {
        for listener in &self.listeners {
            listener.comment_added(view, parent);
        }
    }

    // --- 只读访问 ---

    pub async fn post_id(&self) -> Option<PostId> {
        let st = self.state.read().await;
        st.session.as_ref().map(|s| s.post_id.clone())
    }

    pub async fn comments(&self) -> Vec<CommentView> {
        self.state.read().await.comments.clone()
    }

    pub async fn has_more(&self) -> Option<bool> {
        self.state.read().await.has_more
    }

    pub async fn offset(&self) -> usize {
        self.state.read().await.offset
    }

    pub async fn total_count(&self) -> Option<u64> {
        self.state.read().await.total_count
    }

    pub async fn expansion(&self, comment_id: &CommentId) -> ExpansionState {
        self.state
            .read()
            .await
            .replies
            .get(comment_id)
            .map(|r| r.expansion)
            .unwrap_or_default()
    }

    pub async fn replies(&self, comment_id: &CommentId) -> Vec<CommentView> {
        self.state
            .read()
            .await
            .replies
            .get(comment_id)
            .map(|r| r.replies.clone())
            .unwrap_or_default()
    }

    pub async fn has_more_replies(&self, comment_id: &CommentId) -> bool {
        self.state
            .read()
            .await
            .replies
            .get(comment_id)
            .is_some_and(|r| r.has_more)
    }

    pub async fn replies_state(&self, comment_id: &CommentId) -> Option<RepliesState> {
        self.state.read().await.replies.get(comment_id).cloned()
    }
}
