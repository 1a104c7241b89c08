use domain::protocol::{CommentPage, ProfileMap, ReplyCounts};
use domain::{
    AuthorProfile, Comment, CommentId, CommentView, PostId, UserId, COMMENT_PAGE_SIZE,
    REPLY_PAGE_SIZE,
};
use std::collections::{HashMap, HashSet};
use tokio_util::sync::CancellationToken;

/// Visibility of one top-level comment's replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpansionState {
    #[default]
    Collapsed,
    Loading,
    Expanded,
}

#[derive(Debug, Clone, Default)]
pub struct RepliesState {
    pub expansion: ExpansionState,
    pub replies: Vec<CommentView>,
    pub offset: usize,
    pub has_more: bool,
    /// Set once a reply page has been fetched successfully.
    pub loaded: bool,
    pub(crate) in_flight: bool,
    /// Replies written here that no fetched page has returned yet. They
    /// stay at the end of `replies`.
    pub(crate) local: usize,
}

pub(crate) struct Session {
    pub post_id: PostId,
    pub token: CancellationToken,
}

/// Everything the manager shows for one open post.
#[derive(Default)]
pub(crate) struct ThreadState {
    pub session: Option<Session>,
    pub comments: Vec<CommentView>,
    pub offset: usize,
    pub total_count: Option<u64>,
    /// `None` until the first page lands.
    pub has_more: Option<bool>,
    pub page_in_flight: bool,
    pub replies: HashMap<CommentId, RepliesState>,
    pub authors: HashMap<UserId, AuthorProfile>,
}

impl ThreadState {
    pub fn author_for(&self, id: &UserId) -> AuthorProfile {
        self.authors
            .get(id)
            .cloned()
            .unwrap_or_else(AuthorProfile::placeholder)
    }

    pub fn has_comment(&self, id: &CommentId) -> bool {
        self.comments.iter().any(|c| c.id() == id)
    }

    fn view(&self, comment: Comment, reply_count: u64) -> CommentView {
        let author = self.author_for(&comment.author_id);
        CommentView {
            comment,
            author,
            reply_count,
        }
    }

    pub fn apply_page(
        &mut self,
        offset: usize,
        append: bool,
        page: CommentPage,
        counts: ReplyCounts,
        authors: ProfileMap,
    ) {
        self.authors.extend(authors);
        if let Some(total) = page.total_count {
            self.total_count = Some(total);
        }

        let fetched = page.items.len();
        let views: Vec<CommentView> = page
            .items
            .into_iter()
            .map(|c| {
                let n = counts.get(&c.id).copied().unwrap_or(0);
                self.view(c, n)
            })
            .collect();

        if append {
            let seen: HashSet<CommentId> = self.comments.iter().map(|v| v.id().clone()).collect();
            self.comments
                .extend(views.into_iter().filter(|v| !seen.contains(v.id())));
        } else {
            self.comments = views;
        }

        self.offset = offset.saturating_add(fetched);
        // 没拿到过总数时，只能按页大小猜
        self.has_more = Some(match self.total_count {
            Some(total) => (self.offset as u64) < total,
            None => fetched >= COMMENT_PAGE_SIZE,
        });
    }

    pub fn apply_replies(
        &mut self,
        comment_id: &CommentId,
        offset: usize,
        append: bool,
        replies: Vec<Comment>,
        authors: ProfileMap,
    ) {
        self.authors.extend(authors);
        let fetched = replies.len();
        let views: Vec<CommentView> = replies.into_iter().map(|c| self.view(c, 0)).collect();

        let entry = self.replies.entry(comment_id.clone()).or_default();
        entry.in_flight = false;

        let split = entry.replies.len().saturating_sub(entry.local);
        let local = entry.replies.split_off(split);
        if !append {
            entry.replies.clear();
        }
        let seen: HashSet<CommentId> = entry.replies.iter().map(|v| v.id().clone()).collect();
        entry
            .replies
            .extend(views.into_iter().filter(|v| !seen.contains(v.id())));

        // 已取回的本地回复不再重复，其余仍排在最后
        let seen: HashSet<CommentId> = entry.replies.iter().map(|v| v.id().clone()).collect();
        let pending: Vec<CommentView> =
            local.into_iter().filter(|v| !seen.contains(v.id())).collect();
        entry.local = pending.len();
        entry.replies.extend(pending);

        entry.offset = offset.saturating_add(fetched);
        // 回复没有总数：满页就认为还有更多
        entry.has_more = fetched >= REPLY_PAGE_SIZE;
        entry.loaded = true;
        if entry.expansion == ExpansionState::Loading {
            entry.expansion = ExpansionState::Expanded;
        }
    }

    pub fn prepend_comment(&mut self, view: CommentView) {
        self.comments.insert(0, view);
        // 总数未知时保持未知，等下一次首页
        if let Some(total) = self.total_count.as_mut() {
            *total += 1;
        }
    }

    pub fn append_reply(&mut self, comment_id: &CommentId, view: CommentView) {
        let mut previous = 0;
        if let Some(parent) = self.comments.iter_mut().find(|c| c.id() == comment_id) {
            previous = parent.reply_count;
            parent.reply_count += 1;
        }

        let entry = self.replies.entry(comment_id.clone()).or_default();
        if !entry.loaded && previous > 0 {
            entry.has_more = true;
        }
        entry.replies.push(view);
        entry.local += 1;
        entry.expansion = ExpansionState::Expanded;
    }
}
