use domain::{CommentEvent, CommentId, CommentView};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

use crate::traits::ThreadListener;

/// The "N comments" figure shown next to a post. Counts replies too.
#[derive(Debug, Default)]
pub struct CommentCounter {
    count: AtomicU64,
}

impl CommentCounter {
    pub fn new(initial: u64) -> Self {
        Self {
            count: AtomicU64::new(initial),
        }
    }

    pub fn get(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn set(&self, value: u64) {
        self.count.store(value, Ordering::Relaxed);
    }
}

impl ThreadListener for CommentCounter {
    fn comment_added(&self, _comment: &CommentView, _parent: Option<&CommentId>) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }
}

impl ThreadListener for broadcast::Sender<CommentEvent> {
    fn comment_added(&self, comment: &CommentView, _parent: Option<&CommentId>) {
        if self.send(CommentEvent::added(comment.comment.clone())).is_err() {
            debug!("No subscribers for comment {}", comment.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::{AuthorProfile, Comment, PostId, UserId};

    fn view(parent: Option<&str>) -> CommentView {
        CommentView {
            comment: Comment {
                id: CommentId::new("c9"),
                post_id: PostId::new("post-1").unwrap(),
                parent_comment_id: parent.map(CommentId::new),
                author_id: UserId::new("u1"),
                text: "Amin".to_string(),
                created_at: Utc::now().naive_utc(),
            },
            author: AuthorProfile::placeholder(),
            reply_count: 0,
        }
    }

    #[test]
    fn counter_counts_comments_and_replies() {
        let counter = CommentCounter::new(4);
        counter.comment_added(&view(None), None);
        let parent = CommentId::new("c1");
        counter.comment_added(&view(Some("c1")), Some(&parent));
        assert_eq!(counter.get(), 6);
    }

    #[tokio::test]
    async fn broadcast_listener_forwards_events() {
        let (tx, mut rx) = broadcast::channel(4);
        tx.comment_added(&view(None), None);

        let CommentEvent::Added {
            post_id,
            parent_comment_id,
            comment,
        } = rx.recv().await.unwrap();
        assert_eq!(post_id.as_str(), "post-1");
        assert!(parent_comment_id.is_none());
        assert_eq!(comment.text, "Amin");
    }
}
