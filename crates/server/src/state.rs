use axum::extract::FromRef;
use domain::CommentEvent;
use storage::Db;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    // 新评论广播，供 SSE 订阅
    pub tx_events: broadcast::Sender<CommentEvent>,
}

impl AppState {
    pub fn new(db: Db) -> Self {
        let (tx_events, _rx) = broadcast::channel(100);
        Self { db, tx_events }
    }
}

impl FromRef<AppState> for Db {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
