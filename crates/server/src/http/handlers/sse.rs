use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};

use crate::state::AppState;

pub async fn sse_handler(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let rx = state.tx_events.subscribe();
    tracing::info!("SSE Connected: post={}", post_id);
    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) => {
            if event.post_id().as_str() != post_id {
                return None;
            }
            Some(
                Event::default()
                    .event("new_comment")
                    .json_data(&event)
                    .map_err(|e| {
                        tracing::error!("SSE serialization error: {}", e);
                        axum::Error::new(e)
                    }),
            )
        }
        Err(_lagged) => {
            tracing::warn!("SSE Client lagged for post {}", post_id);
            None
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::new().interval(std::time::Duration::from_secs(15)))
}
