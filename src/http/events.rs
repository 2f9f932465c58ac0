//! Server-sent change feed.
//!
//! Replaces client-side polling: every storage mutation is pushed as one SSE
//! event named after the collection it touched. Lagged subscribers are
//! silently resynced by dropping the missed events; clients re-list on
//! reconnect anyway.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

use super::AppState;

pub async fn stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.changes.subscribe()).filter_map(|item| async move {
        match item {
            Ok(change) => {
                let event = Event::default().event(change.collection);
                match event.json_data(&change) {
                    Ok(event) => Some(Ok(event)),
                    Err(err) => {
                        tracing::warn!(error = %err, "dropping unserializable change event");
                        None
                    }
                }
            }
            Err(BroadcastStreamRecvError::Lagged(missed)) => {
                tracing::debug!(missed, "change feed subscriber lagged");
                None
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
