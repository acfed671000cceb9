//! `WebSocket` record stream.
//!
//! Clients connect to `GET /ws/records` and receive one JSON-encoded
//! [`RecordBroadcast`] per recorded step, in step order and without gaps.
//! Connecting with `?from=N` first replays every mirrored record from
//! step `N`; without it the stream starts at the next live step.
//!
//! The broadcast channel is bounded, so a slow client can miss live
//! messages. Each connection keeps a [`RecordCursor`] and fills any gap
//! from the mirrored history in the [`ObserverSnapshot`] before sending
//! the next live record.
//!
//! [`ObserverSnapshot`]: crate::state::ObserverSnapshot

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use cogmetrics_types::MetricRecord;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::{AppState, RecordBroadcast};

/// Query parameters for the `GET /ws/records` endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct StreamQuery {
    /// Replay mirrored history from this step before going live.
    pub from: Option<u64>,
}

/// Tracks the next step a client should receive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCursor {
    next: Option<u64>,
}

impl RecordCursor {
    /// Start at whatever step arrives first.
    pub const fn live() -> Self {
        Self { next: None }
    }

    /// Start at `step`, replaying history up to the live stream.
    pub const fn from_step(step: u64) -> Self {
        Self { next: Some(step) }
    }

    /// The next step this client expects, if it has been fixed yet.
    pub const fn next_step(&self) -> Option<u64> {
        self.next
    }

    /// Every mirrored record from the cursor onward. Advances the cursor
    /// past the last one returned.
    pub fn backlog(&mut self, records: &[MetricRecord]) -> Vec<RecordBroadcast> {
        self.backlog_until(records, u64::MAX)
    }

    /// Frames to send for a live record: any mirrored records the client
    /// missed before it, then the record itself. Records the client has
    /// already received yield nothing.
    pub fn admit(
        &mut self,
        record: RecordBroadcast,
        records: &[MetricRecord],
    ) -> Vec<RecordBroadcast> {
        if self.next.is_some_and(|next| record.step < next) {
            return Vec::new();
        }
        let mut frames = self.backlog_until(records, record.step);
        self.next = Some(record.step.saturating_add(1));
        frames.push(record);
        frames
    }

    fn backlog_until(&mut self, records: &[MetricRecord], end: u64) -> Vec<RecordBroadcast> {
        let Some(next) = self.next else {
            return Vec::new();
        };
        let start = usize::try_from(next).unwrap_or(usize::MAX);
        let frames: Vec<RecordBroadcast> = records
            .get(start..)
            .unwrap_or_default()
            .iter()
            .take_while(|r| r.step < end)
            .map(RecordBroadcast::from)
            .collect();
        if let Some(last) = frames.last() {
            self.next = Some(last.step.saturating_add(1));
        }
        frames
    }
}

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming records.
///
/// # Route
///
/// `GET /ws/records?from=N`
pub async fn ws_records(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<StreamQuery>,
) -> impl IntoResponse {
    let cursor = params
        .from
        .map_or_else(RecordCursor::live, RecordCursor::from_step);
    ws.on_upgrade(move |socket| stream_records(socket, state, cursor))
}

async fn stream_records(mut socket: WebSocket, state: Arc<AppState>, mut cursor: RecordCursor) {
    // Subscribe before reading the backlog so no step falls between them.
    let mut rx = state.subscribe();
    debug!(from = ?cursor.next_step(), "Record stream client connected");

    let replay = cursor.backlog(&state.snapshot.read().await.records);
    if !send_frames(&mut socket, &replay).await {
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                let frames = match result {
                    Ok(record) => cursor.admit(record, &state.snapshot.read().await.records),
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, next = ?cursor.next_step(), "Record stream lagged, replaying from history");
                        cursor.backlog(&state.snapshot.read().await.records)
                    }
                    Err(RecvError::Closed) => {
                        debug!("Broadcast channel closed, ending record stream");
                        return;
                    }
                };
                if !send_frames(&mut socket, &frames).await {
                    return;
                }
            }
            msg = socket.recv() => match msg {
                Some(Ok(Message::Ping(data))) => {
                    if socket.send(Message::Pong(data)).await.is_err() {
                        return;
                    }
                }
                Some(Ok(Message::Close(_)) | Err(_)) | None => {
                    debug!("Record stream client disconnected");
                    return;
                }
                Some(Ok(_)) => {}
            }
        }
    }
}

/// Send frames in order. Returns `false` once the client is gone.
async fn send_frames(socket: &mut WebSocket, frames: &[RecordBroadcast]) -> bool {
    for frame in frames {
        let json = match serde_json::to_string(frame) {
            Ok(json) => json,
            Err(e) => {
                warn!(step = frame.step, "Failed to serialize record: {e}");
                continue;
            }
        };
        if socket.send(Message::Text(json.into())).await.is_err() {
            debug!(step = frame.step, "Record stream send failed");
            return false;
        }
    }
    true
}
