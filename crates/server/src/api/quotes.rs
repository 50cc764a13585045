//! # Quote API
//!
//! Reads the rotator's latest value. Clients either poll (`/htmx/quote`,
//! `/api/v1/quote`) or subscribe to the SSE stream.

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html,
    },
    Json,
};
use ecoshelf_core::QuoteSnapshot;
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use std::convert::Infallible;
use std::time::Duration;
use utoipa::ToSchema;

use crate::SharedState;

const HEARTBEAT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize, ToSchema)]
pub struct QuoteResponse {
    pub text: String,
    pub sequence: u64,
    /// RFC 3339 timestamp of the rotation
    pub rotated_at: String,
}

impl From<QuoteSnapshot> for QuoteResponse {
    fn from(snapshot: QuoteSnapshot) -> Self {
        Self {
            text: snapshot.text,
            sequence: snapshot.sequence,
            rotated_at: snapshot.rotated_at.to_rfc3339(),
        }
    }
}

fn quote_event(snapshot: QuoteSnapshot) -> Event {
    let json = serde_json::to_string(&QuoteResponse::from(snapshot)).unwrap_or_default();
    Event::default().event("quote").data(json)
}

/// Quote-box fragment polled by the page
pub async fn quote_fragment(State(state): State<SharedState>) -> Html<String> {
    Html(state.service.current_quote())
}

/// Current quote
#[utoipa::path(
    get,
    path = "/api/v1/quote",
    tag = "quotes",
    responses(
        (status = 200, description = "Latest rotated quote", body = QuoteResponse)
    )
)]
pub async fn get_quote(State(state): State<SharedState>) -> Json<QuoteResponse> {
    Json(state.service.quote_snapshot().into())
}

/// SSE stream: the current quote, then one event per rotation, with a
/// heartbeat comment while idle
pub async fn quote_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let feed = state.service.quote_feed();
    let initial = stream::once(futures::future::ready(Ok(quote_event(feed.current()))));

    let updates = stream::unfold(feed, |mut feed| async move {
        match tokio::time::timeout(HEARTBEAT, feed.changed()).await {
            Ok(Some(snapshot)) => Some((Ok(quote_event(snapshot)), feed)),
            Ok(None) => None, // Rotator stopped
            Err(_) => Some((Ok(Event::default().comment("heartbeat")), feed)),
        }
    });

    Sse::new(initial.chain(updates)).keep_alive(KeepAlive::default())
}
