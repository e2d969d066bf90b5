//! Response body sink
//!
//! Bridges a [`ConnectionHandler`](super::ConnectionHandler) to an axum
//! response. The handler runs in its own task; the request handler waits for
//! the stream head, answers with it, and lets hyper pull the body from a
//! channel. hyper takes care of transfer encoding and writes every frame as
//! soon as it is received.

use std::io;

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

use super::handler::{StreamHead, StreamSink};

/// Frames buffered between the handler and hyper
const BODY_CAPACITY: usize = 1;

fn client_gone() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected")
}

/// Stream sink that feeds a streaming response body
#[derive(Debug)]
pub struct BodySink {
    head: Option<oneshot::Sender<StreamHead>>,
    body: Option<mpsc::Sender<io::Result<Bytes>>>,
}

/// The response side of a [`BodySink`]
#[derive(Debug)]
pub struct PendingResponse {
    head: oneshot::Receiver<StreamHead>,
    body: mpsc::Receiver<io::Result<Bytes>>,
}

impl BodySink {
    /// Create a connected sink and pending response
    pub fn channel() -> (BodySink, PendingResponse) {
        let (head_tx, head_rx) = oneshot::channel();
        let (body_tx, body_rx) = mpsc::channel(BODY_CAPACITY);

        (
            BodySink {
                head: Some(head_tx),
                body: Some(body_tx),
            },
            PendingResponse {
                head: head_rx,
                body: body_rx,
            },
        )
    }
}

impl StreamSink for BodySink {
    async fn start(&mut self, head: &StreamHead) -> io::Result<()> {
        let tx = self
            .head
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "stream head already sent"))?;
        tx.send(head.clone()).map_err(|_| client_gone())
    }

    async fn write_chunk(&mut self, chunk: Bytes) -> io::Result<()> {
        if chunk.is_empty() {
            return Ok(());
        }

        match &self.body {
            Some(body) => body.send(Ok(chunk)).await.map_err(|_| client_gone()),
            None => Err(client_gone()),
        }
    }

    async fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    async fn finish(&mut self) -> io::Result<()> {
        // Dropping the sender ends the body
        self.body = None;
        Ok(())
    }
}

impl PendingResponse {
    /// Wait for the stream head and build the streaming response
    ///
    /// Answers `500` if the handler gave up before sending a head.
    pub async fn into_response(self) -> Response {
        match self.head.await {
            Ok(head) => stream_response(&head, Body::from_stream(ReceiverStream::new(self.body))),
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

/// Response carrying the stream headers and `body`
///
/// No Content-Length is set; the body runs until the stream ends.
pub fn stream_response(head: &StreamHead, body: Body) -> Response {
    let content_type = match HeaderValue::from_str(&head.content_type) {
        Ok(value) => value,
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };

    (
        [
            (CONTENT_TYPE, content_type),
            (CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (CONNECTION, HeaderValue::from_static("keep-alive")),
        ],
        body,
    )
        .into_response()
}
