//! Transport contract.
//!
//! A session never performs I/O itself. It hands an [`SseRequest`] to a
//! [`Transport`] and consumes the resulting [`TransportBinding`]: exactly one
//! [`TransportEvent::Response`], then zero or more
//! [`TransportEvent::Chunk`]s in network order, then exactly one
//! [`TransportEvent::Completed`].
//!
//! Implementations produce events through the [`TransportSink`] half returned
//! by [`TransportBinding::channel`].

use std::{
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use bytes::Bytes;
use futures_core::Stream;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::error::SseError;

/// One connection attempt, fully resolved.
#[derive(Clone, Debug)]
pub struct SseRequest {
    /// Endpoint URL.
    pub url: String,
    /// HTTP method.
    pub method: http::Method,
    /// Request headers, including `Accept` and `Last-Event-ID`.
    pub headers: http::HeaderMap,
    /// Optional request body.
    pub body: Option<Bytes>,
    /// Bound on establishing the connection and receiving the response head.
    pub timeout: Duration,
}

/// What the session wants done with a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Deliver the body.
    Allow,
    /// Drop the response without reading the body.
    Cancel,
}

/// The session's answer to a response head. Consumed by
/// [`allow`](Self::allow) or [`cancel`](Self::cancel); dropping it unanswered
/// counts as cancel.
#[derive(Debug)]
pub struct ResponseDecision {
    tx: oneshot::Sender<Disposition>,
}

/// Transport-side half of a [`ResponseDecision`].
#[derive(Debug)]
pub struct PendingDecision {
    rx: oneshot::Receiver<Disposition>,
}

impl ResponseDecision {
    /// Create a decision and the handle the transport waits on.
    pub fn new() -> (Self, PendingDecision) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, PendingDecision { rx })
    }

    /// Continue with the body.
    pub fn allow(self) {
        let _ = self.tx.send(Disposition::Allow);
    }

    /// Abandon the response.
    pub fn cancel(self) {
        let _ = self.tx.send(Disposition::Cancel);
    }
}

impl PendingDecision {
    /// Wait for the session's answer.
    pub async fn wait(self) -> Disposition {
        self.rx.await.unwrap_or(Disposition::Cancel)
    }
}

/// Status line and headers of a response.
#[derive(Debug)]
pub struct ResponseHead {
    /// HTTP status.
    pub status: http::StatusCode,
    /// Response headers.
    pub headers: http::HeaderMap,
    /// Answer channel; see [`ResponseDecision`].
    pub decision: ResponseDecision,
}

/// Notifications delivered by a transport binding.
#[derive(Debug)]
pub enum TransportEvent {
    /// The response head arrived.
    Response(ResponseHead),
    /// A body chunk, in network order.
    Chunk(Bytes),
    /// The binding finished, with the failure cause if any.
    Completed(Option<SseError>),
}

/// Producer half of a binding, owned by the transport.
#[derive(Clone, Debug)]
pub struct TransportSink {
    tx: mpsc::Sender<TransportEvent>,
    cancel: CancellationToken,
}

impl TransportSink {
    /// Deliver an event. Returns `false` once the binding was cancelled or
    /// dropped, after which the transport should stop.
    pub async fn send(&self, event: TransportEvent) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            res = self.tx.send(event) => res.is_ok(),
        }
    }

    /// Deliver a response head and wait for the session's decision.
    pub async fn respond(
        &self,
        status: http::StatusCode,
        headers: http::HeaderMap,
    ) -> Disposition {
        let (decision, pending) = ResponseDecision::new();
        let head = ResponseHead {
            status,
            headers,
            decision,
        };
        if !self.send(TransportEvent::Response(head)).await {
            return Disposition::Cancel;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Disposition::Cancel,
            disposition = pending.wait() => disposition,
        }
    }

    /// Resolves once the binding is cancelled or dropped.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// Whether the binding was cancelled or dropped.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Consumer half of a binding, owned by the session.
///
/// Cancelled when dropped.
#[derive(Debug)]
pub struct TransportBinding {
    rx: mpsc::Receiver<TransportEvent>,
    cancel: CancellationToken,
}

impl TransportBinding {
    /// Create a binding and the sink that feeds it.
    pub fn channel(capacity: usize) -> (Self, TransportSink) {
        let (tx, rx) = mpsc::channel(capacity);
        let cancel = CancellationToken::new();
        (
            Self {
                rx,
                cancel: cancel.clone(),
            },
            TransportSink { tx, cancel },
        )
    }

    /// Tear the binding down. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Receive the next notification.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        self.rx.recv().await
    }
}

impl Stream for TransportBinding {
    type Item = TransportEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for TransportBinding {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Something that can carry an [`SseRequest`] to a server.
pub trait Transport: Send + Sync + 'static {
    /// Start a request. Must not block; delivery happens through the
    /// returned binding.
    fn issue_request(&self, request: SseRequest) -> TransportBinding;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_flow_in_order() {
        let (mut binding, sink) = TransportBinding::channel(8);
        assert!(sink.send(TransportEvent::Chunk(Bytes::from_static(b"a"))).await);
        assert!(sink.send(TransportEvent::Completed(None)).await);
        drop(sink);

        assert!(matches!(binding.next_event().await, Some(TransportEvent::Chunk(c)) if c == "a"));
        assert!(matches!(
            binding.next_event().await,
            Some(TransportEvent::Completed(None))
        ));
        assert!(binding.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_respond_waits_for_decision() {
        let (mut binding, sink) = TransportBinding::channel(8);
        let transport = tokio::spawn(async move {
            sink.respond(http::StatusCode::OK, http::HeaderMap::new())
                .await
        });

        let Some(TransportEvent::Response(head)) = binding.next_event().await else {
            panic!("expected a response head");
        };
        assert_eq!(head.status, http::StatusCode::OK);
        head.decision.allow();

        assert_eq!(transport.await.expect("join"), Disposition::Allow);
    }

    #[tokio::test]
    async fn test_dropped_decision_counts_as_cancel() {
        let (decision, pending) = ResponseDecision::new();
        drop(decision);
        assert_eq!(pending.wait().await, Disposition::Cancel);

        let (decision, pending) = ResponseDecision::new();
        decision.cancel();
        assert_eq!(pending.wait().await, Disposition::Cancel);
    }

    #[tokio::test]
    async fn test_cancel_stops_the_sink() {
        let (binding, sink) = TransportBinding::channel(8);
        binding.cancel();
        binding.cancel();
        assert!(binding.is_cancelled());
        assert!(sink.is_cancelled());
        sink.cancelled().await;
        assert!(!sink.send(TransportEvent::Completed(None)).await);
    }

    #[tokio::test]
    async fn test_drop_cancels() {
        let (binding, sink) = TransportBinding::channel(8);
        drop(binding);
        assert!(sink.is_cancelled());
        assert_eq!(
            sink.respond(http::StatusCode::OK, http::HeaderMap::new())
                .await,
            Disposition::Cancel
        );
    }
}
