//! [`Transport`] backed by `reqwest`.

use futures_util::StreamExt;
use tracing::debug;

use crate::{
    error::SseError,
    transport::{Disposition, SseRequest, Transport, TransportBinding, TransportEvent, TransportSink},
};

/// Capacity of the per-binding notification channel.
const BINDING_CAPACITY: usize = 32;

/// HTTP transport using a shared [`reqwest::Client`].
///
/// Each [`issue_request`](Transport::issue_request) spawns a task on the
/// current tokio runtime that performs the request and pumps the body into
/// the binding until the body ends or the binding is cancelled.
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport around an existing client (for proxies, TLS
    /// settings, connection pools).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn issue_request(&self, request: SseRequest) -> TransportBinding {
        let (binding, sink) = TransportBinding::channel(BINDING_CAPACITY);
        tokio::spawn(drive_request(self.client.clone(), request, sink));
        binding
    }
}

async fn drive_request(client: reqwest::Client, request: SseRequest, sink: TransportSink) {
    let SseRequest {
        url,
        method,
        headers,
        body,
        timeout,
    } = request;
    debug!(url = %url, method = %method, "Issuing SSE request");

    let mut builder = client.request(method, &url).headers(headers);
    if let Some(body) = body {
        builder = builder.body(body);
    }

    let sent = tokio::select! {
        biased;
        _ = sink.cancelled() => return,
        sent = tokio::time::timeout(timeout, builder.send()) => sent,
    };
    let response = match sent {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            sink.send(TransportEvent::Completed(Some(SseError::transport(err))))
                .await;
            return;
        }
        Err(_) => {
            sink.send(TransportEvent::Completed(Some(SseError::timeout(timeout))))
                .await;
            return;
        }
    };

    let status = response.status();
    if sink.respond(status, response.headers().clone()).await == Disposition::Cancel {
        debug!(url = %url, status = %status, "SSE response cancelled by session");
        return;
    }

    let mut body = std::pin::pin!(response.bytes_stream());
    loop {
        let next = tokio::select! {
            biased;
            _ = sink.cancelled() => return,
            next = body.next() => next,
        };
        let event = match next {
            Some(Ok(chunk)) => TransportEvent::Chunk(chunk),
            Some(Err(err)) => TransportEvent::Completed(Some(SseError::transport(err))),
            None => TransportEvent::Completed(None),
        };
        let last = matches!(event, TransportEvent::Completed(_));
        if !sink.send(event).await || last {
            return;
        }
    }
}
