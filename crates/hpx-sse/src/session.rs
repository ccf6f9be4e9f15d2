//! SSE session state machine.
//!
//! [`SseSession`] owns one logical connection. [`SseSession::events`] spawns a
//! driver task that issues requests through a [`Transport`], feeds body chunks
//! through a fresh parser per binding, tracks the last event id, and
//! reconnects with exponential backoff. The consumer reads
//! [`SessionEvent`]s from the returned [`SessionEvents`] stream.

use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use bytes_utils::Str;
use futures_util::{Stream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    config::SseConfig,
    error::{SseError, SseResult},
    handlers::GenericSseHandler,
    parse::{Event, ParseMode, decode_lossy},
    protocol::{EventParser, SseProtocolHandler},
    reconnect::calculate_backoff,
    transport::{SseRequest, Transport, TransportEvent},
    types::{ReadyState, SessionEvent},
};

/// State readable from the application while the driver runs.
#[derive(Debug, Default)]
struct SessionState {
    ready_state: ReadyState,
    last_event_id: Str,
    retry_count: u32,
    consumed: bool,
}

#[derive(Debug, Default)]
struct SessionShared {
    state: Mutex<SessionState>,
    cancel: CancellationToken,
}

// ---------------------------------------------------------------------------
// Public API: SseSession
// ---------------------------------------------------------------------------

/// One logical SSE connection.
///
/// Cloning yields another handle to the same session, e.g. to call
/// [`cancel`](Self::cancel) from a different task than the consumer.
pub struct SseSession<H = GenericSseHandler> {
    config: Arc<SseConfig>,
    transport: Arc<dyn Transport>,
    handler: Arc<H>,
    shared: Arc<SessionShared>,
}

impl<H> Clone for SseSession<H> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            transport: Arc::clone(&self.transport),
            handler: Arc::clone(&self.handler),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl SseSession {
    /// Create a session with the [`GenericSseHandler`].
    ///
    /// # Errors
    ///
    /// Returns [`SseError::Config`] if configuration validation fails.
    pub fn new<T: Transport>(config: SseConfig, transport: T) -> SseResult<Self> {
        Self::with_handler(config, transport, GenericSseHandler::new())
    }
}

impl<H: SseProtocolHandler> SseSession<H> {
    /// Create a session with a custom protocol handler.
    ///
    /// # Errors
    ///
    /// Returns [`SseError::Config`] if configuration validation fails.
    pub fn with_handler<T: Transport>(config: SseConfig, transport: T, handler: H) -> SseResult<Self> {
        config.validate().map_err(SseError::config)?;

        Ok(Self {
            config: Arc::new(config),
            transport: Arc::new(transport),
            handler: Arc::new(handler),
            shared: Arc::default(),
        })
    }

    /// Start the session and return its event sequence.
    ///
    /// Only the first call starts anything. Later calls return a sequence
    /// that yields a single [`SseError::AlreadyConsumed`] error. Calling this
    /// on a session that was cancelled before it started returns an empty
    /// sequence.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn events(&self) -> SessionEvents {
        {
            let mut state = self.shared.state.lock();
            if state.consumed {
                warn!(url = %self.config.url, "SSE session events requested twice");
                return SessionEvents::rejected(SseError::AlreadyConsumed);
            }
            state.consumed = true;
            if state.ready_state.is_closed() || self.shared.cancel.is_cancelled() {
                return SessionEvents::finished();
            }
            state.ready_state = ReadyState::Connecting;
        }

        let (event_tx, event_rx) = mpsc::channel(self.config.event_channel_capacity);
        let driver = SessionDriver {
            config: Arc::clone(&self.config),
            transport: Arc::clone(&self.transport),
            handler: Arc::clone(&self.handler),
            shared: Arc::clone(&self.shared),
            events: event_tx,
            responded: false,
        };
        tokio::spawn(driver.run());

        SessionEvents {
            rx: event_rx,
            cancel: Some(self.shared.cancel.clone()),
        }
    }

    /// Terminate the session.
    ///
    /// Tears down the current binding and any pending reconnect. Events not
    /// yet consumed are discarded and nothing is emitted afterwards.
    /// Idempotent.
    pub fn cancel(&self) {
        let first = !self.shared.cancel.is_cancelled();
        // The driver checks the token under the state lock before every
        // transition, so nothing overwrites `Closed` once this returns.
        self.shared.cancel.cancel();
        self.shared.state.lock().ready_state = ReadyState::Closed;
        if first {
            info!(url = %self.config.url, "SSE session cancelled");
        }
    }

    /// Current readiness.
    pub fn ready_state(&self) -> ReadyState {
        self.shared.state.lock().ready_state
    }

    /// Id of the most recent event that carried one; empty if none did.
    pub fn last_event_id(&self) -> Str {
        self.shared.state.lock().last_event_id.clone()
    }

    /// Reconnects attempted since the session was last open.
    pub fn retry_count(&self) -> u32 {
        self.shared.state.lock().retry_count
    }

    /// How frames are interpreted.
    pub fn mode(&self) -> ParseMode {
        self.config.mode
    }

    /// The configuration the session was created with.
    pub fn config(&self) -> &SseConfig {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// SessionEvents
// ---------------------------------------------------------------------------

/// Stream of [`SessionEvent`]s from an [`SseSession`].
///
/// Ends when the session terminates. After
/// [`cancel`](SseSession::cancel) it yields nothing further, even events that
/// were already queued.
#[derive(Debug)]
pub struct SessionEvents {
    rx: mpsc::Receiver<SessionEvent>,
    cancel: Option<CancellationToken>,
}

impl SessionEvents {
    fn rejected(err: SseError) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.try_send(SessionEvent::Error(err));
        Self { rx, cancel: None }
    }

    fn finished() -> Self {
        let (_, rx) = mpsc::channel(1);
        Self { rx, cancel: None }
    }

    /// Receive the next event, waiting until one is available.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.next().await
    }
}

impl Stream for SessionEvents {
    type Item = SessionEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this
            .cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
        {
            this.rx.close();
            return Poll::Ready(None);
        }
        this.rx.poll_recv(cx)
    }
}

// ---------------------------------------------------------------------------
// Internal: background driver
// ---------------------------------------------------------------------------

/// What happens after a transport binding ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindingOutcome {
    /// Issue a new request after backoff.
    Reconnect,
    /// Terminate and notify the consumer.
    Close,
    /// Terminate silently (cancelled, or nobody is listening).
    Stop,
}

struct SessionDriver<H> {
    config: Arc<SseConfig>,
    transport: Arc<dyn Transport>,
    handler: Arc<H>,
    shared: Arc<SessionShared>,
    events: mpsc::Sender<SessionEvent>,
    /// Whether any binding ever produced a response head.
    responded: bool,
}

impl<H: SseProtocolHandler> SessionDriver<H> {
    async fn run(mut self) {
        loop {
            match self.run_binding().await {
                BindingOutcome::Reconnect => {
                    if !self.backoff().await {
                        break;
                    }
                }
                BindingOutcome::Close => {
                    self.close().await;
                    return;
                }
                BindingOutcome::Stop => break,
            }
        }
        self.shared.state.lock().ready_state = ReadyState::Closed;
        debug!(url = %self.config.url, "SSE driver stopped");
    }

    /// Drive one transport binding to its end.
    async fn run_binding(&mut self) -> BindingOutcome {
        let request = self.build_request();
        info!(
            url = %self.config.url,
            retry_count = self.shared.state.lock().retry_count,
            "SSE connecting"
        );
        let mut binding = self.transport.issue_request(request);
        let mut parser = self.handler.new_parser(self.config.mode);
        let mut pending_status = None;
        let cancel = self.shared.cancel.clone();

        loop {
            let next = tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    binding.cancel();
                    return BindingOutcome::Stop;
                }

                _ = self.events.closed() => {
                    info!("SSE consumer dropped, shutting down");
                    binding.cancel();
                    return BindingOutcome::Stop;
                }

                next = tokio::time::timeout(self.config.timeout_interval, binding.next_event()) => next,
            };

            let event = match next {
                Ok(Some(event)) => event,
                Ok(None) => {
                    self.handler.on_disconnect();
                    let err = SseError::UndefinedConnection;
                    return self.abandon(pending_status, parser.as_mut(), err).await;
                }
                Err(_) => {
                    binding.cancel();
                    self.handler.on_disconnect();
                    let err = SseError::timeout(self.config.timeout_interval);
                    return self.abandon(pending_status, parser.as_mut(), err).await;
                }
            };

            match event {
                TransportEvent::Response(head) => {
                    self.responded = true;
                    let status = head.status;

                    if status == http::StatusCode::NO_CONTENT {
                        info!(url = %self.config.url, "SSE server responded 204, closing");
                        head.decision.cancel();
                        binding.cancel();
                        self.handler.on_disconnect();
                        return BindingOutcome::Close;
                    }

                    head.decision.allow();
                    if status.is_success() {
                        {
                            let mut state = self.shared.state.lock();
                            if !self.shared.cancel.is_cancelled() {
                                state.ready_state = ReadyState::Open;
                            }
                            state.retry_count = 0;
                        }
                        info!(url = %self.config.url, status = %status, "SSE connection established");
                        self.handler.on_open();
                        if !self.emit(SessionEvent::Open).await {
                            binding.cancel();
                            return BindingOutcome::Stop;
                        }
                    } else {
                        warn!(url = %self.config.url, status = %status, "SSE server responded with error status");
                        pending_status = Some(status);
                    }
                }

                TransportEvent::Chunk(chunk) => {
                    if let Some(status) = pending_status {
                        binding.cancel();
                        self.handler.on_disconnect();
                        let err = SseError::connection_error(status, decode_lossy(chunk));
                        return self.fail_permanently(err).await;
                    }

                    for event in parser.parse(&chunk) {
                        if !self.dispatch(event).await {
                            binding.cancel();
                            return BindingOutcome::Stop;
                        }
                    }
                }

                TransportEvent::Completed(cause) => {
                    self.handler.on_disconnect();

                    if let Some(status) = pending_status {
                        let err = SseError::connection_error(status, Str::new());
                        return self.fail_permanently(err).await;
                    }

                    if !self.flush(parser.as_mut()).await {
                        return BindingOutcome::Stop;
                    }

                    return match cause {
                        Some(err) => self.fail(err).await,
                        None => {
                            info!(url = %self.config.url, "SSE stream ended");
                            if self.may_reconnect() {
                                BindingOutcome::Reconnect
                            } else {
                                BindingOutcome::Close
                            }
                        }
                    };
                }
            }
        }
    }

    fn build_request(&self) -> SseRequest {
        let mut headers = self.config.headers.clone();
        headers.insert(
            http::header::ACCEPT,
            http::HeaderValue::from_static("text/event-stream"),
        );
        headers.insert(
            http::header::CACHE_CONTROL,
            http::HeaderValue::from_static("no-store"),
        );

        let last_event_id = self.shared.state.lock().last_event_id.clone();
        match http::HeaderValue::from_str(&last_event_id) {
            Ok(value) => {
                headers.insert(
                    http::header::HeaderName::from_static("last-event-id"),
                    value,
                );
            }
            Err(_) => {
                warn!(last_event_id = %last_event_id, "Last event id is not a valid header value, omitting it");
            }
        }

        SseRequest {
            url: self.config.url.clone(),
            method: self.config.method.clone(),
            headers,
            body: self.config.body.clone(),
            timeout: self.config.timeout_interval,
        }
    }

    /// Forward a parsed event. Returns `false` if the driver should stop.
    async fn dispatch(&self, event: Event) -> bool {
        if let Some(id) = &event.id {
            self.shared.state.lock().last_event_id = id.clone();
        }
        debug!(
            event_type = event.event_type().unwrap_or_default(),
            id = event.id().unwrap_or_default(),
            "SSE event received",
        );
        self.emit(SessionEvent::Message(event)).await
    }

    /// Send to the consumer. Returns `false` once cancelled or the consumer
    /// is gone.
    async fn emit(&self, event: SessionEvent) -> bool {
        tokio::select! {
            biased;
            _ = self.shared.cancel.cancelled() => false,
            sent = self.events.send(event) => sent.is_ok(),
        }
    }

    /// Dispatch whatever the parser still holds at the end of a binding.
    async fn flush(&self, parser: &mut dyn EventParser) -> bool {
        for event in parser.finish() {
            if !self.dispatch(event).await {
                return false;
            }
        }
        true
    }

    /// End a binding that went away without completing.
    ///
    /// An error status already received wins over the loss of the binding.
    async fn abandon(
        &self,
        pending_status: Option<http::StatusCode>,
        parser: &mut dyn EventParser,
        err: SseError,
    ) -> BindingOutcome {
        if let Some(status) = pending_status {
            let err = SseError::connection_error(status, Str::new());
            return self.fail_permanently(err).await;
        }
        if !self.flush(parser).await {
            return BindingOutcome::Stop;
        }
        self.fail(err).await
    }

    fn may_reconnect(&self) -> bool {
        self.shared.state.lock().retry_count < self.config.reconnect_max_attempts
    }

    /// Report a failure and decide whether to reconnect.
    async fn fail(&self, err: SseError) -> BindingOutcome {
        let retry = self.may_reconnect() && self.handler.should_retry(&err);
        error!(url = %self.config.url, error = %err, retry, "SSE connection failed");
        if !self.emit(SessionEvent::Error(err)).await {
            return BindingOutcome::Stop;
        }
        if retry {
            BindingOutcome::Reconnect
        } else {
            BindingOutcome::Close
        }
    }

    /// Report a failure no reconnect can fix.
    async fn fail_permanently(&self, err: SseError) -> BindingOutcome {
        error!(url = %self.config.url, error = %err, "SSE connection rejected");
        if !self.emit(SessionEvent::Error(err)).await {
            return BindingOutcome::Stop;
        }
        BindingOutcome::Close
    }

    /// Sleep before the next attempt. Returns `false` if interrupted.
    async fn backoff(&self) -> bool {
        let attempt = {
            let mut state = self.shared.state.lock();
            state.retry_count = state.retry_count.saturating_add(1);
            if !self.shared.cancel.is_cancelled() {
                state.ready_state = ReadyState::Connecting;
            }
            state.retry_count
        };
        let delay = calculate_backoff(self.config.backoff(), attempt);
        warn!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "SSE reconnecting after backoff"
        );

        tokio::select! {
            biased;
            _ = self.shared.cancel.cancelled() => false,
            _ = self.events.closed() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    async fn close(&self) {
        self.shared.state.lock().ready_state = ReadyState::Closed;
        info!(url = %self.config.url, "SSE session closed");
        if self.responded {
            self.emit(SessionEvent::Closed).await;
        }
    }
}
