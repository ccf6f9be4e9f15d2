//! SSE Stream Example
//!
//! Connects to an SSE endpoint and prints every session event until the
//! stream closes or Ctrl-C is pressed.
//!
//! Run with: `cargo run -p hpx-sse --example sse_stream -- https://sse.dev/test`

use std::time::Duration;

use futures_util::StreamExt;
use hpx_sse::{HttpTransport, SessionEvent, SseConfig, SseSession};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://sse.dev/test".to_string());

    let config = SseConfig::new(url)
        .timeout_interval(Duration::from_secs(60))
        .reconnect_max_attempts(5)
        .reconnect_initial_delay(Duration::from_secs(1))
        .reconnect_max_delay(Duration::from_secs(30));
    let session = SseSession::new(config, HttpTransport::new())?;
    let mut events = session.events();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                session.cancel();
                break;
            }
            event = events.next() => match event {
                Some(SessionEvent::Open) => println!("-- open"),
                Some(SessionEvent::Message(message)) => println!(
                    "[{}] id={} data={}",
                    message.event_type().unwrap_or("message"),
                    message.id().unwrap_or("-"),
                    message.data().unwrap_or_default(),
                ),
                Some(SessionEvent::Error(err)) => println!("-- error: {err}"),
                Some(SessionEvent::Closed) => println!("-- closed"),
                None => break,
            },
        }
    }

    println!(
        "final state: {}, last event id: {:?}",
        session.ready_state(),
        session.last_event_id()
    );
    Ok(())
}
