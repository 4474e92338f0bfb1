//! Print every event from a server-sent event stream.
//!
//! Settings come from the environment:
//!
//! - `SSEFLOW_URL` (required): the stream endpoint.
//! - `SSEFLOW_TYPES`: comma-separated event types shown besides `message`.
//! - `SSEFLOW_POST_BODY`: a JSON body; when set the request is a POST.
//!
//! ```bash
//! SSEFLOW_URL=http://localhost:3000/events SSEFLOW_TYPES=greet \
//!     cargo run --example tail -p sseflow-examples
//! SSEFLOW_URL=http://localhost:3000/chat SSEFLOW_POST_BODY='{"q":"hi"}' \
//!     cargo run --example tail -p sseflow-examples
//! ```

use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sseflow_core::prelude::*;

/// `message` plus the comma-separated types in `extra`, without duplicates.
fn event_types(extra: Option<&str>) -> Vec<String> {
    let mut types = vec!["message".to_string()];
    for t in extra.unwrap_or_default().split(',').map(str::trim) {
        if !t.is_empty() && !types.iter().any(|known| known == t) {
            types.push(t.to_string());
        }
    }
    types
}

fn register(source: &mut EventSource, types: &[String]) {
    source.on_open(|_: &MessageEvent| println!("-- connected"));
    source.on_error(|e: &MessageEvent| eprintln!("-- error: {}", e.data));
    source.add_listener(
        "readystatechange",
        listener(|e: &MessageEvent| {
            if let Some(state) = e.ready_state {
                tracing::info!(%state, "ready state changed");
            }
        }),
    );

    for event_type in types {
        source.on(event_type.clone(), |e: &MessageEvent| {
            let id = e.id.as_deref().unwrap_or("-");
            println!("[{}] id={id} {}", e.event_type, e.data);
        });
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sseflow_core=info,tail=info".into()),
        )
        .init();

    let url = std::env::var("SSEFLOW_URL").expect("SSEFLOW_URL environment variable required");

    let types = event_types(std::env::var("SSEFLOW_TYPES").ok().as_deref());
    let body: Option<Value> = match std::env::var("SSEFLOW_POST_BODY") {
        Ok(raw) => Some(serde_json::from_str(&raw)?),
        Err(_) => None,
    };

    let config = SourceConfig::new();
    let (handle, mut task) = match &body {
        Some(body) => sseflow_http::connect_post(&url, body, config, |s| register(s, &types))?,
        None => sseflow_http::connect_get(&url, config, |s| register(s, &types))?,
    };
    tracing::info!(url = %url, id = %handle.id(), "tailing");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            handle.close();
        }
        _ = &mut task => return Ok(()),
    }
    let _ = task.await;
    Ok(())
}
