//! Push channel with auto-reconnect.
//!
//! Connects to a production's WebSocket event endpoint, subscribes by
//! production id, and streams parsed [`PushFrame`]s through a
//! [`tokio::sync::broadcast`] channel. Handles reconnection with
//! exponential backoff + jitter automatically.
//!
//! Frames delivered while the socket was down are lost. Every successful
//! reconnection after the first emits [`PushMessage::Reconnected`] so the
//! consumer can re-read authoritative state.
//!
//! # Example
//!
//! ```rust,ignore
//! use rigsync_api::push::{PushChannel, PushMessage, ReconnectConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let channel = PushChannel::connect(
//!     "https://rig.example.com/api",
//!     "show-42",
//!     &TransportConfig::default(),
//!     ReconnectConfig::default(),
//!     cancel.clone(),
//! )?;
//! let mut rx = channel.subscribe();
//!
//! while let Ok(msg) = rx.recv().await {
//!     if let PushMessage::Frame(frame) = msg {
//!         println!("{} {:?}", frame.entity_kind, frame.action);
//!     }
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::PushFrame;

// ── Broadcast channel capacity ───────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 1024;

// ── PushMessage ──────────────────────────────────────────────────────

/// Item delivered to push channel subscribers.
#[derive(Debug, Clone)]
pub enum PushMessage {
    /// A change notification from the server.
    Frame(Arc<PushFrame>),
    /// The socket reconnected; frames may have been missed in between.
    Reconnected,
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Backoff tuning for re-establishing the push channel.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// First retry delay (1s by default).
    pub initial_delay: Duration,

    /// Backoff ceiling (30s by default).
    pub max_delay: Duration,

    /// Give up after this many failed attempts; `None` never gives up.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── Subscription control frames ──────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ControlFrame<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    production_id: &'a str,
}

// ── PushChannel ──────────────────────────────────────────────────────

/// Handle to a running push channel subscription.
///
/// Drop all handles and call [`shutdown`](Self::shutdown) to unsubscribe
/// and tear down the background task.
pub struct PushChannel {
    event_rx: broadcast::Receiver<PushMessage>,
    cancel: CancellationToken,
}

impl PushChannel {
    /// Spawn the connection loop for one production.
    ///
    /// Returns immediately once the background task is spawned. The first
    /// connection attempt happens asynchronously.
    pub fn connect(
        base_url: &str,
        production_id: &str,
        transport: &TransportConfig,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> Result<Self, Error> {
        let ws_url = push_url(base_url, production_id)?;
        let auth = transport
            .authorization_header()?
            .and_then(|v| v.to_str().ok().map(str::to_owned));
        let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let session = ChannelSession {
            url: ws_url,
            production_id: production_id.to_owned(),
            auth,
        };
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            ws_loop(session, event_tx, reconnect, task_cancel).await;
        });

        Ok(Self { event_rx, cancel })
    }

    /// Get a new broadcast receiver for the push stream.
    ///
    /// The receiver only sees messages sent after this call, so subscribe
    /// before any load the events must be applied on top of.
    ///
    /// If a consumer falls behind, it receives
    /// [`broadcast::error::RecvError::Lagged`] and should resync.
    pub fn subscribe(&self) -> broadcast::Receiver<PushMessage> {
        self.event_rx.resubscribe()
    }

    /// Signal the background task to unsubscribe and shut down.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Derive the push endpoint from the REST base URL.
///
/// `https://host/api` + `p1` → `wss://host/api/productions/p1/events`
pub fn push_url(base_url: &str, production_id: &str) -> Result<Url, Error> {
    let mut url = Url::parse(base_url)?;
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    url.set_scheme(scheme)
        .map_err(|()| Error::WebSocketConnect(format!("cannot derive push URL from {base_url}")))?;
    let path = url.path().trim_end_matches('/').to_owned();
    url.set_path(&format!("{path}/productions/{production_id}/events"));
    Ok(url)
}

struct ChannelSession {
    url: Url,
    production_id: String,
    auth: Option<String>,
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → subscribe → read → on error, backoff → reconnect.
async fn ws_loop(
    session: ChannelSession,
    event_tx: broadcast::Sender<PushMessage>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;
    let mut connected_before = false;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&session, &event_tx, &cancel, &mut connected_before) => {
                match result {
                    Ok(()) if cancel.is_cancelled() => break,
                    // Clean disconnect: reset attempt counter and reconnect immediately.
                    Ok(()) => {
                        tracing::info!("push channel disconnected cleanly, reconnecting");
                        attempt = 0;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, attempt, "push channel error");

                        if let Some(max) = reconnect.max_retries {
                            if attempt >= max {
                                tracing::error!(
                                    max_retries = max,
                                    "push channel reconnection limit reached, giving up"
                                );
                                break;
                            }
                        }

                        let delay = calculate_backoff(attempt, &reconnect);
                        tracing::info!(
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            attempt,
                            "waiting before reconnect"
                        );

                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => break,
                            () = tokio::time::sleep(delay) => {}
                        }

                        attempt = attempt.saturating_add(1);
                    }
                }
            }
        }
    }

    tracing::debug!("push channel loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish a single WebSocket connection, subscribe, and read frames
/// until the socket drops or the token is cancelled.
async fn connect_and_read(
    session: &ChannelSession,
    event_tx: &broadcast::Sender<PushMessage>,
    cancel: &CancellationToken,
    connected_before: &mut bool,
) -> Result<(), Error> {
    tracing::info!(url = %session.url, "connecting push channel");

    let uri: tungstenite::http::Uri = session
        .url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;

    let mut request = ClientRequestBuilder::new(uri);
    if let Some(auth) = &session.auth {
        request = request.with_header("Authorization", auth.as_str());
    }

    let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    let (mut write, mut read) = ws_stream.split();

    write
        .send(control_message("subscribe", &session.production_id))
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    tracing::info!(production = %session.production_id, "push channel subscribed");

    if *connected_before {
        // No receivers yet is fine
        let _ = event_tx.send(PushMessage::Reconnected);
    }
    *connected_before = true;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                let _ = write.send(control_message("unsubscribe", &session.production_id)).await;
                let _ = write.close().await;
                return Ok(());
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        parse_and_broadcast(&text, event_tx);
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        // answered by tungstenite
                        tracing::trace!("push channel ping");
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(
                                code = %cf.code,
                                reason = %cf.reason,
                                "push channel close frame received"
                            );
                        } else {
                            tracing::info!("push channel close frame received (no payload)");
                        }
                        return Ok(());
                    }
                    Some(Err(e)) => {
                        return Err(Error::WebSocketConnect(e.to_string()));
                    }
                    None => {
                        tracing::info!("push channel stream ended");
                        return Ok(());
                    }
                    Some(Ok(_)) => {
                        // not part of the protocol
                    }
                }
            }
        }
    }
}

fn control_message(kind: &'static str, production_id: &str) -> tungstenite::Message {
    let frame = ControlFrame {
        kind,
        production_id,
    };
    let text = serde_json::to_string(&frame).unwrap_or_default();
    tungstenite::Message::text(text)
}

// ── Message parsing ──────────────────────────────────────────────────

/// Parse a text frame and broadcast it.
///
/// Accepts either a single frame object or an array of frames. Frames
/// that do not parse (unknown action, missing fields) are skipped.
fn parse_and_broadcast(text: &str, event_tx: &broadcast::Sender<PushMessage>) {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, "failed to parse push frame");
            return;
        }
    };

    let items = match value {
        serde_json::Value::Array(items) => items,
        other => vec![other],
    };

    for item in items {
        match serde_json::from_value::<PushFrame>(item) {
            Ok(frame) => {
                let _ = event_tx.send(PushMessage::Frame(Arc::new(frame)));
            }
            Err(e) => tracing::debug!(error = %e, "skipping unrecognized push frame"),
        }
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Doubling delay, capped, with a small jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25%.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt.min(30)).unwrap_or(30);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Jitter derived from the attempt so tests stay deterministic.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────
