use chrono::{TimeZone, Utc};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep, Duration};
use tokio_tungstenite::{connect_async, tungstenite, tungstenite::Message};

use crate::events::EngineEvent;
use crate::models::Tick;

const RECONNECT_DELAY_SECS: u64 = 5;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("websocket connection failed: {0}")]
    Connection(#[source] tungstenite::Error),
    #[error("subscribe request failed: {0}")]
    Subscribe(#[source] tungstenite::Error),
    #[error("feed stream ended: {0}")]
    Stream(String),
    #[error("engine receiver dropped")]
    EngineGone,
}

/// Wire frame pushed by the feed for every batch of trades
#[derive(Debug, Deserialize)]
struct FeedMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Vec<TradeFrame>,
}

#[derive(Debug, Deserialize)]
struct TradeFrame {
    /// Symbol
    s: String,
    /// Last trade price
    p: f64,
    /// Volume at this trade
    v: f64,
    /// Trade time, epoch milliseconds
    t: i64,
}

/// Subscription-based WebSocket tick feed
///
/// Connects, subscribes to one symbol, and forwards parsed ticks into the
/// engine channel. Reconnect policy lives here, not in the engine: on any
/// transport failure the engine keeps its last consistent state and
/// processing resumes once the feed is back.
pub struct TickFeed {
    ws_url: String,
    symbol: String,
}

impl TickFeed {
    pub fn new(ws_url: String, symbol: String) -> Self {
        Self { ws_url, symbol }
    }

    /// Run one connection until it fails or the engine goes away
    pub async fn run(&self, ticks: &mpsc::Sender<Tick>) -> Result<(), FeedError> {
        let (ws, _) = connect_async(self.ws_url.as_str())
            .await
            .map_err(FeedError::Connection)?;
        let (mut sink, mut stream) = ws.split();

        let subscribe =
            serde_json::json!({ "type": "subscribe", "symbol": self.symbol }).to_string();
        sink.send(Message::Text(subscribe.into()))
            .await
            .map_err(FeedError::Subscribe)?;
        tracing::info!(symbol = %self.symbol, "Subscribed to tick feed");

        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    for tick in parse_ticks(&text) {
                        if ticks.send(tick).await.is_err() {
                            return Err(FeedError::EngineGone);
                        }
                    }
                }
                Ok(Message::Ping(payload)) => {
                    sink.send(Message::Pong(payload))
                        .await
                        .map_err(FeedError::Subscribe)?;
                }
                Ok(Message::Close(_)) => {
                    return Err(FeedError::Stream("server closed the connection".into()));
                }
                Ok(_) => {}
                Err(e) => return Err(FeedError::Stream(e.to_string())),
            }
        }

        Err(FeedError::Stream("stream ended without close frame".into()))
    }

    /// Run forever, reconnecting after a fixed delay
    ///
    /// Failures are reported to the presentation sink as `FeedError`
    /// events. Returns only when the engine side has shut down.
    pub async fn run_with_reconnect(
        self,
        ticks: mpsc::Sender<Tick>,
        events: broadcast::Sender<EngineEvent>,
    ) {
        loop {
            match self.run(&ticks).await {
                Err(FeedError::EngineGone) => {
                    tracing::info!("Engine stopped, shutting down feed");
                    return;
                }
                Err(e) => {
                    tracing::warn!("Feed error: {}, reconnecting in {}s", e, RECONNECT_DELAY_SECS);
                    let _ = events.send(EngineEvent::FeedError {
                        message: e.to_string(),
                    });
                    sleep(Duration::from_secs(RECONNECT_DELAY_SECS)).await;
                }
                Ok(()) => unreachable!("run only returns through an error"),
            }
        }
    }
}

/// Parse one wire frame into ticks, dropping malformed trades
///
/// Non-finite or non-positive prices never reach the engine; the core's
/// arithmetic assumes positive finite prices.
fn parse_ticks(text: &str) -> Vec<Tick> {
    let message: FeedMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!("Ignoring unparseable feed frame: {}", e);
            return Vec::new();
        }
    };

    if message.kind != "trade" {
        return Vec::new();
    }

    message
        .data
        .into_iter()
        .filter_map(|frame| {
            if !frame.p.is_finite() || frame.p <= 0.0 {
                tracing::warn!(symbol = %frame.s, price = frame.p, "Dropping tick with invalid price");
                return None;
            }
            let timestamp = Utc.timestamp_millis_opt(frame.t).single()?;
            Some(Tick {
                symbol: frame.s,
                price: frame.p,
                volume: frame.v.max(0.0) as u64,
                timestamp,
            })
        })
        .collect()
}
