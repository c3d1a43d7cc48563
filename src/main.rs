use clap::Parser;
use std::sync::{Arc, Mutex};
use stockbot::api::ReferenceDataClient;
use stockbot::events::EngineEvent;
use stockbot::execution::TickProcessor;
use stockbot::feed::TickFeed;
use stockbot::strategy::RangeBreakoutStrategy;
use stockbot::Result;
use tokio::sync::{broadcast, mpsc};

const DEFAULT_WS_URL: &str = "wss://ws.finnhub.io";
const HISTORY_DAYS: i64 = 5;
const TICK_CHANNEL_CAPACITY: usize = 1024;
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Parser)]
#[command(name = "stockbot", about = "Real-time range-breakout trading bot")]
struct Args {
    /// Stock symbol to subscribe and trade
    #[arg(short, long, default_value = "TSLA")]
    symbol: String,

    /// Number of 5-minute bars to retain (only the two most recent are
    /// ever consulted)
    #[arg(long, default_value_t = 12)]
    max_bars: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let args = Args::parse();
    let api_key = std::env::var("FINNHUB_API_KEY")
        .map_err(|_| "FINNHUB_API_KEY not found in environment")?;
    let ws_url = std::env::var("FEED_WS_URL")
        .unwrap_or_else(|_| format!("{}?token={}", DEFAULT_WS_URL, api_key));

    tracing::info!("🚀 StockBot starting for {}", args.symbol);

    // Static reference data, display only
    show_company_info(&api_key, &args.symbol).await;

    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let (tick_tx, mut tick_rx) = mpsc::channel(TICK_CHANNEL_CAPACITY);

    let processor = Arc::new(Mutex::new(TickProcessor::new(
        args.symbol.clone(),
        args.max_bars,
        Box::new(RangeBreakoutStrategy::default()),
        event_tx.clone(),
    )));

    // Feed task: owns the WebSocket and its reconnect policy
    let feed_task = {
        let feed = TickFeed::new(ws_url, args.symbol.clone());
        let events = event_tx.clone();
        tokio::spawn(async move {
            feed.run_with_reconnect(tick_tx, events).await;
        })
    };

    // Engine task: one tick processed at a time, atomically
    let engine_task = {
        let processor = processor.clone();
        tokio::spawn(async move {
            while let Some(tick) = tick_rx.recv().await {
                processor.lock().unwrap().process(&tick);
            }
        })
    };

    // Render task: the presentation side of the broadcast channel
    let render_task = {
        let mut events = event_tx.subscribe();
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                render_event(&event);
            }
        })
    };

    tracing::info!("✅ Feed, engine and render tasks running");
    tracing::info!("Press Ctrl+C to stop...\n");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("⚠️  Received Ctrl+C, shutting down...");
        }
        result = feed_task => {
            tracing::error!("Feed task exited: {:?}", result);
        }
        result = engine_task => {
            tracing::error!("Engine task exited: {:?}", result);
        }
        result = render_task => {
            tracing::error!("Render task exited: {:?}", result);
        }
    }

    tracing::info!("👋 StockBot stopped");
    Ok(())
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter("stockbot=info,stockbot::strategy=debug")
        .init();
}

/// Print company metadata and the recent closing-price series
///
/// Failures here are cosmetic; trading starts either way.
async fn show_company_info(api_key: &str, symbol: &str) {
    let client = ReferenceDataClient::new(api_key.to_string());

    match client.company_profile(symbol).await {
        Ok(profile) => {
            tracing::info!("📊 Company Information:");
            tracing::info!("  Name: {}", profile.name);
            tracing::info!("  Exchange: {}", profile.exchange);
            tracing::info!("  Industry: {}", profile.industry);
        }
        Err(e) => tracing::warn!("Could not fetch company profile for {}: {}", symbol, e),
    }

    match client.daily_closes(symbol, HISTORY_DAYS).await {
        Ok(closes) => {
            tracing::info!("📈 Last {} daily closes:", closes.len());
            for close in closes {
                tracing::info!("  {}: {:.2}", close.date.format("%Y-%m-%d"), close.close);
            }
        }
        Err(e) => tracing::warn!("Could not fetch historical closes for {}: {}", symbol, e),
    }
}

fn render_event(event: &EngineEvent) {
    match event {
        EngineEvent::PriceUpdate { price, volume } => {
            tracing::info!("Price: ${:.2}  Volume: {}", price, volume);
        }
        EngineEvent::PositionOpened {
            side,
            entry_price,
            stop_loss,
            take_profit,
        } => {
            tracing::info!(
                "📌 Position: {:?} @ ${:.2} (SL ${:.2} / TP ${:.2})",
                side,
                entry_price,
                stop_loss,
                take_profit
            );
        }
        EngineEvent::PositionClosed { pnl, reason, .. } => {
            tracing::info!("💰 Exited position ({:?}). P&L: {:.2}%", reason, pnl * 100.0);
        }
        EngineEvent::NoSignal => {
            tracing::debug!("No signal");
        }
        EngineEvent::FeedError { message } => {
            tracing::warn!("Feed error: {}", message);
        }
    }
}
