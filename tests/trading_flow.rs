use chrono::{TimeZone, Utc};
use stockbot::events::EngineEvent;
use stockbot::execution::TickProcessor;
use stockbot::models::{ExitReason, Side, Tick};
use stockbot::strategy::RangeBreakoutStrategy;
use tokio::sync::broadcast;

fn tick(hour: u32, min: u32, sec: u32, price: f64) -> Tick {
    Tick {
        symbol: "TSLA".to_string(),
        price,
        volume: 50,
        timestamp: Utc.with_ymd_and_hms(2024, 3, 14, hour, min, sec).unwrap(),
    }
}

fn new_engine() -> (TickProcessor, broadcast::Receiver<EngineEvent>) {
    let (tx, rx) = broadcast::channel(1024);
    let processor = TickProcessor::new(
        "TSLA".to_string(),
        12,
        Box::new(RangeBreakoutStrategy::default()),
        tx,
    );
    (processor, rx)
}

fn drain(rx: &mut broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[test]
fn test_full_long_round_trip() {
    let (mut engine, mut rx) = new_engine();

    // 10:30 bar: range 2.0
    engine.process(&tick(10, 30, 5, 100.0));
    engine.process(&tick(10, 31, 0, 102.0));
    engine.process(&tick(10, 33, 0, 101.0));
    assert!(!engine.has_open_position());

    // 10:35 bar: range expands past 2.0 inside the 180s window, price
    // above the bar open -> LONG at 103
    engine.process(&tick(10, 35, 10, 101.0));
    engine.process(&tick(10, 35, 50, 99.5));
    engine.process(&tick(10, 36, 20, 103.0));
    assert!(engine.has_open_position());

    let events = drain(&mut rx);
    let opened = events
        .iter()
        .find_map(|e| match e {
            EngineEvent::PositionOpened {
                side,
                entry_price,
                stop_loss,
                take_profit,
            } => Some((*side, *entry_price, *stop_loss, *take_profit)),
            _ => None,
        })
        .expect("breakout should open a position");

    assert_eq!(opened.0, Side::Long);
    assert_eq!(opened.1, 103.0);
    assert!((opened.2 - 103.0 * 0.9925).abs() < 1e-9);
    assert!((opened.3 - 103.0 * 1.01).abs() < 1e-9);

    // Rally past +1% -> take profit
    engine.process(&tick(10, 37, 0, 104.1));
    assert!(!engine.has_open_position());

    let events = drain(&mut rx);
    let closed = events
        .iter()
        .find_map(|e| match e {
            EngineEvent::PositionClosed {
                exit_price,
                pnl,
                reason,
                ..
            } => Some((*exit_price, *pnl, *reason)),
            _ => None,
        })
        .expect("take profit should close the position");

    assert_eq!(closed.2, ExitReason::TakeProfit);
    assert_eq!(closed.0, 104.1);
    assert!(closed.1 >= 0.01);
}

#[test]
fn test_full_short_round_trip() {
    let (mut engine, mut rx) = new_engine();

    // 14:00 bar: range 1.0
    engine.process(&tick(14, 0, 10, 200.0));
    engine.process(&tick(14, 2, 0, 201.0));

    // 14:05 bar: range 3.0, price below the open -> SHORT at 198
    engine.process(&tick(14, 5, 5, 200.0));
    engine.process(&tick(14, 5, 30, 201.0));
    engine.process(&tick(14, 6, 0, 198.0));
    assert!(engine.has_open_position());

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::PositionOpened {
            side: Side::Short,
            ..
        }
    )));

    // Price falls 2.0 in quote currency: the absolute override fires
    // before the -1% percentage target (198 * 0.99 = 196.02)
    engine.process(&tick(14, 7, 0, 196.1));
    assert!(!engine.has_open_position());

    let events = drain(&mut rx);
    let closed = events
        .iter()
        .find_map(|e| match e {
            EngineEvent::PositionClosed { pnl, reason, .. } => Some((*pnl, *reason)),
            _ => None,
        })
        .expect("absolute move should close the short");

    assert_eq!(closed.1, ExitReason::TakeProfit);
    assert!(closed.0 > 0.0, "short profits when price falls");
}

#[test]
fn test_opens_and_closes_strictly_alternate() {
    let (mut engine, mut rx) = new_engine();

    // A session with several breakouts and exits
    let session: &[(u32, u32, u32, f64)] = &[
        (9, 30, 0, 100.0),
        (9, 31, 0, 101.0),
        (9, 35, 5, 100.5),
        (9, 35, 30, 98.0),  // breakout short
        (9, 36, 0, 102.0),  // stop loss
        (9, 36, 30, 103.5), // breakout long
        (9, 37, 0, 103.0),
        (9, 40, 10, 103.0),
        (9, 40, 40, 104.0),
        (9, 41, 0, 96.0),  // stop loss
        (9, 41, 30, 94.0), // breakout short
        (9, 42, 0, 94.5),
    ];

    for &(h, m, s, price) in session {
        engine.process(&tick(h, m, s, price));
    }

    let mut open = false;
    let mut transitions = 0;
    for event in drain(&mut rx) {
        match event {
            EngineEvent::PositionOpened { .. } => {
                assert!(!open, "opened while a position already existed");
                open = true;
                transitions += 1;
            }
            EngineEvent::PositionClosed { .. } => {
                assert!(open, "closed without an open position");
                open = false;
                transitions += 1;
            }
            _ => {}
        }
    }

    assert!(transitions >= 2, "session should trade at least once");
    assert_eq!(open, engine.has_open_position());
}

#[test]
fn test_feed_gap_preserves_state() {
    let (mut engine, _rx) = new_engine();

    engine.process(&tick(10, 30, 0, 100.0));
    engine.process(&tick(10, 31, 0, 102.0));
    let bars_before = engine.bar_count();

    // Transport drops and reconnects; nothing reaches the engine for a
    // while, then ticks resume in a later window
    engine.process(&tick(10, 50, 0, 101.0));

    assert_eq!(engine.bar_count(), bars_before + 1);
    assert!(!engine.has_open_position());
}
