//! Demo/debug binary: replays a JSON fixture of server messages through
//! `NetworkEngine` and prints the interpolated state after each one.
//!
//! Fixture format: a JSON array of `{ "delay_ms": <u64>, "msg": ServerMsg }`
//! entries, applied in order with a simulated clock advanced by
//! `delay_ms` before each message arrives.
//!
//! Usage: `replay <path-to-fixture.json>`

use std::cell::Cell;
use std::env;
use std::fs;
use std::rc::Rc;

use serde::Deserialize;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ship_game_client::clock::Clock;
use ship_game_client::engine::NetworkEngine;
use ship_game_client::protocol::ServerMsg;

#[derive(Debug, Deserialize)]
struct FixtureEntry {
    delay_ms: u64,
    msg: ServerMsg,
}

struct ReplayClock {
    now: Cell<u64>,
}

impl ReplayClock {
    fn new() -> Self {
        Self { now: Cell::new(0) }
    }

    fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ReplayClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let path = env::args().nth(1).ok_or_else(|| {
        anyhow::anyhow!("usage: replay <path-to-fixture.json>")
    })?;

    let raw = fs::read_to_string(&path)?;
    let fixture: Vec<FixtureEntry> = serde_json::from_str(&raw)?;

    info!(path, entries = fixture.len(), "loaded replay fixture");

    let clock = Rc::new(ReplayClock::new());
    let mut engine = NetworkEngine::with_clock(clock.clone());

    for (i, entry) in fixture.into_iter().enumerate() {
        clock.advance(entry.delay_ms);
        engine.handle_server_msg(&entry.msg);

        match engine.get_interpolated_state() {
            Some(state) => info!(
                index = i,
                tick = state.tick,
                players = state.players.len(),
                delay = engine.interpolation_delay(),
                "applied message"
            ),
            None => error!(index = i, "no interpolated state after message"),
        }
    }

    Ok(())
}

fn init_tracing(default_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}
