//! Simulated noisy order flow, driven straight into the matching core.
//!
//! The generator quotes limit orders around a drifting mid price and mixes
//! in lazy cancels, which is the feed shape the engine is tuned for. A run
//! can record the generated events as JSON lines so the exact same feed can
//! be replayed later.

use crate::book::{MAX_PRICE, MAX_SIZE, MAX_TRADES};
use crate::engine::Engine;
use crate::errors::SimError;
use crate::orders::{Order, OrderId, Price, Qty, Side, Tag};
use crate::reports::{ExecutionReport, ExecutionSink};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp1, Normal};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct SimConfig {
    /// How many limit orders to generate.
    pub orders: u64,
    /// Starting mid price.
    pub mid: f64,
    /// N(0, sigma) drift applied to the mid each tick.
    pub noise_sigma: f64,
    /// Average order size (unit-exp * mean_qty, rounded, floored at 1).
    pub mean_qty: f64,
    /// Distance from the mid at which orders are quoted.
    pub spread: f64,
    /// Chance that a tick also cancels one random live order.
    pub cancel_prob: f64,
    /// RNG seed; a fixed seed reproduces the exact feed.
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            orders: 100_000,
            mid: 50.0,
            noise_sigma: 0.5,
            mean_qty: 8.0,
            spread: 1.0,
            cancel_prob: 0.25,
            seed: 42,
        }
    }
}

impl SimConfig {
    fn validate(&self) -> Result<(), SimError> {
        if self.orders == 0 {
            return Err(SimError::Config("orders must be > 0".into()));
        }
        if self.orders as usize > MAX_TRADES {
            return Err(SimError::Config(format!(
                "orders must be <= {MAX_TRADES} per engine lifetime"
            )));
        }
        if self.mean_qty <= 0.0 {
            return Err(SimError::Config("mean_qty must be > 0".into()));
        }
        if self.noise_sigma < 0.0 {
            return Err(SimError::Config("noise_sigma must be >= 0".into()));
        }
        if !(0.0..=1.0).contains(&self.cancel_prob) {
            return Err(SimError::Config("cancel_prob must be in [0, 1]".into()));
        }
        if !(1.0..=MAX_PRICE as f64).contains(&self.mid) {
            return Err(SimError::Config(format!(
                "mid must be in [1, {MAX_PRICE}]"
            )));
        }
        Ok(())
    }
}

/// One event of a recorded feed, one JSON object per line in feed files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum FeedEvent {
    Place(Order),
    Cancel(OrderId),
}

/// What a simulation or replay run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimSummary {
    pub orders: u64,
    pub cancels: u64,
    pub trades: u64,
    pub traded_qty: Qty,
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
}

/// Tallies executions without retaining them. Every trade emits exactly one
/// buyer leg, so counting those counts trades.
#[derive(Debug, Default)]
struct TallySink {
    trades: u64,
    traded_qty: Qty,
}

impl ExecutionSink for TallySink {
    fn execution(&mut self, report: ExecutionReport) {
        if report.side == Side::Buy {
            self.trades += 1;
            self.traded_qty += report.size;
        }
    }
}

fn summarize(engine: &Engine<TallySink>, orders: u64, cancels: u64) -> SimSummary {
    SimSummary {
        orders,
        cancels,
        trades: engine.sink().trades,
        traded_qty: engine.sink().traded_qty,
        best_bid: engine.best_bid(),
        best_ask: engine.best_ask(),
    }
}

fn write_event(recorder: &mut Option<BufWriter<File>>, event: &FeedEvent) -> Result<(), SimError> {
    if let Some(w) = recorder.as_mut() {
        serde_json::to_writer(&mut *w, event)?;
        w.write_all(b"\n")?;
    }
    Ok(())
}

/// Drives `cfg.orders` ticks of noisy flow into a fresh engine. When
/// `record` is given, the generated feed is written there as JSON lines.
pub fn run_simulation(cfg: &SimConfig, record: Option<&Path>) -> Result<SimSummary, SimError> {
    cfg.validate()?;
    let mut recorder = match record {
        Some(path) => Some(BufWriter::new(File::create(path)?)),
        None => None,
    };

    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let drift =
        Normal::new(0.0, cfg.noise_sigma).map_err(|e| SimError::Config(e.to_string()))?;

    let symbol = Tag::new("SIMFD");
    let mut engine = Engine::new(TallySink::default());
    let mut live: Vec<OrderId> = Vec::with_capacity(cfg.orders as usize);
    let mut mid = cfg.mid;
    let mut cancels = 0u64;

    for tick in 0..cfg.orders {
        mid = (mid + drift.sample(&mut rng)).clamp(2.0, (MAX_PRICE - 1) as f64);

        let unit: f64 = Exp1.sample(&mut rng);
        let size = ((unit * cfg.mean_qty).max(1.0).round() as Qty).min(MAX_SIZE);

        let (side, quote) = if rng.random_bool(0.5) {
            (Side::Buy, mid - cfg.spread)
        } else {
            (Side::Sell, mid + cfg.spread)
        };
        let price = (quote.round().max(1.0) as Price).min(MAX_PRICE);

        let order = Order {
            side,
            price,
            size,
            trader: Tag::new(&format!("T{:03}", tick % 1_000)),
            symbol,
        };
        write_event(&mut recorder, &FeedEvent::Place(order))?;
        let id = engine.limit(order);
        live.push(id);

        if !live.is_empty() && rng.random_bool(cfg.cancel_prob) {
            let victim = live.swap_remove(rng.random_range(0..live.len()));
            write_event(&mut recorder, &FeedEvent::Cancel(victim))?;
            engine.cancel(victim);
            cancels += 1;
        }

        if tick % 10_000 == 0 {
            debug!(
                tick,
                mid = format_args!("{mid:.2}"),
                best_bid = ?engine.best_bid(),
                best_ask = ?engine.best_ask(),
                "sim tick"
            );
        }
    }
    if let Some(w) = recorder.as_mut() {
        w.flush()?;
    }

    let summary = summarize(&engine, cfg.orders, cancels);
    info!(
        orders = summary.orders,
        trades = summary.trades,
        cancels = summary.cancels,
        traded_qty = summary.traded_qty,
        "simulation done"
    );
    Ok(summary)
}

/// Replays a recorded feed file against a fresh engine.
pub fn replay_feed(path: &Path) -> Result<SimSummary, SimError> {
    let reader = BufReader::new(File::open(path)?);
    let mut engine = Engine::new(TallySink::default());
    let (mut orders, mut cancels) = (0u64, 0u64);

    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<FeedEvent>(&line)? {
            FeedEvent::Place(order) => {
                engine.limit(order);
                orders += 1;
            }
            FeedEvent::Cancel(id) => {
                engine.cancel(id);
                cancels += 1;
            }
        }
    }

    let summary = summarize(&engine, orders, cancels);
    info!(
        orders = summary.orders,
        trades = summary.trades,
        cancels = summary.cancels,
        "replay done"
    );
    Ok(summary)
}
