//! In-memory matching core of a continuous, price-time-priority limit order
//! book for a single instrument.
//!
//! The engine accepts two intents, [`Engine::limit`] and [`Engine::cancel`],
//! and publishes fills through an [`ExecutionSink`], two legs per trade.
//! Prices are integers on a bounded grid, which lets the book live in flat
//! preallocated arrays: an order table indexed by id, a price ladder indexed
//! by tick, and two linearly scanned best-price cursors. Cancellation is
//! lazy: it zeroes the record and lets the matcher drop the tombstone when
//! it reaches it.
//!
//! ```
//! use matching_engine::{Engine, Order, Side, Tag};
//!
//! let mut engine = Engine::new(Vec::new());
//! let symbol = Tag::new("INSTR");
//! engine.limit(Order {
//!     side: Side::Sell,
//!     price: 105,
//!     size: 10,
//!     trader: Tag::new("MAKER"),
//!     symbol,
//! });
//! engine.limit(Order {
//!     side: Side::Buy,
//!     price: 105,
//!     size: 4,
//!     trader: Tag::new("TAKER"),
//!     symbol,
//! });
//! // one trade, reported once per counterparty
//! assert_eq!(engine.sink().len(), 2);
//! assert_eq!(engine.best_ask(), Some(105));
//! ```

pub mod book;
pub mod engine;
pub mod errors;
pub mod orders;
pub mod reports;
pub mod simulate;

pub use book::{MAX_PRICE, MAX_SIZE, MAX_TRADES};
pub use engine::Engine;
pub use errors::SimError;
pub use orders::{Order, OrderId, Price, Qty, STRINGLEN, Side, Tag};
pub use reports::{ExecutionReport, ExecutionSink, NullSink};
