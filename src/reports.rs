use crate::orders::{Price, Qty, Side, Tag};
use serde::{Deserialize, Serialize};

/// One leg of a trade, published to the host once per counterparty.
///
/// `side` says whose leg this is: `Side::Buy` carries the buyer's trader
/// tag, `Side::Sell` the seller's. Both legs of a fill carry the same
/// symbol, price and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub symbol: Tag,
    pub trader: Tag,
    pub price: Price,
    pub size: Qty,
    pub side: Side,
}

/// Downstream channel the engine publishes executions through.
///
/// Called synchronously from inside `Engine::limit`, twice per trade: the
/// buyer leg first, then the seller leg. Never called with `size == 0`.
pub trait ExecutionSink {
    fn execution(&mut self, report: ExecutionReport);
}

/// Retains every report in emission order. The sink used by tests.
impl ExecutionSink for Vec<ExecutionReport> {
    fn execution(&mut self, report: ExecutionReport) {
        self.push(report)
    }
}

/// Discards every report.
pub struct NullSink;

impl ExecutionSink for NullSink {
    fn execution(&mut self, _report: ExecutionReport) {}
}
