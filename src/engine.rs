use crate::book::{Ladder, MAX_PRICE, MAX_SIZE, MAX_TRADES, OrderTable};
use crate::orders::{Order, OrderId, Price, Qty, Side, Tag};
use crate::reports::{ExecutionReport, ExecutionSink};
use tracing::trace;

/// The matching core for one instrument: order table, price ladder, the two
/// best-price cursors, and the execution sink.
///
/// All operations run to completion on the caller's thread; the sink is
/// invoked synchronously, in exact trade order. Construction allocates the
/// arena once; nothing allocates afterwards, and `reset` reuses it.
///
/// Inputs are trusted. A price outside `1..=MAX_PRICE`, a size outside
/// `1..=MAX_SIZE`, or more than `MAX_TRADES` accepted orders per lifetime is
/// a caller bug, caught by `debug_assert` in checked builds.
pub struct Engine<S> {
    table: OrderTable,
    ladder: Ladder,
    /// Highest price with a resting buy; 0 when no bids rest.
    best_bid: Price,
    /// Lowest price with a resting sell; `MAX_PRICE + 1` when no asks rest.
    best_ask: Price,
    next_id: OrderId,
    sink: S,
}

impl<S: ExecutionSink> Engine<S> {
    pub fn new(sink: S) -> Self {
        Self {
            table: OrderTable::new(),
            ladder: Ladder::new(),
            best_bid: 0,
            best_ask: MAX_PRICE + 1,
            next_id: 0,
            sink,
        }
    }

    /// Restores the fresh state, reusing the arena. Previously issued ids
    /// become meaningless and the id counter restarts at 1.
    pub fn reset(&mut self) {
        self.table.reset();
        self.ladder.reset();
        self.best_bid = 0;
        self.best_ask = MAX_PRICE + 1;
        self.next_id = 0;
    }

    /// Accepts a limit order: crosses it against the opposing side while it
    /// is marketable, then rests any residual at its own price.
    ///
    /// Returns the allocated id whether the order fully filled, rested, or
    /// both.
    pub fn limit(&mut self, order: Order) -> OrderId {
        debug_assert!(
            (1..=MAX_PRICE).contains(&order.price),
            "order price out of range"
        );
        debug_assert!(
            (1..=MAX_SIZE).contains(&order.size),
            "order size out of range"
        );
        debug_assert!(
            (self.next_id as usize) < MAX_TRADES,
            "order id space exhausted"
        );

        self.next_id += 1;
        let id = self.next_id;
        trace!(
            id,
            side = ?order.side,
            price = order.price,
            size = order.size,
            "limit order accepted"
        );

        let mut remaining = order.size;
        match order.side {
            Side::Buy => {
                while remaining > 0 && order.price >= self.best_ask {
                    remaining = self.sweep_level(self.best_ask, &order, remaining);
                    self.advance_ask();
                }
            }
            Side::Sell => {
                while remaining > 0 && order.price <= self.best_bid {
                    remaining = self.sweep_level(self.best_bid, &order, remaining);
                    self.advance_bid();
                }
            }
        }

        if remaining > 0 {
            self.rest(id, &order, remaining);
        }
        debug_assert!(self.best_bid < self.best_ask, "book crossed after limit");
        id
    }

    /// Cancels a resting order by zeroing its remaining size.
    ///
    /// O(1) and allocation-free: the record is not unlinked from its level,
    /// the matcher drops the tombstone when it reaches it, and cursors are
    /// left where they are. Cancelling a filled, already-cancelled, or
    /// fully-traded-on-entry id is a silent no-op; so is repeating a cancel.
    pub fn cancel(&mut self, id: OrderId) {
        debug_assert!(id >= 1 && id <= self.next_id, "cancel of unallocated id");
        trace!(id, "cancel");
        self.table.get_mut(id).remaining = 0;
    }

    /// Highest resting buy price, if any bid rests.
    pub fn best_bid(&self) -> Option<Price> {
        (self.best_bid > 0).then_some(self.best_bid)
    }

    /// Lowest resting sell price, if any ask rests.
    pub fn best_ask(&self) -> Option<Price> {
        (self.best_ask <= MAX_PRICE).then_some(self.best_ask)
    }

    /// Ids handed out so far; the next accepted order gets `accepted() + 1`.
    pub fn accepted(&self) -> u64 {
        self.next_id
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Consumes liquidity from the head of the level at `price` until the
    /// incoming order is filled or the level drains; returns what is left of
    /// the incoming size. Zero-size heads are tombstones left by `cancel`
    /// and are unlinked without a report.
    fn sweep_level(&mut self, price: Price, taker: &Order, mut remaining: Qty) -> Qty {
        while let Some(maker_id) = self.ladder.head(price) {
            let maker = *self.table.get(maker_id);
            if maker.remaining == 0 {
                self.ladder.pop_head(&self.table, price);
                continue;
            }
            if maker.remaining < remaining {
                self.table.get_mut(maker_id).remaining = 0;
                self.ladder.pop_head(&self.table, price);
                remaining -= maker.remaining;
                self.report_trade(taker, maker.trader, maker.remaining, price);
            } else {
                // The head covers the incoming order; an exact match is
                // unlinked, a larger head keeps the difference.
                if maker.remaining == remaining {
                    self.table.get_mut(maker_id).remaining = 0;
                    self.ladder.pop_head(&self.table, price);
                } else {
                    self.table.get_mut(maker_id).remaining = maker.remaining - remaining;
                }
                self.report_trade(taker, maker.trader, remaining, price);
                return 0;
            }
        }
        remaining
    }

    /// Publishes both legs of a fill, buyer first. The trade prints at the
    /// resting order's price.
    fn report_trade(&mut self, taker: &Order, maker: Tag, size: Qty, price: Price) {
        let (buyer, seller) = match taker.side {
            Side::Buy => (taker.trader, maker),
            Side::Sell => (maker, taker.trader),
        };
        trace!(price, size, %buyer, %seller, "trade");
        self.sink.execution(ExecutionReport {
            symbol: taker.symbol,
            trader: buyer,
            price,
            size,
            side: Side::Buy,
        });
        self.sink.execution(ExecutionReport {
            symbol: taker.symbol,
            trader: seller,
            price,
            size,
            side: Side::Sell,
        });
    }

    /// Writes the residual into the order table, queues it at its price, and
    /// tightens the own-side cursor when the new order beats it.
    fn rest(&mut self, id: OrderId, order: &Order, remaining: Qty) {
        self.table.write(id, remaining, order.trader);
        self.ladder.enqueue(&mut self.table, order.price, id);
        match order.side {
            Side::Buy => {
                if order.price > self.best_bid {
                    self.best_bid = order.price;
                }
            }
            Side::Sell => {
                if order.price < self.best_ask {
                    self.best_ask = order.price;
                }
            }
        }
        trace!(id, price = order.price, remaining, "order resting");
    }

    /// Walks the ask cursor up past drained levels to the next level with
    /// linked records, or to the empty-book sentinel past `MAX_PRICE`.
    /// No-op while the current level still has records queued.
    fn advance_ask(&mut self) {
        while self.best_ask <= MAX_PRICE && self.ladder.is_empty(self.best_ask) {
            self.best_ask += 1;
        }
    }

    fn advance_bid(&mut self) {
        while self.best_bid > 0 && self.ladder.is_empty(self.best_bid) {
            self.best_bid -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine<Vec<ExecutionReport>> {
        Engine::new(Vec::new())
    }

    fn order(side: Side, price: Price, size: Qty, trader: &str) -> Order {
        Order {
            side,
            price,
            size,
            trader: Tag::new(trader),
            symbol: Tag::new("INSTR"),
        }
    }

    #[test]
    fn ids_increase_from_one() {
        let mut eng = engine();
        assert_eq!(eng.limit(order(Side::Buy, 100, 1, "AAAAA")), 1);
        assert_eq!(eng.limit(order(Side::Sell, 200, 1, "BBBBB")), 2);
        assert_eq!(eng.limit(order(Side::Buy, 50, 1, "CCCCC")), 3);
        assert_eq!(eng.accepted(), 3);
    }

    #[test]
    fn resting_orders_update_cursors() {
        let mut eng = engine();
        assert_eq!(eng.best_bid(), None);
        assert_eq!(eng.best_ask(), None);

        eng.limit(order(Side::Buy, 100, 10, "AAAAA"));
        eng.limit(order(Side::Sell, 105, 10, "BBBBB"));
        assert_eq!(eng.best_bid(), Some(100));
        assert_eq!(eng.best_ask(), Some(105));
        assert!(eng.sink().is_empty());
    }

    #[test]
    fn more_aggressive_rest_tightens_both_sides() {
        let mut eng = engine();
        eng.limit(order(Side::Buy, 90, 5, "AAAAA"));
        eng.limit(order(Side::Sell, 110, 5, "BBBBB"));

        eng.limit(order(Side::Buy, 95, 5, "CCCCC"));
        eng.limit(order(Side::Sell, 105, 5, "DDDDD"));
        assert_eq!(eng.best_bid(), Some(95));
        assert_eq!(eng.best_ask(), Some(105));
    }

    #[test]
    fn less_aggressive_rest_leaves_cursors() {
        let mut eng = engine();
        eng.limit(order(Side::Buy, 95, 5, "AAAAA"));
        eng.limit(order(Side::Sell, 105, 5, "BBBBB"));

        eng.limit(order(Side::Buy, 90, 5, "CCCCC"));
        eng.limit(order(Side::Sell, 110, 5, "DDDDD"));
        assert_eq!(eng.best_bid(), Some(95));
        assert_eq!(eng.best_ask(), Some(105));
    }

    #[test]
    fn buy_at_ask_crosses() {
        let mut eng = engine();
        eng.limit(order(Side::Sell, 105, 10, "MAKER"));
        eng.limit(order(Side::Buy, 105, 10, "TAKER"));

        let legs = eng.sink();
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].price, 105);
        assert_eq!(legs[0].size, 10);
        assert_eq!(eng.best_ask(), None);
    }

    #[test]
    fn sell_at_bid_crosses() {
        let mut eng = engine();
        eng.limit(order(Side::Buy, 105, 10, "MAKER"));
        eng.limit(order(Side::Sell, 105, 10, "TAKER"));

        assert_eq!(eng.sink().len(), 2);
        assert_eq!(eng.best_bid(), None);
    }

    #[test]
    fn trade_prints_at_resting_price() {
        let mut eng = engine();
        eng.limit(order(Side::Sell, 101, 5, "MAKER"));
        eng.limit(order(Side::Buy, 110, 5, "TAKER"));
        assert_eq!(eng.sink()[0].price, 101);

        eng.limit(order(Side::Buy, 99, 5, "MAKER"));
        eng.limit(order(Side::Sell, 90, 5, "TAKER"));
        assert_eq!(eng.sink()[2].price, 99);
    }

    #[test]
    fn exact_match_unlinks_head_on_both_sides() {
        let mut eng = engine();
        eng.limit(order(Side::Sell, 100, 5, "AAAAA"));
        eng.limit(order(Side::Buy, 100, 5, "BBBBB"));
        assert_eq!(eng.best_ask(), None);

        eng.limit(order(Side::Buy, 100, 5, "CCCCC"));
        eng.limit(order(Side::Sell, 100, 5, "DDDDD"));
        assert_eq!(eng.best_bid(), None);
    }

    #[test]
    fn larger_head_keeps_difference() {
        let mut eng = engine();
        eng.limit(order(Side::Sell, 100, 8, "MAKER"));
        eng.limit(order(Side::Buy, 100, 5, "TAKER"));

        assert_eq!(eng.sink().len(), 2);
        assert_eq!(eng.sink()[0].size, 5);
        // the head keeps 3, so the level is still the best ask
        assert_eq!(eng.best_ask(), Some(100));

        eng.limit(order(Side::Buy, 100, 3, "TAKE2"));
        assert_eq!(eng.best_ask(), None);
    }

    #[test]
    fn cancelled_head_is_skipped_without_report() {
        let mut eng = engine();
        let stale = eng.limit(order(Side::Sell, 100, 5, "AAAAA"));
        eng.limit(order(Side::Sell, 100, 5, "BBBBB"));
        eng.cancel(stale);

        eng.limit(order(Side::Buy, 100, 5, "XXXXX"));
        let legs = eng.sink();
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[1].trader, Tag::new("BBBBB"));
    }

    #[test]
    fn cancel_does_not_move_cursors() {
        let mut eng = engine();
        let bid = eng.limit(order(Side::Buy, 100, 5, "AAAAA"));
        let ask = eng.limit(order(Side::Sell, 105, 5, "BBBBB"));
        eng.cancel(bid);
        eng.cancel(ask);
        // lazy: tombstones still occupy the levels
        assert_eq!(eng.best_bid(), Some(100));
        assert_eq!(eng.best_ask(), Some(105));
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut eng = engine();
        let id = eng.limit(order(Side::Buy, 100, 5, "AAAAA"));
        eng.cancel(id);
        eng.cancel(id);

        eng.limit(order(Side::Sell, 100, 5, "BBBBB"));
        assert!(eng.sink().is_empty());
        assert_eq!(eng.best_ask(), Some(100));
    }

    #[test]
    fn cancel_after_full_fill_is_noop() {
        let mut eng = engine();
        let id = eng.limit(order(Side::Sell, 100, 5, "AAAAA"));
        eng.limit(order(Side::Buy, 100, 5, "BBBBB"));
        eng.cancel(id);

        eng.limit(order(Side::Sell, 100, 5, "CCCCC"));
        eng.limit(order(Side::Buy, 100, 5, "DDDDD"));
        assert_eq!(eng.sink().len(), 4);
    }

    #[test]
    fn cancel_of_fully_filled_aggressor_is_noop() {
        let mut eng = engine();
        eng.limit(order(Side::Sell, 100, 5, "AAAAA"));
        let taker = eng.limit(order(Side::Buy, 100, 5, "BBBBB"));
        // the taker never rested; its slot is empty
        eng.cancel(taker);
        assert_eq!(eng.best_bid(), None);
    }

    #[test]
    fn self_match_is_allowed() {
        let mut eng = engine();
        eng.limit(order(Side::Sell, 100, 5, "SAME1"));
        eng.limit(order(Side::Buy, 100, 5, "SAME1"));

        let legs = eng.sink();
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].trader, Tag::new("SAME1"));
        assert_eq!(legs[1].trader, Tag::new("SAME1"));
    }

    #[test]
    fn exhausting_one_side_leaves_sentinel_then_accepts_rest() {
        let mut eng = engine();
        eng.limit(order(Side::Sell, 100, 4, "AAAAA"));
        eng.limit(order(Side::Sell, 101, 4, "BBBBB"));

        eng.limit(order(Side::Buy, 110, 20, "XXXXX"));
        assert_eq!(eng.best_ask(), None);
        assert_eq!(eng.best_bid(), Some(110));
        assert_eq!(eng.sink().len(), 4);
    }

    #[test]
    fn tombstone_only_level_is_drained_in_passing() {
        let mut eng = engine();
        let a = eng.limit(order(Side::Sell, 100, 5, "AAAAA"));
        eng.limit(order(Side::Sell, 101, 5, "BBBBB"));
        eng.cancel(a);

        // crossing through 100 pops the tombstone and fills at 101
        eng.limit(order(Side::Buy, 101, 5, "XXXXX"));
        let legs = eng.sink();
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].price, 101);
        assert_eq!(eng.best_ask(), None);
    }

    #[test]
    fn reset_restores_fresh_state() {
        let mut eng = engine();
        eng.limit(order(Side::Buy, 100, 5, "AAAAA"));
        eng.limit(order(Side::Sell, 105, 5, "BBBBB"));
        eng.reset();

        assert_eq!(eng.best_bid(), None);
        assert_eq!(eng.best_ask(), None);
        assert_eq!(eng.accepted(), 0);
        assert_eq!(eng.limit(order(Side::Buy, 50, 1, "CCCCC")), 1);
    }

    #[test]
    fn buyer_leg_precedes_seller_leg() {
        let mut eng = engine();
        eng.limit(order(Side::Sell, 100, 5, "MAKER"));
        eng.limit(order(Side::Buy, 100, 5, "TAKER"));

        let legs = eng.sink();
        assert_eq!(legs[0].side, Side::Buy);
        assert_eq!(legs[0].trader, Tag::new("TAKER"));
        assert_eq!(legs[1].side, Side::Sell);
        assert_eq!(legs[1].trader, Tag::new("MAKER"));
    }
}
