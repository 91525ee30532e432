//! Order book - the matching engine core.
//!
//! Single entry point for all book mutations. Implements the cross/rest
//! algorithm under strict price-time priority:
//! 1. CROSSING: match the incoming order against the opposite side
//! 2. RESTING: park any limit residual in the book
//!
//! The engine is strictly single-threaded; submit runs from entry to return
//! with no suspension points and fans events out synchronously.

use std::time::Instant;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::arena::{Arena, SlotIndex, NULL_INDEX};
use crate::book_side::BookSide;
use crate::config::EngineConfig;
use crate::error::SubmitError;
use crate::events::{SubscriberHandle, Subscribers};
use crate::order::{
    Order, OrderId, OrderStatus, OrderType, Price, Quantity, Side, Timestamp, Trade,
};
use crate::price_level::PriceLevel;
use crate::state::{MarketState, TradeStats};

/// The limit order book and its matching engine.
///
/// Owns the order and level pools, both book sides, the id index, the
/// rolling trade statistics, and the subscriber registries. All of it is
/// touched by exactly one thread.
pub struct OrderBook {
    /// Pool of order cells
    orders: Arena<Order>,
    /// Pool of price-level cells
    levels: Arena<PriceLevel>,
    /// Bid side, best = highest price
    bids: BookSide,
    /// Ask side, best = lowest price
    asks: BookSide,
    /// OrderId -> slot lookup for O(1) cancel/modify
    index: FxHashMap<OrderId, SlotIndex>,
    /// Session-monotonic identifier counter
    next_id: OrderId,
    /// Rolling trade window and session totals
    stats: TradeStats,
    /// Registered event sinks
    subscribers: Subscribers,
    config: EngineConfig,
    /// Anchor for monotonic timestamps
    epoch: Instant,
}

impl OrderBook {
    /// Create an engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with explicit configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            orders: Arena::new(config.order_blocks, config.block_slots),
            levels: Arena::new(config.level_blocks, config.block_slots),
            bids: BookSide::new(Side::Buy),
            asks: BookSide::new(Side::Sell),
            index: FxHashMap::default(),
            next_id: 1,
            stats: TradeStats::new(config.trade_window),
            subscribers: Subscribers::default(),
            config,
            epoch: Instant::now(),
        }
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Submit a new order.
    ///
    /// Matches against the opposite side under price-time priority, then
    /// classifies the residual by order type: limit residuals rest,
    /// IOC/market residuals are cancelled, and fill-or-kill orders either
    /// execute in full or are rejected before any fill is emitted.
    ///
    /// Returns the engine-assigned identifier. Identifiers are never reused
    /// within a session, including those consumed by rejected submissions.
    pub fn submit(
        &mut self,
        price: Price,
        quantity: Quantity,
        side: Side,
        order_type: OrderType,
    ) -> Result<OrderId, SubmitError> {
        if quantity == 0 {
            debug!(price, "rejecting zero-quantity submission");
            return Err(SubmitError::InvalidQuantity);
        }

        let id = self.next_id;
        self.next_id += 1;
        let timestamp = self.now();

        let idx = self.orders.alloc()?;
        *self.orders.get_mut(idx) = Order::new(id, price, quantity, side, order_type, timestamp);
        self.index.insert(id, idx);
        trace!(order_id = id, ?side, ?order_type, price, quantity, "submit");

        // Market orders cross to the opposite quote; with nothing on the
        // opposite side there is no price to execute against.
        if order_type == OrderType::Market {
            let opposite_top = match side {
                Side::Buy => self.asks.top(),
                Side::Sell => self.bids.top(),
            };
            match opposite_top {
                Some((best, _)) => self.orders.get_mut(idx).price = best,
                None => {
                    self.discard(id, idx, OrderStatus::Rejected);
                    debug!(order_id = id, "market order rejected: empty opposite side");
                    return Err(SubmitError::NoLiquidity);
                }
            }
        }

        // Fill-or-kill feasibility is decided before the book is touched so
        // an infeasible order emits no partial fills.
        if order_type == OrderType::FillOrKill {
            let limit = self.orders.get(idx).price;
            if !self.crossable_quantity_covers(side, limit, quantity) {
                self.discard(id, idx, OrderStatus::Rejected);
                debug!(order_id = id, quantity, "fill-or-kill rejected: not fully fillable");
                return Err(SubmitError::Unfillable);
            }
        }

        self.match_incoming(idx);

        let order = *self.orders.get(idx);
        if order.is_filled() {
            self.index.remove(&id);
            self.orders.free(idx);
        } else if order_type == OrderType::Limit {
            self.rest(idx)?;
            let snapshot = *self.orders.get(idx);
            self.subscribers.notify_order(&snapshot);
        } else {
            // IOC remainder, or a market order that outlived its priced
            // level. The fill-or-kill pre-check guarantees no residual here.
            debug_assert!(order_type != OrderType::FillOrKill);
            self.discard(id, idx, OrderStatus::Cancelled);
        }

        let state = self.market_state();
        self.subscribers.notify_state(&state);

        Ok(id)
    }

    /// Match the incoming order against the opposite side while it still
    /// crosses and quantity remains.
    fn match_incoming(&mut self, incoming_idx: SlotIndex) {
        loop {
            let incoming = *self.orders.get(incoming_idx);
            if incoming.remaining() == 0 {
                break;
            }

            let opposite = match incoming.side {
                Side::Buy => &self.asks,
                Side::Sell => &self.bids,
            };
            let Some((best_price, level_idx)) = opposite.top() else {
                break;
            };

            // Equality crosses: the passive side still wins and prices the trade.
            let crosses = match incoming.side {
                Side::Buy => incoming.price >= best_price,
                Side::Sell => incoming.price <= best_price,
            };
            if !crosses {
                break;
            }

            let passive_idx = self.levels.get(level_idx).peek();
            debug_assert!(passive_idx != NULL_INDEX, "non-empty level with no head");

            let match_quantity = incoming
                .remaining()
                .min(self.orders.get(passive_idx).remaining());

            self.execute_trade(passive_idx, incoming_idx, level_idx, match_quantity);
        }
    }

    /// Execute one match step: advance fills, re-sync the level aggregate,
    /// publish the trade and both order transitions, and retire the passive
    /// order if it is done.
    fn execute_trade(
        &mut self,
        passive_idx: SlotIndex,
        aggressive_idx: SlotIndex,
        level_idx: SlotIndex,
        quantity: Quantity,
    ) {
        let passive_old_remaining = self.orders.get(passive_idx).remaining();

        {
            let passive = self.orders.get_mut(passive_idx);
            passive.filled += quantity;
            passive.status = if passive.is_filled() {
                OrderStatus::Filled
            } else {
                OrderStatus::PartiallyFilled
            };
        }
        {
            let aggressive = self.orders.get_mut(aggressive_idx);
            aggressive.filled += quantity;
            aggressive.status = if aggressive.is_filled() {
                OrderStatus::Filled
            } else {
                OrderStatus::PartiallyFilled
            };
        }

        let passive = *self.orders.get(passive_idx);
        let aggressive = *self.orders.get(aggressive_idx);

        self.levels
            .get_mut(level_idx)
            .adjust(passive_old_remaining, passive.remaining());

        let (buyer_order_id, seller_order_id) = match passive.side {
            Side::Buy => (passive.id, aggressive.id),
            Side::Sell => (aggressive.id, passive.id),
        };
        let trade = Trade {
            buyer_order_id,
            seller_order_id,
            price: passive.price,
            quantity,
            taker_side: aggressive.side,
            timestamp: self.now(),
        };
        trace!(
            buyer = buyer_order_id,
            seller = seller_order_id,
            price = trade.price,
            quantity,
            "trade"
        );

        self.stats.record(&trade);
        self.subscribers.notify_trade(&trade);
        self.subscribers.notify_order(&passive);
        self.subscribers.notify_order(&aggressive);

        if passive.is_filled() {
            self.levels.get_mut(level_idx).pop_front(&mut self.orders);
            self.index.remove(&passive.id);
            self.orders.free(passive_idx);

            let book_side = match passive.side {
                Side::Buy => &mut self.bids,
                Side::Sell => &mut self.asks,
            };
            book_side.drop_if_empty(passive.price, &mut self.levels);
        }
    }

    /// Read-only walk of the opposite side: does crossable resting quantity
    /// cover `required` at `limit`?
    fn crossable_quantity_covers(&self, side: Side, limit: Price, required: Quantity) -> bool {
        let opposite = match side {
            Side::Buy => &self.asks,
            Side::Sell => &self.bids,
        };
        let mut available: Quantity = 0;
        for (price, level_idx) in opposite.iter_best_first() {
            let crosses = match side {
                Side::Buy => limit >= price,
                Side::Sell => limit <= price,
            };
            if !crosses {
                break;
            }
            available = available.saturating_add(self.levels.get(level_idx).total_quantity);
            if available >= required {
                return true;
            }
        }
        false
    }

    /// Park a limit residual at the tail of its price level.
    fn rest(&mut self, idx: SlotIndex) -> Result<(), SubmitError> {
        let order = *self.orders.get(idx);
        let book_side = match order.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let level_idx = match book_side.touch(order.price, &mut self.levels) {
            Ok(level_idx) => level_idx,
            Err(err) => {
                self.index.remove(&order.id);
                self.orders.free(idx);
                return Err(err.into());
            }
        };
        self.levels.get_mut(level_idx).push_back(&mut self.orders, idx);
        Ok(())
    }

    /// Retire an order that never rested: set its terminal status, drop the
    /// index entry, return the cell.
    fn discard(&mut self, id: OrderId, idx: SlotIndex, status: OrderStatus) {
        self.orders.get_mut(idx).status = status;
        self.index.remove(&id);
        self.orders.free(idx);
    }

    // ========================================================================
    // Cancel / modify
    // ========================================================================

    /// Cancel a live order.
    ///
    /// Returns `true` if the order was live and is now cancelled; `false`
    /// for unknown or already-terminal identifiers. A second cancel of the
    /// same id returns `false`.
    pub fn cancel(&mut self, order_id: OrderId) -> bool {
        let Some(&idx) = self.index.get(&order_id) else {
            trace!(order_id, "cancel: unknown identifier");
            return false;
        };
        let order = *self.orders.get(idx);

        // Every live order outside a submit call rests in its level.
        let book_side = match order.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        if let Some(level_idx) = book_side.get(order.price) {
            self.levels.get_mut(level_idx).unlink(&mut self.orders, idx);
            book_side.drop_if_empty(order.price, &mut self.levels);
        }

        self.orders.get_mut(idx).status = OrderStatus::Cancelled;
        let snapshot = *self.orders.get(idx);
        self.subscribers.notify_order(&snapshot);

        self.index.remove(&order_id);
        self.orders.free(idx);
        trace!(order_id, "cancelled");
        true
    }

    /// Cancel-and-replace.
    ///
    /// The replacement receives a fresh identifier and loses time priority;
    /// that identifier is returned. `None` means the original was unknown or
    /// terminal, or the new quantity is invalid - in either case the book is
    /// left exactly as it was.
    pub fn modify(
        &mut self,
        order_id: OrderId,
        new_price: Price,
        new_quantity: Quantity,
    ) -> Option<OrderId> {
        if new_quantity == 0 {
            return None;
        }
        let &idx = self.index.get(&order_id)?;
        let (side, order_type) = {
            let order = self.orders.get(idx);
            (order.side, order.order_type)
        };

        self.cancel(order_id);
        // Only limit orders rest, so the replacement is a limit order too;
        // it can fail only on allocator exhaustion.
        self.submit(new_price, new_quantity, side, order_type).ok()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Best bid price (highest buy).
    #[inline]
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.top().map(|(price, _)| price)
    }

    /// Best ask price (lowest sell).
    #[inline]
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.top().map(|(price, _)| price)
    }

    /// Integer midpoint, floored: the lower midpoint for odd sums.
    #[inline]
    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask).div_euclid(2)),
            _ => None,
        }
    }

    /// best_ask - best_bid, when both sides exist.
    #[inline]
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Aggregate resting quantity at an exact price on one side.
    #[inline]
    pub fn volume_at(&self, price: Price, side: Side) -> Quantity {
        let book_side = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        book_side
            .get(price)
            .map_or(0, |idx| self.levels.get(idx).total_quantity)
    }

    /// Immutable snapshot of a live order.
    #[inline]
    pub fn get_order(&self, order_id: OrderId) -> Option<Order> {
        self.index.get(&order_id).map(|&idx| *self.orders.get(idx))
    }

    /// Number of live orders.
    #[inline]
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    /// Number of live (bid, ask) price levels.
    #[inline]
    pub fn level_counts(&self) -> (usize, usize) {
        (self.bids.len(), self.asks.len())
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Register a trade subscriber; invoked per fill in registration order.
    pub fn subscribe_trades(
        &mut self,
        callback: impl FnMut(&Trade) + 'static,
    ) -> SubscriberHandle {
        self.subscribers.register_trade(Box::new(callback))
    }

    /// Register an order-update subscriber.
    pub fn subscribe_orders(
        &mut self,
        callback: impl FnMut(&Order) + 'static,
    ) -> SubscriberHandle {
        self.subscribers.register_order(Box::new(callback))
    }

    /// Register a market-state subscriber; invoked once per completed submit.
    pub fn subscribe_state(
        &mut self,
        callback: impl FnMut(&MarketState) + 'static,
    ) -> SubscriberHandle {
        self.subscribers.register_state(Box::new(callback))
    }

    // ========================================================================
    // Utilities
    // ========================================================================

    /// Pre-fault pool pages before the hot path runs.
    pub fn warm(&self) {
        self.orders.warm();
        self.levels.warm();
    }

    /// Hash of the observable book state, for determinism testing.
    pub fn state_hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        self.best_bid().hash(&mut hasher);
        self.best_ask().hash(&mut hasher);
        self.order_count().hash(&mut hasher);
        self.level_counts().hash(&mut hasher);
        self.orders.live().hash(&mut hasher);
        hasher.finish()
    }

    /// Monotonic nanoseconds since engine construction.
    #[inline]
    pub(crate) fn now(&self) -> Timestamp {
        self.epoch.elapsed().as_nanos() as Timestamp
    }

    pub(crate) fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn bid_side(&self) -> &BookSide {
        &self.bids
    }

    pub(crate) fn ask_side(&self) -> &BookSide {
        &self.asks
    }

    pub(crate) fn level_pool(&self) -> &Arena<PriceLevel> {
        &self.levels
    }

    pub(crate) fn trade_stats(&self) -> &TradeStats {
        &self.stats
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBook")
            .field("best_bid", &self.best_bid())
            .field("best_ask", &self.best_ask())
            .field("bid_levels", &self.bids.len())
            .field("ask_levels", &self.asks.len())
            .field("order_count", &self.index.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn collect_trades(book: &mut OrderBook) -> Rc<RefCell<Vec<Trade>>> {
        let trades = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&trades);
        book.subscribe_trades(move |t| sink.borrow_mut().push(*t));
        trades
    }

    #[test]
    fn test_rest_bid_no_match() {
        let mut book = OrderBook::new();

        let id = book.submit(10_000, 100, Side::Buy, OrderType::Limit).unwrap();

        assert_eq!(book.best_bid(), Some(10_000));
        assert_eq!(book.best_ask(), None);
        assert_eq!(book.order_count(), 1);

        let order = book.get_order(id).unwrap();
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.remaining(), 100);
    }

    #[test]
    fn test_full_match_at_equal_price() {
        let mut book = OrderBook::new();
        let trades = collect_trades(&mut book);

        let ask = book.submit(10_000, 100, Side::Sell, OrderType::Limit).unwrap();
        let bid = book.submit(10_000, 100, Side::Buy, OrderType::Limit).unwrap();

        let trades = trades.borrow();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, 10_000);
        assert_eq!(trades[0].quantity, 100);
        assert_eq!(trades[0].buyer_order_id, bid);
        assert_eq!(trades[0].seller_order_id, ask);
        assert_eq!(trades[0].taker_side, Side::Buy);

        assert_eq!(book.order_count(), 0);
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn test_partial_match_taker_rests() {
        let mut book = OrderBook::new();
        let trades = collect_trades(&mut book);

        book.submit(10_000, 50, Side::Sell, OrderType::Limit).unwrap();
        let bid = book.submit(10_000, 100, Side::Buy, OrderType::Limit).unwrap();

        assert_eq!(trades.borrow().len(), 1);
        assert_eq!(trades.borrow()[0].quantity, 50);

        let resting = book.get_order(bid).unwrap();
        assert_eq!(resting.status, OrderStatus::PartiallyFilled);
        assert_eq!(resting.remaining(), 50);
        assert_eq!(book.best_bid(), Some(10_000));
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn test_partial_match_maker_remains() {
        let mut book = OrderBook::new();

        let ask = book.submit(10_000, 100, Side::Sell, OrderType::Limit).unwrap();
        book.submit(10_000, 30, Side::Buy, OrderType::Limit).unwrap();

        assert_eq!(book.order_count(), 1);
        assert_eq!(book.best_ask(), Some(10_000));
        assert_eq!(book.volume_at(10_000, Side::Sell), 70);

        let maker = book.get_order(ask).unwrap();
        assert_eq!(maker.status, OrderStatus::PartiallyFilled);
        assert_eq!(maker.remaining(), 70);
    }

    #[test]
    fn test_match_walks_price_levels_best_first() {
        let mut book = OrderBook::new();
        let trades = collect_trades(&mut book);

        book.submit(10_020, 50, Side::Sell, OrderType::Limit).unwrap();
        book.submit(10_000, 50, Side::Sell, OrderType::Limit).unwrap();
        book.submit(10_010, 50, Side::Sell, OrderType::Limit).unwrap();

        book.submit(10_020, 120, Side::Buy, OrderType::Limit).unwrap();

        let trades = trades.borrow();
        assert_eq!(trades.len(), 3);
        assert_eq!((trades[0].price, trades[0].quantity), (10_000, 50));
        assert_eq!((trades[1].price, trades[1].quantity), (10_010, 50));
        assert_eq!((trades[2].price, trades[2].quantity), (10_020, 20));

        assert_eq!(book.volume_at(10_020, Side::Sell), 30);
    }

    #[test]
    fn test_fifo_priority_within_level() {
        let mut book = OrderBook::new();
        let trades = collect_trades(&mut book);

        let first = book.submit(10_000, 100, Side::Sell, OrderType::Limit).unwrap();
        let second = book.submit(10_000, 100, Side::Sell, OrderType::Limit).unwrap();
        let third = book.submit(10_000, 100, Side::Sell, OrderType::Limit).unwrap();

        book.submit(10_000, 200, Side::Buy, OrderType::Limit).unwrap();

        let trades = trades.borrow();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].seller_order_id, first);
        assert_eq!(trades[1].seller_order_id, second);

        assert!(book.get_order(third).is_some());
        assert_eq!(book.order_count(), 1);
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let mut book = OrderBook::new();
        let result = book.submit(10_000, 0, Side::Buy, OrderType::Limit);
        assert!(matches!(result, Err(SubmitError::InvalidQuantity)));
        assert_eq!(book.order_count(), 0);

        // Id counter did not advance
        let id = book.submit(10_000, 1, Side::Buy, OrderType::Limit).unwrap();
        assert_eq!(id, 1);
    }

    #[test]
    fn test_market_order_executes_at_best() {
        let mut book = OrderBook::new();
        let trades = collect_trades(&mut book);

        let ask = book.submit(10_005, 100, Side::Sell, OrderType::Limit).unwrap();
        let market = book.submit(0, 60, Side::Buy, OrderType::Market).unwrap();

        let trades = trades.borrow();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, 10_005);
        assert_eq!(trades[0].quantity, 60);
        assert_eq!(trades[0].buyer_order_id, market);
        assert_eq!(trades[0].seller_order_id, ask);

        assert_eq!(book.volume_at(10_005, Side::Sell), 40);
        assert!(book.get_order(market).is_none());
    }

    #[test]
    fn test_market_order_empty_book_rejected() {
        let mut book = OrderBook::new();
        let result = book.submit(0, 60, Side::Buy, OrderType::Market);
        assert!(matches!(result, Err(SubmitError::NoLiquidity)));
        assert_eq!(book.order_count(), 0);
    }

    #[test]
    fn test_market_residual_cancelled_not_rested() {
        let mut book = OrderBook::new();

        book.submit(10_005, 40, Side::Sell, OrderType::Limit).unwrap();
        let market = book.submit(0, 100, Side::Buy, OrderType::Market).unwrap();

        // 40 filled, the rest cancelled; nothing rests on the bid side
        assert!(book.get_order(market).is_none());
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn test_ioc_partial_then_cancel() {
        let mut book = OrderBook::new();
        let trades = collect_trades(&mut book);

        book.submit(10_005, 40, Side::Sell, OrderType::Limit).unwrap();
        let ioc = book
            .submit(10_005, 100, Side::Buy, OrderType::ImmediateOrCancel)
            .unwrap();

        assert_eq!(trades.borrow().len(), 1);
        assert_eq!(trades.borrow()[0].quantity, 40);
        assert!(book.get_order(ioc).is_none());
        assert_eq!(book.volume_at(10_005, Side::Buy), 0);
        assert_eq!(book.order_count(), 0);
    }

    #[test]
    fn test_ioc_no_cross_no_trade() {
        let mut book = OrderBook::new();
        let trades = collect_trades(&mut book);

        book.submit(10_010, 40, Side::Sell, OrderType::Limit).unwrap();
        book.submit(10_000, 40, Side::Buy, OrderType::ImmediateOrCancel)
            .unwrap();

        assert!(trades.borrow().is_empty());
        assert_eq!(book.order_count(), 1);
        assert_eq!(book.best_bid(), None);
    }

    #[test]
    fn test_fok_infeasible_rejected_without_fills() {
        let mut book = OrderBook::new();
        let trades = collect_trades(&mut book);

        book.submit(10_005, 40, Side::Sell, OrderType::Limit).unwrap();
        book.submit(10_010, 30, Side::Sell, OrderType::Limit).unwrap();

        let result = book.submit(10_010, 100, Side::Buy, OrderType::FillOrKill);
        assert!(matches!(result, Err(SubmitError::Unfillable)));

        assert!(trades.borrow().is_empty());
        assert_eq!(book.volume_at(10_005, Side::Sell), 40);
        assert_eq!(book.volume_at(10_010, Side::Sell), 30);
        assert_eq!(book.order_count(), 2);
    }

    #[test]
    fn test_fok_feasible_across_levels_fills_fully() {
        let mut book = OrderBook::new();
        let trades = collect_trades(&mut book);

        book.submit(10_005, 40, Side::Sell, OrderType::Limit).unwrap();
        book.submit(10_010, 30, Side::Sell, OrderType::Limit).unwrap();

        let fok = book.submit(10_010, 70, Side::Buy, OrderType::FillOrKill).unwrap();

        let trades = trades.borrow();
        assert_eq!(trades.len(), 2);
        assert_eq!((trades[0].price, trades[0].quantity), (10_005, 40));
        assert_eq!((trades[1].price, trades[1].quantity), (10_010, 30));
        assert!(book.get_order(fok).is_none());
        assert_eq!(book.order_count(), 0);
    }

    #[test]
    fn test_fok_ignores_non_crossing_liquidity() {
        let mut book = OrderBook::new();

        book.submit(10_005, 40, Side::Sell, OrderType::Limit).unwrap();
        book.submit(10_020, 100, Side::Sell, OrderType::Limit).unwrap();

        // Enough total quantity exists, but not within the limit price
        let result = book.submit(10_010, 100, Side::Buy, OrderType::FillOrKill);
        assert!(matches!(result, Err(SubmitError::Unfillable)));
        assert_eq!(book.order_count(), 2);
    }

    #[test]
    fn test_cancel_resting() {
        let mut book = OrderBook::new();

        let id = book.submit(10_000, 100, Side::Buy, OrderType::Limit).unwrap();
        assert!(book.cancel(id));

        assert_eq!(book.order_count(), 0);
        assert_eq!(book.best_bid(), None);
        assert!(book.get_order(id).is_none());
    }

    #[test]
    fn test_cancel_unknown_and_double_cancel() {
        let mut book = OrderBook::new();
        assert!(!book.cancel(999));

        let id = book.submit(10_000, 100, Side::Buy, OrderType::Limit).unwrap();
        assert!(book.cancel(id));
        assert!(!book.cancel(id));
    }

    #[test]
    fn test_cancel_after_fill_returns_false() {
        let mut book = OrderBook::new();

        let ask = book.submit(10_000, 100, Side::Sell, OrderType::Limit).unwrap();
        book.submit(10_000, 100, Side::Buy, OrderType::Limit).unwrap();

        assert!(!book.cancel(ask));
    }

    #[test]
    fn test_cancel_partial_fill_removes_remainder() {
        let mut book = OrderBook::new();

        let ask = book.submit(10_000, 1_000, Side::Sell, OrderType::Limit).unwrap();
        book.submit(10_000, 300, Side::Buy, OrderType::Limit).unwrap();

        assert_eq!(book.volume_at(10_000, Side::Sell), 700);
        assert!(book.cancel(ask));
        assert_eq!(book.volume_at(10_000, Side::Sell), 0);
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn test_modify_moves_price_and_quantity() {
        let mut book = OrderBook::new();

        let id = book.submit(10_000, 100, Side::Buy, OrderType::Limit).unwrap();
        let new_id = book.modify(id, 10_050, 200).unwrap();

        assert_ne!(new_id, id);
        assert!(book.get_order(id).is_none());
        assert_eq!(book.best_bid(), Some(10_050));
        assert_eq!(book.volume_at(10_050, Side::Buy), 200);

        let replacement = book.get_order(new_id).unwrap();
        assert_eq!(replacement.side, Side::Buy);
        assert_eq!(replacement.order_type, OrderType::Limit);
    }

    #[test]
    fn test_modify_loses_time_priority() {
        let mut book = OrderBook::new();
        let trades = collect_trades(&mut book);

        let first = book.submit(10_000, 100, Side::Sell, OrderType::Limit).unwrap();
        let second = book.submit(10_000, 100, Side::Sell, OrderType::Limit).unwrap();

        // Re-pricing to the same level sends the order to the back of the queue
        let replacement = book.modify(first, 10_000, 100).unwrap();

        book.submit(10_000, 100, Side::Buy, OrderType::Limit).unwrap();
        assert_eq!(trades.borrow()[0].seller_order_id, second);
        assert!(book.get_order(replacement).is_some());
    }

    #[test]
    fn test_modify_unknown_or_filled_returns_none() {
        let mut book = OrderBook::new();
        assert_eq!(book.modify(42, 10_000, 100), None);

        let ask = book.submit(10_000, 100, Side::Sell, OrderType::Limit).unwrap();
        book.submit(10_000, 100, Side::Buy, OrderType::Limit).unwrap();
        assert_eq!(book.modify(ask, 10_050, 100), None);
    }

    #[test]
    fn test_modify_zero_quantity_leaves_book_untouched() {
        let mut book = OrderBook::new();
        let id = book.submit(10_000, 100, Side::Buy, OrderType::Limit).unwrap();

        assert_eq!(book.modify(id, 10_050, 0), None);
        assert!(book.get_order(id).is_some());
        assert_eq!(book.best_bid(), Some(10_000));
    }

    #[test]
    fn test_mid_price_floors_odd_sums() {
        let mut book = OrderBook::new();
        book.submit(9_995, 100, Side::Buy, OrderType::Limit).unwrap();
        book.submit(10_006, 100, Side::Sell, OrderType::Limit).unwrap();

        // (9995 + 10006) / 2 = 10000.5 -> 10000
        assert_eq!(book.mid_price(), Some(10_000));
        assert_eq!(book.spread(), Some(11));
    }

    #[test]
    fn test_mid_price_floor_for_negative_sum() {
        let mut book = OrderBook::new();
        book.submit(-8, 10, Side::Buy, OrderType::Limit).unwrap();
        book.submit(-3, 10, Side::Sell, OrderType::Limit).unwrap();

        // (-8 + -3) / 2 = -5.5 -> floor is -6
        assert_eq!(book.mid_price(), Some(-6));
    }

    #[test]
    fn test_queries_on_empty_book() {
        let book = OrderBook::new();
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
        assert_eq!(book.mid_price(), None);
        assert_eq!(book.spread(), None);
        assert_eq!(book.volume_at(10_000, Side::Buy), 0);
        assert_eq!(book.order_count(), 0);
        assert_eq!(book.level_counts(), (0, 0));
    }

    #[test]
    fn test_book_never_crossed_between_operations() {
        let mut book = OrderBook::new();

        book.submit(10_000, 100, Side::Buy, OrderType::Limit).unwrap();
        book.submit(10_010, 100, Side::Sell, OrderType::Limit).unwrap();
        // Aggressive sell crosses and consumes the bid instead of resting through it
        book.submit(9_990, 150, Side::Sell, OrderType::Limit).unwrap();

        let (bid, ask) = (book.best_bid(), book.best_ask());
        if let (Some(bid), Some(ask)) = (bid, ask) {
            assert!(bid < ask);
        }
        // 100 traded at 10_000, residual 50 rests as best ask at 9_990
        assert_eq!(book.best_ask(), Some(9_990));
        assert_eq!(book.best_bid(), None);
    }

    #[test]
    fn test_self_match_not_prevented() {
        // The engine has no identity concept; an account crossing itself trades
        let mut book = OrderBook::new();
        let trades = collect_trades(&mut book);

        book.submit(10_000, 100, Side::Sell, OrderType::Limit).unwrap();
        book.submit(10_000, 100, Side::Buy, OrderType::Limit).unwrap();

        assert_eq!(trades.borrow().len(), 1);
    }

    #[test]
    fn test_ids_are_session_monotonic() {
        let mut book = OrderBook::new();
        let a = book.submit(10_000, 100, Side::Buy, OrderType::Limit).unwrap();
        let b = book.submit(10_001, 100, Side::Buy, OrderType::Limit).unwrap();
        // A rejected market order still consumes an id
        assert!(book.submit(0, 10, Side::Sell, OrderType::Market).is_ok());
        let c = book.submit(10_002, 100, Side::Buy, OrderType::Limit).unwrap();

        assert_eq!(b, a + 1);
        assert_eq!(c, b + 2);
    }

    #[test]
    fn test_state_event_once_per_submit() {
        let mut book = OrderBook::new();
        let count = Rc::new(RefCell::new(0usize));
        let sink = Rc::clone(&count);
        book.subscribe_state(move |_| *sink.borrow_mut() += 1);

        book.submit(10_000, 100, Side::Sell, OrderType::Limit).unwrap();
        // Crossing submit executes two fills but still emits one state event
        book.submit(10_000, 100, Side::Buy, OrderType::Limit).unwrap();
        assert_eq!(*count.borrow(), 2);

        // Cancel does not emit state events
        let id = book.submit(9_000, 10, Side::Buy, OrderType::Limit).unwrap();
        book.cancel(id);
        assert_eq!(*count.borrow(), 3);
    }

    #[test]
    fn test_order_updates_per_fill() {
        let mut book = OrderBook::new();
        let updates: Rc<RefCell<Vec<(OrderId, OrderStatus)>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&updates);
        book.subscribe_orders(move |o| sink.borrow_mut().push((o.id, o.status)));

        let ask = book.submit(10_000, 100, Side::Sell, OrderType::Limit).unwrap();
        let bid = book.submit(10_000, 40, Side::Buy, OrderType::Limit).unwrap();

        let updates = updates.borrow();
        // Rest of ask, then per-fill passive + aggressor updates
        assert_eq!(
            *updates,
            vec![
                (ask, OrderStatus::New),
                (ask, OrderStatus::PartiallyFilled),
                (bid, OrderStatus::Filled),
            ]
        );
    }

    #[test]
    fn test_level_counts_track_live_levels() {
        let mut book = OrderBook::new();
        book.submit(10_000, 100, Side::Buy, OrderType::Limit).unwrap();
        book.submit(9_990, 100, Side::Buy, OrderType::Limit).unwrap();
        book.submit(10_010, 100, Side::Sell, OrderType::Limit).unwrap();
        assert_eq!(book.level_counts(), (2, 1));

        // Consuming the ask level removes it eagerly
        book.submit(10_010, 100, Side::Buy, OrderType::Limit).unwrap();
        assert_eq!(book.level_counts(), (2, 0));
    }

    #[test]
    fn test_state_hash_determinism() {
        let run = || {
            let mut book = OrderBook::new();
            for i in 0..100i64 {
                let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
                book.submit(10_000 + (i % 10) * 10, 100, side, OrderType::Limit)
                    .unwrap();
            }
            book.state_hash()
        };
        assert_eq!(run(), run());
    }
}
