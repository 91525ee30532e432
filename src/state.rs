//! Market-state projection - bounded snapshot derived from the book and
//! recent trades.
//!
//! The projector is read-only; it walks at most `depth_levels` levels per
//! side plus the rolling trade window, so a snapshot is O(D + K).

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::book::OrderBook;
use crate::order::{Price, Quantity, Timestamp, Trade};

/// Snapshot of the observable market, consumed by strategy layers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    /// Best bid price, if any bid rests
    pub best_bid: Option<Price>,
    /// Best ask price, if any ask rests
    pub best_ask: Option<Price>,
    /// Aggregate quantity at the best bid (0 when empty)
    pub bid_quantity: Quantity,
    /// Aggregate quantity at the best ask (0 when empty)
    pub ask_quantity: Quantity,
    /// best_ask - best_bid when both sides exist
    pub spread: Option<Price>,
    /// Floating-point midpoint, 0.0 when either side is empty
    pub mid_price: f64,
    /// Up to N best bid levels as (price, aggregate quantity), best first
    pub bid_depth: Vec<(Price, Quantity)>,
    /// Up to N best ask levels as (price, aggregate quantity), best first
    pub ask_depth: Vec<(Price, Quantity)>,
    /// (bid_qty - ask_qty) / (bid_qty + ask_qty) at top of book
    pub flow_imbalance: f64,
    /// Price of the most recent trade (0 before any trade)
    pub last_trade_price: Price,
    /// Quantity of the most recent trade (0 before any trade)
    pub last_trade_quantity: Quantity,
    /// Session volume-weighted average price (0.0 before any trade)
    pub vwap: f64,
    /// Population standard deviation of windowed trade prices
    pub price_volatility: f64,
    /// Snapshot time, monotonic nanoseconds
    pub timestamp: Timestamp,
}

/// Rolling trade window plus session running totals.
///
/// Prices and quantities are kept as two parallel sequences capped at the
/// configured window; the VWAP totals are exact integer accumulators over
/// the whole session.
#[derive(Debug)]
pub(crate) struct TradeStats {
    prices: VecDeque<Price>,
    quantities: VecDeque<Quantity>,
    window: usize,
    total_volume: u128,
    total_notional: i128,
}

impl TradeStats {
    pub(crate) fn new(window: usize) -> Self {
        Self {
            prices: VecDeque::with_capacity(window),
            quantities: VecDeque::with_capacity(window),
            window,
            total_volume: 0,
            total_notional: 0,
        }
    }

    /// Fold one execution into the window and the session totals.
    pub(crate) fn record(&mut self, trade: &Trade) {
        if self.prices.len() == self.window {
            self.prices.pop_front();
            self.quantities.pop_front();
        }
        self.prices.push_back(trade.price);
        self.quantities.push_back(trade.quantity);

        self.total_volume += trade.quantity as u128;
        self.total_notional += trade.price as i128 * trade.quantity as i128;
    }

    /// Most recent execution, if any.
    pub(crate) fn last_trade(&self) -> Option<(Price, Quantity)> {
        match (self.prices.back(), self.quantities.back()) {
            (Some(&p), Some(&q)) => Some((p, q)),
            _ => None,
        }
    }

    /// Session VWAP: sum(price * quantity) / sum(quantity).
    pub(crate) fn vwap(&self) -> f64 {
        if self.total_volume == 0 {
            return 0.0;
        }
        self.total_notional as f64 / self.total_volume as f64
    }

    /// Population standard deviation of the windowed trade prices.
    pub(crate) fn volatility(&self) -> f64 {
        let n = self.prices.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.prices.iter().map(|&p| p as f64).sum::<f64>() / n as f64;
        let sq_sum = self
            .prices
            .iter()
            .map(|&p| {
                let d = p as f64 - mean;
                d * d
            })
            .sum::<f64>();
        (sq_sum / n as f64).sqrt()
    }
}

impl OrderBook {
    /// Project the current market state.
    ///
    /// Read-only; never mutates the book.
    pub fn market_state(&self) -> MarketState {
        let depth = self.config().depth_levels;

        let bid_depth: Vec<(Price, Quantity)> = self
            .bid_side()
            .iter_best_first()
            .take(depth)
            .map(|(price, idx)| (price, self.level_pool().get(idx).total_quantity))
            .collect();
        let ask_depth: Vec<(Price, Quantity)> = self
            .ask_side()
            .iter_best_first()
            .take(depth)
            .map(|(price, idx)| (price, self.level_pool().get(idx).total_quantity))
            .collect();

        let best_bid = bid_depth.first().map(|&(p, _)| p);
        let best_ask = ask_depth.first().map(|&(p, _)| p);
        let bid_quantity = bid_depth.first().map_or(0, |&(_, q)| q);
        let ask_quantity = ask_depth.first().map_or(0, |&(_, q)| q);

        let (spread, mid_price) = match (best_bid, best_ask) {
            (Some(bid), Some(ask)) => (Some(ask - bid), (bid + ask) as f64 / 2.0),
            _ => (None, 0.0),
        };

        let top_total = bid_quantity + ask_quantity;
        let flow_imbalance = if top_total > 0 {
            (bid_quantity as f64 - ask_quantity as f64) / top_total as f64
        } else {
            0.0
        };

        let (last_trade_price, last_trade_quantity) =
            self.trade_stats().last_trade().unwrap_or((0, 0));

        MarketState {
            best_bid,
            best_ask,
            bid_quantity,
            ask_quantity,
            spread,
            mid_price,
            bid_depth,
            ask_depth,
            flow_imbalance,
            last_trade_price,
            last_trade_quantity,
            vwap: self.trade_stats().vwap(),
            price_volatility: self.trade_stats().volatility(),
            timestamp: self.now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::Side;

    fn trade(price: Price, quantity: Quantity) -> Trade {
        Trade {
            buyer_order_id: 1,
            seller_order_id: 2,
            price,
            quantity,
            taker_side: Side::Buy,
            timestamp: 0,
        }
    }

    #[test]
    fn test_empty_stats() {
        let stats = TradeStats::new(100);
        assert_eq!(stats.last_trade(), None);
        assert_eq!(stats.vwap(), 0.0);
        assert_eq!(stats.volatility(), 0.0);
    }

    #[test]
    fn test_vwap_running_totals() {
        let mut stats = TradeStats::new(100);
        stats.record(&trade(10_000, 10));
        stats.record(&trade(10_010, 30));

        // (10000*10 + 10010*30) / 40
        let expected = (10_000.0 * 10.0 + 10_010.0 * 30.0) / 40.0;
        assert_eq!(stats.vwap(), expected);
        assert_eq!(stats.last_trade(), Some((10_010, 30)));
    }

    #[test]
    fn test_vwap_spans_beyond_window() {
        // The window caps volatility inputs; VWAP stays session-wide
        let mut stats = TradeStats::new(2);
        stats.record(&trade(100, 1));
        stats.record(&trade(200, 1));
        stats.record(&trade(300, 1));

        assert_eq!(stats.prices.len(), 2);
        assert_eq!(stats.vwap(), 200.0);
    }

    #[test]
    fn test_volatility_single_trade_is_zero() {
        let mut stats = TradeStats::new(100);
        stats.record(&trade(10_000, 10));
        assert_eq!(stats.volatility(), 0.0);
    }

    #[test]
    fn test_volatility_population_stddev() {
        let mut stats = TradeStats::new(100);
        for price in [100, 200, 300, 400] {
            stats.record(&trade(price, 1));
        }
        // mean 250, squared deviations 22500/2500/2500/22500 -> var 12500
        let expected = 12_500.0_f64.sqrt();
        assert!((stats.volatility() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_window_eviction() {
        let mut stats = TradeStats::new(3);
        for price in [1, 2, 3, 4, 5] {
            stats.record(&trade(price, 1));
        }
        let window: Vec<_> = stats.prices.iter().copied().collect();
        assert_eq!(window, vec![3, 4, 5]);
    }
}
