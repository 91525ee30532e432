//! Event fan-out - synchronous subscriber callbacks.
//!
//! Three registries (trade, order update, market state) invoked in
//! registration order on the matching thread. Subscribers borrow the
//! payload only for the duration of the call and must not re-enter the
//! engine; the order cell behind an update may be recycled before the next
//! subscriber runs.

use std::fmt;

use crate::order::{Order, Trade};
use crate::state::MarketState;

/// Callback receiving every executed trade.
pub type TradeCallback = Box<dyn FnMut(&Trade)>;

/// Callback receiving an order snapshot on every state transition.
pub type OrderCallback = Box<dyn FnMut(&Order)>;

/// Callback receiving a market-state snapshot at the end of each submit.
pub type StateCallback = Box<dyn FnMut(&MarketState)>;

/// Opaque handle identifying a registration; carries registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberHandle(pub(crate) usize);

/// The three subscriber registries owned by the engine.
#[derive(Default)]
pub(crate) struct Subscribers {
    trade: Vec<TradeCallback>,
    order: Vec<OrderCallback>,
    state: Vec<StateCallback>,
}

impl Subscribers {
    pub(crate) fn register_trade(&mut self, callback: TradeCallback) -> SubscriberHandle {
        self.trade.push(callback);
        SubscriberHandle(self.trade.len() - 1)
    }

    pub(crate) fn register_order(&mut self, callback: OrderCallback) -> SubscriberHandle {
        self.order.push(callback);
        SubscriberHandle(self.order.len() - 1)
    }

    pub(crate) fn register_state(&mut self, callback: StateCallback) -> SubscriberHandle {
        self.state.push(callback);
        SubscriberHandle(self.state.len() - 1)
    }

    #[inline]
    pub(crate) fn notify_trade(&mut self, trade: &Trade) {
        for callback in &mut self.trade {
            callback(trade);
        }
    }

    #[inline]
    pub(crate) fn notify_order(&mut self, order: &Order) {
        for callback in &mut self.order {
            callback(order);
        }
    }

    #[inline]
    pub(crate) fn notify_state(&mut self, state: &MarketState) {
        for callback in &mut self.state {
            callback(state);
        }
    }
}

impl fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("trade", &self.trade.len())
            .field("order", &self.order.len())
            .field("state", &self.state.len())
            .finish()
    }
}
