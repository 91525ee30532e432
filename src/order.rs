//! Core order and trade types.
//!
//! `Order` is a fixed-layout cell designed to live inside the arena: one
//! cache line, sibling links stored as 32-bit slot indices.

use serde::{Deserialize, Serialize};

use crate::arena::{PoolCell, SlotIndex, NULL_INDEX};

/// Session-unique order identifier, assigned monotonically by the engine.
pub type OrderId = u64;

/// Price in ticks (smallest currency subunit, e.g. cents). Signed.
pub type Price = i64;

/// Order quantity in base units.
pub type Quantity = u64;

/// Monotonic nanoseconds since engine construction.
pub type Timestamp = u64;

/// Order side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    /// Buy side (bids)
    Buy = 0,
    /// Sell side (asks)
    Sell = 1,
}

impl Side {
    /// Returns the opposite side
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order type determines matching behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderType {
    /// Limit order - rests in the book if not fully matched (default)
    #[default]
    Limit = 0,
    /// Market order - executes at the best opposite price, never rests
    Market = 1,
    /// Immediate-Or-Cancel - cancel any unfilled portion immediately
    ImmediateOrCancel = 2,
    /// Fill-Or-Kill - all-or-nothing execution, rejected if not fully fillable
    FillOrKill = 3,
}

/// Order lifecycle status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderStatus {
    /// Accepted, no fills yet
    #[default]
    New = 0,
    /// Some quantity filled, some remaining
    PartiallyFilled = 1,
    /// Fully filled
    Filled = 2,
    /// Cancelled before completion
    Cancelled = 3,
    /// Rejected without execution
    Rejected = 4,
}

impl OrderStatus {
    /// Terminal statuses never transition again.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

/// A single order cell - exactly 64 bytes (one cache line).
///
/// Sibling links embed the order in its price level's FIFO; they are arena
/// slot indices, not pointers, so they stay valid across pool growth.
#[repr(C)]
#[repr(align(64))]
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Order {
    /// Engine-assigned identifier
    pub id: OrderId,
    /// Limit price in ticks (resolved best-opposite for market orders)
    pub price: Price,
    /// Original quantity
    pub quantity: Quantity,
    /// Quantity filled so far (<= quantity)
    pub filled: Quantity,
    /// Submission time, monotonic nanoseconds
    pub timestamp: Timestamp,
    /// Next order at the same price level (towards the tail)
    #[serde(skip)]
    pub(crate) next: SlotIndex,
    /// Previous order at the same price level (towards the head)
    #[serde(skip)]
    pub(crate) prev: SlotIndex,
    /// Buy or sell
    pub side: Side,
    /// Matching behavior
    pub order_type: OrderType,
    /// Lifecycle status
    pub status: OrderStatus,
}

const _: () = assert!(
    std::mem::size_of::<Order>() == 64,
    "Order must be exactly 64 bytes (one cache line)"
);

const _: () = assert!(
    std::mem::align_of::<Order>() == 64,
    "Order must be 64-byte aligned"
);

impl Order {
    /// Create a fresh order cell with no fills and cleared links.
    #[inline]
    pub(crate) fn new(
        id: OrderId,
        price: Price,
        quantity: Quantity,
        side: Side,
        order_type: OrderType,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id,
            price,
            quantity,
            filled: 0,
            timestamp,
            next: NULL_INDEX,
            prev: NULL_INDEX,
            side,
            order_type,
            status: OrderStatus::New,
        }
    }

    /// Quantity still open.
    #[inline]
    pub const fn remaining(&self) -> Quantity {
        self.quantity - self.filled
    }

    /// True once every unit has been executed.
    #[inline]
    pub const fn is_filled(&self) -> bool {
        self.filled >= self.quantity
    }
}

impl Default for Order {
    fn default() -> Self {
        Self {
            id: 0,
            price: 0,
            quantity: 0,
            filled: 0,
            timestamp: 0,
            next: NULL_INDEX,
            prev: NULL_INDEX,
            side: Side::Buy,
            order_type: OrderType::Limit,
            status: OrderStatus::New,
        }
    }
}

impl PoolCell for Order {
    #[inline]
    fn free_link(&self) -> SlotIndex {
        self.next
    }

    #[inline]
    fn set_free_link(&mut self, next: SlotIndex) {
        self.next = next;
    }
}

/// An executed match between two orders.
///
/// The price is always the passive (resting) side's price; `taker_side`
/// records which side was the aggressor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Identifier of the buy-side order
    pub buyer_order_id: OrderId,
    /// Identifier of the sell-side order
    pub seller_order_id: OrderId,
    /// Execution price (the passive order's price)
    pub price: Price,
    /// Executed quantity
    pub quantity: Quantity,
    /// Side of the aggressor (incoming) order
    pub taker_side: Side,
    /// Execution time, monotonic nanoseconds
    pub timestamp: Timestamp,
}
