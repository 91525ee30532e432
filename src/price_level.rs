//! Price level - FIFO queue of resting orders at a single price.
//!
//! Implements a doubly-linked list over arena slot indices for O(1) append,
//! head removal, and removal from arbitrary position. Head-to-tail order is
//! submission order; the head is the time-priority winner.

use crate::arena::{Arena, PoolCell, SlotIndex, NULL_INDEX};
use crate::order::{Order, Price, Quantity};

/// Aggregate view of all resting orders at one price.
///
/// One cache line, like the order cells it chains together.
#[repr(align(64))]
#[derive(Clone, Copy, Debug)]
pub struct PriceLevel {
    /// Price shared by every linked order
    pub price: Price,
    /// Sum of remaining quantities across linked orders
    pub total_quantity: Quantity,
    /// Number of linked orders
    pub order_count: u32,
    /// Index of the oldest order (first to match)
    pub(crate) head: SlotIndex,
    /// Index of the newest order (last to match)
    pub(crate) tail: SlotIndex,
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self {
            price: 0,
            total_quantity: 0,
            order_count: 0,
            head: NULL_INDEX,
            tail: NULL_INDEX,
        }
    }
}

impl PoolCell for PriceLevel {
    #[inline]
    fn free_link(&self) -> SlotIndex {
        self.head
    }

    #[inline]
    fn set_free_link(&mut self, next: SlotIndex) {
        self.head = next;
    }
}

impl PriceLevel {
    /// True if there are no orders at this level
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.order_count == 0
    }

    /// Peek at the head order without removing it.
    ///
    /// Returns `NULL_INDEX` if the level is empty.
    #[inline]
    pub const fn peek(&self) -> SlotIndex {
        self.head
    }

    /// Append an order at the tail (newest, lowest time priority).
    ///
    /// # Complexity
    /// O(1)
    #[inline]
    pub fn push_back(&mut self, orders: &mut Arena<Order>, index: SlotIndex) {
        let remaining = orders.get(index).remaining();

        if self.tail == NULL_INDEX {
            debug_assert!(self.head == NULL_INDEX);
            self.head = index;
            self.tail = index;
            let order = orders.get_mut(index);
            order.prev = NULL_INDEX;
            order.next = NULL_INDEX;
        } else {
            orders.get_mut(self.tail).next = index;
            let order = orders.get_mut(index);
            order.prev = self.tail;
            order.next = NULL_INDEX;
            self.tail = index;
        }

        self.order_count += 1;
        self.total_quantity += remaining;
    }

    /// Remove and return the head order (oldest, highest priority).
    ///
    /// The slot is NOT freed from the arena; the caller owns that.
    ///
    /// # Complexity
    /// O(1)
    #[inline]
    pub fn pop_front(&mut self, orders: &mut Arena<Order>) -> Option<SlotIndex> {
        if self.head == NULL_INDEX {
            return None;
        }

        let index = self.head;
        let order = orders.get(index);
        let next = order.next;
        let remaining = order.remaining();

        if next == NULL_INDEX {
            self.head = NULL_INDEX;
            self.tail = NULL_INDEX;
        } else {
            self.head = next;
            orders.get_mut(next).prev = NULL_INDEX;
        }

        self.order_count -= 1;
        self.total_quantity -= remaining;

        let order = orders.get_mut(index);
        order.prev = NULL_INDEX;
        order.next = NULL_INDEX;

        Some(index)
    }

    /// Splice an order out of the queue from any position (for cancel).
    ///
    /// The slot is NOT freed from the arena; the caller owns that.
    ///
    /// # Complexity
    /// O(1)
    #[inline]
    pub fn unlink(&mut self, orders: &mut Arena<Order>, index: SlotIndex) {
        let order = orders.get(index);
        let prev = order.prev;
        let next = order.next;
        let remaining = order.remaining();

        if prev == NULL_INDEX {
            debug_assert!(self.head == index);
            self.head = next;
        } else {
            orders.get_mut(prev).next = next;
        }

        if next == NULL_INDEX {
            debug_assert!(self.tail == index);
            self.tail = prev;
        } else {
            orders.get_mut(next).prev = prev;
        }

        self.order_count -= 1;
        self.total_quantity -= remaining;

        let order = orders.get_mut(index);
        order.prev = NULL_INDEX;
        order.next = NULL_INDEX;
    }

    /// Re-sync the aggregate after a partial fill mutated a linked order's
    /// filled quantity in place.
    #[inline]
    pub fn adjust(&mut self, old_remaining: Quantity, new_remaining: Quantity) {
        debug_assert!(self.total_quantity + new_remaining >= old_remaining);
        self.total_quantity = self.total_quantity - old_remaining + new_remaining;
    }
}
