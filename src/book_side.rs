//! Book side - ordered mapping from price to price level.
//!
//! Both sides key ascending in a `BTreeMap`; the bid side reads its best
//! price from the last entry, the ask side from the first. This keeps level
//! creation and removal at O(log L) and top-of-book at O(1) amortised with
//! no cached-best bookkeeping to invalidate.

use std::collections::BTreeMap;

use crate::arena::{Arena, ArenaError, SlotIndex};
use crate::order::{Price, Side};
use crate::price_level::PriceLevel;

/// One half of the book: every live price level for a single side.
#[derive(Debug)]
pub struct BookSide {
    side: Side,
    levels: BTreeMap<Price, SlotIndex>,
}

impl BookSide {
    /// Create an empty side.
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    /// Which side this is.
    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Return the level at `price`, creating one from the pool if absent.
    pub fn touch(
        &mut self,
        price: Price,
        pool: &mut Arena<PriceLevel>,
    ) -> Result<SlotIndex, ArenaError> {
        if let Some(&idx) = self.levels.get(&price) {
            return Ok(idx);
        }
        let idx = pool.alloc()?;
        pool.get_mut(idx).price = price;
        self.levels.insert(price, idx);
        Ok(idx)
    }

    /// Remove and deallocate the level at `price` if it holds no orders.
    pub fn drop_if_empty(&mut self, price: Price, pool: &mut Arena<PriceLevel>) {
        if let Some(&idx) = self.levels.get(&price) {
            if pool.get(idx).is_empty() {
                self.levels.remove(&price);
                pool.free(idx);
            }
        }
    }

    /// Best price and its level: highest for bids, lowest for asks.
    #[inline]
    pub fn top(&self) -> Option<(Price, SlotIndex)> {
        match self.side {
            Side::Buy => self.levels.last_key_value().map(|(&p, &i)| (p, i)),
            Side::Sell => self.levels.first_key_value().map(|(&p, &i)| (p, i)),
        }
    }

    /// Level at an exact price, if one exists.
    #[inline]
    pub fn get(&self, price: Price) -> Option<SlotIndex> {
        self.levels.get(&price).copied()
    }

    /// Number of distinct live levels.
    #[inline]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// True if the side holds no levels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Iterate levels in price priority order (best first).
    pub fn iter_best_first(&self) -> Box<dyn Iterator<Item = (Price, SlotIndex)> + '_> {
        match self.side {
            Side::Buy => Box::new(self.levels.iter().rev().map(|(&p, &i)| (p, i))),
            Side::Sell => Box::new(self.levels.iter().map(|(&p, &i)| (p, i))),
        }
    }
}
