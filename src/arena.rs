//! Arena - O(1) slot pool with an intrusive free list.
//!
//! Blocks of cells are pre-allocated up front and the free list is threaded
//! through a link field donated by the cell type itself, so the hot path
//! never touches the system allocator. When the free list runs dry one more
//! block is reserved and linked in; slot indices stay valid across growth.

use std::collections::TryReserveError;
use std::fmt;

use thiserror::Error;

/// Sentinel value representing a null/invalid slot index.
pub const NULL_INDEX: u32 = u32::MAX;

/// Type alias for arena slot indices - our "compressed pointers".
/// Using u32 instead of 64-bit pointers halves link metadata,
/// doubling cache efficiency.
pub type SlotIndex = u32;

/// Failure to obtain a new block from the system allocator.
///
/// This is the only runtime failure the arena signals; it is fatal in most
/// deployments and propagates out of submit.
#[derive(Debug, Error)]
pub enum ArenaError {
    /// The system refused the reservation for one more block
    #[error("arena block reservation failed: {0}")]
    BlockReservation(#[from] TryReserveError),
    /// Growing further would exhaust the 32-bit slot index space
    #[error("arena slot index space exhausted")]
    IndexSpaceExhausted,
}

/// A cell type that can live in an [`Arena`].
///
/// Free slots reuse one of the cell's own link fields to thread the free
/// list, the same storage-overlay trick a union-based pool plays.
pub trait PoolCell: Default {
    /// Read the free-list link stored in this (vacant) cell.
    fn free_link(&self) -> SlotIndex;
    /// Store the free-list link into this (vacant) cell.
    fn set_free_link(&mut self, next: SlotIndex);
}

/// Pre-allocated slot pool with O(1) allocation and deallocation.
pub struct Arena<T> {
    /// Contiguous cell storage; grows by whole blocks, never shrinks
    cells: Vec<T>,
    /// Head of the free list (index of the first vacant cell)
    free_head: SlotIndex,
    /// Number of currently allocated cells
    live: u32,
    /// Cells added per growth step
    block_slots: u32,
}

impl<T: PoolCell> Arena<T> {
    /// Create an arena holding `initial_blocks * block_slots` cells.
    ///
    /// # Panics
    /// Panics if the initial capacity reaches `NULL_INDEX` or `block_slots`
    /// is zero; both are init-time configuration errors.
    pub fn new(initial_blocks: usize, block_slots: u32) -> Self {
        assert!(block_slots > 0, "block_slots must be positive");
        let capacity = initial_blocks * block_slots as usize;
        assert!(
            capacity < NULL_INDEX as usize,
            "arena capacity must be less than NULL_INDEX"
        );

        let mut arena = Self {
            cells: Vec::with_capacity(capacity),
            free_head: NULL_INDEX,
            live: 0,
            block_slots,
        };
        for _ in 0..initial_blocks {
            arena.link_block();
        }
        arena
    }

    /// Append one block of vacant cells and splice them onto the free list.
    /// The caller has already ensured storage for `block_slots` more cells.
    fn link_block(&mut self) {
        let base = self.cells.len() as u32;
        for i in 0..self.block_slots {
            let mut cell = T::default();
            let link = if i + 1 < self.block_slots {
                base + i + 1
            } else {
                self.free_head
            };
            cell.set_free_link(link);
            self.cells.push(cell);
        }
        self.free_head = base;
    }

    /// Allocate a slot, growing by one block if the free list is empty.
    ///
    /// The returned cell is reset to its default state.
    ///
    /// # Complexity
    /// O(1) amortised - pops from the head of the free list.
    #[inline]
    pub fn alloc(&mut self) -> Result<SlotIndex, ArenaError> {
        if self.free_head == NULL_INDEX {
            self.grow()?;
        }

        let index = self.free_head;
        self.free_head = self.cells[index as usize].free_link();
        self.cells[index as usize] = T::default();
        self.live += 1;
        Ok(index)
    }

    /// Reserve and link one more block.
    #[cold]
    fn grow(&mut self) -> Result<(), ArenaError> {
        let new_len = self.cells.len() + self.block_slots as usize;
        if new_len >= NULL_INDEX as usize {
            return Err(ArenaError::IndexSpaceExhausted);
        }
        self.cells.try_reserve(self.block_slots as usize)?;
        self.link_block();
        Ok(())
    }

    /// Return a slot to the free list.
    ///
    /// The caller must ensure the index is currently allocated; double frees
    /// are not detected in release builds.
    ///
    /// # Complexity
    /// O(1) - pushes to the head of the free list.
    #[inline]
    pub fn free(&mut self, index: SlotIndex) {
        debug_assert!((index as usize) < self.cells.len(), "index out of bounds");
        debug_assert!(self.live > 0, "double free detected");

        let cell = &mut self.cells[index as usize];
        *cell = T::default();
        cell.set_free_link(self.free_head);
        self.free_head = index;
        self.live -= 1;
    }

    /// Get an immutable reference to an allocated cell.
    #[inline]
    pub fn get(&self, index: SlotIndex) -> &T {
        debug_assert!((index as usize) < self.cells.len(), "index out of bounds");
        &self.cells[index as usize]
    }

    /// Get a mutable reference to an allocated cell.
    #[inline]
    pub fn get_mut(&mut self, index: SlotIndex) -> &mut T {
        debug_assert!((index as usize) < self.cells.len(), "index out of bounds");
        &mut self.cells[index as usize]
    }

    /// Number of currently allocated cells.
    #[inline]
    pub fn live(&self) -> u32 {
        self.live
    }

    /// Total number of cells across all blocks.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.cells.len() as u32
    }

    /// True if no cells are allocated.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Pre-fault all pages backing the cell storage.
    ///
    /// Walks every cell with a volatile read to force the OS to map virtual
    /// pages to physical RAM before the hot path runs.
    pub fn warm(&self) {
        for cell in &self.cells {
            unsafe {
                std::ptr::read_volatile(cell as *const T as *const u8);
            }
        }
    }
}

impl<T> fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.cells.len())
            .field("live", &self.live)
            .field("free_head", &self.free_head)
            .finish()
    }
}
