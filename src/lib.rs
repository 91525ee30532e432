//! # Tickmatch
//!
//! A single-instrument limit order book matching engine tuned for
//! sub-microsecond operation latency.
//!
//! ## Design Principles
//!
//! - **Single-Writer**: one thread owns the book exclusively (no locks)
//! - **Price-Time Priority**: ordered levels, FIFO queues within a level
//! - **Arena Allocation**: no per-order heap activity on the hot path
//! - **Cache-Optimized**: 64-byte aligned cells, 32-bit slot indices
//!
//! ## Architecture
//!
//! ```text
//! [Collaborator Threads] --> [serial command queue] --> [Engine Thread]
//!                                                            |
//!                                      [trade / order / state subscribers]
//! ```
//!
//! External collaborators (market-data pollers, UIs, strategy tickers)
//! marshal every submit/cancel/modify onto the matching thread and observe
//! the book through subscriptions and read-only queries.

pub mod arena;
pub mod book;
pub mod book_side;
pub mod config;
pub mod error;
pub mod events;
pub mod order;
pub mod price_level;
pub mod state;

// Re-exports for convenience
pub use arena::{Arena, ArenaError, PoolCell, SlotIndex, NULL_INDEX};
pub use book::OrderBook;
pub use book_side::BookSide;
pub use config::EngineConfig;
pub use error::SubmitError;
pub use events::SubscriberHandle;
pub use order::{Order, OrderId, OrderStatus, OrderType, Price, Quantity, Side, Timestamp, Trade};
pub use price_level::PriceLevel;
pub use state::MarketState;
