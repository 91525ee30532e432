//! Engine error types.

use thiserror::Error;

use crate::arena::ArenaError;

/// Reasons a submission is refused without resting or executing.
///
/// Every variant leaves the book unchanged except for the identifier
/// counter, which advances for any submission that passed input validation.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Quantity must be positive
    #[error("order quantity must be positive")]
    InvalidQuantity,

    /// Market order with nothing on the opposite side
    #[error("no liquidity available for market order")]
    NoLiquidity,

    /// Fill-or-kill order that the book cannot fully satisfy
    #[error("fill-or-kill order cannot be fully filled")]
    Unfillable,

    /// The arena could not obtain a new block; fatal in most deployments
    #[error(transparent)]
    Allocator(#[from] ArenaError),
}
