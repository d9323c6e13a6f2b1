//! Error taxonomy for the order book engine.

/// Errors that can occur within the order book engine.
///
/// Every public, mutating entry point returns `Result<_, OrderBookError>`.
/// Propagation is total: no operation leaves partial state behind on error,
/// mirroring the host's transaction model (an aborted call rolls back
/// everything it touched).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum OrderBookError {
    /// Zero quantity, non-lot-aligned quantity, or an insufficient declared
    /// market-sell envelope.
    #[error("invalid quantity: {reason}")]
    InvalidQuantity {
        /// Human-readable detail.
        reason: String,
    },

    /// Zero price, or a price that is not a multiple of `tick_size`.
    #[error("invalid price: {reason}")]
    InvalidPrice {
        /// Human-readable detail.
        reason: String,
    },

    /// `expire_ts` is not strictly after `now` at placement, or is not
    /// strictly before `now` during an expired sweep.
    #[error("invalid expire timestamp: {reason}")]
    InvalidExpireTimestamp {
        /// Human-readable detail.
        reason: String,
    },

    /// Restriction code is not one of no-restriction / IOC / FOK / post-only.
    #[error("invalid restriction code {code}")]
    InvalidRestriction {
        /// The rejected code.
        code: u8,
    },

    /// Self-matching-prevention code is not "cancel-oldest-maker".
    #[error("invalid self-matching-prevention code {code}")]
    InvalidSelfMatching {
        /// The rejected code.
        code: u8,
    },

    /// `tick_size * lot_size == 0` at pool creation.
    #[error("tick_size and lot_size must both be non-zero")]
    InvalidTickSizeLotSize,

    /// Base and quote asset types are identical.
    #[error("base and quote asset must differ")]
    InvalidPair,

    /// Pool creation fee did not match [`crate::constants::POOL_CREATION_FEE`].
    #[error("invalid creation fee: expected {expected}, got {actual}")]
    InvalidFee {
        /// Required fee.
        expected: u64,
        /// Fee actually supplied.
        actual: u64,
    },

    /// `maker_rebate_rate > taker_fee_rate` at pool creation.
    #[error("maker_rebate_rate ({maker_rebate_rate}) exceeds taker_fee_rate ({taker_fee_rate})")]
    InvalidFeeRateRebateRate {
        /// Configured maker rebate rate.
        maker_rebate_rate: u64,
        /// Configured taker fee rate.
        taker_fee_rate: u64,
    },

    /// The order id was not found in the owner's index or in the ladder.
    #[error("order {order_id} not found")]
    InvalidOrderId {
        /// The id that was not found.
        order_id: u64,
    },

    /// The caller's owner does not match the order's owner.
    #[error("order {order_id} is not owned by the caller")]
    UnauthorizedCancel {
        /// The order that was the target of the cancel.
        order_id: u64,
    },

    /// A batch cancel referenced a price whose tick level no longer exists.
    #[error("no resting tick level at price {price}")]
    InvalidTickPrice {
        /// The stale price.
        price: u64,
    },

    /// A fill-or-kill placement could not be fully filled.
    #[error("order could not be fully filled")]
    OrderCannotBeFullyFilled,

    /// A post-or-abort placement would have crossed the book.
    #[error("order could not be placed as fully passive")]
    OrderCannotBeFullyPassive,

    /// The declared base coin envelope is smaller than the amount needed.
    #[error("insufficient base coin: needed {needed}, have {available}")]
    InsufficientBaseCoin {
        /// Amount required.
        needed: u64,
        /// Amount actually available.
        available: u64,
    },

    /// The declared quote coin envelope is smaller than the amount needed.
    #[error("insufficient quote coin: needed {needed}, have {available}")]
    InsufficientQuoteCoin {
        /// Amount required.
        needed: u64,
        /// Amount actually available.
        available: u64,
    },

    /// A fee withdrawal presented a capability that does not own the pool.
    #[error("capability does not own this pool")]
    IncorrectPoolOwner,

    /// A child capability attempted to mint another capability.
    #[error("only an admin capability may mint child capabilities")]
    AdminAccountCapRequired,

    /// An arithmetic operation would have overflowed.
    #[error("arithmetic overflow: {reason}")]
    Overflow {
        /// Human-readable detail.
        reason: String,
    },
}
