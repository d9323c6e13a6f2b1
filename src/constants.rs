//! Numeric constants fixed by the external protocol.
//!
//! These values are part of the wire contract with callers: changing any of
//! them changes the economics of every pool and breaks compatibility with
//! anything that persisted state computed under the old values.

/// Fixed-point scale used for fee rates and rounding. `S = 1e9`.
pub const SCALE: u64 = 1_000_000_000;

/// Pool creation fee, denominated in the fee asset's base units.
pub const POOL_CREATION_FEE: u64 = 100_000_000_000;

/// Reference taker fee rate: 0.25%, scaled by [`SCALE`].
pub const REFERENCE_TAKER_FEE_RATE: u64 = 2_500_000;

/// Reference maker rebate rate: 0.15%, scaled by [`SCALE`].
pub const REFERENCE_MAKER_REBATE_RATE: u64 = 1_500_000;

/// First ask order id. Ask ids occupy `[MIN_ASK_ORDER_ID, u64::MAX]`.
pub const MIN_ASK_ORDER_ID: u64 = 1 << 63;

/// First bid order id. Bid ids occupy `[MIN_BID_ORDER_ID, MIN_ASK_ORDER_ID)`.
pub const MIN_BID_ORDER_ID: u64 = 1;

/// Upper bound used as "no limit" when walking the bid side for a market buy.
pub const MAX_PRICE: u64 = 1 << 63;

/// Lower bound used as "no limit" when walking the ask side for a market sell.
pub const MIN_PRICE: u64 = 0;
