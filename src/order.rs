//! Order records and the tick level that groups them by price.

use serde::{Deserialize, Serialize};

use crate::fifo::Fifo;
use crate::ids::Owner;

/// Self-match prevention policy. Only `CancelOldestMaker` is supported;
/// any other wire code is rejected at placement with
/// [`crate::error::OrderBookError::InvalidSelfMatching`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelfMatchPrevention {
    /// When a taker would cross its own resting order, the resting maker is
    /// canceled (unlocked and removed) instead of filled.
    CancelOldestMaker,
}

impl SelfMatchPrevention {
    /// Decodes the wire restriction code (only `0` is currently defined).
    pub fn from_code(code: u8) -> Result<Self, crate::error::OrderBookError> {
        match code {
            0 => Ok(Self::CancelOldestMaker),
            other => Err(crate::error::OrderBookError::InvalidSelfMatching { code: other }),
        }
    }
}

/// Time-in-force restriction applied to a limit placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Restriction {
    /// Rest any unfilled remainder in the book.
    NoRestriction,
    /// Fill what crosses immediately; discard the remainder without resting.
    ImmediateOrCancel,
    /// Require the entire quantity to fill immediately, or reject wholesale.
    FillOrKill,
    /// Require the order to rest without any immediate fill, or reject.
    PostOrAbort,
}

impl Restriction {
    /// Decodes the wire restriction code (§6: 0/1/2/3).
    pub fn from_code(code: u8) -> Result<Self, crate::error::OrderBookError> {
        match code {
            0 => Ok(Self::NoRestriction),
            1 => Ok(Self::ImmediateOrCancel),
            2 => Ok(Self::FillOrKill),
            3 => Ok(Self::PostOrAbort),
            other => Err(crate::error::OrderBookError::InvalidRestriction { code: other }),
        }
    }
}

/// A single resting (or in-flight) order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Engine-assigned id; its high bit encodes [`crate::ids::Side`].
    pub order_id: u64,
    /// Caller-supplied id, opaque to the engine, echoed back in events.
    pub client_order_id: u64,
    /// Limit price, a multiple of the pool's `tick_size`.
    pub price: u64,
    /// Quantity at placement time, a multiple of the pool's `lot_size`.
    pub original_quantity: u64,
    /// Quantity remaining to be filled. Reaches 0 exactly when the order is
    /// removed from the book.
    pub quantity: u64,
    /// `true` for a bid, `false` for an ask. Redundant with `order_id`'s
    /// high bit, kept alongside it so callers never need to decode the id.
    pub is_bid: bool,
    /// The stable identity that funded this order and may cancel it.
    pub owner: Owner,
    /// Absolute expiry, in milliseconds. Inclusive: the order is live while
    /// `expire_timestamp_ms > now`.
    pub expire_timestamp_ms: u64,
    /// Self-match prevention policy in force for this order.
    pub self_matching_prevention: SelfMatchPrevention,
}

impl Order {
    /// `true` if `now` has reached or passed this order's expiry.
    #[must_use]
    pub fn is_expired(&self, now: u64) -> bool {
        self.expire_timestamp_ms <= now
    }

    /// The quote amount this order reserves while resting: `quantity ×
    /// price`, exact (no scale division — see spec §4.1).
    pub fn locked_quote(&self) -> Result<u64, crate::error::OrderBookError> {
        crate::fixed_point::quote_value(self.quantity, self.price)
    }
}

/// All open orders resting at a single price on one side, in FIFO
/// (insertion/age) order.
#[derive(Debug, Default)]
pub struct TickLevel {
    /// The price this level is indexed under in the ladder.
    pub price: u64,
    /// Orders at this price, oldest first.
    pub orders: Fifo<Order>,
}

impl TickLevel {
    /// An empty tick level at `price`.
    #[must_use]
    pub fn new(price: u64) -> Self {
        Self {
            price,
            orders: Fifo::new(),
        }
    }

    /// `true` if no order rests at this level. Callers remove the level
    /// from the ladder the instant this becomes true (spec §8 invariant 6).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order(order_id: u64, price: u64, quantity: u64) -> Order {
        Order {
            order_id,
            client_order_id: 0,
            price,
            original_quantity: quantity,
            quantity,
            is_bid: false,
            owner: Owner::new(),
            expire_timestamp_ms: u64::MAX,
            self_matching_prevention: SelfMatchPrevention::CancelOldestMaker,
        }
    }

    #[test]
    fn is_expired_is_inclusive_of_now() {
        let mut order = sample_order(1, 100, 10);
        order.expire_timestamp_ms = 5;
        assert!(order.is_expired(5));
        assert!(order.is_expired(6));
        assert!(!order.is_expired(4));
    }

    #[test]
    fn tick_level_reports_empty_after_last_order_removed() {
        let mut level = TickLevel::new(100);
        level.orders.push_back(1, sample_order(1, 100, 10));
        assert!(!level.is_empty());
        level.orders.remove(1);
        assert!(level.is_empty());
    }

    #[test]
    fn restriction_decodes_known_codes_and_rejects_others() {
        assert_eq!(Restriction::from_code(0).unwrap(), Restriction::NoRestriction);
        assert_eq!(Restriction::from_code(1).unwrap(), Restriction::ImmediateOrCancel);
        assert_eq!(Restriction::from_code(2).unwrap(), Restriction::FillOrKill);
        assert_eq!(Restriction::from_code(3).unwrap(), Restriction::PostOrAbort);
        assert!(Restriction::from_code(4).is_err());
    }

    #[test]
    fn self_matching_prevention_only_accepts_code_zero() {
        assert_eq!(
            SelfMatchPrevention::from_code(0).unwrap(),
            SelfMatchPrevention::CancelOldestMaker
        );
        assert!(SelfMatchPrevention::from_code(1).is_err());
    }
}
