//! Structured event records and the sink that receives them.
//!
//! The engine never decides how events are transported or persisted — it
//! only constructs [`Event`] values and hands them to whatever [`EventSink`]
//! the caller supplied, the same thin-boundary split the teacher draws
//! between book mutation and its own notification plumbing.

use serde::{Deserialize, Serialize};

use crate::ids::{Owner, PoolId};

/// One canceled-order record inside a coalesced cancellation event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanceledOrderComponent {
    /// The canceled order's id.
    pub order_id: u64,
    /// The caller-supplied id echoed back unchanged.
    pub client_order_id: u64,
    /// `true` if the canceled order was a bid.
    pub is_bid: bool,
    /// The canceled order's owner.
    pub owner: Owner,
    /// Quantity the order was originally placed with.
    pub original_quantity: u64,
    /// Quantity that was resting (and is now unlocked) at cancellation.
    pub base_asset_quantity_canceled: u64,
    /// The order's limit price.
    pub price: u64,
}

/// Every structured record the engine can emit. Matches spec §6 verbatim;
/// `B`/`Q` are left as a single `pool_id` reference rather than generic
/// asset-type parameters, since this crate does not itself model coin
/// types — that lives on the host side of the trust boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// A new pool was created.
    PoolCreated {
        /// The new pool's id.
        pool_id: PoolId,
        /// Identifier of the base asset.
        base_asset_type: String,
        /// Identifier of the quote asset.
        quote_asset_type: String,
        /// Taker fee rate, scaled by [`crate::constants::SCALE`].
        taker_fee_rate: u64,
        /// Maker rebate rate, scaled by [`crate::constants::SCALE`].
        maker_rebate_rate: u64,
        /// Minimum price increment.
        tick_size: u64,
        /// Minimum quantity increment.
        lot_size: u64,
    },
    /// An order was injected into the book.
    OrderPlaced {
        /// The pool the order was placed in.
        pool_id: PoolId,
        /// Engine-assigned id.
        order_id: u64,
        /// Caller-supplied id, echoed back unchanged.
        client_order_id: u64,
        /// `true` for a bid.
        is_bid: bool,
        /// The order's owner.
        owner: Owner,
        /// Quantity at placement.
        original_quantity: u64,
        /// Quantity actually resting after any immediate match.
        base_asset_quantity_placed: u64,
        /// The order's limit price.
        price: u64,
        /// Absolute expiry, in milliseconds.
        expire_timestamp: u64,
    },
    /// A single order was canceled outside of a batch.
    OrderCanceled {
        /// The pool the order belonged to.
        pool_id: PoolId,
        /// The canceled order's id.
        order_id: u64,
        /// Caller-supplied id, echoed back unchanged.
        client_order_id: u64,
        /// `true` if the canceled order was a bid.
        is_bid: bool,
        /// The canceled order's owner.
        owner: Owner,
        /// Quantity the order was originally placed with.
        original_quantity: u64,
        /// Quantity that was resting (and is now unlocked) at cancellation.
        base_asset_quantity_canceled: u64,
        /// The order's limit price.
        price: u64,
    },
    /// A batch of one or more orders were canceled together: explicit
    /// batch cancel, cancel-all, an expired sweep, or a skip rule firing
    /// during matching.
    AllOrdersCanceled {
        /// The pool the orders belonged to.
        pool_id: PoolId,
        /// One component per canceled order, in iteration order.
        orders_canceled: Vec<CanceledOrderComponent>,
    },
    /// A maker order was (partially or fully) filled by a taker.
    OrderFilled {
        /// The pool the fill occurred in.
        pool_id: PoolId,
        /// The maker order's id.
        order_id: u64,
        /// The taker's client-supplied id.
        taker_client_order_id: u64,
        /// The maker's client-supplied id.
        maker_client_order_id: u64,
        /// `true` if the maker side was a bid (i.e. the taker was a seller).
        is_bid: bool,
        /// The taker's owner identity.
        taker_address: Owner,
        /// The maker's owner identity.
        maker_address: Owner,
        /// The maker order's quantity at placement.
        original_quantity: u64,
        /// Base quantity filled in this event.
        base_asset_quantity_filled: u64,
        /// Base quantity still remaining on the maker order after this fill.
        base_asset_quantity_remaining: u64,
        /// The price the fill occurred at (the maker's price).
        price: u64,
        /// Taker commission charged on this fill's quote leg.
        taker_commission: u64,
        /// Maker rebate credited on this fill's quote leg.
        maker_rebates: u64,
    },
    /// Funds were deposited into a custodian on behalf of `owner`.
    DepositAsset {
        /// The pool the deposit was made into.
        pool_id: PoolId,
        /// Amount deposited.
        quantity: u64,
        /// The depositing owner.
        owner: Owner,
    },
    /// Funds were withdrawn from a custodian on behalf of `owner`.
    WithdrawAsset {
        /// The pool the withdrawal was made from.
        pool_id: PoolId,
        /// Amount withdrawn.
        quantity: u64,
        /// The withdrawing owner.
        owner: Owner,
    },
}

/// Receives structured records as the engine produces them.
///
/// Implementors decide format and transport; the engine only guarantees
/// emission order (spec §5: "event emissions follow the order in which
/// they occur in the algorithm").
pub trait EventSink {
    /// Records `event`.
    fn emit(&mut self, event: Event);
}

/// A default, in-memory sink useful for tests and for callers that want to
/// inspect everything a call emitted.
#[derive(Debug, Default)]
pub struct VecEventSink {
    events: Vec<Event>,
}

impl VecEventSink {
    /// An empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The events recorded so far, in emission order.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Drains and returns every recorded event.
    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

impl EventSink for VecEventSink {
    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }
}
