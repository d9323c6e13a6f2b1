//! Pool state: a trading pair's ladders, custodians, index, and fee config.

use std::cell::RefCell;
use std::collections::HashMap;

use tracing::{info, trace};

use crate::constants::{MIN_ASK_ORDER_ID, MIN_BID_ORDER_ID, POOL_CREATION_FEE};
use crate::custody::Custodian;
use crate::error::OrderBookError;
use crate::events::{Event, EventSink};
use crate::fifo::Fifo;
use crate::ids::{Owner, PoolId};
use crate::ladder::Ladder;
use crate::order::TickLevel;

/// A tick level as stored in a ladder: wrapped in a `RefCell` so the
/// matching loop can mutate a level's FIFO while only holding a shared
/// reference borrowed out of the underlying `SkipMap` entry.
pub type TickSlot = RefCell<TickLevel>;

/// Parameters supplied to create a new [`Pool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Identifier of the base asset.
    pub base_asset_type: String,
    /// Identifier of the quote asset.
    pub quote_asset_type: String,
    /// Minimum price increment; every resting order's price is a multiple.
    pub tick_size: u64,
    /// Minimum quantity increment; every order's quantity is a multiple.
    pub lot_size: u64,
    /// Fee rate charged to the taker on every fill, scaled by `SCALE`.
    pub taker_fee_rate: u64,
    /// Rebate rate credited to the maker on every fill, scaled by `SCALE`.
    pub maker_rebate_rate: u64,
    /// The identity that owns this pool (receives minted admin rights over
    /// fee withdrawal).
    pub owner: Owner,
    /// Creation fee actually supplied by the caller; must equal
    /// [`POOL_CREATION_FEE`] exactly.
    pub creation_fee_paid: u64,
}

/// A single trading pair: two ladders, two custodians, and the
/// configuration that governs matching and fees.
#[derive(Debug)]
pub struct Pool {
    /// This pool's stable id.
    pub pool_id: PoolId,
    /// Identity permitted to withdraw accrued fees.
    pub owner: Owner,
    /// Identifier of the base asset.
    pub base_asset_type: String,
    /// Identifier of the quote asset.
    pub quote_asset_type: String,
    /// Bid-side ladder, ordered ascending by price; best bid is `max_leaf`.
    pub bids: Ladder<TickSlot>,
    /// Ask-side ladder, ordered ascending by price; best ask is `min_leaf`.
    pub asks: Ladder<TickSlot>,
    /// Next id to assign to a bid, starting at [`MIN_BID_ORDER_ID`].
    pub next_bid_order_id: u64,
    /// Next id to assign to an ask, starting at [`MIN_ASK_ORDER_ID`].
    pub next_ask_order_id: u64,
    /// Per-owner index of open orders: `order_id -> price`, in placement
    /// order. Used for cancellation and enumeration.
    pub owner_index: HashMap<Owner, Fifo<u64>>,
    /// Global `order_id -> owner` index, maintained alongside `owner_index`.
    /// Lets single-order cancellation tell "no such order" apart from "not
    /// yours" in O(1) without scanning every owner's index.
    pub order_owners: HashMap<u64, Owner>,
    /// Minimum price increment.
    pub tick_size: u64,
    /// Minimum quantity increment.
    pub lot_size: u64,
    /// Fee rate charged to the taker, scaled by `SCALE`.
    pub taker_fee_rate: u64,
    /// Rebate rate credited to the maker, scaled by `SCALE`.
    pub maker_rebate_rate: u64,
    /// Base-asset custody ledger.
    pub base_custodian: Custodian,
    /// Quote-asset custody ledger.
    pub quote_custodian: Custodian,
    /// Accrued, unwithdrawn base-asset protocol fees.
    pub base_fee_sink: u64,
    /// Accrued, unwithdrawn quote-asset protocol fees.
    pub quote_fee_sink: u64,
    /// Creation fee collected when the pool was made.
    pub creation_fee_balance: u64,
}

impl Pool {
    /// Creates a new pool, validating the configuration per spec §4 /
    /// errors §7. Does not emit the `PoolCreated` event itself — callers
    /// that want events go through a higher-level constructor that also
    /// holds an [`crate::events::EventSink`].
    pub fn new(config: PoolConfig) -> Result<Self, OrderBookError> {
        if config.tick_size == 0 || config.lot_size == 0 {
            return Err(OrderBookError::InvalidTickSizeLotSize);
        }
        if config.base_asset_type == config.quote_asset_type {
            return Err(OrderBookError::InvalidPair);
        }
        if config.creation_fee_paid != POOL_CREATION_FEE {
            return Err(OrderBookError::InvalidFee {
                expected: POOL_CREATION_FEE,
                actual: config.creation_fee_paid,
            });
        }
        if config.maker_rebate_rate > config.taker_fee_rate {
            return Err(OrderBookError::InvalidFeeRateRebateRate {
                maker_rebate_rate: config.maker_rebate_rate,
                taker_fee_rate: config.taker_fee_rate,
            });
        }
        info!(
            "creating pool {}/{} tick_size={} lot_size={}",
            config.base_asset_type, config.quote_asset_type, config.tick_size, config.lot_size
        );
        Ok(Self {
            pool_id: PoolId::new(),
            owner: config.owner,
            base_asset_type: config.base_asset_type,
            quote_asset_type: config.quote_asset_type,
            bids: Ladder::new(),
            asks: Ladder::new(),
            next_bid_order_id: MIN_BID_ORDER_ID,
            next_ask_order_id: MIN_ASK_ORDER_ID,
            owner_index: HashMap::new(),
            order_owners: HashMap::new(),
            tick_size: config.tick_size,
            lot_size: config.lot_size,
            taker_fee_rate: config.taker_fee_rate,
            maker_rebate_rate: config.maker_rebate_rate,
            base_custodian: Custodian::new(),
            quote_custodian: Custodian::new(),
            base_fee_sink: 0,
            quote_fee_sink: 0,
            creation_fee_balance: config.creation_fee_paid,
        })
    }

    /// Allocates the next order id for `is_bid`, advancing the per-side
    /// counter.
    pub(crate) fn next_order_id(&mut self, is_bid: bool) -> u64 {
        if is_bid {
            let id = self.next_bid_order_id;
            self.next_bid_order_id += 1;
            id
        } else {
            let id = self.next_ask_order_id;
            self.next_ask_order_id += 1;
            id
        }
    }

    /// Deposits `amount` of `owner`'s base (or quote) asset into this pool's
    /// custody, crediting it to their available balance, and emits
    /// [`Event::DepositAsset`].
    pub fn deposit(&mut self, owner: Owner, amount: u64, is_base: bool, sink: &mut dyn EventSink) {
        trace!("deposit owner={owner} amount={amount} is_base={is_base}");
        if is_base {
            self.base_custodian.credit_available(owner, amount);
        } else {
            self.quote_custodian.credit_available(owner, amount);
        }
        sink.emit(Event::DepositAsset {
            pool_id: self.pool_id,
            quantity: amount,
            owner,
        });
    }

    /// Withdraws `amount` of `owner`'s available base (or quote) balance,
    /// leaving locked funds untouched, and emits [`Event::WithdrawAsset`].
    ///
    /// # Errors
    /// [`OrderBookError::InsufficientBaseCoin`] / [`OrderBookError::InsufficientQuoteCoin`]
    /// if the available balance is smaller than `amount`.
    pub fn withdraw(
        &mut self,
        owner: Owner,
        amount: u64,
        is_base: bool,
        sink: &mut dyn EventSink,
    ) -> Result<(), OrderBookError> {
        trace!("withdraw owner={owner} amount={amount} is_base={is_base}");
        if is_base {
            let available = self.base_custodian.balance(owner).available;
            if !self.base_custodian.debit_available(owner, amount) {
                return Err(OrderBookError::InsufficientBaseCoin {
                    needed: amount,
                    available,
                });
            }
        } else {
            let available = self.quote_custodian.balance(owner).available;
            if !self.quote_custodian.debit_available(owner, amount) {
                return Err(OrderBookError::InsufficientQuoteCoin {
                    needed: amount,
                    available,
                });
            }
        }
        sink.emit(Event::WithdrawAsset {
            pool_id: self.pool_id,
            quantity: amount,
            owner,
        });
        Ok(())
    }

    /// Withdraws the entire accrued fee sink for both assets. Requires the
    /// pool's own owner capability; the caller is responsible for checking
    /// `cap.owner() == pool.owner` and raising [`OrderBookError::IncorrectPoolOwner`]
    /// beforehand (kept out of this method so it stays infallible plumbing).
    pub fn drain_fee_sinks(&mut self) -> (u64, u64) {
        let base = std::mem::take(&mut self.base_fee_sink);
        let quote = std::mem::take(&mut self.quote_fee_sink);
        (base, quote)
    }

    /// The ladder for `is_bid`'s own side.
    #[must_use]
    pub fn ladder(&self, is_bid: bool) -> &Ladder<TickSlot> {
        if is_bid {
            &self.bids
        } else {
            &self.asks
        }
    }

    /// The ladder for `is_bid`'s own side, mutably.
    pub fn ladder_mut(&mut self, is_bid: bool) -> &mut Ladder<TickSlot> {
        if is_bid {
            &mut self.bids
        } else {
            &mut self.asks
        }
    }

    /// The ladder opposite `is_bid` — what a taker on that side matches
    /// against.
    #[must_use]
    pub fn opposite_ladder(&self, is_bid: bool) -> &Ladder<TickSlot> {
        if is_bid {
            &self.asks
        } else {
            &self.bids
        }
    }

    /// Inserts `order` into its own-side ladder (creating the tick level if
    /// absent) and records it in the owner index. Does not touch custody —
    /// callers lock the reservation separately.
    pub(crate) fn insert_resting_order(&mut self, order: crate::order::Order) {
        let is_bid = order.is_bid;
        let price = order.price;
        let order_id = order.order_id;
        let owner = order.owner;
        let ladder = if is_bid { &mut self.bids } else { &mut self.asks };
        if !ladder.contains(price) {
            ladder.insert(price, RefCell::new(TickLevel::new(price)));
        }
        let slot = ladder.get(price).expect("level just inserted");
        slot.value().borrow_mut().orders.push_back(order_id, order);
        drop(slot);
        self.owner_index
            .entry(owner)
            .or_default()
            .push_back(order_id, price);
        self.order_owners.insert(order_id, owner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::VecEventSink;

    fn config() -> PoolConfig {
        PoolConfig {
            base_asset_type: "BASE".to_string(),
            quote_asset_type: "QUOTE".to_string(),
            tick_size: 1,
            lot_size: 1,
            taker_fee_rate: 2_500_000,
            maker_rebate_rate: 1_500_000,
            owner: Owner::new(),
            creation_fee_paid: POOL_CREATION_FEE,
        }
    }

    #[test]
    fn creation_assigns_fresh_counters() {
        let pool = Pool::new(config()).unwrap();
        assert_eq!(pool.next_bid_order_id, MIN_BID_ORDER_ID);
        assert_eq!(pool.next_ask_order_id, MIN_ASK_ORDER_ID);
    }

    #[test]
    fn rejects_zero_tick_or_lot_size() {
        let mut bad = config();
        bad.tick_size = 0;
        assert_eq!(
            Pool::new(bad).unwrap_err(),
            OrderBookError::InvalidTickSizeLotSize
        );
    }

    #[test]
    fn rejects_identical_base_and_quote() {
        let mut bad = config();
        bad.quote_asset_type = bad.base_asset_type.clone();
        assert_eq!(Pool::new(bad).unwrap_err(), OrderBookError::InvalidPair);
    }

    #[test]
    fn rejects_wrong_creation_fee() {
        let mut bad = config();
        bad.creation_fee_paid = 1;
        assert_eq!(
            Pool::new(bad).unwrap_err(),
            OrderBookError::InvalidFee {
                expected: POOL_CREATION_FEE,
                actual: 1
            }
        );
    }

    #[test]
    fn rejects_maker_rebate_above_taker_fee() {
        let mut bad = config();
        bad.maker_rebate_rate = bad.taker_fee_rate + 1;
        assert_eq!(
            Pool::new(bad).unwrap_err(),
            OrderBookError::InvalidFeeRateRebateRate {
                maker_rebate_rate: bad.maker_rebate_rate,
                taker_fee_rate: bad.taker_fee_rate,
            }
        );
    }

    #[test]
    fn order_id_counters_advance_independently_per_side() {
        let mut pool = Pool::new(config()).unwrap();
        let bid1 = pool.next_order_id(true);
        let bid2 = pool.next_order_id(true);
        let ask1 = pool.next_order_id(false);
        assert_eq!(bid1, MIN_BID_ORDER_ID);
        assert_eq!(bid2, MIN_BID_ORDER_ID + 1);
        assert_eq!(ask1, MIN_ASK_ORDER_ID);
    }

    #[test]
    fn deposit_credits_available_and_emits_event() {
        let mut pool = Pool::new(config()).unwrap();
        let mut sink = VecEventSink::new();
        let owner = Owner::new();
        pool.deposit(owner, 100, true, &mut sink);
        assert_eq!(pool.base_custodian.balance(owner).available, 100);
        assert!(matches!(sink.events()[0], Event::DepositAsset { quantity: 100, .. }));
    }

    #[test]
    fn withdraw_fails_without_sufficient_available_and_leaves_locked_untouched() {
        let mut pool = Pool::new(config()).unwrap();
        let mut sink = VecEventSink::new();
        let owner = Owner::new();
        pool.deposit(owner, 100, false, &mut sink);
        assert!(pool.quote_custodian.lock(owner, 60));

        let err = pool.withdraw(owner, 50, false, &mut sink).unwrap_err();
        assert_eq!(
            err,
            OrderBookError::InsufficientQuoteCoin {
                needed: 50,
                available: 40
            }
        );
        assert_eq!(pool.quote_custodian.balance(owner).locked, 60);

        pool.withdraw(owner, 40, false, &mut sink).unwrap();
        assert_eq!(pool.quote_custodian.balance(owner).available, 0);
        assert!(matches!(sink.events().last().unwrap(), Event::WithdrawAsset { quantity: 40, .. }));
    }
}
