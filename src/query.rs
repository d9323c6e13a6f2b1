//! Read-only queries over a [`Pool`]: best bid/ask, a depth slice between
//! two prices, a single order lookup, an owner's open orders, and account
//! balances (spec §4.9). None of these take `&mut Pool` — they run
//! concurrently with other readers.

use crate::custody::Balance;
use crate::error::OrderBookError;
use crate::ids::{Owner, Side};
use crate::order::Order;
use crate::pool::Pool;

/// One aggregated price level in a [`level2`] depth slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthLevel {
    /// The level's price.
    pub price: u64,
    /// Sum of every live (unexpired) order's remaining quantity at this
    /// price.
    pub quantity: u64,
}

/// The best (lowest) resting ask price, if any.
#[must_use]
pub fn best_ask(pool: &Pool) -> Option<u64> {
    pool.asks.min_leaf().map(|(price, _)| price)
}

/// The best (highest) resting bid price, if any.
#[must_use]
pub fn best_bid(pool: &Pool) -> Option<u64> {
    pool.bids.max_leaf().map(|(price, _)| price)
}

/// Aggregated depth on one side between `price_low` and `price_high`
/// (inclusive), skipping orders already expired as of `now`. Walks the
/// ladder with an explicit cursor rather than a lazy iterator adaptor,
/// since each step needs to inspect and sum a whole tick level's FIFO.
pub fn level2(pool: &Pool, is_bid: bool, price_low: u64, price_high: u64, now: u64) -> Vec<DepthLevel> {
    if price_low > price_high {
        return Vec::new();
    }
    let ladder = pool.ladder(is_bid);
    let mut levels = Vec::new();
    let mut cursor = ladder.find_closest_key(price_low).map(|(price, _)| price);
    while let Some(price) = cursor {
        if price > price_high {
            break;
        }
        let Some(entry) = ladder.get(price) else {
            cursor = ladder.next_leaf(price).map(|(p, _)| p);
            continue;
        };
        let level = entry.value().borrow();
        let quantity: u64 = level
            .orders
            .iter()
            .filter(|(_, order)| !order.is_expired(now))
            .map(|(_, order)| order.quantity)
            .sum();
        if quantity > 0 {
            levels.push(DepthLevel { price, quantity });
        }
        cursor = ladder.next_leaf(price).map(|(p, _)| p);
    }
    levels
}

/// Looks up a single open order by id.
///
/// # Errors
/// [`OrderBookError::InvalidOrderId`] if no such order is resting.
pub fn get_order(pool: &Pool, order_id: u64) -> Result<Order, OrderBookError> {
    let owner = *pool
        .order_owners
        .get(&order_id)
        .ok_or(OrderBookError::InvalidOrderId { order_id })?;
    let is_bid = Side::of_order_id(order_id).is_bid();
    let price = *pool
        .owner_index
        .get(&owner)
        .and_then(|index| index.get(order_id))
        .ok_or(OrderBookError::InvalidOrderId { order_id })?;
    let slot = pool
        .ladder(is_bid)
        .get(price)
        .ok_or(OrderBookError::InvalidOrderId { order_id })?;
    slot.value()
        .borrow()
        .orders
        .get(order_id)
        .cloned()
        .ok_or(OrderBookError::InvalidOrderId { order_id })
}

/// Lists every order `owner` currently has open, oldest first.
#[must_use]
pub fn list_open_orders(pool: &Pool, owner: Owner) -> Vec<Order> {
    let Some(index) = pool.owner_index.get(&owner) else {
        return Vec::new();
    };
    index
        .iter()
        .filter_map(|(order_id, &price)| {
            let is_bid = Side::of_order_id(order_id).is_bid();
            let slot = pool.ladder(is_bid).get(price)?;
            slot.value().borrow().orders.get(order_id).cloned()
        })
        .collect()
}

/// Reads `owner`'s available/locked balance for both of the pool's assets.
#[must_use]
pub fn account_balance(pool: &Pool, owner: Owner) -> (Balance, Balance) {
    (pool.base_custodian.balance(owner), pool.quote_custodian.balance(owner))
}
