//! Cancellation paths: single cancel, batch cancel, cancel-all, and the
//! expired-order sweep (spec §4.8). Every path unlocks the canceled
//! order's custody reservation and removes it from the ladder, the owner
//! index, and the global id index before emitting its event.

use tracing::{trace, warn};

use crate::error::OrderBookError;
use crate::events::{CanceledOrderComponent, Event, EventSink};
use crate::ids::{Owner, Side};
use crate::matching::remove_resting_order;
use crate::order::Order;
use crate::pool::Pool;

/// Reads a clone of the resting order `order_id` at `price` on `is_bid`'s
/// own ladder, if it is still there.
fn resting_order_snapshot(pool: &Pool, is_bid: bool, price: u64, order_id: u64) -> Option<Order> {
    let slot = pool.ladder(is_bid).get(price)?;
    let level = slot.value().borrow();
    level.orders.get(order_id).cloned()
}

/// Unlocks `order`'s custody reservation: locked quote for a bid, locked
/// base for an ask.
fn unlock_reservation(pool: &mut Pool, order: &Order) -> Result<(), OrderBookError> {
    if order.is_bid {
        let locked_quote = order.locked_quote()?;
        debug_assert!(pool.quote_custodian.unlock(order.owner, locked_quote));
    } else {
        debug_assert!(pool.base_custodian.unlock(order.owner, order.quantity));
    }
    Ok(())
}

fn component(order: &Order) -> CanceledOrderComponent {
    CanceledOrderComponent {
        order_id: order.order_id,
        client_order_id: order.client_order_id,
        is_bid: order.is_bid,
        owner: order.owner,
        original_quantity: order.original_quantity,
        base_asset_quantity_canceled: order.quantity,
        price: order.price,
    }
}

/// Cancels a single order on behalf of `caller`.
///
/// # Errors
/// - [`OrderBookError::InvalidOrderId`] if no such order is open.
/// - [`OrderBookError::UnauthorizedCancel`] if `caller` is not the order's
///   owner.
pub fn cancel_order(
    pool: &mut Pool,
    caller: Owner,
    order_id: u64,
    sink: &mut dyn EventSink,
) -> Result<(), OrderBookError> {
    trace!("cancel_order caller={caller} order_id={order_id}");
    let owner = *pool
        .order_owners
        .get(&order_id)
        .ok_or(OrderBookError::InvalidOrderId { order_id })?;
    if owner != caller {
        return Err(OrderBookError::UnauthorizedCancel { order_id });
    }
    let is_bid = Side::of_order_id(order_id).is_bid();
    let price = *pool
        .owner_index
        .get(&owner)
        .and_then(|index| index.get(order_id))
        .ok_or(OrderBookError::InvalidOrderId { order_id })?;
    let order =
        resting_order_snapshot(pool, is_bid, price, order_id).ok_or(OrderBookError::InvalidOrderId { order_id })?;

    remove_resting_order(pool, is_bid, owner, order_id, price);
    unlock_reservation(pool, &order)?;

    sink.emit(Event::OrderCanceled {
        pool_id: pool.pool_id,
        order_id: order.order_id,
        client_order_id: order.client_order_id,
        is_bid: order.is_bid,
        owner: order.owner,
        original_quantity: order.original_quantity,
        base_asset_quantity_canceled: order.quantity,
        price: order.price,
    });
    Ok(())
}

/// Cancels every order in `order_ids` on behalf of `caller`, atomically:
/// if any id does not belong to `caller` (or does not exist), nothing in
/// the batch is canceled. Emits a single [`Event::AllOrdersCanceled`]
/// covering the whole batch.
///
/// # Errors
/// - [`OrderBookError::InvalidOrderId`] if any id is not open.
/// - [`OrderBookError::UnauthorizedCancel`] if any id belongs to another
///   owner.
pub fn cancel_orders(
    pool: &mut Pool,
    caller: Owner,
    order_ids: &[u64],
    sink: &mut dyn EventSink,
) -> Result<(), OrderBookError> {
    trace!("cancel_orders caller={caller} count={}", order_ids.len());
    let mut snapshots = Vec::with_capacity(order_ids.len());
    for &order_id in order_ids {
        let owner = *pool
            .order_owners
            .get(&order_id)
            .ok_or(OrderBookError::InvalidOrderId { order_id })?;
        if owner != caller {
            return Err(OrderBookError::UnauthorizedCancel { order_id });
        }
        let is_bid = Side::of_order_id(order_id).is_bid();
        let price = *pool
            .owner_index
            .get(&owner)
            .and_then(|index| index.get(order_id))
            .ok_or(OrderBookError::InvalidOrderId { order_id })?;
        let order = resting_order_snapshot(pool, is_bid, price, order_id)
            .ok_or(OrderBookError::InvalidOrderId { order_id })?;
        snapshots.push((is_bid, price, order));
    }

    let mut components = Vec::with_capacity(snapshots.len());
    for (is_bid, price, order) in snapshots {
        remove_resting_order(pool, is_bid, order.owner, order.order_id, price);
        unlock_reservation(pool, &order)?;
        components.push(component(&order));
    }

    sink.emit(Event::AllOrdersCanceled {
        pool_id: pool.pool_id,
        orders_canceled: components,
    });
    Ok(())
}

/// Cancels every order `caller` has open. A no-op (no event emitted) if
/// `caller` has none.
pub fn cancel_all(pool: &mut Pool, caller: Owner, sink: &mut dyn EventSink) -> Result<(), OrderBookError> {
    trace!("cancel_all caller={caller}");
    let Some(ids) = pool.owner_index.get(&caller).map(|index| {
        index
            .iter()
            .map(|(order_id, &price)| (order_id, price))
            .collect::<Vec<_>>()
    }) else {
        return Ok(());
    };
    if ids.is_empty() {
        return Ok(());
    }

    let mut components = Vec::with_capacity(ids.len());
    for (order_id, price) in ids {
        let is_bid = Side::of_order_id(order_id).is_bid();
        let Some(order) = resting_order_snapshot(pool, is_bid, price, order_id) else {
            continue;
        };
        remove_resting_order(pool, is_bid, caller, order_id, price);
        unlock_reservation(pool, &order)?;
        components.push(component(&order));
    }

    if components.is_empty() {
        return Ok(());
    }
    sink.emit(Event::AllOrdersCanceled {
        pool_id: pool.pool_id,
        orders_canceled: components,
    });
    Ok(())
}

/// Sweeps a batch of candidate `(order_id, owner)` pairs, canceling every
/// one that is both still open and genuinely expired as of `now`.
/// Entries that are no longer present (already filled or canceled, or
/// whose owner no longer matches) are silently skipped, since a sweep is a
/// best-effort maintenance pass over a caller-supplied snapshot that may
/// already be stale. A *present* entry that has not yet expired is a
/// caller error, not a stale-snapshot artifact: it aborts the whole sweep
/// with no partial cancellation, per the engine's all-errors-abort model.
///
/// # Errors
/// - [`OrderBookError::InvalidExpireTimestamp`] if a present entry's
///   `expire_timestamp_ms >= now` (i.e. it has not strictly expired yet).
pub fn cancel_expired(
    pool: &mut Pool,
    entries: &[(u64, Owner)],
    now: u64,
    sink: &mut dyn EventSink,
) -> Result<(), OrderBookError> {
    trace!("cancel_expired now={now} count={}", entries.len());
    let mut to_cancel = Vec::new();
    for &(order_id, owner) in entries {
        let Some(&indexed_owner) = pool.order_owners.get(&order_id) else {
            continue;
        };
        if indexed_owner != owner {
            continue;
        }
        let is_bid = Side::of_order_id(order_id).is_bid();
        let Some(&price) = pool.owner_index.get(&owner).and_then(|index| index.get(order_id)) else {
            continue;
        };
        let Some(order) = resting_order_snapshot(pool, is_bid, price, order_id) else {
            continue;
        };
        if order.expire_timestamp_ms >= now {
            warn!(
                "cancel_expired aborted: order {order_id} has not expired (expire_timestamp_ms={} now={now})",
                order.expire_timestamp_ms
            );
            return Err(OrderBookError::InvalidExpireTimestamp {
                reason: format!(
                    "order {order_id} has not expired: expire_timestamp_ms={} now={now}",
                    order.expire_timestamp_ms
                ),
            });
        }
        to_cancel.push((is_bid, price, order));
    }

    if to_cancel.is_empty() {
        return Ok(());
    }
    let mut components = Vec::with_capacity(to_cancel.len());
    for (is_bid, price, order) in to_cancel {
        remove_resting_order(pool, is_bid, order.owner, order.order_id, price);
        unlock_reservation(pool, &order)?;
        components.push(component(&order));
    }
    sink.emit(Event::AllOrdersCanceled {
        pool_id: pool.pool_id,
        orders_canceled: components,
    });
    Ok(())
}
