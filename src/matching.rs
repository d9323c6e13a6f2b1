//! The matching core: walks the opposite-side ladder against a taker,
//! applying price-time priority, the self-match/expiry skip rule, and
//! rounded fee/rebate accounting (spec §4.6).
//!
//! None of these routines touch the taker's own custody balances — the
//! taker's funds were already pulled out of (or never entered) the custody
//! ledger by the caller before matching begins, and the caller applies the
//! refund/credit of whatever matching leaves over. Only the *maker* side is
//! ever debited or credited here, because makers are resting orders whose
//! reservation lives in the custodian until consumed or unlocked.

use tracing::trace;

use crate::error::OrderBookError;
use crate::events::{CanceledOrderComponent, Event, EventSink};
use crate::fixed_point;
use crate::ids::Owner;
use crate::order::Order;
use crate::pool::Pool;

fn overflow(reason: &str) -> OrderBookError {
    OrderBookError::Overflow {
        reason: reason.to_string(),
    }
}

/// Clones the order currently at the front of the FIFO resting at `price`
/// on the ladder identified by `maker_is_bid`, if any.
fn peek_front(pool: &Pool, maker_is_bid: bool, price: u64) -> Option<(u64, Order)> {
    let ladder = pool.ladder(maker_is_bid);
    let slot = ladder.get(price)?;
    let level = slot.value().borrow();
    level.orders.front().map(|(id, order)| (id, order.clone()))
}

/// Removes `order_id` from its resting tick level and the owner index,
/// dropping the tick level if it becomes empty. Does not touch custody.
pub(crate) fn remove_resting_order(
    pool: &mut Pool,
    maker_is_bid: bool,
    owner: Owner,
    order_id: u64,
    price: u64,
) {
    let ladder = pool.ladder_mut(maker_is_bid);
    let now_empty = {
        let Some(slot) = ladder.get(price) else {
            return;
        };
        let mut level = slot.value().borrow_mut();
        level.orders.remove(order_id);
        level.is_empty()
    };
    if now_empty {
        ladder.remove(price);
    }
    if let Some(index) = pool.owner_index.get_mut(&owner) {
        index.remove(order_id);
        if index.is_empty() {
            pool.owner_index.remove(&owner);
        }
    }
    pool.order_owners.remove(&order_id);
}

/// Shrinks the resting maker's quantity by `filled_base`, removing it
/// entirely (FIFO + index + possibly the tick level) if that exhausts it.
/// Returns the quantity remaining after the fill.
fn shrink_maker(
    pool: &mut Pool,
    maker_is_bid: bool,
    owner: Owner,
    order_id: u64,
    price: u64,
    filled_base: u64,
) -> u64 {
    let remaining = {
        let ladder = pool.ladder(maker_is_bid);
        let slot = ladder.get(price).expect("maker's tick level must exist");
        let mut level = slot.value().borrow_mut();
        let order = level
            .orders
            .get_mut(order_id)
            .expect("maker order must exist at its own tick");
        order.quantity -= filled_base;
        order.quantity
    };
    if remaining == 0 {
        remove_resting_order(pool, maker_is_bid, owner, order_id, price);
    }
    remaining
}

/// Removes an expired or self-matching ask maker, unlocking its reserved
/// base, and emits the cancellation.
fn skip_ask_maker(pool: &mut Pool, maker: &Order, sink: &mut dyn EventSink) {
    trace!(
        "skipping ask maker {} at price {} (expired or self-match)",
        maker.order_id, maker.price
    );
    remove_resting_order(pool, false, maker.owner, maker.order_id, maker.price);
    debug_assert!(pool.base_custodian.unlock(maker.owner, maker.quantity));
    sink.emit(Event::AllOrdersCanceled {
        pool_id: pool.pool_id,
        orders_canceled: vec![CanceledOrderComponent {
            order_id: maker.order_id,
            client_order_id: maker.client_order_id,
            is_bid: false,
            owner: maker.owner,
            original_quantity: maker.original_quantity,
            base_asset_quantity_canceled: maker.quantity,
            price: maker.price,
        }],
    });
}

/// Removes an expired or self-matching bid maker, unlocking its reserved
/// quote, and emits the cancellation.
fn skip_bid_maker(pool: &mut Pool, maker: &Order, sink: &mut dyn EventSink) -> Result<(), OrderBookError> {
    trace!(
        "skipping bid maker {} at price {} (expired or self-match)",
        maker.order_id, maker.price
    );
    let locked_quote = maker.locked_quote()?;
    remove_resting_order(pool, true, maker.owner, maker.order_id, maker.price);
    debug_assert!(pool.quote_custodian.unlock(maker.owner, locked_quote));
    sink.emit(Event::AllOrdersCanceled {
        pool_id: pool.pool_id,
        orders_canceled: vec![CanceledOrderComponent {
            order_id: maker.order_id,
            client_order_id: maker.client_order_id,
            is_bid: true,
            owner: maker.owner,
            original_quantity: maker.original_quantity,
            base_asset_quantity_canceled: maker.quantity,
            price: maker.price,
        }],
    });
    Ok(())
}

/// Settles one fill against an ask maker: decreases its locked base,
/// credits its quote (fill + rebate), and deposits the fee-sink remainder.
/// Returns `(taker_commission, maker_rebate)`.
fn settle_ask_maker_fill(
    pool: &mut Pool,
    maker_owner: Owner,
    filled_base: u64,
    filled_quote: u64,
) -> Result<(u64, u64), OrderBookError> {
    let taker_commission = fixed_point::taker_commission(filled_quote, pool.taker_fee_rate)?;
    let maker_rebate = fixed_point::maker_rebate(filled_quote, pool.maker_rebate_rate)?;
    debug_assert!(pool.base_custodian.debit_locked(maker_owner, filled_base));
    let maker_credit = filled_quote
        .checked_add(maker_rebate)
        .ok_or_else(|| overflow("settle_ask_maker_fill: filled_quote + maker_rebate overflowed"))?;
    pool.quote_custodian.credit_available(maker_owner, maker_credit);
    pool.quote_fee_sink = pool
        .quote_fee_sink
        .saturating_add(taker_commission.saturating_sub(maker_rebate));
    Ok((taker_commission, maker_rebate))
}

/// Settles one fill against a bid maker: decreases its locked quote,
/// credits its base and its rebate, and deposits the fee-sink remainder.
/// Returns `(taker_commission, maker_rebate)`.
fn settle_bid_maker_fill(
    pool: &mut Pool,
    maker_owner: Owner,
    filled_base: u64,
    filled_quote: u64,
) -> Result<(u64, u64), OrderBookError> {
    let taker_commission = fixed_point::taker_commission(filled_quote, pool.taker_fee_rate)?;
    let maker_rebate = fixed_point::maker_rebate(filled_quote, pool.maker_rebate_rate)?;
    debug_assert!(pool.quote_custodian.debit_locked(maker_owner, filled_quote));
    pool.quote_custodian.credit_available(maker_owner, maker_rebate);
    pool.base_custodian.credit_available(maker_owner, filled_base);
    pool.quote_fee_sink = pool
        .quote_fee_sink
        .saturating_add(taker_commission.saturating_sub(maker_rebate));
    Ok((taker_commission, maker_rebate))
}

fn emit_fill(
    pool: &Pool,
    maker: &Order,
    taker_client_order_id: u64,
    taker_owner: Owner,
    filled_base: u64,
    remaining: u64,
    taker_commission: u64,
    maker_rebate: u64,
    sink: &mut dyn EventSink,
) {
    sink.emit(Event::OrderFilled {
        pool_id: pool.pool_id,
        order_id: maker.order_id,
        taker_client_order_id,
        maker_client_order_id: maker.client_order_id,
        is_bid: maker.is_bid,
        taker_address: taker_owner,
        maker_address: maker.owner,
        original_quantity: maker.original_quantity,
        base_asset_quantity_filled: filled_base,
        base_asset_quantity_remaining: remaining,
        price: maker.price,
        taker_commission,
        maker_rebates: maker_rebate,
    });
}

/// Matches an incoming bid (a buy) against the ask ladder, walking from
/// the best (lowest) ask upward while the tick price is at or below
/// `price_limit`, taking up to `base_qty_wanted` base units and spending
/// at most `quote_in` quote units (inclusive of taker commission).
///
/// Returns `(base_out, quote_left)`: base actually acquired, and quote left
/// unspent from the `quote_in` budget.
#[allow(clippy::too_many_arguments)]
pub fn match_bid(
    pool: &mut Pool,
    taker_owner: Owner,
    taker_client_order_id: u64,
    base_qty_wanted: u64,
    price_limit: u64,
    now: u64,
    quote_in: u64,
    sink: &mut dyn EventSink,
) -> Result<(u64, u64), OrderBookError> {
    trace!("match_bid taker={taker_owner} qty_wanted={base_qty_wanted} price_limit={price_limit} quote_in={quote_in}");
    let mut remaining_base = base_qty_wanted;
    let mut remaining_quote = quote_in;
    let mut base_out = 0u64;

    loop {
        if remaining_base == 0 {
            break;
        }
        let Some((tick_price, _)) = pool.asks.min_leaf() else {
            break;
        };
        if tick_price > price_limit {
            break;
        }
        let Some((maker_id, maker)) = peek_front(pool, false, tick_price) else {
            pool.asks.remove(tick_price);
            continue;
        };
        debug_assert_eq!(maker_id, maker.order_id);

        if maker.is_expired(now) || maker.owner == taker_owner {
            skip_ask_maker(pool, &maker, sink);
            continue;
        }

        let filled_base = remaining_base.min(maker.quantity);
        let filled_quote = fixed_point::quote_value(filled_base, maker.price)?;
        let taker_commission = fixed_point::taker_commission(filled_quote, pool.taker_fee_rate)?;
        let cost = filled_quote
            .checked_add(taker_commission)
            .ok_or_else(|| overflow("match_bid: filled_quote + taker_commission overflowed"))?;
        if cost > remaining_quote {
            // The taker's remaining budget cannot cover even this much of
            // the best-priced maker; nothing further can fill either.
            break;
        }

        let (_, maker_rebate) = settle_ask_maker_fill(pool, maker.owner, filled_base, filled_quote)?;
        remaining_quote -= cost;
        remaining_base -= filled_base;
        base_out += filled_base;

        let remaining_maker_qty =
            shrink_maker(pool, false, maker.owner, maker.order_id, maker.price, filled_base);
        trace!(
            "filled maker {} for {filled_base} base at price {} ({remaining_maker_qty} remaining)",
            maker.order_id, maker.price
        );
        emit_fill(
            pool,
            &maker,
            taker_client_order_id,
            taker_owner,
            filled_base,
            remaining_maker_qty,
            taker_commission,
            maker_rebate,
            sink,
        );
    }

    Ok((base_out, remaining_quote))
}

/// Matches an incoming bid sized by a quote budget rather than a base
/// target (used by `swap_exact_quote_for_base`). Fills whole makers while
/// the budget covers them; when a maker can only be partially afforded,
/// fills the largest lot-aligned base quantity the remaining budget
/// supports (including its taker commission), then stops.
pub fn match_bid_with_quote_quantity(
    pool: &mut Pool,
    taker_owner: Owner,
    taker_client_order_id: u64,
    quote_budget: u64,
    price_limit: u64,
    now: u64,
    sink: &mut dyn EventSink,
) -> Result<(u64, u64), OrderBookError> {
    trace!("match_bid_with_quote_quantity taker={taker_owner} quote_budget={quote_budget} price_limit={price_limit}");
    let mut remaining_quote = quote_budget;
    let mut base_out = 0u64;

    loop {
        if remaining_quote == 0 {
            break;
        }
        let Some((tick_price, _)) = pool.asks.min_leaf() else {
            break;
        };
        if tick_price > price_limit {
            break;
        }
        let Some((maker_id, maker)) = peek_front(pool, false, tick_price) else {
            pool.asks.remove(tick_price);
            continue;
        };
        debug_assert_eq!(maker_id, maker.order_id);

        if maker.is_expired(now) || maker.owner == taker_owner {
            skip_ask_maker(pool, &maker, sink);
            continue;
        }

        let full_quote = fixed_point::quote_value(maker.quantity, maker.price)?;
        let full_commission = fixed_point::taker_commission(full_quote, pool.taker_fee_rate)?;
        let full_cost = full_quote
            .checked_add(full_commission)
            .ok_or_else(|| overflow("match_bid_with_quote_quantity: full cost overflowed"))?;

        if full_cost <= remaining_quote {
            let (_, maker_rebate) =
                settle_ask_maker_fill(pool, maker.owner, maker.quantity, full_quote)?;
            remaining_quote -= full_cost;
            base_out += maker.quantity;
            let remaining_maker_qty =
                shrink_maker(pool, false, maker.owner, maker.order_id, maker.price, maker.quantity);
            emit_fill(
                pool,
                &maker,
                taker_client_order_id,
                taker_owner,
                maker.quantity,
                remaining_maker_qty,
                full_commission,
                maker_rebate,
                sink,
            );
            continue;
        }

        let affordable_base = max_affordable_quantity(
            remaining_quote,
            maker.price,
            pool.lot_size,
            maker.quantity,
            pool.taker_fee_rate,
        )?;
        if affordable_base == 0 {
            break;
        }
        let quote = fixed_point::quote_value(affordable_base, maker.price)?;
        let (taker_commission, maker_rebate) =
            settle_ask_maker_fill(pool, maker.owner, affordable_base, quote)?;
        let cost = quote
            .checked_add(taker_commission)
            .ok_or_else(|| overflow("match_bid_with_quote_quantity: partial cost overflowed"))?;
        remaining_quote -= cost;
        base_out += affordable_base;
        let remaining_maker_qty = shrink_maker(
            pool,
            false,
            maker.owner,
            maker.order_id,
            maker.price,
            affordable_base,
        );
        emit_fill(
            pool,
            &maker,
            taker_client_order_id,
            taker_owner,
            affordable_base,
            remaining_maker_qty,
            taker_commission,
            maker_rebate,
            sink,
        );
        break;
    }

    Ok((base_out, remaining_quote))
}

/// The largest multiple of `lot_size`, no larger than `max_quantity`, whose
/// quote cost (`qty * price`, plus its taker commission) fits within
/// `quote_budget`. Binary search over lot count: cost is monotonic
/// non-decreasing in quantity, so the feasible set is a prefix.
fn max_affordable_quantity(
    quote_budget: u64,
    price: u64,
    lot_size: u64,
    max_quantity: u64,
    taker_rate: u64,
) -> Result<u64, OrderBookError> {
    if lot_size == 0 {
        return Err(overflow("max_affordable_quantity: lot_size is zero"));
    }
    let max_lots = max_quantity / lot_size;
    let mut lo: u64 = 0;
    let mut hi: u64 = max_lots;
    while lo < hi {
        let mid = lo + (hi - lo + 1) / 2;
        let qty = mid * lot_size;
        let quote = fixed_point::quote_value(qty, price)?;
        let commission = fixed_point::taker_commission(quote, taker_rate)?;
        let cost = quote
            .checked_add(commission)
            .ok_or_else(|| overflow("max_affordable_quantity: cost overflowed"))?;
        if cost <= quote_budget {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    Ok(lo * lot_size)
}

/// Matches an incoming ask (a sell) against the bid ladder, walking from
/// the best (highest) bid downward while the tick price is at or above
/// `price_limit`, selling up to `base_in` base units.
///
/// Returns `(base_left, quote_out)`: base left unsold from `base_in`, and
/// quote acquired (net of taker commission).
pub fn match_ask(
    pool: &mut Pool,
    taker_owner: Owner,
    taker_client_order_id: u64,
    price_limit: u64,
    now: u64,
    base_in: u64,
    sink: &mut dyn EventSink,
) -> Result<(u64, u64), OrderBookError> {
    trace!("match_ask taker={taker_owner} base_in={base_in} price_limit={price_limit}");
    let mut remaining_base = base_in;
    let mut quote_out = 0u64;

    loop {
        if remaining_base == 0 {
            break;
        }
        let Some((tick_price, _)) = pool.bids.max_leaf() else {
            break;
        };
        if tick_price < price_limit {
            break;
        }
        let Some((maker_id, maker)) = peek_front(pool, true, tick_price) else {
            pool.bids.remove(tick_price);
            continue;
        };
        debug_assert_eq!(maker_id, maker.order_id);

        if maker.is_expired(now) || maker.owner == taker_owner {
            skip_bid_maker(pool, &maker, sink)?;
            continue;
        }

        let filled_base = remaining_base.min(maker.quantity);
        let filled_quote = fixed_point::quote_value(filled_base, maker.price)?;
        let (taker_commission, maker_rebate) =
            settle_bid_maker_fill(pool, maker.owner, filled_base, filled_quote)?;

        remaining_base -= filled_base;
        quote_out += filled_quote.saturating_sub(taker_commission);

        let remaining_maker_qty =
            shrink_maker(pool, true, maker.owner, maker.order_id, maker.price, filled_base);
        trace!(
            "filled maker {} for {filled_base} base at price {} ({remaining_maker_qty} remaining)",
            maker.order_id, maker.price
        );
        emit_fill(
            pool,
            &maker,
            taker_client_order_id,
            taker_owner,
            filled_base,
            remaining_maker_qty,
            taker_commission,
            maker_rebate,
            sink,
        );
    }

    Ok((remaining_base, quote_out))
}
