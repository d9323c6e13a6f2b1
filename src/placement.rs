//! Order placement: limit injection, restriction handling, and market
//! (swap-style) entry points built on top of [`crate::matching`].

use tracing::{trace, warn};

use crate::constants::{MAX_PRICE, MIN_PRICE};
use crate::error::OrderBookError;
use crate::events::{Event, EventSink};
use crate::fixed_point;
use crate::ids::Owner;
use crate::matching::{match_ask, match_bid, match_bid_with_quote_quantity};
use crate::order::{Order, Restriction, SelfMatchPrevention};
use crate::pool::Pool;

fn overflow(reason: &str) -> OrderBookError {
    OrderBookError::Overflow {
        reason: reason.to_string(),
    }
}

/// Outcome of a limit placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementResult {
    /// Base quantity filled immediately against the opposite book.
    pub base_filled: u64,
    /// Quote quantity that changed hands immediately (spent for a bid,
    /// received net of taker commission for an ask).
    pub quote_filled: u64,
    /// `true` if a remainder was injected into the own-side ladder.
    pub resting: bool,
    /// The id assigned to the resting remainder, if any.
    pub order_id: Option<u64>,
}

/// Outcome of a market order or swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketFillResult {
    /// Base quantity filled.
    pub base_filled: u64,
    /// Quote quantity that changed hands.
    pub quote_filled: u64,
    /// Base left over and returned to the caller unchanged.
    pub base_returned: u64,
    /// Quote left over and returned to the caller unchanged.
    pub quote_returned: u64,
}

/// Reads the maximum base quantity matchable for a hypothetical bid,
/// without mutating the book or custody. Used to decide fill-or-kill and
/// post-or-abort outcomes before committing to a real match, so a rejected
/// placement never leaves partial state behind.
fn simulate_bid_fill(
    pool: &Pool,
    taker_owner: Owner,
    price_limit: u64,
    now: u64,
    base_cap: u64,
    quote_budget: u64,
    taker_rate: u64,
) -> Result<u64, OrderBookError> {
    let mut remaining_base = base_cap;
    let mut remaining_quote = quote_budget;
    let mut filled = 0u64;
    'outer: for entry in pool.asks.iter_ascending() {
        if remaining_base == 0 {
            break;
        }
        let tick_price = *entry.key();
        if tick_price > price_limit {
            break;
        }
        let level = entry.value().borrow();
        for (_, maker) in level.orders.iter() {
            if remaining_base == 0 {
                break 'outer;
            }
            if maker.is_expired(now) || maker.owner == taker_owner {
                continue;
            }
            let take = remaining_base.min(maker.quantity);
            let quote = fixed_point::quote_value(take, maker.price)?;
            let commission = fixed_point::taker_commission(quote, taker_rate)?;
            let cost = quote
                .checked_add(commission)
                .ok_or_else(|| overflow("simulate_bid_fill: cost overflowed"))?;
            if cost > remaining_quote {
                break 'outer;
            }
            remaining_quote -= cost;
            remaining_base -= take;
            filled += take;
        }
    }
    Ok(filled)
}

/// Same as [`simulate_bid_fill`] for a hypothetical ask: no quote budget
/// applies, since an ask's limiting resource is its base quantity.
fn simulate_ask_fill(
    pool: &Pool,
    taker_owner: Owner,
    price_limit: u64,
    now: u64,
    base_cap: u64,
) -> Result<u64, OrderBookError> {
    let mut remaining_base = base_cap;
    let mut filled = 0u64;
    'outer: for entry in pool.bids.iter_descending() {
        if remaining_base == 0 {
            break;
        }
        let tick_price = *entry.key();
        if tick_price < price_limit {
            break;
        }
        let level = entry.value().borrow();
        for (_, maker) in level.orders.iter() {
            if remaining_base == 0 {
                break 'outer;
            }
            if maker.is_expired(now) || maker.owner == taker_owner {
                continue;
            }
            let take = remaining_base.min(maker.quantity);
            remaining_base -= take;
            filled += take;
        }
    }
    Ok(filled)
}

/// Injects a fresh resting order, locking its reservation out of `owner`'s
/// already-available balance and emitting `OrderPlaced`.
#[allow(clippy::too_many_arguments)]
fn inject_order(
    pool: &mut Pool,
    owner: Owner,
    client_order_id: u64,
    price: u64,
    resting_quantity: u64,
    original_quantity: u64,
    is_bid: bool,
    self_match: SelfMatchPrevention,
    expire_timestamp_ms: u64,
    sink: &mut dyn EventSink,
) -> Result<u64, OrderBookError> {
    let order_id = pool.next_order_id(is_bid);
    trace!("resting order {order_id} is_bid={is_bid} price={price} quantity={resting_quantity}");
    if is_bid {
        let reservation = fixed_point::quote_value(resting_quantity, price)?;
        debug_assert!(pool.quote_custodian.lock(owner, reservation));
    } else {
        debug_assert!(pool.base_custodian.lock(owner, resting_quantity));
    }
    let order = Order {
        order_id,
        client_order_id,
        price,
        original_quantity,
        quantity: resting_quantity,
        is_bid,
        owner,
        expire_timestamp_ms,
        self_matching_prevention: self_match,
    };
    pool.insert_resting_order(order);
    sink.emit(Event::OrderPlaced {
        pool_id: pool.pool_id,
        order_id,
        client_order_id,
        is_bid,
        owner,
        original_quantity,
        base_asset_quantity_placed: resting_quantity,
        price,
        expire_timestamp: expire_timestamp_ms,
    });
    Ok(order_id)
}

/// Places a limit order: validates, reserves funds, crosses the opposite
/// book, applies the time-in-force restriction, and refunds any unused
/// reservation. See spec §4.5.
#[allow(clippy::too_many_arguments)]
pub fn place_limit(
    pool: &mut Pool,
    owner: Owner,
    client_order_id: u64,
    price: u64,
    quantity: u64,
    self_match: SelfMatchPrevention,
    is_bid: bool,
    expire_timestamp_ms: u64,
    restriction: Restriction,
    now: u64,
    sink: &mut dyn EventSink,
) -> Result<PlacementResult, OrderBookError> {
    trace!(
        "place_limit client_order_id={client_order_id} price={price} quantity={quantity} is_bid={is_bid} restriction={restriction:?}"
    );
    if quantity == 0 {
        return Err(OrderBookError::InvalidQuantity {
            reason: "quantity must be nonzero".to_string(),
        });
    }
    if price == 0 {
        return Err(OrderBookError::InvalidPrice {
            reason: "price must be nonzero".to_string(),
        });
    }
    if price % pool.tick_size != 0 {
        return Err(OrderBookError::InvalidPrice {
            reason: format!("price {price} is not a multiple of tick_size {}", pool.tick_size),
        });
    }
    if quantity % pool.lot_size != 0 {
        return Err(OrderBookError::InvalidQuantity {
            reason: format!("quantity {quantity} is not a multiple of lot_size {}", pool.lot_size),
        });
    }
    if expire_timestamp_ms <= now {
        return Err(OrderBookError::InvalidExpireTimestamp {
            reason: format!("expire_timestamp_ms {expire_timestamp_ms} must be after now {now}"),
        });
    }

    if is_bid {
        place_limit_bid(
            pool,
            owner,
            client_order_id,
            price,
            quantity,
            self_match,
            expire_timestamp_ms,
            restriction,
            now,
            sink,
        )
    } else {
        place_limit_ask(
            pool,
            owner,
            client_order_id,
            price,
            quantity,
            self_match,
            expire_timestamp_ms,
            restriction,
            now,
            sink,
        )
    }
}

#[allow(clippy::too_many_arguments)]
fn place_limit_bid(
    pool: &mut Pool,
    owner: Owner,
    client_order_id: u64,
    price: u64,
    quantity: u64,
    self_match: SelfMatchPrevention,
    expire_timestamp_ms: u64,
    restriction: Restriction,
    now: u64,
    sink: &mut dyn EventSink,
) -> Result<PlacementResult, OrderBookError> {
    let needed_quote = fixed_point::quote_value(quantity, price)?;
    let available = pool.quote_custodian.balance(owner).available;
    if available < needed_quote {
        return Err(OrderBookError::InsufficientQuoteCoin {
            needed: needed_quote,
            available,
        });
    }

    if matches!(restriction, Restriction::FillOrKill) {
        let fillable = simulate_bid_fill(pool, owner, price, now, quantity, available, pool.taker_fee_rate)?;
        if fillable < quantity {
            warn!("fill-or-kill bid rejected: only {fillable} of {quantity} fillable at price {price}");
            return Err(OrderBookError::OrderCannotBeFullyFilled);
        }
    }
    if matches!(restriction, Restriction::PostOrAbort) {
        let crosses = simulate_bid_fill(pool, owner, price, now, 1, u64::MAX, pool.taker_fee_rate)?;
        if crosses > 0 {
            warn!("post-or-abort bid rejected: would cross the book at price {price}");
            return Err(OrderBookError::OrderCannotBeFullyPassive);
        }
    }

    debug_assert!(pool.quote_custodian.debit_available(owner, available));
    let (base_filled, quote_left) = match_bid(pool, owner, client_order_id, quantity, price, now, available, sink)?;
    let quote_spent = available - quote_left;
    pool.quote_custodian.credit_available(owner, quote_left);
    pool.base_custodian.credit_available(owner, base_filled);

    let remaining_qty = quantity - base_filled;
    let should_rest = matches!(restriction, Restriction::NoRestriction | Restriction::PostOrAbort)
        && remaining_qty > 0;

    let mut order_id = None;
    let resting = if should_rest {
        // Cap the resting size to what the refunded quote can actually
        // collateralize: fee dust spent during matching can leave slightly
        // less than `remaining_qty * price` behind. The uncollateralizable
        // sliver simply stays in the owner's available balance rather than
        // resting partially under-funded.
        let max_units = quote_left / price;
        let affordable_qty = max_units - (max_units % pool.lot_size);
        let resting_qty = remaining_qty.min(affordable_qty);
        if resting_qty > 0 {
            order_id = Some(inject_order(
                pool,
                owner,
                client_order_id,
                price,
                resting_qty,
                quantity,
                true,
                self_match,
                expire_timestamp_ms,
                sink,
            )?);
            true
        } else {
            false
        }
    } else {
        false
    };

    Ok(PlacementResult {
        base_filled,
        quote_filled: quote_spent,
        resting,
        order_id,
    })
}

#[allow(clippy::too_many_arguments)]
fn place_limit_ask(
    pool: &mut Pool,
    owner: Owner,
    client_order_id: u64,
    price: u64,
    quantity: u64,
    self_match: SelfMatchPrevention,
    expire_timestamp_ms: u64,
    restriction: Restriction,
    now: u64,
    sink: &mut dyn EventSink,
) -> Result<PlacementResult, OrderBookError> {
    let available = pool.base_custodian.balance(owner).available;
    if available < quantity {
        return Err(OrderBookError::InsufficientBaseCoin {
            needed: quantity,
            available,
        });
    }

    if matches!(restriction, Restriction::FillOrKill) {
        let fillable = simulate_ask_fill(pool, owner, price, now, quantity)?;
        if fillable < quantity {
            warn!("fill-or-kill ask rejected: only {fillable} of {quantity} fillable at price {price}");
            return Err(OrderBookError::OrderCannotBeFullyFilled);
        }
    }
    if matches!(restriction, Restriction::PostOrAbort) {
        let crosses = simulate_ask_fill(pool, owner, price, now, 1)?;
        if crosses > 0 {
            warn!("post-or-abort ask rejected: would cross the book at price {price}");
            return Err(OrderBookError::OrderCannotBeFullyPassive);
        }
    }

    debug_assert!(pool.base_custodian.debit_available(owner, quantity));
    let (base_left, quote_out) = match_ask(pool, owner, client_order_id, price, now, quantity, sink)?;
    let base_filled = quantity - base_left;
    pool.base_custodian.credit_available(owner, base_left);
    pool.quote_custodian.credit_available(owner, quote_out);

    let should_rest =
        matches!(restriction, Restriction::NoRestriction | Restriction::PostOrAbort) && base_left > 0;

    let mut order_id = None;
    if should_rest {
        order_id = Some(inject_order(
            pool,
            owner,
            client_order_id,
            price,
            base_left,
            quantity,
            false,
            self_match,
            expire_timestamp_ms,
            sink,
        )?);
    }

    Ok(PlacementResult {
        base_filled,
        quote_filled: quote_out,
        resting: should_rest,
        order_id,
    })
}

/// Places a market order: crosses the opposite book up to `quantity` base
/// units without ever injecting a resting remainder (spec §4.7).
#[allow(clippy::too_many_arguments)]
pub fn place_market(
    pool: &mut Pool,
    owner: Owner,
    client_order_id: u64,
    quantity: u64,
    is_bid: bool,
    base_in: u64,
    quote_in: u64,
    now: u64,
    sink: &mut dyn EventSink,
) -> Result<MarketFillResult, OrderBookError> {
    trace!("place_market client_order_id={client_order_id} quantity={quantity} is_bid={is_bid}");
    if quantity == 0 {
        return Err(OrderBookError::InvalidQuantity {
            reason: "quantity must be nonzero".to_string(),
        });
    }
    if is_bid {
        let (base_out, quote_left) =
            match_bid(pool, owner, client_order_id, quantity, MAX_PRICE, now, quote_in, sink)?;
        Ok(MarketFillResult {
            base_filled: base_out,
            quote_filled: quote_in - quote_left,
            base_returned: base_out,
            quote_returned: quote_left,
        })
    } else {
        if base_in < quantity {
            return Err(OrderBookError::InvalidQuantity {
                reason: format!("declared base envelope {base_in} is smaller than quantity {quantity}"),
            });
        }
        let (base_left, quote_out) = match_ask(pool, owner, client_order_id, MIN_PRICE, now, quantity, sink)?;
        Ok(MarketFillResult {
            base_filled: quantity - base_left,
            quote_filled: quote_out,
            base_returned: (base_in - quantity) + base_left,
            quote_returned: 0,
        })
    }
}

/// Sugar: a market ask sized exactly by the base coin handed in.
pub fn swap_exact_base_for_quote(
    pool: &mut Pool,
    owner: Owner,
    client_order_id: u64,
    base_in: u64,
    now: u64,
    sink: &mut dyn EventSink,
) -> Result<MarketFillResult, OrderBookError> {
    place_market(pool, owner, client_order_id, base_in, false, base_in, 0, now, sink)
}

/// Sugar: a market bid sized by a quote budget rather than a base target.
pub fn swap_exact_quote_for_base(
    pool: &mut Pool,
    owner: Owner,
    client_order_id: u64,
    quote_in: u64,
    now: u64,
    sink: &mut dyn EventSink,
) -> Result<MarketFillResult, OrderBookError> {
    let (base_out, quote_left) =
        match_bid_with_quote_quantity(pool, owner, client_order_id, quote_in, MAX_PRICE, now, sink)?;
    Ok(MarketFillResult {
        base_filled: base_out,
        quote_filled: quote_in - quote_left,
        base_returned: base_out,
        quote_returned: quote_left,
    })
}
