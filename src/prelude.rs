//! Common re-exports for callers that don't want to name every module.

pub use crate::cancel::{cancel_all, cancel_expired, cancel_order, cancel_orders};
pub use crate::custody::{Balance, Custodian};
pub use crate::error::OrderBookError;
pub use crate::events::{CanceledOrderComponent, Event, EventSink, VecEventSink};
pub use crate::ids::{AccountCap, Owner, PoolId, Side};
pub use crate::order::{Order, Restriction, SelfMatchPrevention, TickLevel};
pub use crate::placement::{
    place_limit, place_market, swap_exact_base_for_quote, swap_exact_quote_for_base, MarketFillResult,
    PlacementResult,
};
pub use crate::pool::{Pool, PoolConfig};
pub use crate::query::{account_balance, best_ask, best_bid, get_order, level2, list_open_orders, DepthLevel};
