//! # clob-engine
//!
//! A central limit order book engine: a single trading pair's price-time-
//! priority matching, custody ledger, and fixed-point fee accounting.
//!
//! ## Scope
//!
//! This crate is the matching core, not a venue. It owns:
//!
//! - the ordered bid/ask ladders and the FIFO queue at each price level
//! - the per-owner custody balances (`available`/`locked`) for the pair's
//!   two assets
//! - limit placement (with time-in-force restrictions), market orders, and
//!   the swap-style sugar built on top of them
//! - cancellation (single, batch, cancel-all, expired sweep)
//! - a structured event record per mutation, emitted to a caller-supplied
//!   [`EventSink`](events::EventSink)
//!
//! It deliberately does not own: wire serialization of persisted state,
//! event *transport* (a message bus, a journal file, a wire protocol), pool
//! creation governance, or routing real coin envelopes into and out of the
//! custody ledger. Those are the host's job; this crate defines the traits
//! and records they plug into.
//!
//! ## Concurrency model
//!
//! Every mutating entry point takes `&mut Pool` — single-threaded,
//! run-to-completion. Queries take `&Pool` and may run concurrently with
//! each other. A pool is not `Sync`; callers that need concurrent pools
//! hold one `Pool` per trading pair behind their own synchronization.
//!
//! ## Example
//!
//! ```
//! use clob_engine::prelude::*;
//!
//! let mut pool = Pool::new(PoolConfig {
//!     base_asset_type: "BTC".to_string(),
//!     quote_asset_type: "USDC".to_string(),
//!     tick_size: 1,
//!     lot_size: 1,
//!     taker_fee_rate: 2_500_000,
//!     maker_rebate_rate: 1_500_000,
//!     owner: Owner::new(),
//!     creation_fee_paid: 100_000_000_000,
//! })
//! .unwrap();
//!
//! let maker = Owner::new();
//! pool.base_custodian.credit_available(maker, 10);
//! let mut sink = VecEventSink::new();
//! place_limit(
//!     &mut pool,
//!     maker,
//!     0,
//!     100,
//!     10,
//!     SelfMatchPrevention::CancelOldestMaker,
//!     false,
//!     u64::MAX,
//!     Restriction::NoRestriction,
//!     0,
//!     &mut sink,
//! )
//! .unwrap();
//!
//! assert_eq!(best_ask(&pool), Some(100));
//! ```

pub mod cancel;
pub mod constants;
pub mod custody;
pub mod error;
pub mod events;
pub mod fifo;
pub mod fixed_point;
pub mod ids;
pub mod ladder;
pub mod matching;
pub mod order;
pub mod placement;
pub mod pool;
pub mod query;

pub mod prelude;

pub use cancel::{cancel_all, cancel_expired, cancel_order, cancel_orders};
pub use custody::{Balance, Custodian};
pub use error::OrderBookError;
pub use events::{CanceledOrderComponent, Event, EventSink, VecEventSink};
pub use ids::{AccountCap, Owner, PoolId, Side};
pub use order::{Order, Restriction, SelfMatchPrevention, TickLevel};
pub use placement::{
    place_limit, place_market, swap_exact_base_for_quote, swap_exact_quote_for_base, MarketFillResult,
    PlacementResult,
};
pub use pool::{Pool, PoolConfig};
pub use query::{account_balance, best_ask, best_bid, get_order, level2, list_open_orders, DepthLevel};
