//! Opaque identities: owners, pools, and the capabilities that carry them.
//!
//! The engine never interprets the bytes of an [`Owner`] or [`PoolId`] — it
//! only compares and hashes them. The host's permissioning/object model
//! decides what these bytes mean; here they are just stable keys.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::MIN_ASK_ORDER_ID;
use crate::error::OrderBookError;

/// A stable, opaque owner identity.
///
/// Two capabilities with the same `owner` draw against the same custody
/// balances and may cancel each other's orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner(pub Uuid);

impl Owner {
    /// Generates a fresh, random owner identity.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Owner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stable, opaque pool identity, assigned once at pool creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolId(pub Uuid);

impl PoolId {
    /// Generates a fresh pool identity.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PoolId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PoolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An account capability: an opaque reference whose `owner` field is the
/// stable principal used for custody and order ownership.
///
/// An **admin cap** has `id == owner` (it funds its own bucket and may mint
/// children). A **child cap** has `id != owner`, drawing against the admin's
/// funding bucket without being able to mint further capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountCap {
    id: Owner,
    owner: Owner,
}

impl AccountCap {
    /// Mints a fresh admin capability: a new identity that is its own owner.
    #[must_use]
    pub fn mint_admin() -> Self {
        let identity = Owner::new();
        Self {
            id: identity,
            owner: identity,
        }
    }

    /// Mints a child capability funded by `admin`'s bucket.
    ///
    /// # Errors
    /// Returns [`OrderBookError::AdminAccountCapRequired`] if `admin` is
    /// itself a child capability (`admin.id != admin.owner`).
    pub fn mint_child(admin: &AccountCap) -> Result<Self, OrderBookError> {
        if !admin.is_admin() {
            return Err(OrderBookError::AdminAccountCapRequired);
        }
        Ok(Self {
            id: Owner::new(),
            owner: admin.owner,
        })
    }

    /// This capability's own identity.
    #[must_use]
    pub fn id(&self) -> Owner {
        self.id
    }

    /// The funding bucket this capability draws against.
    #[must_use]
    pub fn owner(&self) -> Owner {
        self.owner
    }

    /// `true` if this capability may mint children (`id == owner`).
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.id == self.owner
    }
}

/// Which side of the book an order id belongs to, recovered purely from the
/// id's high bit: ids below [`MIN_ASK_ORDER_ID`] are bids, the rest are asks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Buy side.
    Bid,
    /// Sell side.
    Ask,
}

impl Side {
    /// Recovers the side from an order id's high bit.
    #[must_use]
    pub fn of_order_id(order_id: u64) -> Self {
        if order_id < MIN_ASK_ORDER_ID {
            Side::Bid
        } else {
            Side::Ask
        }
    }

    /// `true` for [`Side::Bid`].
    #[must_use]
    pub fn is_bid(self) -> bool {
        matches!(self, Side::Bid)
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Bid => write!(f, "bid"),
            Side::Ask => write!(f, "ask"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_from_id_boundary() {
        assert_eq!(Side::of_order_id(MIN_ASK_ORDER_ID - 1), Side::Bid);
        assert_eq!(Side::of_order_id(MIN_ASK_ORDER_ID), Side::Ask);
        assert_eq!(Side::of_order_id(1), Side::Bid);
        assert_eq!(Side::of_order_id(u64::MAX), Side::Ask);
    }

    #[test]
    fn child_cap_shares_owner_not_id() {
        let admin = AccountCap::mint_admin();
        let child = AccountCap::mint_child(&admin).unwrap();
        assert_eq!(child.owner(), admin.owner());
        assert_ne!(child.id(), admin.id());
        assert!(admin.is_admin());
        assert!(!child.is_admin());
    }

    #[test]
    fn child_cannot_mint_grandchild() {
        let admin = AccountCap::mint_admin();
        let child = AccountCap::mint_child(&admin).unwrap();
        let err = AccountCap::mint_child(&child).unwrap_err();
        assert_eq!(err, OrderBookError::AdminAccountCapRequired);
    }
}
