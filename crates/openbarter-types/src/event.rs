//! Events emitted by committed settlement calls.
//!
//! Events are appended to the engine's log only when the whole call
//! succeeds; a failed call leaves no trace.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{OrderHash, ReceivedItem, SpentItem};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementEvent {
    /// An order (or a fraction of it) was settled.
    OrderFulfilled {
        order_hash: OrderHash,
        offerer: Address,
        zone: Address,
        /// The fulfiller, or the zero address for matched orders.
        recipient: Address,
        offer: Vec<SpentItem>,
        consideration: Vec<ReceivedItem>,
    },
    OrderCancelled {
        order_hash: OrderHash,
        offerer: Address,
        zone: Address,
    },
    OrderValidated {
        order_hash: OrderHash,
        offerer: Address,
        zone: Address,
    },
    NonceIncremented {
        new_nonce: U256,
        offerer: Address,
    },
    OrdersMatched {
        order_hashes: Vec<OrderHash>,
    },
}

impl SettlementEvent {
    /// Order hash the event is about, if it concerns a single order.
    #[must_use]
    pub fn order_hash(&self) -> Option<OrderHash> {
        match self {
            Self::OrderFulfilled { order_hash, .. }
            | Self::OrderCancelled { order_hash, .. }
            | Self::OrderValidated { order_hash, .. } => Some(*order_hash),
            Self::NonceIncremented { .. } | Self::OrdersMatched { .. } => None,
        }
    }
}

impl std::fmt::Display for SettlementEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OrderFulfilled { order_hash, .. } => write!(f, "ORDER_FULFILLED({order_hash})"),
            Self::OrderCancelled { order_hash, .. } => write!(f, "ORDER_CANCELLED({order_hash})"),
            Self::OrderValidated { order_hash, .. } => write!(f, "ORDER_VALIDATED({order_hash})"),
            Self::NonceIncremented { new_nonce, offerer } => {
                write!(f, "NONCE_INCREMENTED({offerer} -> {new_nonce})")
            }
            Self::OrdersMatched { order_hashes } => {
                write!(f, "ORDERS_MATCHED({} orders)", order_hashes.len())
            }
        }
    }
}
