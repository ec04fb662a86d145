//! Order status and nonce ledger.
//!
//! The ledger is the only persistent state the engine owns about orders:
//! one [`OrderStatus`] per order hash and one nonce per offerer. Entries are
//! created on first touch and never deleted. Cancellation and full
//! consumption are terminal for an order hash.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use openbarter_matchcore::FillUpdate;
use openbarter_types::{OpenbarterError, OrderHash, OrderStatus, Result};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct OrderLedger {
    statuses: HashMap<OrderHash, OrderStatus>,
    nonces: HashMap<Address, U256>,
}

impl OrderLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Status of an order; untouched orders read as all-zero.
    #[must_use]
    pub fn status(&self, order_hash: &OrderHash) -> OrderStatus {
        self.statuses.get(order_hash).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn nonce(&self, offerer: &Address) -> U256 {
        self.nonces.get(offerer).copied().unwrap_or_default()
    }

    /// Bump an offerer's nonce, invalidating every order signed under the
    /// previous one. Returns the new nonce.
    pub fn increment_nonce(&mut self, offerer: Address) -> U256 {
        let nonce = self.nonces.entry(offerer).or_default();
        *nonce += U256::from(1u8);
        debug!(offerer = %offerer, nonce = %nonce, "Nonce incremented");
        *nonce
    }

    /// Whether the order may still be filled.
    ///
    /// Cancelled and fully filled orders fail when `revert_on_invalid` is
    /// set and read as `false` otherwise. `only_allow_unused` rejects any
    /// order that has been filled at all, regardless of `revert_on_invalid`.
    pub fn verify_status(
        &self,
        order_hash: &OrderHash,
        only_allow_unused: bool,
        revert_on_invalid: bool,
    ) -> Result<bool> {
        let status = self.status(order_hash);
        if status.is_cancelled {
            if revert_on_invalid {
                return Err(OpenbarterError::OrderIsCancelled(*order_hash));
            }
            return Ok(false);
        }
        if status.total_filled != 0 {
            if only_allow_unused {
                return Err(OpenbarterError::OrderPartiallyFilled(*order_hash));
            }
            if status.is_fully_filled() {
                if revert_on_invalid {
                    return Err(OpenbarterError::OrderAlreadyFilled(*order_hash));
                }
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Mark an order validated. Returns `true` on the first transition.
    pub fn mark_validated(&mut self, order_hash: OrderHash) -> bool {
        let status = self.statuses.entry(order_hash).or_default();
        let first = !status.is_validated;
        status.is_validated = true;
        first
    }

    /// Cancel an order. Terminal: the hash can never be filled again.
    pub fn mark_cancelled(&mut self, order_hash: OrderHash) {
        let status = self.statuses.entry(order_hash).or_default();
        status.is_validated = false;
        status.is_cancelled = true;
    }

    /// Store the cumulative fill state produced by fill accounting.
    pub fn record_fill(&mut self, order_hash: OrderHash, update: &FillUpdate) {
        let status = self.statuses.entry(order_hash).or_default();
        status.is_validated = true;
        status.is_cancelled = false;
        status.total_filled = update.total_filled;
        status.total_size = update.total_size;
        debug!(
            order = %order_hash,
            filled = update.total_filled,
            size = update.total_size,
            "Fill recorded"
        );
    }
}
