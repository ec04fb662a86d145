//! Transfer router: executes resolved movements.
//!
//! Native currency is paid by the engine out of the value supplied with the
//! call, so every native movement must come from the caller. Token
//! transfers with the zero conduit key go straight to the token with the
//! engine as operator. Conduit transfers are accumulated while the key
//! stays the same and flushed as one conduit call when it changes or the
//! router finishes.

use alloy_primitives::{Address, U256};
use openbarter_ingress::CallbackRegistry;
use openbarter_types::{
    CallbackFailure, ConduitKey, Execution, ItemType, OpenbarterError, Result,
};
use tracing::{debug, warn};

use crate::{
    assets::{AssetBackend, TokenTransfer, perform_transfer},
    conduit::{ConduitBatch, ConduitController},
};

pub struct TransferRouter<'a, A: AssetBackend> {
    assets: &'a mut A,
    conduits: &'a ConduitController,
    registry: &'a CallbackRegistry,
    engine: Address,
    payer: Address,
    native_remaining: U256,
    pending: Option<(ConduitKey, Vec<TokenTransfer>)>,
}

impl<'a, A: AssetBackend> TransferRouter<'a, A> {
    /// `value` was supplied by `payer` and must already be held by the engine.
    pub fn new(
        assets: &'a mut A,
        conduits: &'a ConduitController,
        registry: &'a CallbackRegistry,
        engine: Address,
        payer: Address,
        value: U256,
    ) -> Self {
        Self {
            assets,
            conduits,
            registry,
            engine,
            payer,
            native_remaining: value,
            pending: None,
        }
    }

    #[must_use]
    pub fn native_remaining(&self) -> U256 {
        self.native_remaining
    }

    pub fn execute(&mut self, execution: &Execution) -> Result<()> {
        let item = &execution.item;
        debug!(
            item_type = %item.item_type,
            token = %item.token,
            identifier = %item.identifier,
            amount = %item.amount,
            from = %execution.offerer,
            to = %item.recipient,
            conduit = %execution.conduit_key,
            "Transfer"
        );
        if item.item_type == ItemType::Native {
            if execution.offerer != self.payer {
                return Err(OpenbarterError::InvalidNativeOfferItem {
                    offerer: execution.offerer,
                });
            }
            return self.pay_native(item.recipient, item.amount);
        }
        self.transfer(
            TokenTransfer {
                item_type: item.item_type,
                token: item.token,
                from: execution.offerer,
                to: item.recipient,
                identifier: item.identifier,
                amount: item.amount,
            },
            execution.conduit_key,
        )
    }

    pub fn execute_all(&mut self, executions: &[Execution]) -> Result<()> {
        executions.iter().try_for_each(|e| self.execute(e))
    }

    /// Transfer a token directly or queue it for its conduit.
    pub fn transfer(&mut self, transfer: TokenTransfer, conduit_key: ConduitKey) -> Result<()> {
        if conduit_key.is_direct() {
            return perform_transfer(&mut *self.assets, self.engine, &transfer);
        }
        if let Some((key, queued)) = &mut self.pending {
            if *key == conduit_key {
                queued.push(transfer);
                return Ok(());
            }
        }
        self.flush()?;
        self.pending = Some((conduit_key, vec![transfer]));
        Ok(())
    }

    /// Pay native currency out of the supplied value.
    pub fn pay_native(&mut self, recipient: Address, amount: U256) -> Result<()> {
        if amount > self.native_remaining {
            return Err(OpenbarterError::InsufficientEtherSupplied {
                required: amount,
                supplied: self.native_remaining,
            });
        }
        self.native_remaining -= amount;
        self.send_native(recipient, amount)
    }

    fn send_native(&mut self, recipient: Address, amount: U256) -> Result<()> {
        self.assets.transfer_native(self.engine, recipient, amount)?;
        let Some(receiver) = self.registry.native_receiver(&recipient) else {
            return Ok(());
        };
        receiver
            .on_receive(self.engine, amount)
            .map_err(|failure| match failure {
                CallbackFailure::Nested(err) => *err,
                other => {
                    warn!(%recipient, %amount, cause = %other, "Native receiver rejected payment");
                    OpenbarterError::EtherTransferGenericFailure { recipient, amount }
                }
            })
    }

    fn flush(&mut self) -> Result<()> {
        let Some((key, transfers)) = self.pending.take() else {
            return Ok(());
        };
        let conduits = self.conduits;
        let batch = ConduitBatch::group(transfers);
        conduits
            .require(key)?
            .execute(&mut *self.assets, self.engine, &batch)
    }

    /// Flush queued conduit transfers and refund unspent value to
    /// `refund_to`. Returns the refunded amount.
    pub fn finish(mut self, refund_to: Address) -> Result<U256> {
        self.flush()?;
        let refund = self.native_remaining;
        if !refund.is_zero() {
            self.native_remaining = U256::ZERO;
            self.send_native(refund_to, refund)?;
            debug!(%refund_to, %refund, "Refunded unspent value");
        }
        Ok(refund)
    }
}
