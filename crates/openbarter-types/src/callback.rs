//! External callbacks the engine consults during settlement.
//!
//! Contract offerers, zones and native-payment recipients are external code.
//! They are injected as trait objects and answer with a magic value or a
//! [`CallbackFailure`] that says exactly how they failed.

use alloy_primitives::{Address, B256, U256};
use thiserror::Error;

use crate::{CriteriaResolver, OpenbarterError, OrderHash, OrderParameters};

/// How an external callback failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackFailure {
    /// The callback reverted with a reason string.
    #[error("reverted: {0}")]
    Reverted(String),

    /// The callback reverted without data.
    #[error("reverted without data")]
    RevertedWithoutData,

    /// The callback returned, but not the expected magic value.
    #[error("returned invalid magic value 0x{}", hex::encode(.0))]
    InvalidMagicValue([u8; 4]),

    /// Nothing is registered at the callback address.
    #[error("no code at callback target")]
    NoCode,

    /// The callback made a nested engine call that failed. The nested error
    /// is surfaced as-is.
    #[error("nested call failed: {0}")]
    Nested(Box<OpenbarterError>),
}

/// Outcome of a magic-value callback.
pub type CallbackResult = std::result::Result<[u8; 4], CallbackFailure>;

/// Signature verification for contract offerers (EIP-1271 style).
///
/// Must return [`crate::constants::EIP1271_MAGIC_VALUE`] to accept.
pub trait ContractSigner: Send + Sync {
    fn is_valid_signature(&self, digest: B256, signature: &[u8]) -> CallbackResult;
}

/// What a zone sees when asked to approve a restricted order.
#[derive(Debug, Clone, Copy)]
pub struct ZoneContext<'a> {
    pub order_hash: OrderHash,
    /// The account that called the settlement entry point.
    pub caller: Address,
    pub parameters: &'a OrderParameters,
    pub extra_data: &'a [u8],
    /// Hashes of the orders before this one in the same batch.
    pub prior_order_hashes: &'a [OrderHash],
    pub criteria_resolvers: &'a [CriteriaResolver],
}

/// Gatekeeper for restricted orders.
///
/// Must return [`crate::constants::ZONE_MAGIC_VALUE`] to approve.
pub trait Zone: Send + Sync {
    fn is_valid_order(&self, context: &ZoneContext<'_>) -> CallbackResult;
}

/// Code that runs when a recipient receives native value.
pub trait NativeReceiver: Send + Sync {
    fn on_receive(&self, from: Address, amount: U256) -> std::result::Result<(), CallbackFailure>;
}

/// Checks a callback answer against the expected magic value.
pub fn expect_magic(result: CallbackResult, magic: [u8; 4]) -> std::result::Result<(), CallbackFailure> {
    match result {
        Ok(value) if value == magic => Ok(()),
        Ok(value) => Err(CallbackFailure::InvalidMagicValue(value)),
        Err(failure) => Err(failure),
    }
}
