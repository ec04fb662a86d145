//! Asset backend: the token contracts and native balances settlement moves.
//!
//! Token contracts are external collaborators. The engine only sees the raw
//! outcome of each call ([`TokenCallOutcome`] or a [`CallbackFailure`]) and
//! turns every non-standard behaviour into a named transfer error here, in
//! one place, for both the direct path and conduits.

use alloy_primitives::{Address, U256};
use openbarter_types::{CallbackFailure, ItemType, OpenbarterError, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// How a token call that did not revert returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCallOutcome {
    ReturnedTrue,
    ReturnedFalse,
    /// The call succeeded but returned no data.
    ReturnedNothing,
}

/// Raw result of a token call.
pub type TokenCallResult = std::result::Result<TokenCallOutcome, CallbackFailure>;

/// One single-asset token movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransfer {
    pub item_type: ItemType,
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub identifier: U256,
    pub amount: U256,
}

/// Several ERC1155 ids moved between the same two accounts in one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Erc1155BatchTransfer {
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub identifiers: Vec<U256>,
    pub amounts: Vec<U256>,
}

/// Balances, approvals and token contract behaviour.
///
/// `operator` is the account calling the token: the engine on the direct
/// path, the conduit otherwise. Implementations enforce approvals for it.
pub trait AssetBackend: Clone + Send {
    /// Whether a token contract is deployed at `account`. Calls to an
    /// account without code are refused before they are made.
    fn has_code(&self, account: &Address) -> bool;

    fn native_balance(&self, account: &Address) -> U256;

    /// Move native currency. Fails with `InsufficientNativeBalance`.
    fn transfer_native(&mut self, from: Address, to: Address, amount: U256) -> Result<()>;

    /// `transferFrom` / `safeTransferFrom` on an ERC20, ERC721 or ERC1155.
    fn transfer_token(&mut self, operator: Address, transfer: &TokenTransfer) -> TokenCallResult;

    /// `safeBatchTransferFrom` on an ERC1155.
    fn batch_transfer_erc1155(
        &mut self,
        operator: Address,
        batch: &Erc1155BatchTransfer,
    ) -> TokenCallResult;
}

/// Perform one token transfer and map its outcome to an engine error.
pub fn perform_transfer<A: AssetBackend>(
    assets: &mut A,
    operator: Address,
    transfer: &TokenTransfer,
) -> Result<()> {
    match transfer.item_type {
        ItemType::Erc20 | ItemType::Erc1155 => {}
        ItemType::Erc721 => {
            if transfer.amount != U256::from(1u8) {
                return Err(OpenbarterError::InvalidErc721TransferAmount {
                    amount: transfer.amount,
                });
            }
        }
        ItemType::Native | ItemType::Erc721WithCriteria | ItemType::Erc1155WithCriteria => {
            return Err(OpenbarterError::InvalidItemType);
        }
    }

    if !assets.has_code(&transfer.token) {
        return Err(OpenbarterError::NoContract(transfer.token));
    }
    let outcome = assets
        .transfer_token(operator, transfer)
        .map_err(|failure| transfer_failure(transfer, failure))?;

    if transfer.item_type == ItemType::Erc20 && outcome != TokenCallOutcome::ReturnedTrue {
        warn!(token = %transfer.token, ?outcome, "ERC20 transfer did not return true");
        return Err(OpenbarterError::BadReturnValueFromErc20OnTransfer {
            token: transfer.token,
            from: transfer.from,
            to: transfer.to,
            amount: transfer.amount,
        });
    }
    Ok(())
}

/// Perform one ERC1155 batch transfer.
pub fn perform_batch_transfer<A: AssetBackend>(
    assets: &mut A,
    operator: Address,
    batch: &Erc1155BatchTransfer,
) -> Result<()> {
    if !assets.has_code(&batch.token) {
        return Err(OpenbarterError::NoContract(batch.token));
    }
    assets
        .batch_transfer_erc1155(operator, batch)
        .map(|_| ())
        .map_err(|failure| match failure {
            CallbackFailure::NoCode => OpenbarterError::NoContract(batch.token),
            CallbackFailure::Reverted(reason) => OpenbarterError::TokenTransferReverted {
                token: batch.token,
                reason,
            },
            CallbackFailure::Nested(err) => *err,
            CallbackFailure::RevertedWithoutData | CallbackFailure::InvalidMagicValue(_) => {
                OpenbarterError::TokenTransferGenericFailure {
                    token: batch.token,
                    from: batch.from,
                    to: batch.to,
                    identifier: batch.identifiers.first().copied().unwrap_or_default(),
                    amount: batch.amounts.first().copied().unwrap_or_default(),
                }
            }
        })
}

fn transfer_failure(transfer: &TokenTransfer, failure: CallbackFailure) -> OpenbarterError {
    match failure {
        CallbackFailure::NoCode => OpenbarterError::NoContract(transfer.token),
        CallbackFailure::Reverted(reason) => OpenbarterError::TokenTransferReverted {
            token: transfer.token,
            reason,
        },
        CallbackFailure::Nested(err) => *err,
        CallbackFailure::RevertedWithoutData | CallbackFailure::InvalidMagicValue(_) => {
            OpenbarterError::TokenTransferGenericFailure {
                token: transfer.token,
                from: transfer.from,
                to: transfer.to,
                identifier: transfer.identifier,
                amount: transfer.amount,
            }
        }
    }
}
