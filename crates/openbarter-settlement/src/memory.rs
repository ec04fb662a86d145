//! In-memory asset backend.
//!
//! Holds native balances and the state of every ERC20, ERC721 and ERC1155
//! token the engine can touch, with per-token switches for the misbehaving
//! contracts seen in the wild. Lets the engine run without a chain.

use std::collections::{HashMap, HashSet};

use alloy_primitives::{Address, U256};
use openbarter_types::{CallbackFailure, ItemType, OpenbarterError, Result};

use crate::assets::{
    AssetBackend, Erc1155BatchTransfer, TokenCallOutcome, TokenCallResult, TokenTransfer,
};

/// How a token contract deviates from the standard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TokenQuirk {
    #[default]
    Standard,
    /// Returns `false` and moves nothing.
    ReturnsFalse,
    /// Moves the tokens but returns no data.
    ReturnsNothing,
    RevertsWithoutData,
    Reverts(String),
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryAssets {
    code: HashSet<Address>,
    native: HashMap<Address, U256>,
    /// (token, owner)
    erc20_balances: HashMap<(Address, Address), U256>,
    /// (token, owner, spender)
    erc20_allowances: HashMap<(Address, Address, Address), U256>,
    /// (token, id) -> owner
    erc721_owners: HashMap<(Address, U256), Address>,
    /// (token, id, owner)
    erc1155_balances: HashMap<(Address, U256, Address), U256>,
    /// (token, owner, operator) for ERC721 and ERC1155
    operators: HashSet<(Address, Address, Address)>,
    quirks: HashMap<Address, TokenQuirk>,
}

impl InMemoryAssets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an account as having deployed code.
    pub fn deploy(&mut self, account: Address) {
        self.code.insert(account);
    }

    pub fn set_quirk(&mut self, token: Address, quirk: TokenQuirk) {
        self.code.insert(token);
        self.quirks.insert(token, quirk);
    }

    pub fn deal_native(&mut self, account: Address, amount: U256) {
        *self.native.entry(account).or_default() += amount;
    }

    pub fn mint_erc20(&mut self, token: Address, to: Address, amount: U256) {
        self.code.insert(token);
        *self.erc20_balances.entry((token, to)).or_default() += amount;
    }

    pub fn approve_erc20(&mut self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.erc20_allowances.insert((token, owner, spender), amount);
    }

    pub fn mint_erc721(&mut self, token: Address, to: Address, identifier: U256) {
        self.code.insert(token);
        self.erc721_owners.insert((token, identifier), to);
    }

    pub fn mint_erc1155(&mut self, token: Address, to: Address, identifier: U256, amount: U256) {
        self.code.insert(token);
        *self
            .erc1155_balances
            .entry((token, identifier, to))
            .or_default() += amount;
    }

    /// `setApprovalForAll` on an ERC721 or ERC1155.
    pub fn set_approval_for_all(
        &mut self,
        token: Address,
        owner: Address,
        operator: Address,
        approved: bool,
    ) {
        if approved {
            self.operators.insert((token, owner, operator));
        } else {
            self.operators.remove(&(token, owner, operator));
        }
    }

    #[must_use]
    pub fn erc20_balance(&self, token: Address, owner: Address) -> U256 {
        self.erc20_balances
            .get(&(token, owner))
            .copied()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn erc20_allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.erc20_allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn erc721_owner(&self, token: Address, identifier: U256) -> Option<Address> {
        self.erc721_owners.get(&(token, identifier)).copied()
    }

    #[must_use]
    pub fn erc1155_balance(&self, token: Address, identifier: U256, owner: Address) -> U256 {
        self.erc1155_balances
            .get(&(token, identifier, owner))
            .copied()
            .unwrap_or_default()
    }

    fn is_operator(&self, token: Address, owner: Address, operator: Address) -> bool {
        owner == operator || self.operators.contains(&(token, owner, operator))
    }

    /// Contract presence and the deliberate failure quirks, checked before
    /// any state changes.
    fn precheck(&self, token: Address) -> std::result::Result<&TokenQuirk, CallbackFailure> {
        if !self.code.contains(&token) {
            return Err(CallbackFailure::NoCode);
        }
        let quirk = self.quirks.get(&token).unwrap_or(&TokenQuirk::Standard);
        match quirk {
            TokenQuirk::RevertsWithoutData => Err(CallbackFailure::RevertedWithoutData),
            TokenQuirk::Reverts(reason) => Err(CallbackFailure::Reverted(reason.clone())),
            other => Ok(other),
        }
    }

    fn move_erc20(
        &mut self,
        operator: Address,
        transfer: &TokenTransfer,
    ) -> std::result::Result<(), CallbackFailure> {
        let TokenTransfer {
            token,
            from,
            to,
            amount,
            ..
        } = *transfer;
        let allowance = self.erc20_allowance(token, from, operator);
        if operator != from && allowance < amount {
            return Err(CallbackFailure::Reverted(
                "ERC20: insufficient allowance".into(),
            ));
        }
        let balance = self.erc20_balance(token, from);
        if balance < amount {
            return Err(CallbackFailure::Reverted(
                "ERC20: transfer amount exceeds balance".into(),
            ));
        }
        if operator != from && allowance != U256::MAX {
            self.erc20_allowances
                .insert((token, from, operator), allowance - amount);
        }
        self.erc20_balances.insert((token, from), balance - amount);
        *self.erc20_balances.entry((token, to)).or_default() += amount;
        Ok(())
    }

    fn move_erc721(
        &mut self,
        operator: Address,
        transfer: &TokenTransfer,
    ) -> std::result::Result<(), CallbackFailure> {
        let key = (transfer.token, transfer.identifier);
        if self.erc721_owners.get(&key) != Some(&transfer.from) {
            return Err(CallbackFailure::Reverted(
                "ERC721: transfer from incorrect owner".into(),
            ));
        }
        if !self.is_operator(transfer.token, transfer.from, operator) {
            return Err(CallbackFailure::Reverted(
                "ERC721: caller is not token owner or approved".into(),
            ));
        }
        self.erc721_owners.insert(key, transfer.to);
        Ok(())
    }

    fn move_erc1155(
        &mut self,
        operator: Address,
        token: Address,
        from: Address,
        to: Address,
        moves: &[(U256, U256)],
    ) -> std::result::Result<(), CallbackFailure> {
        if !self.is_operator(token, from, operator) {
            return Err(CallbackFailure::Reverted(
                "ERC1155: caller is not token owner or approved".into(),
            ));
        }
        let mut next = self.erc1155_balances.clone();
        for &(identifier, amount) in moves {
            let balance = next.get(&(token, identifier, from)).copied().unwrap_or_default();
            if balance < amount {
                return Err(CallbackFailure::Reverted(
                    "ERC1155: insufficient balance for transfer".into(),
                ));
            }
            next.insert((token, identifier, from), balance - amount);
            *next.entry((token, identifier, to)).or_default() += amount;
        }
        self.erc1155_balances = next;
        Ok(())
    }
}

impl AssetBackend for InMemoryAssets {
    fn has_code(&self, account: &Address) -> bool {
        self.code.contains(account)
    }

    fn native_balance(&self, account: &Address) -> U256 {
        self.native.get(account).copied().unwrap_or_default()
    }

    fn transfer_native(&mut self, from: Address, to: Address, amount: U256) -> Result<()> {
        let available = self.native_balance(&from);
        if available < amount {
            return Err(OpenbarterError::InsufficientNativeBalance {
                account: from,
                needed: amount,
                available,
            });
        }
        self.native.insert(from, available - amount);
        *self.native.entry(to).or_default() += amount;
        Ok(())
    }

    fn transfer_token(&mut self, operator: Address, transfer: &TokenTransfer) -> TokenCallResult {
        let quirk = self.precheck(transfer.token)?.clone();
        if quirk == TokenQuirk::ReturnsFalse {
            return Ok(TokenCallOutcome::ReturnedFalse);
        }
        match transfer.item_type {
            ItemType::Erc20 => self.move_erc20(operator, transfer)?,
            ItemType::Erc721 => self.move_erc721(operator, transfer)?,
            ItemType::Erc1155 => self.move_erc1155(
                operator,
                transfer.token,
                transfer.from,
                transfer.to,
                &[(transfer.identifier, transfer.amount)],
            )?,
            _ => return Err(CallbackFailure::RevertedWithoutData),
        }
        Ok(if quirk == TokenQuirk::ReturnsNothing {
            TokenCallOutcome::ReturnedNothing
        } else {
            TokenCallOutcome::ReturnedTrue
        })
    }

    fn batch_transfer_erc1155(
        &mut self,
        operator: Address,
        batch: &Erc1155BatchTransfer,
    ) -> TokenCallResult {
        self.precheck(batch.token)?;
        if batch.identifiers.len() != batch.amounts.len() {
            return Err(CallbackFailure::Reverted(
                "ERC1155: ids and amounts length mismatch".into(),
            ));
        }
        let moves: Vec<(U256, U256)> = batch
            .identifiers
            .iter()
            .copied()
            .zip(batch.amounts.iter().copied())
            .collect();
        self.move_erc1155(operator, batch.token, batch.from, batch.to, &moves)?;
        Ok(TokenCallOutcome::ReturnedNothing)
    }
}
