//! Conduits: channel-permissioned transfer proxies.
//!
//! An asset owner approves a conduit instead of the engine. The conduit
//! only executes transfers for callers whose channel is open, and it never
//! handles native currency.

use std::collections::{BTreeMap, HashMap, HashSet};

use alloy_primitives::{Address, B256, Keccak256, keccak256};
use openbarter_types::{ConduitKey, ItemType, OpenbarterError, Result};
use tracing::{debug, info};

use crate::assets::{
    AssetBackend, Erc1155BatchTransfer, TokenTransfer, perform_batch_transfer, perform_transfer,
};

/// Transfers for one conduit call: single transfers in order, then ERC1155
/// batches grouped by `(token, from, to)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConduitBatch {
    pub transfers: Vec<TokenTransfer>,
    pub batch_transfers: Vec<Erc1155BatchTransfer>,
}

impl ConduitBatch {
    /// Group transfers, folding ERC1155 moves that share token, sender and
    /// recipient into one batch. Lone ERC1155 moves stay single transfers.
    #[must_use]
    pub fn group(transfers: Vec<TokenTransfer>) -> Self {
        let mut groups: BTreeMap<(Address, Address, Address), Vec<usize>> = BTreeMap::new();
        for (index, transfer) in transfers.iter().enumerate() {
            if transfer.item_type == ItemType::Erc1155 {
                groups
                    .entry((transfer.token, transfer.from, transfer.to))
                    .or_default()
                    .push(index);
            }
        }
        let batched: HashSet<usize> = groups
            .values()
            .filter(|indices| indices.len() > 1)
            .flatten()
            .copied()
            .collect();
        let batch_transfers = groups
            .into_iter()
            .filter(|(_, indices)| indices.len() > 1)
            .map(|((token, from, to), indices)| Erc1155BatchTransfer {
                token,
                from,
                to,
                identifiers: indices.iter().map(|&i| transfers[i].identifier).collect(),
                amounts: indices.iter().map(|&i| transfers[i].amount).collect(),
            })
            .collect();
        let transfers = transfers
            .into_iter()
            .enumerate()
            .filter(|(index, _)| !batched.contains(index))
            .map(|(_, transfer)| transfer)
            .collect();
        Self {
            transfers,
            batch_transfers,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty() && self.batch_transfers.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conduit {
    address: Address,
    key: ConduitKey,
    channels: HashSet<Address>,
}

impl Conduit {
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    #[must_use]
    pub fn key(&self) -> ConduitKey {
        self.key
    }

    #[must_use]
    pub fn is_open(&self, channel: &Address) -> bool {
        self.channels.contains(channel)
    }

    /// Execute a batch on behalf of `caller`. The conduit is the operator of
    /// every token call.
    pub fn execute<A: AssetBackend>(
        &self,
        assets: &mut A,
        caller: Address,
        batch: &ConduitBatch,
    ) -> Result<()> {
        if !self.is_open(&caller) {
            return Err(OpenbarterError::ChannelClosed {
                conduit: self.address,
                channel: caller,
            });
        }
        for transfer in &batch.transfers {
            perform_transfer(assets, self.address, transfer)?;
        }
        for batch_transfer in &batch.batch_transfers {
            perform_batch_transfer(assets, self.address, batch_transfer)?;
        }
        debug!(
            conduit = %self.address,
            transfers = batch.transfers.len(),
            batches = batch.batch_transfers.len(),
            "Conduit executed"
        );
        Ok(())
    }
}

/// Creates conduits and tracks their channels.
#[derive(Debug, Clone)]
pub struct ConduitController {
    address: Address,
    code_hash: B256,
    conduits: HashMap<ConduitKey, Conduit>,
    by_address: HashMap<Address, ConduitKey>,
}

impl ConduitController {
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self {
            address,
            code_hash: keccak256(b"openbarter:conduit"),
            conduits: HashMap::new(),
            by_address: HashMap::new(),
        }
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Deterministic address of the conduit for `key`, deployed or not.
    #[must_use]
    pub fn conduit_address(&self, key: ConduitKey) -> Address {
        let mut hasher = Keccak256::new();
        hasher.update([0xff]);
        hasher.update(self.address);
        hasher.update(key.0);
        hasher.update(self.code_hash);
        Address::from_slice(&hasher.finalize()[12..])
    }

    /// Create the conduit for `key`. Idempotent.
    pub fn create_conduit(&mut self, key: ConduitKey) -> Address {
        let address = self.conduit_address(key);
        if !self.conduits.contains_key(&key) {
            self.conduits.insert(
                key,
                Conduit {
                    address,
                    key,
                    channels: HashSet::new(),
                },
            );
            self.by_address.insert(address, key);
            info!(conduit = %address, key = %key, "Conduit created");
        }
        address
    }

    /// Open or close `channel` on a conduit.
    pub fn update_channel(&mut self, conduit: Address, channel: Address, open: bool) -> Result<()> {
        let conduit = self
            .by_address
            .get(&conduit)
            .and_then(|key| self.conduits.get_mut(key))
            .ok_or(OpenbarterError::NoContract(conduit))?;
        if open {
            conduit.channels.insert(channel);
        } else {
            conduit.channels.remove(&channel);
        }
        debug!(conduit = %conduit.address, %channel, open, "Channel updated");
        Ok(())
    }

    #[must_use]
    pub fn conduit(&self, key: &ConduitKey) -> Option<&Conduit> {
        self.conduits.get(key)
    }

    /// The conduit for `key`, or `InvalidConduit` if none was created.
    pub fn require(&self, key: ConduitKey) -> Result<&Conduit> {
        self.conduits
            .get(&key)
            .ok_or_else(|| OpenbarterError::InvalidConduit {
                conduit_key: key,
                conduit: self.conduit_address(key),
            })
    }

    #[must_use]
    pub fn channel_status(&self, conduit: &Address, channel: &Address) -> bool {
        self.by_address
            .get(conduit)
            .and_then(|key| self.conduits.get(key))
            .is_some_and(|c| c.is_open(channel))
    }
}
