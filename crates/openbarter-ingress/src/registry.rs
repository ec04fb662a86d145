//! Registry of external callback code, keyed by account.
//!
//! An account with a registered [`ContractSigner`] is a contract offerer and
//! is verified through its callback instead of ECDSA recovery. Zones and
//! native receivers are looked up the same way.

use std::{collections::HashMap, sync::Arc};

use alloy_primitives::Address;
use openbarter_types::{ContractSigner, NativeReceiver, Zone};

#[derive(Clone, Default)]
pub struct CallbackRegistry {
    signers: HashMap<Address, Arc<dyn ContractSigner>>,
    zones: HashMap<Address, Arc<dyn Zone>>,
    receivers: HashMap<Address, Arc<dyn NativeReceiver>>,
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("signers", &self.signers.keys().collect::<Vec<_>>())
            .field("zones", &self.zones.keys().collect::<Vec<_>>())
            .field("receivers", &self.receivers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CallbackRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_contract_signer(&mut self, account: Address, signer: Arc<dyn ContractSigner>) {
        self.signers.insert(account, signer);
    }

    pub fn register_zone(&mut self, account: Address, zone: Arc<dyn Zone>) {
        self.zones.insert(account, zone);
    }

    pub fn register_native_receiver(&mut self, account: Address, receiver: Arc<dyn NativeReceiver>) {
        self.receivers.insert(account, receiver);
    }

    #[must_use]
    pub fn contract_signer(&self, account: &Address) -> Option<&Arc<dyn ContractSigner>> {
        self.signers.get(account)
    }

    #[must_use]
    pub fn zone(&self, account: &Address) -> Option<&Arc<dyn Zone>> {
        self.zones.get(account)
    }

    #[must_use]
    pub fn native_receiver(&self, account: &Address) -> Option<&Arc<dyn NativeReceiver>> {
        self.receivers.get(account)
    }
}
