//! Identifiers used throughout OpenBarter.
//!
//! Orders are identified by their typed-data hash; transfer proxies by a
//! 32-byte conduit key whose leading 20 bytes name the conduit's creator.

use std::fmt;

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// OrderHash
// ---------------------------------------------------------------------------

/// Typed-data hash of an order's signed components. Keys the status ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OrderHash(pub B256);

impl OrderHash {
    #[must_use]
    pub fn as_b256(&self) -> &B256 {
        &self.0
    }

    /// First four bytes, hex-encoded. Used in log lines.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl From<B256> for OrderHash {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl fmt::Display for OrderHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "order:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// ConduitKey
// ---------------------------------------------------------------------------

/// Selects the transfer path for an order or a fulfiller.
///
/// The zero key means "no conduit": the engine itself acts as spender.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct ConduitKey(pub B256);

impl ConduitKey {
    /// The direct (engine-as-spender) path.
    pub const NONE: Self = Self(B256::ZERO);

    /// Build a key from its creator and a 12-byte discriminator.
    #[must_use]
    pub fn new(creator: Address, discriminator: [u8; 12]) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..20].copy_from_slice(creator.as_slice());
        bytes[20..].copy_from_slice(&discriminator);
        Self(B256::from(bytes))
    }

    #[must_use]
    pub fn is_direct(&self) -> bool {
        self.0 == B256::ZERO
    }

    /// The account encoded in the leading 20 bytes.
    #[must_use]
    pub fn creator(&self) -> Address {
        Address::from_slice(&self.0[..20])
    }
}

impl fmt::Display for ConduitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_direct() {
            write!(f, "conduit:none")
        } else {
            write!(f, "conduit:{}", hex::encode(&self.0[..8]))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
