//! ECDSA signature encoding and signer recovery (secp256k1).
//!
//! Two encodings are accepted:
//! - 65 bytes `r ‖ s ‖ v` with `v ∈ {27, 28}`
//! - 64 bytes `r ‖ vs` (EIP-2098), where the top bit of `vs` carries the
//!   parity and the remaining 255 bits are `s`
//!
//! High-s signatures are rejected so that every signature has exactly one
//! valid encoding.

use alloy_primitives::{Address, B256, keccak256};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use openbarter_types::{OpenbarterError, OrderHash, Result};

use crate::typed_data::signing_digest;

/// Split a raw signature into `(r ‖ s, v)`.
fn split_signature(signature: &[u8]) -> Result<([u8; 64], u8)> {
    let mut rs = [0u8; 64];
    match signature.len() {
        65 => {
            let v = signature[64];
            if v != 27 && v != 28 {
                return Err(OpenbarterError::BadSignatureV { v });
            }
            rs.copy_from_slice(&signature[..64]);
            Ok((rs, v))
        }
        64 => {
            rs.copy_from_slice(signature);
            let v = 27 + (rs[32] >> 7);
            rs[32] &= 0x7f;
            Ok((rs, v))
        }
        _ => Err(OpenbarterError::InvalidSignature),
    }
}

/// EVM address of a public key: last 20 bytes of the keccak256 of the
/// uncompressed point without its prefix byte.
#[must_use]
pub fn address_of(key: &VerifyingKey) -> Address {
    let encoded = key.to_encoded_point(false);
    let hash = keccak256(&encoded.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// Recover the account that produced `signature` over `digest`.
pub fn recover_signer(digest: B256, signature: &[u8]) -> Result<Address> {
    let (rs, v) = split_signature(signature)?;
    let sig = Signature::from_slice(&rs).map_err(|_| OpenbarterError::InvalidSignature)?;
    if sig.normalize_s().is_some() {
        return Err(OpenbarterError::InvalidSignature);
    }
    let recovery_id = RecoveryId::from_byte(v - 27).ok_or(OpenbarterError::InvalidSignature)?;
    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &sig, recovery_id)
        .map_err(|_| OpenbarterError::InvalidSignature)?;
    Ok(address_of(&key))
}

/// Check that `signature` over `digest` was produced by `expected`.
pub fn verify_ecdsa(expected: Address, digest: B256, signature: &[u8]) -> Result<()> {
    let recovered = recover_signer(digest, signature)?;
    if recovered != expected {
        return Err(OpenbarterError::InvalidSigner {
            expected,
            recovered,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// OrderSigner
// ---------------------------------------------------------------------------

/// A secp256k1 key that signs orders for one offerer account.
///
/// The secret key never leaves the signer; callers get signatures only.
pub struct OrderSigner {
    key: SigningKey,
    address: Address,
}

impl std::fmt::Debug for OrderSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl OrderSigner {
    /// Load a signer from a 32-byte secret scalar.
    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self> {
        let key = SigningKey::from_bytes(secret.into())
            .map_err(|e| OpenbarterError::Configuration(format!("invalid secret key: {e}")))?;
        let address = address_of(key.verifying_key());
        Ok(Self { key, address })
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// 65-byte `r ‖ s ‖ v` signature over a prehashed digest.
    pub fn sign_digest(&self, digest: B256) -> Result<[u8; 65]> {
        let (sig, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest.as_slice())
            .map_err(|e| OpenbarterError::Internal(format!("signing failed: {e}")))?;
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&sig.to_bytes());
        out[64] = 27 + recovery_id.to_byte();
        Ok(out)
    }

    /// 64-byte EIP-2098 compact signature over a prehashed digest.
    pub fn sign_digest_compact(&self, digest: B256) -> Result<[u8; 64]> {
        let full = self.sign_digest(digest)?;
        let mut out = [0u8; 64];
        out.copy_from_slice(&full[..64]);
        if full[64] == 28 {
            out[32] |= 0x80;
        }
        Ok(out)
    }

    /// Sign an order hash under an engine's domain separator.
    pub fn sign_order(&self, domain_separator: B256, order_hash: OrderHash) -> Result<Vec<u8>> {
        Ok(self
            .sign_digest(signing_digest(domain_separator, order_hash))?
            .to_vec())
    }

    /// Compact variant of [`Self::sign_order`].
    pub fn sign_order_compact(
        &self,
        domain_separator: B256,
        order_hash: OrderHash,
    ) -> Result<Vec<u8>> {
        Ok(self
            .sign_digest_compact(signing_digest(domain_separator, order_hash))?
            .to_vec())
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl OrderSigner {
    /// Deterministic signer derived from a seed. The same seed always yields
    /// the same account.
    pub fn from_seed(seed: u64) -> Self {
        let mut counter = 0u64;
        loop {
            let mut material = seed.to_be_bytes().to_vec();
            material.extend_from_slice(&counter.to_be_bytes());
            if let Ok(signer) = Self::from_bytes(&keccak256(&material).0) {
                return signer;
            }
            counter += 1;
        }
    }
}
