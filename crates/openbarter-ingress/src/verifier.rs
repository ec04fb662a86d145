//! Offerer signature verification.

use alloy_primitives::{Address, B256};
use openbarter_matchcore::{TypedDataDomain, signing_digest, verify_ecdsa};
use openbarter_types::{OpenbarterError, OrderHash, Result, constants, expect_magic};
use tracing::warn;

use crate::CallbackRegistry;

/// Verifies that an offerer signed an order hash under one engine's domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureVerifier {
    domain_separator: B256,
}

impl SignatureVerifier {
    #[must_use]
    pub fn new(domain: &TypedDataDomain) -> Self {
        Self {
            domain_separator: domain.separator(),
        }
    }

    #[must_use]
    pub fn domain_separator(&self) -> B256 {
        self.domain_separator
    }

    /// Contract offerers answer through their registered signer callback;
    /// every other offerer must have produced an ECDSA signature.
    pub fn verify(
        &self,
        registry: &CallbackRegistry,
        offerer: Address,
        order_hash: OrderHash,
        signature: &[u8],
    ) -> Result<()> {
        let digest = signing_digest(self.domain_separator, order_hash);
        if let Some(signer) = registry.contract_signer(&offerer) {
            return expect_magic(
                signer.is_valid_signature(digest, signature),
                constants::EIP1271_MAGIC_VALUE,
            )
            .map_err(|cause| {
                warn!(offerer = %offerer, order = %order_hash, cause = %cause, "Contract signer rejected order");
                OpenbarterError::BadContractSignature {
                    signer: offerer,
                    cause,
                }
            });
        }
        verify_ecdsa(offerer, digest, signature)
    }
}
