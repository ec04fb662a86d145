//! # openbarter-matchcore
//!
//! **Pure settlement computation for OpenBarter.**
//!
//! MatchCore is the compute plane. Given signed orders and a settlement plan
//! it derives everything the transfer layer needs, and nothing else:
//!
//! - **Typed-data identity**: order hashes, domain separators, signing digests
//! - **Signatures**: secp256k1 recovery for full and compact encodings, and
//!   an [`OrderSigner`] for producing them
//! - **Fractions**: exact fill accounting with 120-bit bounded terms
//! - **Amounts**: fraction application and time-based linear interpolation
//! - **Criteria**: merkle membership proofs and resolver application
//! - **Fulfillments**: aggregation of component groups into executions
//!
//! No ledger writes, no transfers, no callbacks: the same inputs always give
//! the same outputs.

pub mod amount;
pub mod criteria;
pub mod fraction;
pub mod fulfillment;
pub mod signature;
pub mod typed_data;

pub use amount::{Rounding, apply_fraction, check_validity_window, resolve_amounts};
pub use criteria::{apply_criteria_resolvers, build_criteria_tree, verify_criteria_proof};
pub use fraction::{FillUpdate, check_fill_request, compute_fill};
pub use fulfillment::{
    FulfillmentMatcher, ResolvedOrder, aggregate_available_fulfillments, match_fulfillments,
};
pub use signature::{OrderSigner, recover_signer, verify_ecdsa};
pub use typed_data::{
    TypedDataDomain, derive_order_hash, hash_order_components, signing_digest,
};
