//! # openbarter-ingress
//!
//! **Security Envelope Plane**: everything that decides whether an order may
//! settle, and records that it did.
//!
//! ## Architecture
//!
//! 1. **OrderLedger**: status per order hash, nonce per offerer
//! 2. **CallbackRegistry**: contract signers, zones and native receivers
//! 3. **SignatureVerifier**: ECDSA or contract-signer approval of an order hash
//! 4. **Zone check**: restricted orders need their zone's approval
//! 5. **Validator**: time, fraction, zone, status and signature, then fill
//! 6. **Batch**: validated orders resolved to concrete amounts for MatchCore
//!
//! ## Order Flow
//!
//! ```text
//! AdvancedOrder → validate_order_and_update_status() → apply criteria
//!     → resolve amounts → ResolvedOrder → MatchCore fulfillments
//! ```
//!
//! Ledger writes happen here and nowhere else.

pub mod batch;
pub mod ledger;
pub mod registry;
pub mod validator;
pub mod verifier;
pub mod zone;

pub use batch::prepare_batch;
pub use ledger::OrderLedger;
pub use registry::CallbackRegistry;
pub use validator::{
    ValidatedOrder, ValidationContext, cancel_orders, validate_basic_order_and_update_status,
    validate_order_and_update_status, validate_orders,
};
pub use verifier::SignatureVerifier;
pub use zone::assert_restricted_order_validity;
