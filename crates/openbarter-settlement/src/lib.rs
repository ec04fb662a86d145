//! # openbarter-settlement
//!
//! **Finality Plane**: moves assets for validated, matched orders.
//!
//! ## Architecture
//!
//! [`SettlementEngine`] exposes every entry point and:
//! 1. Holds the reentrancy latch for the whole call
//! 2. Validates orders and records fills through the ingress ledger
//! 3. Resolves amounts and fulfillments through MatchCore
//! 4. Routes each execution directly or through a conduit
//! 5. Refunds unspent native value and commits state and events atomically
//!
//! ## Transfer paths
//!
//! - **Direct**: the engine is the token operator
//! - **Conduit**: a channel-permissioned proxy is the operator; consecutive
//!   transfers through one conduit are sent as one batch
//! - **Native**: paid by the engine out of the value supplied with the call

pub mod assets;
pub mod basic;
pub mod conduit;
pub mod engine;
pub mod memory;
pub mod reentrancy;
pub mod router;

pub use assets::{AssetBackend, Erc1155BatchTransfer, TokenCallOutcome, TokenTransfer};
pub use conduit::{Conduit, ConduitBatch, ConduitController};
pub use engine::{
    AvailableFulfillment, CallContext, EngineInformation, SettlementEngine,
    SettlementEngineBuilder,
};
pub use memory::{InMemoryAssets, TokenQuirk};
pub use reentrancy::ReentrancyLatch;
pub use router::TransferRouter;
