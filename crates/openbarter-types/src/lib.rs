//! # openbarter-types
//!
//! Shared types, errors, and configuration for the **OpenBarter** settlement
//! engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`OrderHash`], [`ConduitKey`]
//! - **Items**: [`ItemType`], [`OfferItem`], [`ConsiderationItem`], [`SpentItem`], [`ReceivedItem`]
//! - **Order model**: [`OrderParameters`], [`OrderComponents`], [`Order`], [`AdvancedOrder`], [`OrderStatus`], [`BasicOrderParameters`]
//! - **Settlement plans**: [`CriteriaResolver`], [`Fulfillment`], [`FulfillmentComponent`], [`Execution`]
//! - **External callbacks**: [`ContractSigner`], [`Zone`], [`NativeReceiver`], [`CallbackFailure`]
//! - **Events**: [`SettlementEvent`]
//! - **Configuration**: [`EngineConfig`]
//! - **Time**: [`Clock`], [`SystemClock`], [`FixedClock`]
//! - **Errors**: [`OpenbarterError`] with `OB_ERR_` prefix codes
//! - **Constants**: magic values, fraction bounds, typed-data type strings

pub mod callback;
pub mod clock;
pub mod config;
pub mod constants;
pub mod criteria;
pub mod error;
pub mod event;
pub mod fulfillment;
pub mod ids;
pub mod item;
pub mod order;

// Re-export all primary types at crate root for ergonomic imports:
//   use openbarter_types::{AdvancedOrder, ItemType, OrderHash, ...};

pub use callback::*;
pub use clock::*;
pub use config::*;
pub use criteria::*;
pub use error::*;
pub use event::*;
pub use fulfillment::*;
pub use ids::*;
pub use item::*;
pub use order::*;

// Constants are accessed via `openbarter_types::constants::FOO`
// (not re-exported to avoid name collisions).

// Amounts, identifiers and accounts are alloy primitives throughout.
pub use alloy_primitives::{Address, B256, U256};
