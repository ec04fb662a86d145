//! Order types for the OpenBarter settlement engine.
//!
//! An order is a signed intent: the offerer gives up the `offer` items in
//! exchange for every `consideration` item reaching its recipient. Orders
//! are never held in custody; they are validated and settled on demand.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::{ConduitKey, ConsiderationItem, ItemType, OfferItem, OpenbarterError, Result};

/// Fill and restriction policy. Discriminants match the signed wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderType {
    /// Full fills only, anyone may fulfill.
    FullOpen = 0,
    /// Partial fills allowed, anyone may fulfill.
    PartialOpen = 1,
    /// Full fills only, the zone must approve.
    FullRestricted = 2,
    /// Partial fills allowed, the zone must approve.
    PartialRestricted = 3,
}

impl OrderType {
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn allows_partial_fills(self) -> bool {
        matches!(self, Self::PartialOpen | Self::PartialRestricted)
    }

    #[must_use]
    pub fn is_restricted(self) -> bool {
        matches!(self, Self::FullRestricted | Self::PartialRestricted)
    }
}

impl TryFrom<u8> for OrderType {
    type Error = OpenbarterError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::FullOpen),
            1 => Ok(Self::PartialOpen),
            2 => Ok(Self::FullRestricted),
            3 => Ok(Self::PartialRestricted),
            other => Err(OpenbarterError::UnknownOrderType(other)),
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FullOpen => write!(f, "FULL_OPEN"),
            Self::PartialOpen => write!(f, "PARTIAL_OPEN"),
            Self::FullRestricted => write!(f, "FULL_RESTRICTED"),
            Self::PartialRestricted => write!(f, "PARTIAL_RESTRICTED"),
        }
    }
}

/// Which side of an order an item slot lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Offer,
    Consideration,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Offer => write!(f, "OFFER"),
            Self::Consideration => write!(f, "CONSIDERATION"),
        }
    }
}

/// The terms of an order as submitted for settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderParameters {
    pub offerer: Address,
    /// Gatekeeper for restricted orders; may also cancel the order.
    pub zone: Address,
    pub offer: Vec<OfferItem>,
    pub consideration: Vec<ConsiderationItem>,
    pub order_type: OrderType,
    pub start_time: u64,
    pub end_time: u64,
    pub zone_hash: B256,
    pub salt: U256,
    pub conduit_key: ConduitKey,
    /// Consideration items covered by the signature. Items appended after
    /// this count are tips and are not hashed.
    pub total_original_consideration_items: usize,
}

impl OrderParameters {
    /// The signed form of these terms under the given offerer nonce.
    #[must_use]
    pub fn to_components(&self, nonce: U256) -> OrderComponents {
        OrderComponents {
            offerer: self.offerer,
            zone: self.zone,
            offer: self.offer.clone(),
            consideration: self.consideration.clone(),
            order_type: self.order_type,
            start_time: self.start_time,
            end_time: self.end_time,
            zone_hash: self.zone_hash,
            salt: self.salt,
            conduit_key: self.conduit_key,
            nonce,
        }
    }

    /// Consideration items covered by the signature.
    #[must_use]
    pub fn original_consideration(&self) -> &[ConsiderationItem] {
        let len = self
            .total_original_consideration_items
            .min(self.consideration.len());
        &self.consideration[..len]
    }

    /// Whether any offer or consideration slot still awaits a criteria resolver.
    #[must_use]
    pub fn has_criteria_items(&self) -> bool {
        self.offer.iter().any(|i| i.item_type.is_criteria())
            || self
                .consideration
                .iter()
                .any(|i| i.item_type.is_criteria())
    }
}

/// The exact structure an offerer signs. Also the input to `cancel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderComponents {
    pub offerer: Address,
    pub zone: Address,
    pub offer: Vec<OfferItem>,
    pub consideration: Vec<ConsiderationItem>,
    pub order_type: OrderType,
    pub start_time: u64,
    pub end_time: u64,
    pub zone_hash: B256,
    pub salt: U256,
    pub conduit_key: ConduitKey,
    pub nonce: U256,
}

impl OrderComponents {
    /// Parameters with every consideration item treated as original.
    #[must_use]
    pub fn to_parameters(&self) -> OrderParameters {
        OrderParameters {
            offerer: self.offerer,
            zone: self.zone,
            offer: self.offer.clone(),
            consideration: self.consideration.clone(),
            order_type: self.order_type,
            start_time: self.start_time,
            end_time: self.end_time,
            zone_hash: self.zone_hash,
            salt: self.salt,
            conduit_key: self.conduit_key,
            total_original_consideration_items: self.consideration.len(),
        }
    }
}

/// A signed order, filled in full.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub parameters: OrderParameters,
    /// 65-byte or 64-byte ECDSA signature, contract-signer payload, or empty
    /// when the order is already validated.
    pub signature: Vec<u8>,
}

/// A signed order with a requested fill fraction and opaque zone data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancedOrder {
    pub parameters: OrderParameters,
    pub numerator: u128,
    pub denominator: u128,
    pub signature: Vec<u8>,
    /// Passed through to the zone of a restricted order.
    pub extra_data: Vec<u8>,
}

impl From<Order> for AdvancedOrder {
    fn from(order: Order) -> Self {
        Self {
            parameters: order.parameters,
            numerator: 1,
            denominator: 1,
            signature: order.signature,
            extra_data: Vec::new(),
        }
    }
}

impl AdvancedOrder {
    /// Same order, requesting `numerator / denominator` of it.
    #[must_use]
    pub fn with_fraction(mut self, numerator: u128, denominator: u128) -> Self {
        self.numerator = numerator;
        self.denominator = denominator;
        self
    }
}

/// Per-order ledger record, keyed by order hash.
///
/// `total_filled / total_size` is the filled fraction; `0/0` means the order
/// has never been filled. Cancellation and full consumption are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatus {
    pub is_validated: bool,
    pub is_cancelled: bool,
    pub total_filled: u128,
    pub total_size: u128,
}

impl OrderStatus {
    #[must_use]
    pub fn is_untouched(&self) -> bool {
        self.total_size == 0
    }

    #[must_use]
    pub fn is_fully_filled(&self) -> bool {
        self.total_size != 0 && self.total_filled >= self.total_size
    }

    #[must_use]
    pub fn is_partially_filled(&self) -> bool {
        self.total_filled != 0 && !self.is_fully_filled()
    }
}

// ---------------------------------------------------------------------------
// Basic orders
// ---------------------------------------------------------------------------

/// Asset pairing of a basic order, named payment-to-received from the
/// fulfiller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BasicOrderRoute {
    EthToErc721 = 0,
    EthToErc1155 = 1,
    Erc20ToErc721 = 2,
    Erc20ToErc1155 = 3,
    Erc721ToErc20 = 4,
    Erc1155ToErc20 = 5,
}

impl BasicOrderRoute {
    /// Item type of the single offer item.
    #[must_use]
    pub fn offered_item_type(self) -> ItemType {
        match self {
            Self::EthToErc721 | Self::Erc20ToErc721 => ItemType::Erc721,
            Self::EthToErc1155 | Self::Erc20ToErc1155 => ItemType::Erc1155,
            Self::Erc721ToErc20 | Self::Erc1155ToErc20 => ItemType::Erc20,
        }
    }

    /// Item type of the primary consideration item paid to the offerer.
    #[must_use]
    pub fn received_item_type(self) -> ItemType {
        match self {
            Self::EthToErc721 | Self::EthToErc1155 => ItemType::Native,
            Self::Erc20ToErc721 | Self::Erc20ToErc1155 => ItemType::Erc20,
            Self::Erc721ToErc20 => ItemType::Erc721,
            Self::Erc1155ToErc20 => ItemType::Erc1155,
        }
    }

    /// Additional recipients are paid in the route's fungible asset.
    #[must_use]
    pub fn additional_recipients_item_type(self) -> ItemType {
        match self {
            Self::EthToErc721 | Self::EthToErc1155 => ItemType::Native,
            _ => ItemType::Erc20,
        }
    }

    /// The offerer supplies the fungible side (and pays any fees out of it).
    #[must_use]
    pub fn offerer_supplies_payment(self) -> bool {
        matches!(self, Self::Erc721ToErc20 | Self::Erc1155ToErc20)
    }

    #[must_use]
    pub fn is_native_payment(self) -> bool {
        matches!(self, Self::EthToErc721 | Self::EthToErc1155)
    }
}

/// Route and order type packed as `order_type + 4 * route`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BasicOrderType {
    pub order_type: OrderType,
    pub route: BasicOrderRoute,
}

impl BasicOrderType {
    #[must_use]
    pub fn new(order_type: OrderType, route: BasicOrderRoute) -> Self {
        Self { order_type, route }
    }

    #[must_use]
    pub fn as_u8(self) -> u8 {
        self.order_type.as_u8() + 4 * (self.route as u8)
    }
}

impl TryFrom<u8> for BasicOrderType {
    type Error = OpenbarterError;

    fn try_from(value: u8) -> Result<Self> {
        let route = match value / 4 {
            0 => BasicOrderRoute::EthToErc721,
            1 => BasicOrderRoute::EthToErc1155,
            2 => BasicOrderRoute::Erc20ToErc721,
            3 => BasicOrderRoute::Erc20ToErc1155,
            4 => BasicOrderRoute::Erc721ToErc20,
            5 => BasicOrderRoute::Erc1155ToErc20,
            _ => return Err(OpenbarterError::UnknownBasicOrderType(value)),
        };
        Ok(Self {
            order_type: OrderType::try_from(value % 4)?,
            route,
        })
    }
}

/// A fee or royalty leg of a basic order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalRecipient {
    pub amount: U256,
    pub recipient: Address,
}

/// Shorthand for a single-offer-item order paid in one fungible asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicOrderParameters {
    /// Zero for native payment routes.
    pub consideration_token: Address,
    pub consideration_identifier: U256,
    pub consideration_amount: U256,
    pub offerer: Address,
    pub zone: Address,
    pub offer_token: Address,
    pub offer_identifier: U256,
    pub offer_amount: U256,
    pub basic_order_type: BasicOrderType,
    pub start_time: u64,
    pub end_time: u64,
    pub zone_hash: B256,
    pub salt: U256,
    pub offerer_conduit_key: ConduitKey,
    pub fulfiller_conduit_key: ConduitKey,
    /// Additional recipients covered by the signature; the rest are tips.
    pub total_original_additional_recipients: usize,
    pub additional_recipients: Vec<AdditionalRecipient>,
    pub signature: Vec<u8>,
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl OrderParameters {
    /// An open full-fill order valid over `[0, u64::MAX / 2]` with a random salt.
    pub fn dummy(
        offerer: Address,
        offer: Vec<OfferItem>,
        consideration: Vec<ConsiderationItem>,
    ) -> Self {
        let total_original_consideration_items = consideration.len();
        Self {
            offerer,
            zone: Address::ZERO,
            offer,
            consideration,
            order_type: OrderType::FullOpen,
            start_time: 0,
            end_time: u64::MAX / 2,
            zone_hash: B256::ZERO,
            salt: U256::from(rand::random::<u64>()),
            conduit_key: ConduitKey::NONE,
            total_original_consideration_items,
        }
    }

    pub fn with_order_type(mut self, order_type: OrderType) -> Self {
        self.order_type = order_type;
        self
    }

    pub fn with_zone(mut self, zone: Address) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_window(mut self, start_time: u64, end_time: u64) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    pub fn with_conduit_key(mut self, conduit_key: ConduitKey) -> Self {
        self.conduit_key = conduit_key;
        self
    }
}
