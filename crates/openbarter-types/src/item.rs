//! Item types: what an offerer gives up and what recipients must receive.
//!
//! Offer and consideration items carry a start and end amount; the due
//! amount is interpolated over the order's validity window. Criteria-based
//! items name a merkle root (or `0` for "any identifier") instead of a
//! concrete token id until a criteria resolver substitutes one.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{OpenbarterError, Result};

/// The asset class of an item. Discriminants match the signed wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[repr(u8)]
pub enum ItemType {
    Native = 0,
    Erc20 = 1,
    Erc721 = 2,
    Erc1155 = 3,
    Erc721WithCriteria = 4,
    Erc1155WithCriteria = 5,
}

impl ItemType {
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn is_criteria(self) -> bool {
        matches!(self, Self::Erc721WithCriteria | Self::Erc1155WithCriteria)
    }

    /// The concrete type a criteria item becomes once resolved.
    #[must_use]
    pub fn resolved(self) -> Self {
        match self {
            Self::Erc721WithCriteria => Self::Erc721,
            Self::Erc1155WithCriteria => Self::Erc1155,
            other => other,
        }
    }
}

impl TryFrom<u8> for ItemType {
    type Error = OpenbarterError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Native),
            1 => Ok(Self::Erc20),
            2 => Ok(Self::Erc721),
            3 => Ok(Self::Erc1155),
            4 => Ok(Self::Erc721WithCriteria),
            5 => Ok(Self::Erc1155WithCriteria),
            other => Err(OpenbarterError::UnknownItemType(other)),
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => write!(f, "NATIVE"),
            Self::Erc20 => write!(f, "ERC20"),
            Self::Erc721 => write!(f, "ERC721"),
            Self::Erc1155 => write!(f, "ERC1155"),
            Self::Erc721WithCriteria => write!(f, "ERC721_WITH_CRITERIA"),
            Self::Erc1155WithCriteria => write!(f, "ERC1155_WITH_CRITERIA"),
        }
    }
}

/// An asset the offerer gives up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferItem {
    pub item_type: ItemType,
    /// Token contract. Ignored for [`ItemType::Native`].
    pub token: Address,
    /// Token id, or a merkle root for criteria items (`0` = any id).
    pub identifier_or_criteria: U256,
    pub start_amount: U256,
    pub end_amount: U256,
}

impl OfferItem {
    #[must_use]
    pub fn native(amount: U256) -> Self {
        Self::fixed(ItemType::Native, Address::ZERO, U256::ZERO, amount)
    }

    #[must_use]
    pub fn erc20(token: Address, amount: U256) -> Self {
        Self::fixed(ItemType::Erc20, token, U256::ZERO, amount)
    }

    #[must_use]
    pub fn erc721(token: Address, identifier: U256) -> Self {
        Self::fixed(ItemType::Erc721, token, identifier, U256::from(1u8))
    }

    #[must_use]
    pub fn erc1155(token: Address, identifier: U256, amount: U256) -> Self {
        Self::fixed(ItemType::Erc1155, token, identifier, amount)
    }

    /// An item of constant amount over the whole validity window.
    #[must_use]
    pub fn fixed(item_type: ItemType, token: Address, identifier: U256, amount: U256) -> Self {
        Self {
            item_type,
            token,
            identifier_or_criteria: identifier,
            start_amount: amount,
            end_amount: amount,
        }
    }

    /// Replace the start/end amounts (e.g. for a declining-price offer).
    #[must_use]
    pub fn with_amounts(mut self, start_amount: U256, end_amount: U256) -> Self {
        self.start_amount = start_amount;
        self.end_amount = end_amount;
        self
    }
}

/// An asset a named recipient must receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsiderationItem {
    pub item_type: ItemType,
    pub token: Address,
    pub identifier_or_criteria: U256,
    pub start_amount: U256,
    pub end_amount: U256,
    pub recipient: Address,
}

impl ConsiderationItem {
    #[must_use]
    pub fn native(amount: U256, recipient: Address) -> Self {
        Self::fixed(ItemType::Native, Address::ZERO, U256::ZERO, amount, recipient)
    }

    #[must_use]
    pub fn erc20(token: Address, amount: U256, recipient: Address) -> Self {
        Self::fixed(ItemType::Erc20, token, U256::ZERO, amount, recipient)
    }

    #[must_use]
    pub fn erc721(token: Address, identifier: U256, recipient: Address) -> Self {
        Self::fixed(ItemType::Erc721, token, identifier, U256::from(1u8), recipient)
    }

    #[must_use]
    pub fn erc1155(token: Address, identifier: U256, amount: U256, recipient: Address) -> Self {
        Self::fixed(ItemType::Erc1155, token, identifier, amount, recipient)
    }

    #[must_use]
    pub fn fixed(
        item_type: ItemType,
        token: Address,
        identifier: U256,
        amount: U256,
        recipient: Address,
    ) -> Self {
        Self {
            item_type,
            token,
            identifier_or_criteria: identifier,
            start_amount: amount,
            end_amount: amount,
            recipient,
        }
    }

    #[must_use]
    pub fn with_amounts(mut self, start_amount: U256, end_amount: U256) -> Self {
        self.start_amount = start_amount;
        self.end_amount = end_amount;
        self
    }
}

/// A resolved offer item at its settled amount. Appears in events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpentItem {
    pub item_type: ItemType,
    pub token: Address,
    pub identifier: U256,
    pub amount: U256,
}

/// A resolved item delivered to a recipient. The unit of every transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedItem {
    pub item_type: ItemType,
    pub token: Address,
    pub identifier: U256,
    pub amount: U256,
    pub recipient: Address,
}

impl ReceivedItem {
    /// Whether two items name the same asset (type, token and identifier).
    #[must_use]
    pub fn same_asset(&self, other: &Self) -> bool {
        self.item_type == other.item_type
            && self.token == other.token
            && self.identifier == other.identifier
    }
}
