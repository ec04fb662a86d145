//! System-wide constants for the OpenBarter settlement engine.

use alloy_primitives::{Address, address};

/// Engine name used in the typed-data domain.
pub const ENGINE_NAME: &str = "OpenBarter";

/// Engine version used in the typed-data domain.
pub const ENGINE_VERSION: &str = "1";

/// Default chain id (local development chain).
pub const DEFAULT_CHAIN_ID: u64 = 31_337;

/// Default engine account, used as the typed-data verifying contract and as
/// the spender on direct transfers.
pub const DEFAULT_ENGINE_ADDRESS: Address = address!("00000000000000000000000000000000000ba7e4");

/// Default conduit controller account.
pub const DEFAULT_CONDUIT_CONTROLLER: Address =
    address!("00000000000000000000000000000000000c0d17");

/// Upper bound for fill numerators and denominators (2^120 - 1).
pub const MAX_FRACTION: u128 = (1u128 << 120) - 1;

/// Returned by a contract signer that accepts a signature (`isValidSignature` selector).
pub const EIP1271_MAGIC_VALUE: [u8; 4] = [0x16, 0x26, 0xba, 0x7e];

/// Returned by a zone that approves a restricted order (`isValidOrder` selector).
pub const ZONE_MAGIC_VALUE: [u8; 4] = [0x0e, 0x1d, 0x31, 0xdc];

/// Typed-data prefix bytes.
pub const EIP712_PREFIX: [u8; 2] = [0x19, 0x01];

// ---------------------------------------------------------------------------
// Typed-data type strings
// ---------------------------------------------------------------------------

pub const EIP712_DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

pub const OFFER_ITEM_TYPE: &str = "OfferItem(uint8 itemType,address token,uint256 identifierOrCriteria,uint256 startAmount,uint256 endAmount)";

pub const CONSIDERATION_ITEM_TYPE: &str = "ConsiderationItem(uint8 itemType,address token,uint256 identifierOrCriteria,uint256 startAmount,uint256 endAmount,address recipient)";

pub const ORDER_COMPONENTS_PARTIAL_TYPE: &str = "OrderComponents(address offerer,address zone,OfferItem[] offer,ConsiderationItem[] consideration,uint8 orderType,uint256 startTime,uint256 endTime,bytes32 zoneHash,uint256 salt,bytes32 conduitKey,uint256 nonce)";
