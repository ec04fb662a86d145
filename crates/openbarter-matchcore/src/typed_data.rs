//! Typed-data identity for orders.
//!
//! Order hashes follow EIP-712 struct hashing: each offer and consideration
//! item is hashed under its own type hash, the item hashes of each side are
//! concatenated and hashed, and the result is combined with the remaining
//! order fields and the offerer's nonce. Signatures cover
//! `keccak256(0x1901 ‖ domainSeparator ‖ orderHash)`, so they cannot be
//! replayed on another chain or another engine instance.

use std::sync::LazyLock;

use alloy_primitives::{Address, B256, Keccak256, U256, keccak256};
use openbarter_types::{
    ConsiderationItem, EngineConfig, OfferItem, OpenbarterError, OrderComponents, OrderHash,
    OrderParameters, Result, constants,
};

static OFFER_ITEM_TYPEHASH: LazyLock<B256> =
    LazyLock::new(|| keccak256(constants::OFFER_ITEM_TYPE.as_bytes()));

static CONSIDERATION_ITEM_TYPEHASH: LazyLock<B256> =
    LazyLock::new(|| keccak256(constants::CONSIDERATION_ITEM_TYPE.as_bytes()));

// Referenced struct types are appended in alphabetical order.
static ORDER_TYPEHASH: LazyLock<B256> = LazyLock::new(|| {
    let full = format!(
        "{}{}{}",
        constants::ORDER_COMPONENTS_PARTIAL_TYPE,
        constants::CONSIDERATION_ITEM_TYPE,
        constants::OFFER_ITEM_TYPE,
    );
    keccak256(full.as_bytes())
});

static DOMAIN_TYPEHASH: LazyLock<B256> =
    LazyLock::new(|| keccak256(constants::EIP712_DOMAIN_TYPE.as_bytes()));

#[must_use]
pub fn offer_item_typehash() -> B256 {
    *OFFER_ITEM_TYPEHASH
}

#[must_use]
pub fn consideration_item_typehash() -> B256 {
    *CONSIDERATION_ITEM_TYPEHASH
}

#[must_use]
pub fn order_typehash() -> B256 {
    *ORDER_TYPEHASH
}

// ---------------------------------------------------------------------------
// Word encoding
// ---------------------------------------------------------------------------

fn word_u256(value: U256) -> [u8; 32] {
    value.to_be_bytes::<32>()
}

fn word_u64(value: u64) -> [u8; 32] {
    word_u256(U256::from(value))
}

fn word_u8(value: u8) -> [u8; 32] {
    word_u256(U256::from(value))
}

fn word_address(address: Address) -> B256 {
    address.into_word()
}

// ---------------------------------------------------------------------------
// Struct hashes
// ---------------------------------------------------------------------------

#[must_use]
pub fn hash_offer_item(item: &OfferItem) -> B256 {
    let mut hasher = Keccak256::new();
    hasher.update(OFFER_ITEM_TYPEHASH.as_slice());
    hasher.update(word_u8(item.item_type.as_u8()));
    hasher.update(word_address(item.token));
    hasher.update(word_u256(item.identifier_or_criteria));
    hasher.update(word_u256(item.start_amount));
    hasher.update(word_u256(item.end_amount));
    hasher.finalize()
}

#[must_use]
pub fn hash_consideration_item(item: &ConsiderationItem) -> B256 {
    let mut hasher = Keccak256::new();
    hasher.update(CONSIDERATION_ITEM_TYPEHASH.as_slice());
    hasher.update(word_u8(item.item_type.as_u8()));
    hasher.update(word_address(item.token));
    hasher.update(word_u256(item.identifier_or_criteria));
    hasher.update(word_u256(item.start_amount));
    hasher.update(word_u256(item.end_amount));
    hasher.update(word_address(item.recipient));
    hasher.finalize()
}

/// Full EIP-712 `encodeData` payload for an order (type hash included).
///
/// `consideration` must already be truncated to the signed items.
fn encode_order(
    fields: &OrderFields<'_>,
    offer: &[OfferItem],
    consideration: &[ConsiderationItem],
    nonce: U256,
) -> Vec<u8> {
    let offer_hashes: Vec<u8> = offer
        .iter()
        .flat_map(|item| hash_offer_item(item).0)
        .collect();
    let consideration_hashes: Vec<u8> = consideration
        .iter()
        .flat_map(|item| hash_consideration_item(item).0)
        .collect();

    let mut payload = Vec::with_capacity(12 * 32);
    payload.extend_from_slice(ORDER_TYPEHASH.as_slice());
    payload.extend_from_slice(word_address(fields.offerer).as_slice());
    payload.extend_from_slice(word_address(fields.zone).as_slice());
    payload.extend_from_slice(keccak256(&offer_hashes).as_slice());
    payload.extend_from_slice(keccak256(&consideration_hashes).as_slice());
    payload.extend_from_slice(&word_u8(fields.order_type));
    payload.extend_from_slice(&word_u64(fields.start_time));
    payload.extend_from_slice(&word_u64(fields.end_time));
    payload.extend_from_slice(fields.zone_hash.as_slice());
    payload.extend_from_slice(&word_u256(fields.salt));
    payload.extend_from_slice(fields.conduit_key.as_slice());
    payload.extend_from_slice(&word_u256(nonce));
    payload
}

/// The scalar order fields shared by parameters and components.
struct OrderFields<'a> {
    offerer: Address,
    zone: Address,
    order_type: u8,
    start_time: u64,
    end_time: u64,
    zone_hash: &'a B256,
    salt: U256,
    conduit_key: &'a B256,
}

impl<'a> From<&'a OrderParameters> for OrderFields<'a> {
    fn from(p: &'a OrderParameters) -> Self {
        Self {
            offerer: p.offerer,
            zone: p.zone,
            order_type: p.order_type.as_u8(),
            start_time: p.start_time,
            end_time: p.end_time,
            zone_hash: &p.zone_hash,
            salt: p.salt,
            conduit_key: &p.conduit_key.0,
        }
    }
}

impl<'a> From<&'a OrderComponents> for OrderFields<'a> {
    fn from(c: &'a OrderComponents) -> Self {
        Self {
            offerer: c.offerer,
            zone: c.zone,
            order_type: c.order_type.as_u8(),
            start_time: c.start_time,
            end_time: c.end_time,
            zone_hash: &c.zone_hash,
            salt: c.salt,
            conduit_key: &c.conduit_key.0,
        }
    }
}

/// The signing payload for a set of components: the exact bytes whose
/// keccak256 is the order hash.
#[must_use]
pub fn encode_order_components(components: &OrderComponents) -> Vec<u8> {
    encode_order(
        &OrderFields::from(components),
        &components.offer,
        &components.consideration,
        components.nonce,
    )
}

/// Hash of signed components. Every consideration item is covered.
#[must_use]
pub fn hash_order_components(components: &OrderComponents) -> OrderHash {
    OrderHash(keccak256(encode_order_components(components)))
}

/// Hash of submitted parameters under the offerer's nonce.
///
/// Only the first `total_original_consideration_items` consideration items
/// are hashed; anything appended after them is an unsigned tip.
pub fn derive_order_hash(parameters: &OrderParameters, nonce: U256) -> Result<OrderHash> {
    if parameters.consideration.len() < parameters.total_original_consideration_items {
        return Err(OpenbarterError::MissingOriginalConsiderationItems);
    }
    let payload = encode_order(
        &OrderFields::from(parameters),
        &parameters.offer,
        parameters.original_consideration(),
        nonce,
    );
    Ok(OrderHash(keccak256(payload)))
}

// ---------------------------------------------------------------------------
// Domain
// ---------------------------------------------------------------------------

/// The EIP-712 domain of one engine instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedDataDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl TypedDataDomain {
    #[must_use]
    pub fn separator(&self) -> B256 {
        let mut hasher = Keccak256::new();
        hasher.update(DOMAIN_TYPEHASH.as_slice());
        hasher.update(keccak256(self.name.as_bytes()));
        hasher.update(keccak256(self.version.as_bytes()));
        hasher.update(word_u64(self.chain_id));
        hasher.update(word_address(self.verifying_contract));
        hasher.finalize()
    }
}

impl From<&EngineConfig> for TypedDataDomain {
    fn from(config: &EngineConfig) -> Self {
        Self {
            name: config.name.clone(),
            version: config.version.clone(),
            chain_id: config.chain_id,
            verifying_contract: config.engine_address,
        }
    }
}

/// The digest an offerer signs: `keccak256(0x1901 ‖ domainSeparator ‖ orderHash)`.
#[must_use]
pub fn signing_digest(domain_separator: B256, order_hash: OrderHash) -> B256 {
    let mut hasher = Keccak256::new();
    hasher.update(constants::EIP712_PREFIX);
    hasher.update(domain_separator.as_slice());
    hasher.update(order_hash.0.as_slice());
    hasher.finalize()
}
