//! Error types for the OpenBarter settlement engine.
//!
//! All errors use the `OB_ERR_` prefix convention for easy grepping in logs.
//! Every failure aborts the whole settlement call; nothing is retried.
//! Error codes are grouped by failure class:
//! - 1xx: Signature / authorization errors
//! - 2xx: Order state errors
//! - 3xx: Timing errors
//! - 4xx: Arithmetic / fraction errors
//! - 5xx: Structural / data errors
//! - 6xx: Transfer errors
//! - 7xx: Reentrancy errors
//! - 9xx: General / internal errors

use alloy_primitives::{Address, U256};
use thiserror::Error;

use crate::{CallbackFailure, ConduitKey, OrderHash};

/// Central error enum for all OpenBarter operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpenbarterError {
    // =================================================================
    // Signature / Authorization Errors (1xx)
    // =================================================================
    /// The signature could not be decoded or did not recover to any signer.
    #[error("OB_ERR_100: Invalid signature")]
    InvalidSignature,

    /// A 65-byte signature carried a recovery byte other than 27 or 28.
    #[error("OB_ERR_101: Bad signature v value: {v}")]
    BadSignatureV { v: u8 },

    /// The signature recovered to an address other than the offerer.
    #[error("OB_ERR_102: Invalid signer: expected {expected}, recovered {recovered}")]
    InvalidSigner { expected: Address, recovered: Address },

    /// A contract offerer rejected the signature through its verification callback.
    #[error("OB_ERR_103: Bad contract signature from {signer}: {cause}")]
    BadContractSignature {
        signer: Address,
        cause: CallbackFailure,
    },

    /// The caller is neither the offerer nor the zone of the order being cancelled.
    #[error("OB_ERR_104: Invalid canceller: {caller}")]
    InvalidCanceller { caller: Address },

    /// The zone of a restricted order did not approve it.
    #[error("OB_ERR_105: Invalid restricted order {order_hash}: {cause}")]
    InvalidRestrictedOrder {
        order_hash: OrderHash,
        cause: CallbackFailure,
    },

    // =================================================================
    // Order State Errors (2xx)
    // =================================================================
    /// The order has been cancelled; cancellation is terminal.
    #[error("OB_ERR_200: Order is cancelled: {0}")]
    OrderIsCancelled(OrderHash),

    /// The order has been fully filled.
    #[error("OB_ERR_201: Order already filled: {0}")]
    OrderAlreadyFilled(OrderHash),

    /// The order is partially filled but the path requires an unused order.
    #[error("OB_ERR_202: Order partially filled: {0}")]
    OrderPartiallyFilled(OrderHash),

    // =================================================================
    // Timing Errors (3xx)
    // =================================================================
    /// The order is not active at the current time.
    #[error("OB_ERR_300: Invalid time: window [{start_time}, {end_time}], now {now}")]
    InvalidTime {
        start_time: u64,
        end_time: u64,
        now: u64,
    },

    // =================================================================
    // Arithmetic / Fraction Errors (4xx)
    // =================================================================
    /// Zero numerator, zero denominator, or numerator above denominator.
    #[error("OB_ERR_400: Bad fraction: {numerator}/{denominator}")]
    BadFraction { numerator: u128, denominator: u128 },

    /// The fraction cannot be applied without rounding error.
    #[error("OB_ERR_401: Inexact fraction")]
    InexactFraction,

    /// A partial fill was requested on a full-fill-only order.
    #[error("OB_ERR_402: Partial fills not enabled for order")]
    PartialFillsNotEnabledForOrder,

    /// An intermediate amount exceeded 256 bits.
    #[error("OB_ERR_403: Arithmetic overflow in {context}")]
    ArithmeticOverflow { context: &'static str },

    // =================================================================
    // Structural / Data Errors (5xx)
    // =================================================================
    /// A fulfillment component is out of range, duplicated, or incompatible.
    #[error("OB_ERR_500: Invalid fulfillment component data: {reason}")]
    InvalidFulfillmentComponentData { reason: String },

    /// Offer and consideration sides of a fulfillment resolve to different assets.
    #[error("OB_ERR_501: Mismatched fulfillment offer and consideration components")]
    MismatchedFulfillmentOfferAndConsiderationComponents,

    /// A fulfillment is missing its offer or consideration components.
    #[error("OB_ERR_502: Offer and consideration required on fulfillment")]
    OfferAndConsiderationRequiredOnFulfillment,

    /// An item would transfer a zero amount.
    #[error("OB_ERR_503: Missing item amount")]
    MissingItemAmount,

    /// A consideration item was not fully paid after all fulfillments were applied.
    #[error(
        "OB_ERR_504: Consideration not met: order {order_index}, item {consideration_index}, shortfall {shortfall}"
    )]
    ConsiderationNotMet {
        order_index: usize,
        consideration_index: usize,
        shortfall: U256,
    },

    /// Every order supplied to `fulfill_available` was skipped.
    #[error("OB_ERR_505: No specified orders available")]
    NoSpecifiedOrdersAvailable,

    /// Fewer consideration items than `total_original_consideration_items`.
    #[error("OB_ERR_506: Missing original consideration items")]
    MissingOriginalConsiderationItems,

    /// A criteria resolver references an order index beyond the batch.
    #[error("OB_ERR_507: Order criteria resolver out of range")]
    OrderCriteriaResolverOutOfRange,

    /// A criteria resolver references an offer index beyond the order's offer.
    #[error("OB_ERR_508: Offer criteria resolver out of range")]
    OfferCriteriaResolverOutOfRange,

    /// A criteria resolver references a consideration index beyond the order's consideration.
    #[error("OB_ERR_509: Consideration criteria resolver out of range")]
    ConsiderationCriteriaResolverOutOfRange,

    /// A criteria resolver targets an item that is not criteria-based.
    #[error("OB_ERR_510: Criteria not enabled for item")]
    CriteriaNotEnabledForItem,

    /// The membership proof does not lead to the item's merkle root.
    #[error("OB_ERR_511: Invalid criteria proof")]
    InvalidProof,

    /// A criteria-based offer item was left unresolved.
    #[error("OB_ERR_512: Unresolved offer criteria: order {order_index}, item {item_index}")]
    UnresolvedOfferCriteria {
        order_index: usize,
        item_index: usize,
    },

    /// A criteria-based consideration item was left unresolved.
    #[error(
        "OB_ERR_513: Unresolved consideration criteria: order {order_index}, item {item_index}"
    )]
    UnresolvedConsiderationCriteria {
        order_index: usize,
        item_index: usize,
    },

    /// A basic order set a token or identifier that its route does not use.
    #[error("OB_ERR_514: Unused item parameters")]
    UnusedItemParameters,

    /// Unknown item type discriminant.
    #[error("OB_ERR_515: Unknown item type: {0}")]
    UnknownItemType(u8),

    /// Unknown order type discriminant.
    #[error("OB_ERR_516: Unknown order type: {0}")]
    UnknownOrderType(u8),

    /// Unknown basic order type discriminant.
    #[error("OB_ERR_517: Unknown basic order type: {0}")]
    UnknownBasicOrderType(u8),

    // =================================================================
    // Transfer Errors (6xx)
    // =================================================================
    /// The caller did not supply enough native value to cover native payments.
    #[error("OB_ERR_600: Insufficient native value supplied: need {required}, supplied {supplied}")]
    InsufficientEtherSupplied { required: U256, supplied: U256 },

    /// Native value was supplied to a path that never spends it.
    #[error("OB_ERR_601: Invalid native value: {0}")]
    InvalidMsgValue(U256),

    /// A call targeted an address without deployed code.
    #[error("OB_ERR_602: No contract at {0}")]
    NoContract(Address),

    /// An ERC20 transfer returned `false` or no data.
    #[error("OB_ERR_603: Bad return value from ERC20 {token} on transfer of {amount} from {from} to {to}")]
    BadReturnValueFromErc20OnTransfer {
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    },

    /// A token transfer reverted without a reason.
    #[error(
        "OB_ERR_604: Token transfer failed: token {token} id {identifier} amount {amount} from {from} to {to}"
    )]
    TokenTransferGenericFailure {
        token: Address,
        from: Address,
        to: Address,
        identifier: U256,
        amount: U256,
    },

    /// A token transfer reverted with a reason.
    #[error("OB_ERR_605: Token {token} reverted: {reason}")]
    TokenTransferReverted { token: Address, reason: String },

    /// An ERC721 transfer was requested with an amount other than one.
    #[error("OB_ERR_606: Invalid ERC721 transfer amount: {amount}")]
    InvalidErc721TransferAmount { amount: U256 },

    /// A transfer proxy was asked to move an item type it cannot handle.
    #[error("OB_ERR_607: Invalid item type for conduit transfer")]
    InvalidItemType,

    /// No conduit is deployed for the conduit key.
    #[error("OB_ERR_608: Invalid conduit for key {conduit_key} ({conduit})")]
    InvalidConduit {
        conduit_key: ConduitKey,
        conduit: Address,
    },

    /// The conduit has not opened a channel for the calling engine.
    #[error("OB_ERR_609: Channel {channel} closed on conduit {conduit}")]
    ChannelClosed { conduit: Address, channel: Address },

    /// A native payment to a recipient failed.
    #[error("OB_ERR_610: Native transfer of {amount} to {recipient} failed")]
    EtherTransferGenericFailure { recipient: Address, amount: U256 },

    /// The caller does not hold the native value it attached to the call.
    #[error("OB_ERR_611: Insufficient native balance for {account}: need {needed}, have {available}")]
    InsufficientNativeBalance {
        account: Address,
        needed: U256,
        available: U256,
    },

    /// A native offer item belongs to someone other than the caller, whose
    /// value is the only native currency the engine can spend.
    #[error("OB_ERR_612: Invalid native offer item from {offerer}")]
    InvalidNativeOfferItem { offerer: Address },

    // =================================================================
    // Reentrancy Errors (7xx)
    // =================================================================
    /// A settlement entry point was entered while another was in progress.
    #[error("OB_ERR_700: No reentrant calls")]
    NoReentrantCalls,

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("OB_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("OB_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("OB_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, OpenbarterError>;

impl From<serde_json::Error> for OpenbarterError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
