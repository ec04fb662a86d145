//! Order validation against the ledger.
//!
//! Every path that fills, validates or cancels an order goes through here:
//! time window, fill request, consideration length, zone approval, status
//! and signature are checked in that order, and the ledger is updated only
//! once all of them pass.

use alloy_primitives::Address;
use openbarter_matchcore::{
    FillUpdate, check_fill_request, check_validity_window, compute_fill, derive_order_hash,
    hash_order_components,
};
use openbarter_types::{
    AdvancedOrder, CriteriaResolver, OpenbarterError, Order, OrderComponents, OrderHash,
    OrderParameters, Result, SettlementEvent, ZoneContext,
};
use tracing::{debug, warn};

use crate::{
    CallbackRegistry, OrderLedger, SignatureVerifier, zone::assert_restricted_order_validity,
};

/// Who is calling, when, and which callbacks and domain apply.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub registry: &'a CallbackRegistry,
    pub verifier: &'a SignatureVerifier,
    pub caller: Address,
    pub now: u64,
}

impl ValidationContext<'_> {
    /// Signatures are not checked when the offerer itself is calling.
    fn verify_signature(
        &self,
        offerer: Address,
        order_hash: OrderHash,
        signature: &[u8],
    ) -> Result<()> {
        if self.caller == offerer {
            return Ok(());
        }
        self.verifier
            .verify(self.registry, offerer, order_hash, signature)
    }
}

/// An order accepted for this call, with the fraction of it to settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedOrder {
    pub order_hash: OrderHash,
    pub numerator: u128,
    pub denominator: u128,
}

/// Validate an advanced order and record its fill.
///
/// With `revert_on_invalid` unset, an order outside its time window or
/// already cancelled or filled is skipped (`Ok(None)`) instead of failing
/// the call. Malformed fractions, zone rejections and bad signatures always
/// fail.
pub fn validate_order_and_update_status(
    ledger: &mut OrderLedger,
    ctx: &ValidationContext<'_>,
    order: &AdvancedOrder,
    criteria_resolvers: &[CriteriaResolver],
    prior_order_hashes: &[OrderHash],
    revert_on_invalid: bool,
) -> Result<Option<ValidatedOrder>> {
    let parameters = &order.parameters;

    if let Err(err) =
        check_validity_window(parameters.start_time, parameters.end_time, ctx.now)
    {
        if revert_on_invalid {
            return Err(err);
        }
        warn!(offerer = %parameters.offerer, now = ctx.now, "Skipping order outside its time window");
        return Ok(None);
    }

    check_fill_request(parameters.order_type, order.numerator, order.denominator)?;

    let nonce = ledger.nonce(&parameters.offerer);
    let order_hash = derive_order_hash(parameters, nonce)?;

    assert_restricted_order_validity(
        ctx.registry,
        parameters.order_type,
        &ZoneContext {
            order_hash,
            caller: ctx.caller,
            parameters,
            extra_data: &order.extra_data,
            prior_order_hashes,
            criteria_resolvers,
        },
    )?;

    if !ledger.verify_status(&order_hash, false, revert_on_invalid)? {
        warn!(order = %order_hash, "Skipping cancelled or filled order");
        return Ok(None);
    }

    let status = ledger.status(&order_hash);
    if !status.is_validated {
        ctx.verify_signature(parameters.offerer, order_hash, &order.signature)?;
    }

    let FillUpdate {
        numerator,
        denominator,
        ..
    } = record_fill(ledger, order_hash, order.numerator, order.denominator)?;

    Ok(Some(ValidatedOrder {
        order_hash,
        numerator,
        denominator,
    }))
}

fn record_fill(
    ledger: &mut OrderLedger,
    order_hash: OrderHash,
    numerator: u128,
    denominator: u128,
) -> Result<FillUpdate> {
    let update = compute_fill(&ledger.status(&order_hash), numerator, denominator)?;
    ledger.record_fill(order_hash, &update);
    Ok(update)
}

/// Validate an order on the basic path, which only accepts unused orders
/// and always fills them completely.
pub fn validate_basic_order_and_update_status(
    ledger: &mut OrderLedger,
    ctx: &ValidationContext<'_>,
    parameters: &OrderParameters,
    signature: &[u8],
) -> Result<OrderHash> {
    check_validity_window(parameters.start_time, parameters.end_time, ctx.now)?;

    let nonce = ledger.nonce(&parameters.offerer);
    let order_hash = derive_order_hash(parameters, nonce)?;

    assert_restricted_order_validity(
        ctx.registry,
        parameters.order_type,
        &ZoneContext {
            order_hash,
            caller: ctx.caller,
            parameters,
            extra_data: &[],
            prior_order_hashes: &[],
            criteria_resolvers: &[],
        },
    )?;

    ledger.verify_status(&order_hash, true, true)?;
    if !ledger.status(&order_hash).is_validated {
        ctx.verify_signature(parameters.offerer, order_hash, signature)?;
    }
    record_fill(ledger, order_hash, 1, 1)?;
    Ok(order_hash)
}

/// Pre-approve orders so they can later be filled without a signature.
///
/// Emits `OrderValidated` only for orders not validated before.
pub fn validate_orders(
    ledger: &mut OrderLedger,
    ctx: &ValidationContext<'_>,
    orders: &[Order],
) -> Result<Vec<SettlementEvent>> {
    let mut events = Vec::new();
    for order in orders {
        let parameters = &order.parameters;
        let nonce = ledger.nonce(&parameters.offerer);
        let order_hash = derive_order_hash(parameters, nonce)?;

        ledger.verify_status(&order_hash, false, true)?;
        if ledger.status(&order_hash).is_validated {
            debug!(order = %order_hash, "Order already validated");
            continue;
        }
        ctx.verify_signature(parameters.offerer, order_hash, &order.signature)?;
        ledger.mark_validated(order_hash);
        events.push(SettlementEvent::OrderValidated {
            order_hash,
            offerer: parameters.offerer,
            zone: parameters.zone,
        });
    }
    Ok(events)
}

/// Cancel orders by their signed components. Only the offerer or the zone
/// may cancel; the hash uses the nonce in the components.
pub fn cancel_orders(
    ledger: &mut OrderLedger,
    caller: Address,
    orders: &[OrderComponents],
) -> Result<Vec<SettlementEvent>> {
    let mut events = Vec::with_capacity(orders.len());
    for components in orders {
        if caller != components.offerer && caller != components.zone {
            return Err(OpenbarterError::InvalidCanceller { caller });
        }
        let order_hash = hash_order_components(components);
        ledger.mark_cancelled(order_hash);
        events.push(SettlementEvent::OrderCancelled {
            order_hash,
            offerer: components.offerer,
            zone: components.zone,
        });
    }
    Ok(events)
}
