//! Batch preparation: turns a list of advanced orders into resolved orders
//! ready for fulfillment matching.
//!
//! 1. Validate each order in sequence, recording fills. Orders beyond
//!    `maximum_fulfilled`, or skipped by validation, stay in the batch as
//!    unavailable so component indices keep their meaning.
//! 2. Apply criteria resolvers to the available orders.
//! 3. Compute the concrete amount of every item for the accepted fraction.

use alloy_primitives::{B256, U256};
use openbarter_matchcore::{ResolvedOrder, apply_criteria_resolvers, resolve_amounts};
use openbarter_types::{
    AdvancedOrder, CriteriaResolver, OrderHash, OrderParameters, ReceivedItem, Result, SpentItem,
};
use tracing::{debug, info};

use crate::{
    OrderLedger,
    validator::{ValidatedOrder, ValidationContext, validate_order_and_update_status},
};

/// Validate and resolve a batch of orders.
///
/// With `revert_on_invalid` set (the match path), any invalid order fails
/// the whole batch. Otherwise invalid orders are skipped.
pub fn prepare_batch(
    ledger: &mut OrderLedger,
    ctx: &ValidationContext<'_>,
    orders: &[AdvancedOrder],
    criteria_resolvers: &[CriteriaResolver],
    revert_on_invalid: bool,
    maximum_fulfilled: usize,
) -> Result<Vec<ResolvedOrder>> {
    let mut accepted: Vec<Option<ValidatedOrder>> = Vec::with_capacity(orders.len());
    let mut order_hashes: Vec<OrderHash> = Vec::with_capacity(orders.len());
    let mut remaining = maximum_fulfilled;

    for (index, order) in orders.iter().enumerate() {
        let validated = if remaining == 0 {
            debug!(order_index = index, "Maximum fulfilled reached, skipping order");
            None
        } else {
            validate_order_and_update_status(
                ledger,
                ctx,
                order,
                criteria_resolvers,
                &order_hashes,
                revert_on_invalid,
            )?
        };
        if validated.is_some() {
            remaining -= 1;
        }
        order_hashes.push(validated.map_or(OrderHash(B256::ZERO), |v| v.order_hash));
        accepted.push(validated);
    }

    let available: Vec<bool> = accepted.iter().map(Option::is_some).collect();
    let mut resolved_inputs = orders.to_vec();
    apply_criteria_resolvers(&mut resolved_inputs, &available, criteria_resolvers)?;

    let batch = resolved_inputs
        .iter()
        .zip(&accepted)
        .map(|(order, validated)| resolve_order(&order.parameters, *validated, ctx.now))
        .collect::<Result<Vec<_>>>()?;

    info!(
        orders = batch.len(),
        available = batch.iter().filter(|o| o.available).count(),
        "Batch prepared"
    );
    Ok(batch)
}

fn resolve_order(
    parameters: &OrderParameters,
    validated: Option<ValidatedOrder>,
    now: u64,
) -> Result<ResolvedOrder> {
    let (order_hash, offer, consideration, available) = match validated {
        Some(v) => {
            let (offer, consideration) =
                resolve_amounts(parameters, v.numerator, v.denominator, now)?;
            (v.order_hash, offer, consideration, true)
        }
        None => {
            let (offer, consideration) = zero_amounts(parameters);
            (OrderHash(B256::ZERO), offer, consideration, false)
        }
    };
    Ok(ResolvedOrder {
        order_hash,
        offerer: parameters.offerer,
        zone: parameters.zone,
        conduit_key: parameters.conduit_key,
        offer,
        consideration,
        available,
    })
}

/// Items of a skipped order, kept so its slots can still be referenced.
fn zero_amounts(parameters: &OrderParameters) -> (Vec<SpentItem>, Vec<ReceivedItem>) {
    let offer = parameters
        .offer
        .iter()
        .map(|item| SpentItem {
            item_type: item.item_type,
            token: item.token,
            identifier: item.identifier_or_criteria,
            amount: U256::ZERO,
        })
        .collect();
    let consideration = parameters
        .consideration
        .iter()
        .map(|item| ReceivedItem {
            item_type: item.item_type,
            token: item.token,
            identifier: item.identifier_or_criteria,
            amount: U256::ZERO,
            recipient: item.recipient,
        })
        .collect();
    (offer, consideration)
}
