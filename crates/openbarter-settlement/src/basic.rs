//! Basic orders: one offer item paid for in a single fungible asset.
//!
//! The shorthand parameters expand to full [`OrderParameters`] for hashing
//! and validation. Settlement skips fulfillment aggregation: the offer item
//! moves straight to the fulfiller and each payment leg straight to its
//! recipient.

use alloy_primitives::{Address, U256};
use openbarter_types::{
    BasicOrderParameters, BasicOrderRoute, ConsiderationItem, Execution, ItemType, OfferItem,
    OpenbarterError, OrderParameters, ReceivedItem, Result, SpentItem,
};

/// Expand basic parameters into the order the offerer signed.
///
/// Additional recipients become consideration items after the primary
/// payment; the first `total_original_additional_recipients` of them are
/// signed, the rest are tips.
pub fn derive_basic_order(basic: &BasicOrderParameters) -> Result<OrderParameters> {
    let route = basic.basic_order_type.route;
    check_unused_parameters(basic, route)?;
    if basic.total_original_additional_recipients > basic.additional_recipients.len() {
        return Err(OpenbarterError::MissingOriginalConsiderationItems);
    }

    let offer = vec![OfferItem::fixed(
        route.offered_item_type(),
        basic.offer_token,
        basic.offer_identifier,
        basic.offer_amount,
    )];

    let fee_token = match route.additional_recipients_item_type() {
        ItemType::Native => Address::ZERO,
        _ if route.offerer_supplies_payment() => basic.offer_token,
        _ => basic.consideration_token,
    };
    let mut consideration = Vec::with_capacity(1 + basic.additional_recipients.len());
    consideration.push(ConsiderationItem::fixed(
        route.received_item_type(),
        basic.consideration_token,
        basic.consideration_identifier,
        basic.consideration_amount,
        basic.offerer,
    ));
    consideration.extend(basic.additional_recipients.iter().map(|additional| {
        ConsiderationItem::fixed(
            route.additional_recipients_item_type(),
            fee_token,
            U256::ZERO,
            additional.amount,
            additional.recipient,
        )
    }));

    Ok(OrderParameters {
        offerer: basic.offerer,
        zone: basic.zone,
        offer,
        consideration,
        order_type: basic.basic_order_type.order_type,
        start_time: basic.start_time,
        end_time: basic.end_time,
        zone_hash: basic.zone_hash,
        salt: basic.salt,
        conduit_key: basic.offerer_conduit_key,
        total_original_consideration_items: basic.total_original_additional_recipients + 1,
    })
}

/// The fungible side carries no identifier, and native payment no token.
fn check_unused_parameters(basic: &BasicOrderParameters, route: BasicOrderRoute) -> Result<()> {
    let unused = if route.is_native_payment() {
        basic.consideration_token != Address::ZERO || !basic.consideration_identifier.is_zero()
    } else if route.offerer_supplies_payment() {
        !basic.offer_identifier.is_zero()
    } else {
        !basic.consideration_identifier.is_zero()
    };
    if unused {
        return Err(OpenbarterError::UnusedItemParameters);
    }
    Ok(())
}

/// Transfers settling a basic order, in execution order.
///
/// When the offerer supplies the payment, fees come out of the offered
/// amount and the fulfiller receives the remainder.
pub fn basic_executions(
    basic: &BasicOrderParameters,
    fulfiller: Address,
) -> Result<Vec<Execution>> {
    let route = basic.basic_order_type.route;
    let offerer = basic.offerer;
    let mut executions = Vec::with_capacity(2 + basic.additional_recipients.len());

    if route.offerer_supplies_payment() {
        executions.push(Execution {
            item: ReceivedItem {
                item_type: route.received_item_type(),
                token: basic.consideration_token,
                identifier: basic.consideration_identifier,
                amount: basic.consideration_amount,
                recipient: offerer,
            },
            offerer: fulfiller,
            conduit_key: basic.fulfiller_conduit_key,
        });
        let mut remainder = basic.offer_amount;
        for additional in &basic.additional_recipients {
            remainder = remainder.checked_sub(additional.amount).ok_or(
                OpenbarterError::ArithmeticOverflow {
                    context: "basic order fees exceed offer amount",
                },
            )?;
            executions.push(Execution {
                item: fungible(basic.offer_token, additional.amount, additional.recipient),
                offerer,
                conduit_key: basic.offerer_conduit_key,
            });
        }
        executions.push(Execution {
            item: fungible(basic.offer_token, remainder, fulfiller),
            offerer,
            conduit_key: basic.offerer_conduit_key,
        });
        return Ok(executions);
    }

    executions.push(Execution {
        item: ReceivedItem {
            item_type: route.offered_item_type(),
            token: basic.offer_token,
            identifier: basic.offer_identifier,
            amount: basic.offer_amount,
            recipient: fulfiller,
        },
        offerer,
        conduit_key: basic.offerer_conduit_key,
    });
    let payment_type = route.received_item_type();
    let payment = |amount: U256, recipient: Address| Execution {
        item: ReceivedItem {
            item_type: payment_type,
            token: basic.consideration_token,
            identifier: U256::ZERO,
            amount,
            recipient,
        },
        offerer: fulfiller,
        conduit_key: basic.fulfiller_conduit_key,
    };
    executions.push(payment(basic.consideration_amount, offerer));
    executions.extend(
        basic
            .additional_recipients
            .iter()
            .map(|additional| payment(additional.amount, additional.recipient)),
    );
    Ok(executions)
}

fn fungible(token: Address, amount: U256, recipient: Address) -> ReceivedItem {
    ReceivedItem {
        item_type: ItemType::Erc20,
        token,
        identifier: U256::ZERO,
        amount,
        recipient,
    }
}

/// Event payload: the offer as spent, every consideration item as received.
#[must_use]
pub fn basic_event_items(parameters: &OrderParameters) -> (Vec<SpentItem>, Vec<ReceivedItem>) {
    let offer = parameters
        .offer
        .iter()
        .map(|item| SpentItem {
            item_type: item.item_type,
            token: item.token,
            identifier: item.identifier_or_criteria,
            amount: item.start_amount,
        })
        .collect();
    let consideration = parameters
        .consideration
        .iter()
        .map(|item| ReceivedItem {
            item_type: item.item_type,
            token: item.token,
            identifier: item.identifier_or_criteria,
            amount: item.start_amount,
            recipient: item.recipient,
        })
        .collect();
    (offer, consideration)
}
