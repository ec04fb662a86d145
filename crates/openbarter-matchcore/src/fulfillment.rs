//! Fulfillment matching: collapsing caller-supplied component groups into
//! concrete executions.
//!
//! Every resolved order carries a remaining amount per item slot. Applying a
//! fulfillment sums the remaining amounts of the referenced slots on each
//! side, consumes them, and yields one [`Execution`]. The matcher validates
//! plans; it never invents aggregations of its own.

use std::collections::HashSet;

use alloy_primitives::{Address, U256};
use openbarter_types::{
    ConduitKey, Execution, Fulfillment, FulfillmentComponent, ItemType, OpenbarterError,
    OrderHash, ReceivedItem, Result, Side, SpentItem,
};
use tracing::debug;

/// An order after validation, criteria resolution and amount computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOrder {
    pub order_hash: OrderHash,
    pub offerer: Address,
    pub zone: Address,
    pub conduit_key: ConduitKey,
    pub offer: Vec<SpentItem>,
    pub consideration: Vec<ReceivedItem>,
    /// `false` for orders skipped by `fulfill_available`.
    pub available: bool,
}

impl ResolvedOrder {
    /// Transfers that settle this order on its own: every offer item to
    /// `recipient`, every consideration item from the fulfiller.
    #[must_use]
    pub fn direct_executions(
        &self,
        fulfiller: Address,
        fulfiller_conduit_key: ConduitKey,
        recipient: Address,
    ) -> Vec<Execution> {
        let offer = self.offer.iter().map(|item| Execution {
            item: ReceivedItem {
                item_type: item.item_type,
                token: item.token,
                identifier: item.identifier,
                amount: item.amount,
                recipient,
            },
            offerer: self.offerer,
            conduit_key: self.conduit_key,
        });
        let consideration = self.consideration.iter().map(|item| Execution {
            item: item.clone(),
            offerer: fulfiller,
            conduit_key: fulfiller_conduit_key,
        });
        offer.chain(consideration).collect()
    }
}

/// Summed slots of one side of a fulfillment.
#[derive(Debug, Clone)]
struct Aggregate {
    item_type: ItemType,
    token: Address,
    identifier: U256,
    /// Offerer for the offer side, recipient for the consideration side.
    account: Address,
    conduit_key: ConduitKey,
    amount: U256,
    first: FulfillmentComponent,
}

impl Aggregate {
    fn same_asset(&self, other: &Self) -> bool {
        self.item_type == other.item_type
            && self.token == other.token
            && self.identifier == other.identifier
    }
}

fn invalid_component(reason: impl Into<String>) -> OpenbarterError {
    OpenbarterError::InvalidFulfillmentComponentData {
        reason: reason.into(),
    }
}

/// Remaining amounts per slot over a batch of resolved orders.
#[derive(Debug)]
pub struct FulfillmentMatcher<'a> {
    orders: &'a [ResolvedOrder],
    offer_remaining: Vec<Vec<U256>>,
    consideration_remaining: Vec<Vec<U256>>,
}

impl<'a> FulfillmentMatcher<'a> {
    #[must_use]
    pub fn new(orders: &'a [ResolvedOrder]) -> Self {
        let offer_remaining = orders
            .iter()
            .map(|o| {
                o.offer
                    .iter()
                    .map(|i| if o.available { i.amount } else { U256::ZERO })
                    .collect()
            })
            .collect();
        let consideration_remaining = orders
            .iter()
            .map(|o| {
                o.consideration
                    .iter()
                    .map(|i| if o.available { i.amount } else { U256::ZERO })
                    .collect()
            })
            .collect();
        Self {
            orders,
            offer_remaining,
            consideration_remaining,
        }
    }

    /// Remaining (unconsumed) amount of a slot.
    #[must_use]
    pub fn remaining(&self, side: Side, component: FulfillmentComponent) -> Option<U256> {
        let slots = match side {
            Side::Offer => &self.offer_remaining,
            Side::Consideration => &self.consideration_remaining,
        };
        slots
            .get(component.order_index)?
            .get(component.item_index)
            .copied()
    }

    fn check_components(&self, side: Side, components: &[FulfillmentComponent]) -> Result<()> {
        let mut seen = HashSet::with_capacity(components.len());
        for component in components {
            let order = self.orders.get(component.order_index).ok_or_else(|| {
                invalid_component(format!("order index {} out of range", component.order_index))
            })?;
            let len = match side {
                Side::Offer => order.offer.len(),
                Side::Consideration => order.consideration.len(),
            };
            if component.item_index >= len {
                return Err(invalid_component(format!(
                    "{side} item index {} out of range for order {}",
                    component.item_index, component.order_index
                )));
            }
            if !seen.insert(*component) {
                return Err(invalid_component(format!(
                    "duplicate {side} component ({}, {})",
                    component.order_index, component.item_index
                )));
            }
        }
        Ok(())
    }

    /// Sum and consume the referenced slots. Slots on unavailable orders are
    /// skipped. Returns `None` when no referenced order is available.
    fn aggregate(
        &mut self,
        side: Side,
        components: &[FulfillmentComponent],
    ) -> Result<Option<Aggregate>> {
        self.check_components(side, components)?;

        let orders = self.orders;
        let mut aggregate: Option<Aggregate> = None;
        for component in components {
            let order = &orders[component.order_index];
            if !order.available {
                continue;
            }
            let candidate = match side {
                Side::Offer => {
                    let item = &order.offer[component.item_index];
                    let slot = &mut self.offer_remaining[component.order_index]
                        [component.item_index];
                    Aggregate {
                        item_type: item.item_type,
                        token: item.token,
                        identifier: item.identifier,
                        account: order.offerer,
                        conduit_key: order.conduit_key,
                        amount: std::mem::take(slot),
                        first: *component,
                    }
                }
                Side::Consideration => {
                    let item = &order.consideration[component.item_index];
                    let slot = &mut self.consideration_remaining[component.order_index]
                        [component.item_index];
                    Aggregate {
                        item_type: item.item_type,
                        token: item.token,
                        identifier: item.identifier,
                        account: item.recipient,
                        conduit_key: ConduitKey::NONE,
                        amount: std::mem::take(slot),
                        first: *component,
                    }
                }
            };

            match aggregate.as_mut() {
                None => aggregate = Some(candidate),
                Some(total) => {
                    let compatible = total.same_asset(&candidate)
                        && total.account == candidate.account
                        && total.conduit_key == candidate.conduit_key;
                    if !compatible {
                        return Err(invalid_component(format!(
                            "{side} component ({}, {}) does not match the first component",
                            component.order_index, component.item_index
                        )));
                    }
                    total.amount = total.amount.checked_add(candidate.amount).ok_or(
                        OpenbarterError::ArithmeticOverflow {
                            context: "fulfillment aggregation",
                        },
                    )?;
                }
            }
        }
        Ok(aggregate)
    }

    fn credit(&mut self, side: Side, component: FulfillmentComponent, amount: U256) {
        let slot = match side {
            Side::Offer => &mut self.offer_remaining[component.order_index][component.item_index],
            Side::Consideration => {
                &mut self.consideration_remaining[component.order_index][component.item_index]
            }
        };
        *slot += amount;
    }

    /// Collapse one match fulfillment into an execution.
    ///
    /// The executed amount is the smaller of the two sums; the excess on the
    /// larger side is credited back to that side's first component so a
    /// later fulfillment can consume it.
    pub fn apply_fulfillment(&mut self, fulfillment: &Fulfillment) -> Result<Execution> {
        if fulfillment.offer_components.is_empty()
            || fulfillment.consideration_components.is_empty()
        {
            return Err(OpenbarterError::OfferAndConsiderationRequiredOnFulfillment);
        }

        let offer = self
            .aggregate(Side::Offer, &fulfillment.offer_components)?
            .ok_or(OpenbarterError::MissingItemAmount)?;
        let consideration = self
            .aggregate(Side::Consideration, &fulfillment.consideration_components)?
            .ok_or(OpenbarterError::MissingItemAmount)?;

        if !offer.same_asset(&consideration) {
            return Err(OpenbarterError::MismatchedFulfillmentOfferAndConsiderationComponents);
        }
        if offer.amount.is_zero() || consideration.amount.is_zero() {
            return Err(OpenbarterError::MissingItemAmount);
        }

        let amount = if offer.amount > consideration.amount {
            self.credit(Side::Offer, offer.first, offer.amount - consideration.amount);
            consideration.amount
        } else {
            if consideration.amount > offer.amount {
                self.credit(
                    Side::Consideration,
                    consideration.first,
                    consideration.amount - offer.amount,
                );
            }
            offer.amount
        };

        Ok(Execution {
            item: ReceivedItem {
                item_type: offer.item_type,
                token: offer.token,
                identifier: offer.identifier,
                amount,
                recipient: consideration.account,
            },
            offerer: offer.account,
            conduit_key: offer.conduit_key,
        })
    }

    /// Aggregate one side of a `fulfill_available` plan into an execution.
    ///
    /// Offer items go to `recipient` from their offerers; consideration items
    /// are paid by the fulfiller through its conduit. Returns `None` when the
    /// aggregate is empty (every referenced order skipped, or nothing left).
    pub fn aggregate_available(
        &mut self,
        side: Side,
        components: &[FulfillmentComponent],
        fulfiller: Address,
        fulfiller_conduit_key: ConduitKey,
        recipient: Address,
    ) -> Result<Option<Execution>> {
        if components.is_empty() {
            return Err(invalid_component(format!("empty {side} component list")));
        }
        let Some(aggregate) = self.aggregate(side, components)? else {
            return Ok(None);
        };
        if aggregate.amount.is_zero() {
            return Ok(None);
        }
        let (offerer, conduit_key, item_recipient) = match side {
            Side::Offer => (aggregate.account, aggregate.conduit_key, recipient),
            Side::Consideration => (fulfiller, fulfiller_conduit_key, aggregate.account),
        };
        Ok(Some(Execution {
            item: ReceivedItem {
                item_type: aggregate.item_type,
                token: aggregate.token,
                identifier: aggregate.identifier,
                amount: aggregate.amount,
                recipient: item_recipient,
            },
            offerer,
            conduit_key,
        }))
    }

    /// Every consideration item of every available order must be fully paid.
    pub fn check_consideration_met(&self) -> Result<()> {
        for (order_index, order) in self.orders.iter().enumerate() {
            if !order.available {
                continue;
            }
            for (consideration_index, shortfall) in
                self.consideration_remaining[order_index].iter().enumerate()
            {
                if !shortfall.is_zero() {
                    return Err(OpenbarterError::ConsiderationNotMet {
                        order_index,
                        consideration_index,
                        shortfall: *shortfall,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Apply a full match plan. Self transfers are dropped.
pub fn match_fulfillments(
    orders: &[ResolvedOrder],
    fulfillments: &[Fulfillment],
) -> Result<Vec<Execution>> {
    let mut matcher = FulfillmentMatcher::new(orders);
    let mut executions = Vec::with_capacity(fulfillments.len());
    for (index, fulfillment) in fulfillments.iter().enumerate() {
        let execution = matcher.apply_fulfillment(fulfillment)?;
        if execution.item.recipient == execution.offerer {
            debug!(fulfillment = index, offerer = %execution.offerer, "Dropping self transfer");
            continue;
        }
        debug!(
            fulfillment = index,
            item_type = %execution.item.item_type,
            token = %execution.item.token,
            amount = %execution.item.amount,
            from = %execution.offerer,
            to = %execution.item.recipient,
            "Execution"
        );
        executions.push(execution);
    }
    matcher.check_consideration_met()?;
    Ok(executions)
}

/// Apply a `fulfill_available` plan: offer groups pay `recipient`,
/// consideration groups are paid by the fulfiller. Empty aggregates and
/// self transfers are dropped.
pub fn aggregate_available_fulfillments(
    orders: &[ResolvedOrder],
    offer_fulfillments: &[Vec<FulfillmentComponent>],
    consideration_fulfillments: &[Vec<FulfillmentComponent>],
    fulfiller: Address,
    fulfiller_conduit_key: ConduitKey,
    recipient: Address,
) -> Result<Vec<Execution>> {
    let mut matcher = FulfillmentMatcher::new(orders);
    let mut executions = Vec::new();
    let groups = offer_fulfillments
        .iter()
        .map(|c| (Side::Offer, c))
        .chain(
            consideration_fulfillments
                .iter()
                .map(|c| (Side::Consideration, c)),
        );
    for (side, components) in groups {
        let execution = matcher.aggregate_available(
            side,
            components,
            fulfiller,
            fulfiller_conduit_key,
            recipient,
        )?;
        if let Some(execution) = execution {
            if execution.item.recipient == execution.offerer {
                continue;
            }
            executions.push(execution);
        }
    }
    matcher.check_consideration_met()?;
    Ok(executions)
}
