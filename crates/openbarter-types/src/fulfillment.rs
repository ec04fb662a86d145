//! Fulfillment plans and the executions they collapse into.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{ConduitKey, ReceivedItem};

/// Points at one item slot across the batch of orders being settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FulfillmentComponent {
    pub order_index: usize,
    pub item_index: usize,
}

impl FulfillmentComponent {
    #[must_use]
    pub fn new(order_index: usize, item_index: usize) -> Self {
        Self {
            order_index,
            item_index,
        }
    }
}

/// A caller-supplied grouping of offer and consideration slots that must all
/// name the same asset. Collapses into at most one [`Execution`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fulfillment {
    pub offer_components: Vec<FulfillmentComponent>,
    pub consideration_components: Vec<FulfillmentComponent>,
}

impl Fulfillment {
    /// One offer slot paying one consideration slot.
    #[must_use]
    pub fn single(offer: (usize, usize), consideration: (usize, usize)) -> Self {
        Self {
            offer_components: vec![FulfillmentComponent::new(offer.0, offer.1)],
            consideration_components: vec![FulfillmentComponent::new(
                consideration.0,
                consideration.1,
            )],
        }
    }
}

/// A concrete asset movement ready for the transfer router.
///
/// `offerer` is the account the item is pulled from; `conduit_key` selects
/// the spender that pulls it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    pub item: ReceivedItem,
    pub offerer: Address,
    pub conduit_key: ConduitKey,
}
