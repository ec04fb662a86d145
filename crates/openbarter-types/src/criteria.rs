//! Criteria resolvers: caller-supplied substitutions for criteria-based slots.

use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};

use crate::Side;

/// Substitutes a concrete `identifier` into one criteria-based item slot.
///
/// `criteria_proof` holds the sibling hashes from the leaf up to the merkle
/// root stored in the slot's `identifier_or_criteria`. It is ignored when the
/// root is zero (any identifier is accepted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaResolver {
    pub order_index: usize,
    pub side: Side,
    pub index: usize,
    pub identifier: U256,
    pub criteria_proof: Vec<B256>,
}

impl CriteriaResolver {
    /// Resolver for a wildcard slot (no proof required).
    #[must_use]
    pub fn wildcard(order_index: usize, side: Side, index: usize, identifier: U256) -> Self {
        Self {
            order_index,
            side,
            index,
            identifier,
            criteria_proof: Vec::new(),
        }
    }
}
