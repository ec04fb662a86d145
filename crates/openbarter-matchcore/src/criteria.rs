//! Criteria resolution: substituting concrete identifiers into
//! criteria-based item slots.
//!
//! A criteria slot stores a merkle root in `identifier_or_criteria`. Leaves
//! are `keccak256(identifier)` over the 32-byte big-endian identifier and
//! every pair is sorted before hashing, so proofs carry no left/right flags.
//! A zero root accepts any identifier without a proof.

use alloy_primitives::{B256, Keccak256, U256, keccak256};
use openbarter_types::{AdvancedOrder, CriteriaResolver, OpenbarterError, Result, Side};

/// Hash two nodes in sorted order.
#[must_use]
pub fn hash_pair(a: B256, b: B256) -> B256 {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    let mut hasher = Keccak256::new();
    hasher.update(first.as_slice());
    hasher.update(second.as_slice());
    hasher.finalize()
}

#[must_use]
pub fn leaf_hash(identifier: U256) -> B256 {
    keccak256(identifier.to_be_bytes::<32>())
}

/// Check that `identifier` is a member of the set committed to by `root`.
pub fn verify_criteria_proof(root: U256, identifier: U256, proof: &[B256]) -> Result<()> {
    let computed = proof
        .iter()
        .fold(leaf_hash(identifier), |node, sibling| hash_pair(node, *sibling));
    if computed != B256::from(root) {
        return Err(OpenbarterError::InvalidProof);
    }
    Ok(())
}

/// Apply every resolver to the batch, then require that no criteria slot
/// remains unresolved on an available order.
///
/// Resolvers targeting orders marked unavailable are ignored once their
/// order index has been range-checked. A slot can only be resolved once:
/// a second resolver finds a concrete item and fails.
pub fn apply_criteria_resolvers(
    orders: &mut [AdvancedOrder],
    available: &[bool],
    resolvers: &[CriteriaResolver],
) -> Result<()> {
    for resolver in resolvers {
        let order = orders
            .get_mut(resolver.order_index)
            .ok_or(OpenbarterError::OrderCriteriaResolverOutOfRange)?;
        if !available.get(resolver.order_index).copied().unwrap_or(true) {
            continue;
        }

        let (item_type, identifier_or_criteria) = match resolver.side {
            Side::Offer => {
                let item = order
                    .parameters
                    .offer
                    .get_mut(resolver.index)
                    .ok_or(OpenbarterError::OfferCriteriaResolverOutOfRange)?;
                (&mut item.item_type, &mut item.identifier_or_criteria)
            }
            Side::Consideration => {
                let item = order
                    .parameters
                    .consideration
                    .get_mut(resolver.index)
                    .ok_or(OpenbarterError::ConsiderationCriteriaResolverOutOfRange)?;
                (&mut item.item_type, &mut item.identifier_or_criteria)
            }
        };

        if !item_type.is_criteria() {
            return Err(OpenbarterError::CriteriaNotEnabledForItem);
        }
        let root = *identifier_or_criteria;
        if root != U256::ZERO {
            verify_criteria_proof(root, resolver.identifier, &resolver.criteria_proof)?;
        }

        *item_type = item_type.resolved();
        *identifier_or_criteria = resolver.identifier;
    }

    for (order_index, order) in orders.iter().enumerate() {
        if !available.get(order_index).copied().unwrap_or(true) {
            continue;
        }
        if let Some(item_index) = order
            .parameters
            .offer
            .iter()
            .position(|i| i.item_type.is_criteria())
        {
            return Err(OpenbarterError::UnresolvedOfferCriteria {
                order_index,
                item_index,
            });
        }
        if let Some(item_index) = order
            .parameters
            .consideration
            .iter()
            .position(|i| i.item_type.is_criteria())
        {
            return Err(OpenbarterError::UnresolvedConsiderationCriteria {
                order_index,
                item_index,
            });
        }
    }
    Ok(())
}

/// Build a sorted-pair merkle tree over `identifiers`.
///
/// Returns the root and, for each leaf, its proof. An odd node at the end of
/// a level is promoted unchanged.
#[must_use]
pub fn build_criteria_tree(identifiers: &[U256]) -> (U256, Vec<Vec<B256>>) {
    if identifiers.is_empty() {
        return (U256::ZERO, Vec::new());
    }
    let mut level: Vec<B256> = identifiers.iter().map(|id| leaf_hash(*id)).collect();
    // positions[i] = index of leaf i's ancestor in the current level
    let mut positions: Vec<usize> = (0..identifiers.len()).collect();
    let mut proofs = vec![Vec::new(); identifiers.len()];

    while level.len() > 1 {
        for (leaf, pos) in positions.iter_mut().enumerate() {
            let sibling = *pos ^ 1;
            if sibling < level.len() {
                proofs[leaf].push(level[sibling]);
            }
            *pos /= 2;
        }
        level = level
            .chunks(2)
            .map(|pair| pair.iter().copied().reduce(hash_pair).unwrap_or_default())
            .collect();
    }
    (U256::from_be_bytes(level[0].0), proofs)
}
