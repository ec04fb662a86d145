//! Restricted-order approval.

use openbarter_types::{
    CallbackFailure, OpenbarterError, OrderType, Result, ZoneContext, constants, expect_magic,
};
use tracing::warn;

use crate::CallbackRegistry;

/// A restricted order settles only if its zone approves it, unless the zone
/// or the offerer is the caller.
pub fn assert_restricted_order_validity(
    registry: &CallbackRegistry,
    order_type: OrderType,
    context: &ZoneContext<'_>,
) -> Result<()> {
    let parameters = context.parameters;
    if !order_type.is_restricted()
        || context.caller == parameters.zone
        || context.caller == parameters.offerer
    {
        return Ok(());
    }

    let outcome = match registry.zone(&parameters.zone) {
        Some(zone) => expect_magic(zone.is_valid_order(context), constants::ZONE_MAGIC_VALUE),
        None => Err(CallbackFailure::NoCode),
    };
    outcome.map_err(|cause| {
        warn!(
            order = %context.order_hash,
            zone = %parameters.zone,
            cause = %cause,
            "Zone rejected restricted order"
        );
        OpenbarterError::InvalidRestrictedOrder {
            order_hash: context.order_hash,
            cause,
        }
    })
}
