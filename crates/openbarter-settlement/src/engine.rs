//! The settlement engine: every public entry point.
//!
//! Each mutating call holds the reentrancy latch, works on a copy of the
//! engine state (ledger, assets, conduits, event log) and commits it only if
//! the whole call succeeds. A failed call moves no assets, changes no order
//! status and emits no events.

use std::sync::{Arc, Mutex, MutexGuard};

use alloy_primitives::{Address, B256, U256};
use openbarter_ingress::{
    CallbackRegistry, OrderLedger, SignatureVerifier, ValidationContext, cancel_orders,
    prepare_batch, validate_basic_order_and_update_status, validate_orders,
};
use openbarter_matchcore::{
    ResolvedOrder, TypedDataDomain, aggregate_available_fulfillments, hash_order_components,
    match_fulfillments,
};
use openbarter_types::{
    AdvancedOrder, BasicOrderParameters, Clock, ConduitKey, ContractSigner, CriteriaResolver,
    EngineConfig, Execution, Fulfillment, FulfillmentComponent, NativeReceiver, OpenbarterError,
    Order, OrderComponents, OrderHash, OrderStatus, Result, SettlementEvent, SystemClock, Zone,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    assets::AssetBackend,
    basic::{basic_event_items, basic_executions, derive_basic_order},
    conduit::ConduitController,
    reentrancy::ReentrancyLatch,
    router::TransferRouter,
};

/// Who is calling and how much native value they attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    pub value: U256,
}

impl CallContext {
    #[must_use]
    pub fn new(caller: Address) -> Self {
        Self {
            caller,
            value: U256::ZERO,
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    fn require_no_value(&self) -> Result<()> {
        if self.value.is_zero() {
            Ok(())
        } else {
            Err(OpenbarterError::InvalidMsgValue(self.value))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineInformation {
    pub version: String,
    pub domain_separator: B256,
    pub conduit_controller: Address,
}

/// Outcome of a `fulfill_available` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableFulfillment {
    /// One flag per supplied order; `false` for skipped orders.
    pub available_orders: Vec<bool>,
    pub executions: Vec<Execution>,
}

#[derive(Debug, Clone)]
struct EngineState<A> {
    ledger: OrderLedger,
    assets: A,
    conduits: ConduitController,
    events: Vec<SettlementEvent>,
}

pub struct SettlementEngine<A: AssetBackend> {
    config: EngineConfig,
    domain_separator: B256,
    verifier: SignatureVerifier,
    registry: CallbackRegistry,
    clock: Arc<dyn Clock>,
    latch: ReentrancyLatch,
    state: Mutex<EngineState<A>>,
}

impl<A: AssetBackend> std::fmt::Debug for SettlementEngine<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementEngine")
            .field("config", &self.config)
            .field("domain_separator", &self.domain_separator)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

pub struct SettlementEngineBuilder<A: AssetBackend> {
    config: EngineConfig,
    assets: A,
    registry: CallbackRegistry,
    clock: Arc<dyn Clock>,
}

impl<A: AssetBackend> SettlementEngineBuilder<A> {
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn contract_signer(mut self, account: Address, signer: Arc<dyn ContractSigner>) -> Self {
        self.registry.register_contract_signer(account, signer);
        self
    }

    #[must_use]
    pub fn zone(mut self, account: Address, zone: Arc<dyn Zone>) -> Self {
        self.registry.register_zone(account, zone);
        self
    }

    #[must_use]
    pub fn native_receiver(mut self, account: Address, receiver: Arc<dyn NativeReceiver>) -> Self {
        self.registry.register_native_receiver(account, receiver);
        self
    }

    pub fn build(self) -> Result<SettlementEngine<A>> {
        self.config.validate()?;
        let domain = TypedDataDomain::from(&self.config);
        let domain_separator = domain.separator();
        info!(
            name = %self.config.name,
            version = %self.config.version,
            chain_id = self.config.chain_id,
            engine = %self.config.engine_address,
            "Settlement engine started"
        );
        Ok(SettlementEngine {
            verifier: SignatureVerifier::new(&domain),
            domain_separator,
            registry: self.registry,
            clock: self.clock,
            latch: ReentrancyLatch::new(),
            state: Mutex::new(EngineState {
                ledger: OrderLedger::new(),
                assets: self.assets,
                conduits: ConduitController::new(self.config.conduit_controller),
                events: Vec::new(),
            }),
            config: self.config,
        })
    }
}

impl<A: AssetBackend> SettlementEngine<A> {
    #[must_use]
    pub fn builder(assets: A) -> SettlementEngineBuilder<A> {
        SettlementEngineBuilder {
            config: EngineConfig::default(),
            assets,
            registry: CallbackRegistry::new(),
            clock: Arc::new(SystemClock),
        }
    }

    // -----------------------------------------------------------------------
    // Call plumbing
    // -----------------------------------------------------------------------

    fn lock_state(&self) -> Result<MutexGuard<'_, EngineState<A>>> {
        self.state
            .lock()
            .map_err(|_| OpenbarterError::Internal("engine state lock poisoned".into()))
    }

    /// Run `op` on a working copy of the state and commit it on success.
    fn transact<R>(&self, op: impl FnOnce(&mut EngineState<A>, u64) -> Result<R>) -> Result<R> {
        let _entered = self.latch.enter()?;
        let mut working = self.lock_state()?.clone();
        let result = op(&mut working, self.clock.now())?;
        *self.lock_state()? = working;
        Ok(result)
    }

    fn validation_context(&self, caller: Address, now: u64) -> ValidationContext<'_> {
        ValidationContext {
            registry: &self.registry,
            verifier: &self.verifier,
            caller,
            now,
        }
    }

    /// Take the caller's value, run every transfer, refund what is left.
    fn settle(
        &self,
        state: &mut EngineState<A>,
        ctx: &CallContext,
        executions: &[Execution],
    ) -> Result<U256> {
        let engine = self.config.engine_address;
        if !ctx.value.is_zero() {
            state.assets.transfer_native(ctx.caller, engine, ctx.value)?;
        }
        let mut router = TransferRouter::new(
            &mut state.assets,
            &state.conduits,
            &self.registry,
            engine,
            ctx.caller,
            ctx.value,
        );
        router.execute_all(executions)?;
        router.finish(ctx.caller)
    }

    fn fulfilled_event(order: &ResolvedOrder, recipient: Address) -> SettlementEvent {
        SettlementEvent::OrderFulfilled {
            order_hash: order.order_hash,
            offerer: order.offerer,
            zone: order.zone,
            recipient,
            offer: order.offer.clone(),
            consideration: order.consideration.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Fulfillment
    // -----------------------------------------------------------------------

    /// Fulfill a basic order: one offer item for a single fungible payment
    /// split between the offerer and any additional recipients.
    pub fn fulfill_basic_order(
        &self,
        ctx: &CallContext,
        parameters: &BasicOrderParameters,
    ) -> Result<bool> {
        self.transact(|state, now| {
            if !parameters.basic_order_type.route.is_native_payment() {
                ctx.require_no_value()?;
            }
            let order = derive_basic_order(parameters)?;
            let order_hash = validate_basic_order_and_update_status(
                &mut state.ledger,
                &self.validation_context(ctx.caller, now),
                &order,
                &parameters.signature,
            )?;
            let executions = basic_executions(parameters, ctx.caller)?;
            let refund = self.settle(state, ctx, &executions)?;

            let (offer, consideration) = basic_event_items(&order);
            state.events.push(SettlementEvent::OrderFulfilled {
                order_hash,
                offerer: order.offerer,
                zone: order.zone,
                recipient: ctx.caller,
                offer,
                consideration,
            });
            info!(
                order = %order_hash,
                fulfiller = %ctx.caller,
                transfers = executions.len(),
                %refund,
                "Basic order fulfilled"
            );
            Ok(true)
        })
    }

    /// Fulfill an order in full, without criteria items.
    pub fn fulfill_order(
        &self,
        ctx: &CallContext,
        order: &Order,
        fulfiller_conduit_key: ConduitKey,
    ) -> Result<bool> {
        self.fulfill_advanced_order(
            ctx,
            &AdvancedOrder::from(order.clone()),
            &[],
            fulfiller_conduit_key,
            Address::ZERO,
        )
    }

    /// Fulfill a fraction of an order. Offer items go to `recipient` (the
    /// caller when zero); the caller pays every consideration item.
    pub fn fulfill_advanced_order(
        &self,
        ctx: &CallContext,
        order: &AdvancedOrder,
        criteria_resolvers: &[CriteriaResolver],
        fulfiller_conduit_key: ConduitKey,
        recipient: Address,
    ) -> Result<bool> {
        let recipient = if recipient.is_zero() {
            ctx.caller
        } else {
            recipient
        };
        self.transact(|state, now| {
            let batch = prepare_batch(
                &mut state.ledger,
                &self.validation_context(ctx.caller, now),
                std::slice::from_ref(order),
                criteria_resolvers,
                true,
                1,
            )?;
            let resolved = batch
                .into_iter()
                .next()
                .ok_or_else(|| OpenbarterError::Internal("empty batch".into()))?;
            let executions =
                resolved.direct_executions(ctx.caller, fulfiller_conduit_key, recipient);
            let refund = self.settle(state, ctx, &executions)?;

            state
                .events
                .push(Self::fulfilled_event(&resolved, recipient));
            info!(
                order = %resolved.order_hash,
                fulfiller = %ctx.caller,
                %recipient,
                numerator = order.numerator,
                denominator = order.denominator,
                %refund,
                "Order fulfilled"
            );
            Ok(true)
        })
    }

    /// Fulfill as many of `orders` as are still fillable, up to
    /// `maximum_fulfilled`.
    pub fn fulfill_available_orders(
        &self,
        ctx: &CallContext,
        orders: &[Order],
        offer_fulfillments: &[Vec<FulfillmentComponent>],
        consideration_fulfillments: &[Vec<FulfillmentComponent>],
        fulfiller_conduit_key: ConduitKey,
        maximum_fulfilled: usize,
    ) -> Result<AvailableFulfillment> {
        let orders: Vec<AdvancedOrder> = orders.iter().cloned().map(AdvancedOrder::from).collect();
        self.fulfill_available_advanced_orders(
            ctx,
            &orders,
            &[],
            offer_fulfillments,
            consideration_fulfillments,
            fulfiller_conduit_key,
            Address::ZERO,
            maximum_fulfilled,
        )
    }

    /// Advanced form of [`Self::fulfill_available_orders`]: fractions,
    /// criteria resolvers and an explicit recipient (the caller when zero).
    ///
    /// Expired, cancelled and filled orders are skipped. Fails with
    /// `NoSpecifiedOrdersAvailable` when nothing is left to settle.
    #[allow(clippy::too_many_arguments)]
    pub fn fulfill_available_advanced_orders(
        &self,
        ctx: &CallContext,
        orders: &[AdvancedOrder],
        criteria_resolvers: &[CriteriaResolver],
        offer_fulfillments: &[Vec<FulfillmentComponent>],
        consideration_fulfillments: &[Vec<FulfillmentComponent>],
        fulfiller_conduit_key: ConduitKey,
        recipient: Address,
        maximum_fulfilled: usize,
    ) -> Result<AvailableFulfillment> {
        let recipient = if recipient.is_zero() {
            ctx.caller
        } else {
            recipient
        };
        self.transact(|state, now| {
            let batch = prepare_batch(
                &mut state.ledger,
                &self.validation_context(ctx.caller, now),
                orders,
                criteria_resolvers,
                false,
                maximum_fulfilled,
            )?;
            let available_orders: Vec<bool> = batch.iter().map(|o| o.available).collect();
            if !available_orders.contains(&true) {
                return Err(OpenbarterError::NoSpecifiedOrdersAvailable);
            }
            let executions = aggregate_available_fulfillments(
                &batch,
                offer_fulfillments,
                consideration_fulfillments,
                ctx.caller,
                fulfiller_conduit_key,
                recipient,
            )?;
            if executions.is_empty() {
                return Err(OpenbarterError::NoSpecifiedOrdersAvailable);
            }
            let refund = self.settle(state, ctx, &executions)?;

            for order in batch.iter().filter(|o| o.available) {
                state.events.push(Self::fulfilled_event(order, recipient));
            }
            info!(
                orders = batch.len(),
                fulfilled = available_orders.iter().filter(|a| **a).count(),
                executions = executions.len(),
                %refund,
                "Available orders fulfilled"
            );
            Ok(AvailableFulfillment {
                available_orders,
                executions,
            })
        })
    }

    // -----------------------------------------------------------------------
    // Matching
    // -----------------------------------------------------------------------

    /// Match complete orders against each other.
    pub fn match_orders(
        &self,
        ctx: &CallContext,
        orders: &[Order],
        fulfillments: &[Fulfillment],
    ) -> Result<Vec<Execution>> {
        let orders: Vec<AdvancedOrder> = orders.iter().cloned().map(AdvancedOrder::from).collect();
        self.match_advanced_orders(ctx, &orders, &[], fulfillments)
    }

    /// Match orders (or fractions of them) against each other. Every order
    /// must be valid and every consideration item fully paid.
    pub fn match_advanced_orders(
        &self,
        ctx: &CallContext,
        orders: &[AdvancedOrder],
        criteria_resolvers: &[CriteriaResolver],
        fulfillments: &[Fulfillment],
    ) -> Result<Vec<Execution>> {
        self.transact(|state, now| {
            let batch = prepare_batch(
                &mut state.ledger,
                &self.validation_context(ctx.caller, now),
                orders,
                criteria_resolvers,
                true,
                usize::MAX,
            )?;
            let executions = match_fulfillments(&batch, fulfillments)?;
            let refund = self.settle(state, ctx, &executions)?;

            for order in &batch {
                state.events.push(Self::fulfilled_event(order, Address::ZERO));
            }
            state.events.push(SettlementEvent::OrdersMatched {
                order_hashes: batch.iter().map(|o| o.order_hash).collect(),
            });
            info!(
                orders = batch.len(),
                executions = executions.len(),
                %refund,
                "Orders matched"
            );
            Ok(executions)
        })
    }

    // -----------------------------------------------------------------------
    // Ledger management
    // -----------------------------------------------------------------------

    /// Pre-validate orders so they can be filled without a signature.
    pub fn validate(&self, ctx: &CallContext, orders: &[Order]) -> Result<bool> {
        ctx.require_no_value()?;
        self.transact(|state, now| {
            let events = validate_orders(
                &mut state.ledger,
                &self.validation_context(ctx.caller, now),
                orders,
            )?;
            debug!(validated = events.len(), "Orders validated");
            state.events.extend(events);
            Ok(true)
        })
    }

    /// Cancel orders. The caller must be each order's offerer or zone.
    pub fn cancel(&self, ctx: &CallContext, orders: &[OrderComponents]) -> Result<bool> {
        ctx.require_no_value()?;
        self.transact(|state, _| {
            let events = cancel_orders(&mut state.ledger, ctx.caller, orders)?;
            info!(caller = %ctx.caller, cancelled = events.len(), "Orders cancelled");
            state.events.extend(events);
            Ok(true)
        })
    }

    /// Bump the caller's nonce, invalidating every order signed under the
    /// previous one.
    pub fn increment_nonce(&self, ctx: &CallContext) -> Result<U256> {
        ctx.require_no_value()?;
        self.transact(|state, _| {
            let new_nonce = state.ledger.increment_nonce(ctx.caller);
            state.events.push(SettlementEvent::NonceIncremented {
                new_nonce,
                offerer: ctx.caller,
            });
            info!(offerer = %ctx.caller, %new_nonce, "Nonce incremented");
            Ok(new_nonce)
        })
    }

    // -----------------------------------------------------------------------
    // Conduits
    // -----------------------------------------------------------------------

    pub fn create_conduit(&self, conduit_key: ConduitKey) -> Result<Address> {
        self.transact(|state, _| Ok(state.conduits.create_conduit(conduit_key)))
    }

    pub fn update_channel(&self, conduit: Address, channel: Address, open: bool) -> Result<()> {
        self.transact(|state, _| state.conduits.update_channel(conduit, channel, open))
    }

    pub fn conduit_address(&self, conduit_key: ConduitKey) -> Result<Address> {
        Ok(self.lock_state()?.conduits.conduit_address(conduit_key))
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn get_order_hash(&self, components: &OrderComponents) -> OrderHash {
        hash_order_components(components)
    }

    pub fn get_order_status(&self, order_hash: &OrderHash) -> Result<OrderStatus> {
        Ok(self.lock_state()?.ledger.status(order_hash))
    }

    pub fn get_nonce(&self, offerer: &Address) -> Result<U256> {
        Ok(self.lock_state()?.ledger.nonce(offerer))
    }

    #[must_use]
    pub fn information(&self) -> EngineInformation {
        EngineInformation {
            version: self.config.version.clone(),
            domain_separator: self.domain_separator,
            conduit_controller: self.config.conduit_controller,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.config.engine_address
    }

    #[must_use]
    pub fn domain_separator(&self) -> B256 {
        self.domain_separator
    }

    /// Committed events, oldest first.
    pub fn events(&self) -> Result<Vec<SettlementEvent>> {
        Ok(self.lock_state()?.events.clone())
    }

    /// Read or seed the asset backend outside of any settlement call.
    pub fn with_assets<R>(&self, f: impl FnOnce(&mut A) -> R) -> Result<R> {
        Ok(f(&mut self.lock_state()?.assets))
    }
}
