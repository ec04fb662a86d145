//! End-to-end settlement tests.
//!
//! Every scenario drives the public engine entry points against the
//! in-memory asset backend: orders are signed, seeded balances are moved
//! and the resulting balances, statuses and events are checked.

use std::sync::{Arc, OnceLock, Weak};

use alloy_primitives::{Address, B256, U256};
use openbarter_matchcore::{OrderSigner, build_criteria_tree, derive_order_hash};
use openbarter_settlement::{
    AssetBackend, CallContext, InMemoryAssets, SettlementEngine, SettlementEngineBuilder,
    TokenQuirk, basic::derive_basic_order,
};
use openbarter_types::{
    AdditionalRecipient, AdvancedOrder, BasicOrderParameters, BasicOrderRoute, BasicOrderType,
    CallbackFailure, CallbackResult, ConduitKey, ConsiderationItem, ContractSigner,
    CriteriaResolver, FixedClock, Fulfillment, FulfillmentComponent, ItemType, NativeReceiver,
    OfferItem, OpenbarterError, Order, OrderHash, OrderParameters, OrderType, SettlementEvent,
    Side, Zone, ZoneContext, constants,
};
use tracing_subscriber::EnvFilter;

const NOW: u64 = 1_000;

fn u(v: u64) -> U256 {
    U256::from(v)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn buyer() -> Address {
    Address::repeat_byte(0xb0)
}

fn nft() -> Address {
    Address::repeat_byte(0x72)
}

fn multi() -> Address {
    Address::repeat_byte(0x15)
}

fn coin() -> Address {
    Address::repeat_byte(0x20)
}

fn fee_recipient() -> Address {
    Address::repeat_byte(0xfe)
}

fn royalty_recipient() -> Address {
    Address::repeat_byte(0x77)
}

type Builder = SettlementEngineBuilder<InMemoryAssets>;

/// Engine, clock and helpers shared by every scenario.
struct Market {
    engine: Arc<SettlementEngine<InMemoryAssets>>,
    clock: Arc<FixedClock>,
}

impl Market {
    fn new() -> Self {
        Self::with(|builder| builder)
    }

    fn with(configure: impl FnOnce(Builder) -> Builder) -> Self {
        init_tracing();
        let clock = Arc::new(FixedClock::new(NOW));
        let builder = SettlementEngine::builder(InMemoryAssets::new()).clock(clock.clone());
        let engine = configure(builder).build().unwrap();
        Self {
            engine: Arc::new(engine),
            clock,
        }
    }

    fn engine_address(&self) -> Address {
        self.engine.address()
    }

    fn seed(&self, f: impl FnOnce(&mut InMemoryAssets)) {
        self.engine.with_assets(f).unwrap();
    }

    fn read<R>(&self, f: impl FnOnce(&InMemoryAssets) -> R) -> R {
        self.engine.with_assets(|assets| f(assets)).unwrap()
    }

    fn native(&self, account: Address) -> U256 {
        self.read(|assets| assets.native_balance(&account))
    }

    fn hash(&self, parameters: &OrderParameters) -> OrderHash {
        let nonce = self.engine.get_nonce(&parameters.offerer).unwrap();
        derive_order_hash(parameters, nonce).unwrap()
    }

    /// Sign under the offerer's current nonce.
    fn sign(&self, signer: &OrderSigner, parameters: OrderParameters) -> Order {
        let hash = self.hash(&parameters);
        let signature = signer
            .sign_order(self.engine.domain_separator(), hash)
            .unwrap();
        Order {
            parameters,
            signature,
        }
    }

    /// Seller holds `id` of the shared NFT and lets the engine move it.
    fn list_nft(&self, seller: Address, id: u64) {
        let engine = self.engine_address();
        self.seed(|assets| {
            assets.mint_erc721(nft(), seller, u(id));
            assets.set_approval_for_all(nft(), seller, engine, true);
        });
    }
}

/// NFT for 10 to the seller plus 1 each to the fee and royalty recipients.
fn nft_for_native(seller: Address, id: u64) -> OrderParameters {
    OrderParameters::dummy(
        seller,
        vec![OfferItem::erc721(nft(), u(id))],
        vec![
            ConsiderationItem::native(u(10), seller),
            ConsiderationItem::native(u(1), fee_recipient()),
            ConsiderationItem::native(u(1), royalty_recipient()),
        ],
    )
}

// ============================================================================
// Test: basic order, NFT for native currency with two fee recipients
// ============================================================================

#[test]
fn e2e_basic_order_nft_for_native() {
    let market = Market::new();
    let seller = OrderSigner::from_seed(1);
    market.list_nft(seller.address(), 7);
    market.seed(|assets| assets.deal_native(buyer(), u(12)));

    // 1. Seller signs the expanded basic order
    let mut basic = BasicOrderParameters {
        consideration_token: Address::ZERO,
        consideration_identifier: U256::ZERO,
        consideration_amount: u(10),
        offerer: seller.address(),
        zone: Address::ZERO,
        offer_token: nft(),
        offer_identifier: u(7),
        offer_amount: u(1),
        basic_order_type: BasicOrderType::new(OrderType::FullOpen, BasicOrderRoute::EthToErc721),
        start_time: 0,
        end_time: NOW * 10,
        zone_hash: B256::ZERO,
        salt: u(42),
        offerer_conduit_key: ConduitKey::NONE,
        fulfiller_conduit_key: ConduitKey::NONE,
        total_original_additional_recipients: 2,
        additional_recipients: vec![
            AdditionalRecipient {
                amount: u(1),
                recipient: fee_recipient(),
            },
            AdditionalRecipient {
                amount: u(1),
                recipient: royalty_recipient(),
            },
        ],
        signature: Vec::new(),
    };
    let parameters = derive_basic_order(&basic).unwrap();
    let order_hash = market.hash(&parameters);
    basic.signature = market.sign(&seller, parameters).signature;

    // 2. Buyer fulfills with exactly enough value
    let ctx = CallContext::new(buyer()).with_value(u(12));
    assert!(market.engine.fulfill_basic_order(&ctx, &basic).unwrap());

    // 3. Assets moved, nothing left in the engine
    assert_eq!(market.read(|a| a.erc721_owner(nft(), u(7))), Some(buyer()));
    assert_eq!(market.native(seller.address()), u(10));
    assert_eq!(market.native(fee_recipient()), u(1));
    assert_eq!(market.native(royalty_recipient()), u(1));
    assert_eq!(market.native(buyer()), U256::ZERO);
    assert_eq!(market.native(market.engine_address()), U256::ZERO);

    // 4. Status and event
    let status = market.engine.get_order_status(&order_hash).unwrap();
    assert!(status.is_fully_filled());
    let events = market.engine.events().unwrap();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        SettlementEvent::OrderFulfilled { order_hash: h, recipient, consideration, .. }
            if *h == order_hash && *recipient == buyer() && consideration.len() == 3
    ));

    // 5. Basic orders only fill untouched orders
    market.seed(|assets| assets.deal_native(buyer(), u(12)));
    assert_eq!(
        market.engine.fulfill_basic_order(&ctx, &basic).unwrap_err(),
        OpenbarterError::OrderPartiallyFilled(order_hash)
    );
}

// ============================================================================
// Test: standard order with excess value refunded to the caller
// ============================================================================

#[test]
fn e2e_fulfill_order_refunds_excess_value() {
    let market = Market::new();
    let seller = OrderSigner::from_seed(2);
    market.list_nft(seller.address(), 8);
    market.seed(|assets| assets.deal_native(buyer(), u(15)));

    let order = market.sign(&seller, nft_for_native(seller.address(), 8));
    let ctx = CallContext::new(buyer()).with_value(u(15));
    assert!(market.engine.fulfill_order(&ctx, &order, ConduitKey::NONE).unwrap());

    assert_eq!(market.read(|a| a.erc721_owner(nft(), u(8))), Some(buyer()));
    assert_eq!(market.native(seller.address()), u(10));
    assert_eq!(market.native(buyer()), u(3));
    assert_eq!(market.native(market.engine_address()), U256::ZERO);
}

#[test]
fn e2e_insufficient_value_moves_nothing() {
    let market = Market::new();
    let seller = OrderSigner::from_seed(3);
    market.list_nft(seller.address(), 9);
    market.seed(|assets| assets.deal_native(buyer(), u(11)));

    let order = market.sign(&seller, nft_for_native(seller.address(), 9));
    let ctx = CallContext::new(buyer()).with_value(u(11));
    assert!(matches!(
        market.engine.fulfill_order(&ctx, &order, ConduitKey::NONE),
        Err(OpenbarterError::InsufficientEtherSupplied { .. })
    ));

    assert_eq!(
        market.read(|a| a.erc721_owner(nft(), u(9))),
        Some(seller.address())
    );
    assert_eq!(market.native(buyer()), u(11));
    assert!(market.engine.events().unwrap().is_empty());
}

#[test]
fn e2e_compact_signature_fills_order() {
    let market = Market::new();
    let seller = OrderSigner::from_seed(24);
    market.list_nft(seller.address(), 10);
    market.seed(|assets| assets.deal_native(buyer(), u(12)));

    let parameters = nft_for_native(seller.address(), 10);
    let order_hash = market.hash(&parameters);
    let signature = seller
        .sign_order_compact(market.engine.domain_separator(), order_hash)
        .unwrap();
    assert_eq!(signature.len(), 64);
    let order = Order {
        parameters,
        signature,
    };

    let ctx = CallContext::new(buyer()).with_value(u(12));
    assert!(market.engine.fulfill_order(&ctx, &order, ConduitKey::NONE).unwrap());
    assert_eq!(market.read(|a| a.erc721_owner(nft(), u(10))), Some(buyer()));
    assert_eq!(market.native(seller.address()), u(10));
    assert!(
        market
            .engine
            .get_order_status(&order_hash)
            .unwrap()
            .is_fully_filled()
    );
}

// ============================================================================
// Test: partial fills accumulate and clamp at the order size
// ============================================================================

#[test]
fn e2e_partial_fills_clamp_to_full() {
    let market = Market::new();
    let seller = OrderSigner::from_seed(4);
    let engine = market.engine_address();
    market.seed(|assets| {
        assets.mint_erc1155(multi(), seller.address(), u(1), u(100));
        assets.set_approval_for_all(multi(), seller.address(), engine, true);
        assets.mint_erc20(coin(), buyer(), u(1000));
        assets.approve_erc20(coin(), buyer(), engine, U256::MAX);
    });

    // 1. 100 units offered for 1000 coins, partial fills allowed
    let parameters = OrderParameters::dummy(
        seller.address(),
        vec![OfferItem::erc1155(multi(), u(1), u(100))],
        vec![ConsiderationItem::erc20(coin(), u(1000), seller.address())],
    )
    .with_order_type(OrderType::PartialOpen);
    let order_hash = market.hash(&parameters);
    let order = AdvancedOrder::from(market.sign(&seller, parameters));
    let ctx = CallContext::new(buyer());
    let fill = |numerator: u128, denominator: u128| {
        market.engine.fulfill_advanced_order(
            &ctx,
            &order.clone().with_fraction(numerator, denominator),
            &[],
            ConduitKey::NONE,
            Address::ZERO,
        )
    };
    let bought = || market.read(|a| a.erc1155_balance(multi(), u(1), buyer()));
    let paid = || market.read(|a| a.erc20_balance(coin(), seller.address()));

    // 2. 2/10
    fill(2, 10).unwrap();
    assert_eq!((bought(), paid()), (u(20), u(200)));

    let status = market.engine.get_order_status(&order_hash).unwrap();
    assert_eq!((status.total_filled, status.total_size), (1, 5));

    // 3. 1/2 on top: 7/10
    fill(1, 2).unwrap();
    let status = market.engine.get_order_status(&order_hash).unwrap();
    assert_eq!((status.total_filled, status.total_size), (7, 10));
    assert_eq!((bought(), paid()), (u(70), u(700)));

    // 4. Another 1/2 only has 3/10 left: clamped, order complete at 1/1
    fill(1, 2).unwrap();
    let status = market.engine.get_order_status(&order_hash).unwrap();
    assert_eq!((status.total_filled, status.total_size), (1, 1));
    assert_eq!((bought(), paid()), (u(100), u(1000)));

    // 5. Nothing left
    assert_eq!(
        fill(1, 10).unwrap_err(),
        OpenbarterError::OrderAlreadyFilled(order_hash)
    );
}

#[test]
fn e2e_partial_fills_consume_whole_stack() {
    let market = Market::new();
    let seller = OrderSigner::from_seed(23);
    let engine = market.engine_address();
    market.seed(|assets| {
        assets.mint_erc1155(multi(), seller.address(), u(2), u(100));
        assets.set_approval_for_all(multi(), seller.address(), engine, true);
        assets.mint_erc20(coin(), buyer(), u(1000));
        assets.approve_erc20(coin(), buyer(), engine, U256::MAX);
    });
    let parameters = OrderParameters::dummy(
        seller.address(),
        vec![OfferItem::erc1155(multi(), u(2), u(100))],
        vec![ConsiderationItem::erc20(coin(), u(1000), seller.address())],
    )
    .with_order_type(OrderType::PartialOpen);
    let order_hash = market.hash(&parameters);
    let order = AdvancedOrder::from(market.sign(&seller, parameters));
    let ctx = CallContext::new(buyer());

    for (numerator, denominator) in [(2, 10), (1, 2), (3, 10)] {
        market
            .engine
            .fulfill_advanced_order(
                &ctx,
                &order.clone().with_fraction(numerator, denominator),
                &[],
                ConduitKey::NONE,
                Address::ZERO,
            )
            .unwrap();
    }

    // 1/5 + 1/2 + 3/10 lands exactly on the order size
    let status = market.engine.get_order_status(&order_hash).unwrap();
    assert!(status.is_fully_filled());
    assert_eq!((status.total_filled, status.total_size), (1, 1));
    assert_eq!(market.read(|a| a.erc1155_balance(multi(), u(2), buyer())), u(100));
    assert_eq!(market.read(|a| a.erc20_balance(coin(), seller.address())), u(1000));
}

#[test]
fn e2e_partial_fill_rejected_for_full_order() {
    let market = Market::new();
    let seller = OrderSigner::from_seed(5);
    market.list_nft(seller.address(), 1);
    let order = market.sign(&seller, nft_for_native(seller.address(), 1));

    let result = market.engine.fulfill_advanced_order(
        &CallContext::new(buyer()),
        &AdvancedOrder::from(order).with_fraction(1, 2),
        &[],
        ConduitKey::NONE,
        Address::ZERO,
    );
    assert_eq!(
        result.unwrap_err(),
        OpenbarterError::PartialFillsNotEnabledForOrder
    );
}

// ============================================================================
// Test: matching a listing against a native-currency bid
// ============================================================================

/// Seller's signed listing and the buyer's unsigned 12-unit bid for it.
fn listing_and_bid(market: &Market, seller: &OrderSigner, id: u64) -> (Order, Order) {
    market.list_nft(seller.address(), id);
    market.seed(|assets| assets.deal_native(buyer(), u(12)));
    let listing = market.sign(seller, nft_for_native(seller.address(), id));
    let bid = Order {
        parameters: OrderParameters::dummy(
            buyer(),
            vec![OfferItem::native(u(12))],
            vec![ConsiderationItem::erc721(nft(), u(id), buyer())],
        ),
        signature: Vec::new(),
    };
    (listing, bid)
}

#[test]
fn e2e_match_listing_against_bid() {
    let market = Market::new();
    let seller = OrderSigner::from_seed(6);
    let (listing, bid) = listing_and_bid(&market, &seller, 3);
    let listing_hash = market.hash(&listing.parameters);
    let bid_hash = market.hash(&bid.parameters);

    // NFT to the buyer, then the bid split across the three payees. The
    // 12 offered covers 10, the excess 2 rolls over to the fee legs.
    let fulfillments = vec![
        Fulfillment::single((0, 0), (1, 0)),
        Fulfillment::single((1, 0), (0, 0)),
        Fulfillment::single((1, 0), (0, 1)),
        Fulfillment::single((1, 0), (0, 2)),
    ];
    let ctx = CallContext::new(buyer()).with_value(u(12));
    let executions = market
        .engine
        .match_orders(&ctx, &[listing, bid], &fulfillments)
        .unwrap();

    assert_eq!(executions.len(), 4);
    assert_eq!(executions[0].item.item_type, ItemType::Erc721);
    assert_eq!(executions[0].item.recipient, buyer());
    assert_eq!(executions[1].item.amount, u(10));
    assert_eq!(executions[2].item.amount, u(1));
    assert_eq!(executions[3].item.amount, u(1));

    assert_eq!(market.read(|a| a.erc721_owner(nft(), u(3))), Some(buyer()));
    assert_eq!(market.native(seller.address()), u(10));
    assert_eq!(market.native(fee_recipient()), u(1));
    assert_eq!(market.native(royalty_recipient()), u(1));
    assert_eq!(market.native(buyer()), U256::ZERO);

    let events = market.engine.events().unwrap();
    assert_eq!(events.len(), 3);
    assert!(matches!(
        &events[0],
        SettlementEvent::OrderFulfilled { order_hash, recipient, .. }
            if *order_hash == listing_hash && *recipient == Address::ZERO
    ));
    assert_eq!(
        events[2],
        SettlementEvent::OrdersMatched {
            order_hashes: vec![listing_hash, bid_hash]
        }
    );
}

#[test]
fn e2e_match_unpaid_consideration_fails() {
    let market = Market::new();
    let seller = OrderSigner::from_seed(7);
    let (listing, bid) = listing_and_bid(&market, &seller, 4);

    // Royalty leg never fulfilled
    let fulfillments = vec![
        Fulfillment::single((0, 0), (1, 0)),
        Fulfillment::single((1, 0), (0, 0)),
        Fulfillment::single((1, 0), (0, 1)),
    ];
    let ctx = CallContext::new(buyer()).with_value(u(12));
    assert!(matches!(
        market.engine.match_orders(&ctx, &[listing, bid], &fulfillments),
        Err(OpenbarterError::ConsiderationNotMet {
            order_index: 0,
            consideration_index: 2,
            ..
        })
    ));
    assert_eq!(market.native(buyer()), u(12));
}

#[test]
fn e2e_match_cannot_spend_another_offerers_native() {
    let market = Market::new();
    let seller = OrderSigner::from_seed(25);
    let bidder = OrderSigner::from_seed(26);
    let keeper = Address::repeat_byte(0x4b);
    market.list_nft(seller.address(), 6);
    market.seed(|assets| {
        assets.deal_native(bidder.address(), u(12));
        assets.deal_native(keeper, u(12));
    });
    let listing = market.sign(&seller, nft_for_native(seller.address(), 6));
    let bid = market.sign(
        &bidder,
        OrderParameters::dummy(
            bidder.address(),
            vec![OfferItem::native(u(12))],
            vec![ConsiderationItem::erc721(nft(), u(6), bidder.address())],
        ),
    );

    // The bid's native offer belongs to the bidder, not the caller
    let fulfillments = vec![
        Fulfillment::single((0, 0), (1, 0)),
        Fulfillment::single((1, 0), (0, 0)),
        Fulfillment::single((1, 0), (0, 1)),
        Fulfillment::single((1, 0), (0, 2)),
    ];
    let ctx = CallContext::new(keeper).with_value(u(12));
    assert_eq!(
        market
            .engine
            .match_orders(&ctx, &[listing, bid], &fulfillments)
            .unwrap_err(),
        OpenbarterError::InvalidNativeOfferItem {
            offerer: bidder.address()
        }
    );

    assert_eq!(
        market.read(|a| a.erc721_owner(nft(), u(6))),
        Some(seller.address())
    );
    assert_eq!(market.native(keeper), u(12));
    assert_eq!(market.native(bidder.address()), u(12));
    assert!(market.engine.events().unwrap().is_empty());
}

// ============================================================================
// Test: malformed fulfillment components leave every balance untouched
// ============================================================================

#[test]
fn e2e_invalid_fulfillment_components() {
    let market = Market::new();
    let seller = OrderSigner::from_seed(8);
    let (listing, bid) = listing_and_bid(&market, &seller, 5);
    let listing_hash = market.hash(&listing.parameters);
    let orders = [listing, bid];
    let ctx = CallContext::new(buyer()).with_value(u(12));

    let out_of_range_order = vec![Fulfillment::single((5, 0), (1, 0))];
    let out_of_range_item = vec![Fulfillment::single((0, 4), (1, 0))];
    let mixed_types = vec![Fulfillment {
        offer_components: vec![FulfillmentComponent::new(0, 0), FulfillmentComponent::new(1, 0)],
        consideration_components: vec![FulfillmentComponent::new(1, 0)],
    }];

    for fulfillments in [out_of_range_order, out_of_range_item, mixed_types] {
        assert!(matches!(
            market.engine.match_orders(&ctx, &orders, &fulfillments),
            Err(OpenbarterError::InvalidFulfillmentComponentData { .. })
        ));
    }

    assert_eq!(
        market.read(|a| a.erc721_owner(nft(), u(5))),
        Some(seller.address())
    );
    assert_eq!(market.native(buyer()), u(12));
    assert!(
        market
            .engine
            .get_order_status(&listing_hash)
            .unwrap()
            .is_untouched()
    );
    assert!(market.engine.events().unwrap().is_empty());
}

// ============================================================================
// Test: nonce increment invalidates outstanding signatures
// ============================================================================

#[test]
fn e2e_nonce_increment_invalidates_signatures() {
    let market = Market::new();
    let seller = OrderSigner::from_seed(9);
    market.list_nft(seller.address(), 11);
    market.seed(|assets| assets.deal_native(buyer(), u(24)));
    let parameters = nft_for_native(seller.address(), 11);
    let stale = market.sign(&seller, parameters.clone());

    let seller_ctx = CallContext::new(seller.address());
    assert_eq!(market.engine.increment_nonce(&seller_ctx).unwrap(), u(1));

    let ctx = CallContext::new(buyer()).with_value(u(12));
    assert!(matches!(
        market.engine.fulfill_order(&ctx, &stale, ConduitKey::NONE),
        Err(OpenbarterError::InvalidSigner { .. })
    ));

    let fresh = market.sign(&seller, parameters);
    assert!(market.engine.fulfill_order(&ctx, &fresh, ConduitKey::NONE).unwrap());
    assert_eq!(market.read(|a| a.erc721_owner(nft(), u(11))), Some(buyer()));
}

// ============================================================================
// Test: collection offer resolved with a merkle proof
// ============================================================================

#[test]
fn e2e_collection_offer_with_criteria_proof() {
    let market = Market::new();
    let bidder = OrderSigner::from_seed(10);
    let holder = Address::repeat_byte(0x40);
    let engine = market.engine_address();
    market.list_nft(holder, 3);
    market.seed(|assets| {
        assets.mint_erc20(coin(), bidder.address(), u(100));
        assets.approve_erc20(coin(), bidder.address(), engine, U256::MAX);
    });

    // 1. Bid 100 coins for any of ids 1..=4
    let ids: Vec<U256> = (1u64..=4).map(U256::from).collect();
    let (root, proofs) = build_criteria_tree(&ids);
    let order = market.sign(
        &bidder,
        OrderParameters::dummy(
            bidder.address(),
            vec![OfferItem::erc20(coin(), u(100))],
            vec![ConsiderationItem::fixed(
                ItemType::Erc721WithCriteria,
                nft(),
                root,
                u(1),
                bidder.address(),
            )],
        ),
    );
    let order = AdvancedOrder::from(order);
    let ctx = CallContext::new(holder);
    let resolver = |proof: Vec<B256>| CriteriaResolver {
        order_index: 0,
        side: Side::Consideration,
        index: 0,
        identifier: u(3),
        criteria_proof: proof,
    };

    // 2. Tampered proof
    let mut tampered = proofs[2].clone();
    tampered[0] = B256::repeat_byte(0xab);
    assert_eq!(
        market
            .engine
            .fulfill_advanced_order(&ctx, &order, &[resolver(tampered)], ConduitKey::NONE, Address::ZERO)
            .unwrap_err(),
        OpenbarterError::InvalidProof
    );
    assert_eq!(market.read(|a| a.erc721_owner(nft(), u(3))), Some(holder));

    // 3. Valid proof for id 3
    market
        .engine
        .fulfill_advanced_order(
            &ctx,
            &order,
            &[resolver(proofs[2].clone())],
            ConduitKey::NONE,
            Address::ZERO,
        )
        .unwrap();
    assert_eq!(
        market.read(|a| a.erc721_owner(nft(), u(3))),
        Some(bidder.address())
    );
    assert_eq!(market.read(|a| a.erc20_balance(coin(), holder)), u(100));
}

// ============================================================================
// Test: fulfill_available skips dead orders and respects the cap
// ============================================================================

fn token_for_one(seller: Address, id: u64) -> OrderParameters {
    OrderParameters::dummy(
        seller,
        vec![OfferItem::erc1155(multi(), u(id), u(1))],
        vec![ConsiderationItem::native(u(1), seller)],
    )
}

fn one_group_per_order(count: usize) -> Vec<Vec<FulfillmentComponent>> {
    (0..count)
        .map(|order| vec![FulfillmentComponent::new(order, 0)])
        .collect()
}

#[test]
fn e2e_fulfill_available_skips_expired_and_cancelled() {
    let market = Market::new();
    let seller = OrderSigner::from_seed(12);
    let engine = market.engine_address();
    market.seed(|assets| {
        for id in 0..3 {
            assets.mint_erc1155(multi(), seller.address(), u(id), u(1));
        }
        assets.set_approval_for_all(multi(), seller.address(), engine, true);
        assets.deal_native(buyer(), u(3));
    });

    // 1. One expired, one cancelled, one live
    let expired = market.sign(&seller, token_for_one(seller.address(), 0).with_window(0, NOW / 2));
    let cancelled = market.sign(&seller, token_for_one(seller.address(), 1));
    let live = market.sign(&seller, token_for_one(seller.address(), 2));
    let cancelled_components = cancelled.parameters.to_components(U256::ZERO);
    market
        .engine
        .cancel(&CallContext::new(seller.address()), &[cancelled_components])
        .unwrap();

    // 2. Buyer sends value for all three
    let orders = [expired, cancelled, live];
    let groups = one_group_per_order(3);
    let ctx = CallContext::new(buyer()).with_value(u(3));
    let outcome = market
        .engine
        .fulfill_available_orders(&ctx, &orders, &groups, &groups, ConduitKey::NONE, 10)
        .unwrap();

    // 3. Only the live order settled; unspent value refunded
    assert_eq!(outcome.available_orders, vec![false, false, true]);
    assert_eq!(outcome.executions.len(), 2);
    assert_eq!(market.read(|a| a.erc1155_balance(multi(), u(2), buyer())), u(1));
    assert_eq!(market.read(|a| a.erc1155_balance(multi(), u(0), buyer())), U256::ZERO);
    assert_eq!(market.native(seller.address()), u(1));
    assert_eq!(market.native(buyer()), u(2));

    let events = market.engine.events().unwrap();
    assert!(matches!(events[0], SettlementEvent::OrderCancelled { .. }));
    assert_eq!(events.len(), 2);

    // 4. Nothing left to fill
    let ctx = CallContext::new(buyer()).with_value(u(2));
    assert_eq!(
        market
            .engine
            .fulfill_available_orders(&ctx, &orders, &groups, &groups, ConduitKey::NONE, 10)
            .unwrap_err(),
        OpenbarterError::NoSpecifiedOrdersAvailable
    );
}

#[test]
fn e2e_fulfill_available_respects_maximum() {
    let market = Market::new();
    let seller = OrderSigner::from_seed(13);
    let engine = market.engine_address();
    market.seed(|assets| {
        for id in 0..2 {
            assets.mint_erc1155(multi(), seller.address(), u(id), u(1));
        }
        assets.set_approval_for_all(multi(), seller.address(), engine, true);
        assets.deal_native(buyer(), u(2));
    });
    let orders = [
        market.sign(&seller, token_for_one(seller.address(), 0)),
        market.sign(&seller, token_for_one(seller.address(), 1)),
    ];
    let groups = one_group_per_order(2);

    let ctx = CallContext::new(buyer()).with_value(u(2));
    let outcome = market
        .engine
        .fulfill_available_orders(&ctx, &orders, &groups, &groups, ConduitKey::NONE, 1)
        .unwrap();
    assert_eq!(outcome.available_orders, vec![true, false]);
    assert_eq!(market.native(buyer()), u(1));
    assert_eq!(market.read(|a| a.erc1155_balance(multi(), u(1), buyer())), U256::ZERO);
}

#[test]
fn e2e_orders_expire_with_the_clock() {
    let market = Market::new();
    let seller = OrderSigner::from_seed(14);
    market.list_nft(seller.address(), 12);
    market.seed(|assets| assets.deal_native(buyer(), u(12)));
    let order = market.sign(
        &seller,
        nft_for_native(seller.address(), 12).with_window(0, NOW + 10),
    );

    market.clock.advance(11);
    let ctx = CallContext::new(buyer()).with_value(u(12));
    assert!(matches!(
        market.engine.fulfill_order(&ctx, &order, ConduitKey::NONE),
        Err(OpenbarterError::InvalidTime { .. })
    ));
}

// ============================================================================
// Test: a payment hook calling back into the engine
// ============================================================================

/// Native receiver that calls back into the engine on every payment.
struct CallsBack {
    engine: OnceLock<Weak<SettlementEngine<InMemoryAssets>>>,
    account: Address,
    mutate: bool,
}

impl CallsBack {
    fn new(account: Address, mutate: bool) -> Arc<Self> {
        Arc::new(Self {
            engine: OnceLock::new(),
            account,
            mutate,
        })
    }
}

impl NativeReceiver for CallsBack {
    fn on_receive(&self, _from: Address, _amount: U256) -> Result<(), CallbackFailure> {
        let Some(engine) = self.engine.get().and_then(Weak::upgrade) else {
            return Ok(());
        };
        let outcome = if self.mutate {
            engine
                .increment_nonce(&CallContext::new(self.account))
                .map(|_| ())
        } else {
            engine.get_nonce(&self.account).map(|_| ())
        };
        outcome.map_err(|err| CallbackFailure::Nested(Box::new(err)))
    }
}

#[test]
fn e2e_reentrant_payment_hook_rejected() {
    let seller = OrderSigner::from_seed(15);
    let hook = CallsBack::new(seller.address(), true);
    let market = Market::with(|b| b.native_receiver(seller.address(), hook.clone()));
    hook.engine.set(Arc::downgrade(&market.engine)).unwrap();
    market.list_nft(seller.address(), 20);
    market.seed(|assets| assets.deal_native(buyer(), u(12)));

    let order = market.sign(&seller, nft_for_native(seller.address(), 20));
    let order_hash = market.hash(&order.parameters);
    let ctx = CallContext::new(buyer()).with_value(u(12));
    assert_eq!(
        market
            .engine
            .fulfill_order(&ctx, &order, ConduitKey::NONE)
            .unwrap_err(),
        OpenbarterError::NoReentrantCalls
    );

    // The whole call rolled back, including the NFT leg that ran first
    assert_eq!(
        market.read(|a| a.erc721_owner(nft(), u(20))),
        Some(seller.address())
    );
    assert_eq!(market.native(buyer()), u(12));
    assert_eq!(market.engine.get_nonce(&seller.address()).unwrap(), U256::ZERO);
    assert!(
        market
            .engine
            .get_order_status(&order_hash)
            .unwrap()
            .is_untouched()
    );
    assert!(market.engine.events().unwrap().is_empty());
}

#[test]
fn e2e_payment_hook_may_read_state() {
    let seller = OrderSigner::from_seed(16);
    let hook = CallsBack::new(seller.address(), false);
    let market = Market::with(|b| b.native_receiver(seller.address(), hook.clone()));
    hook.engine.set(Arc::downgrade(&market.engine)).unwrap();
    market.list_nft(seller.address(), 21);
    market.seed(|assets| assets.deal_native(buyer(), u(12)));

    let order = market.sign(&seller, nft_for_native(seller.address(), 21));
    let ctx = CallContext::new(buyer()).with_value(u(12));
    assert!(market.engine.fulfill_order(&ctx, &order, ConduitKey::NONE).unwrap());
    assert_eq!(market.native(seller.address()), u(10));
}

// ============================================================================
// Test: conduit routing and channel permissions
// ============================================================================

#[test]
fn e2e_conduit_transfers_need_open_channel() {
    let market = Market::new();
    let seller = OrderSigner::from_seed(17);
    let engine = market.engine_address();
    let key = ConduitKey::new(seller.address(), [0u8; 12]);
    let conduit = market.engine.create_conduit(key).unwrap();
    assert_eq!(market.engine.conduit_address(key).unwrap(), conduit);

    market.seed(|assets| {
        for id in [30, 31] {
            assets.mint_erc721(nft(), seller.address(), u(id));
        }
        assets.set_approval_for_all(nft(), seller.address(), conduit, true);
        assets.mint_erc20(coin(), buyer(), u(100));
        assets.approve_erc20(coin(), buyer(), engine, U256::MAX);
    });
    let listing = |id: u64, conduit_key: ConduitKey| {
        market.sign(
            &seller,
            OrderParameters::dummy(
                seller.address(),
                vec![OfferItem::erc721(nft(), u(id))],
                vec![ConsiderationItem::erc20(coin(), u(50), seller.address())],
            )
            .with_conduit_key(conduit_key),
        )
    };
    let ctx = CallContext::new(buyer());

    // 1. Key that never had a conduit created
    let unknown = listing(31, ConduitKey::new(seller.address(), [9u8; 12]));
    assert!(matches!(
        market.engine.fulfill_order(&ctx, &unknown, ConduitKey::NONE),
        Err(OpenbarterError::InvalidConduit { .. })
    ));

    // 2. Channel for the engine still closed
    let order = listing(30, key);
    assert_eq!(
        market
            .engine
            .fulfill_order(&ctx, &order, ConduitKey::NONE)
            .unwrap_err(),
        OpenbarterError::ChannelClosed {
            conduit,
            channel: engine
        }
    );

    // 3. Open it and settle
    market.engine.update_channel(conduit, engine, true).unwrap();
    assert!(market.engine.fulfill_order(&ctx, &order, ConduitKey::NONE).unwrap());
    assert_eq!(market.read(|a| a.erc721_owner(nft(), u(30))), Some(buyer()));
    assert_eq!(market.read(|a| a.erc20_balance(coin(), seller.address())), u(50));
}

// ============================================================================
// Test: non-conforming ERC20 tokens
// ============================================================================

#[test]
fn e2e_erc20_without_true_return_fails() {
    for quirk in [TokenQuirk::ReturnsFalse, TokenQuirk::ReturnsNothing] {
        let market = Market::new();
        let seller = OrderSigner::from_seed(18);
        let engine = market.engine_address();
        market.list_nft(seller.address(), 40);
        market.seed(|assets| {
            assets.mint_erc20(coin(), buyer(), u(100));
            assets.approve_erc20(coin(), buyer(), engine, U256::MAX);
            assets.set_quirk(coin(), quirk);
        });
        let order = market.sign(
            &seller,
            OrderParameters::dummy(
                seller.address(),
                vec![OfferItem::erc721(nft(), u(40))],
                vec![ConsiderationItem::erc20(coin(), u(50), seller.address())],
            ),
        );

        let result = market
            .engine
            .fulfill_order(&CallContext::new(buyer()), &order, ConduitKey::NONE);
        assert!(matches!(
            result,
            Err(OpenbarterError::BadReturnValueFromErc20OnTransfer { token, .. }) if token == coin()
        ));
        assert_eq!(
            market.read(|a| a.erc721_owner(nft(), u(40))),
            Some(seller.address())
        );
    }
}

#[test]
fn e2e_missing_token_contract_fails() {
    let market = Market::new();
    let seller = OrderSigner::from_seed(19);
    market.list_nft(seller.address(), 41);
    let missing = Address::repeat_byte(0x99);
    let order = market.sign(
        &seller,
        OrderParameters::dummy(
            seller.address(),
            vec![OfferItem::erc721(nft(), u(41))],
            vec![ConsiderationItem::erc20(missing, u(5), seller.address())],
        ),
    );
    assert_eq!(
        market
            .engine
            .fulfill_order(&CallContext::new(buyer()), &order, ConduitKey::NONE)
            .unwrap_err(),
        OpenbarterError::NoContract(missing)
    );
}

// ============================================================================
// Test: restricted orders and their zone
// ============================================================================

/// Approves orders whose extra data carries the ticket.
struct TicketZone;

impl Zone for TicketZone {
    fn is_valid_order(&self, context: &ZoneContext<'_>) -> CallbackResult {
        if context.extra_data == b"ticket" {
            Ok(constants::ZONE_MAGIC_VALUE)
        } else {
            Ok([0u8; 4])
        }
    }
}

#[test]
fn e2e_restricted_order_needs_zone_approval() {
    let zone = Address::repeat_byte(0x2e);
    let market = Market::with(|b| b.zone(zone, Arc::new(TicketZone)));
    let seller = OrderSigner::from_seed(20);
    let engine = market.engine_address();
    market.seed(|assets| {
        assets.mint_erc20(coin(), seller.address(), u(10));
        assets.approve_erc20(coin(), seller.address(), engine, U256::MAX);
        assets.deal_native(buyer(), u(5));
    });
    let order = AdvancedOrder::from(
        market.sign(
            &seller,
            OrderParameters::dummy(
                seller.address(),
                vec![OfferItem::erc20(coin(), u(10))],
                vec![ConsiderationItem::native(u(5), seller.address())],
            )
            .with_order_type(OrderType::FullRestricted)
            .with_zone(zone),
        ),
    );
    let ctx = CallContext::new(buyer()).with_value(u(5));

    assert!(matches!(
        market
            .engine
            .fulfill_advanced_order(&ctx, &order, &[], ConduitKey::NONE, Address::ZERO),
        Err(OpenbarterError::InvalidRestrictedOrder {
            cause: CallbackFailure::InvalidMagicValue(_),
            ..
        })
    ));

    let ticketed = AdvancedOrder {
        extra_data: b"ticket".to_vec(),
        ..order
    };
    assert!(
        market
            .engine
            .fulfill_advanced_order(&ctx, &ticketed, &[], ConduitKey::NONE, Address::ZERO)
            .unwrap()
    );
    assert_eq!(market.read(|a| a.erc20_balance(coin(), buyer())), u(10));
}

// ============================================================================
// Test: contract offerers sign through a callback
// ============================================================================

struct Vault;

impl ContractSigner for Vault {
    fn is_valid_signature(&self, _digest: B256, signature: &[u8]) -> CallbackResult {
        if signature == b"vault-approved" {
            Ok(constants::EIP1271_MAGIC_VALUE)
        } else {
            Err(CallbackFailure::Reverted("not approved".into()))
        }
    }
}

#[test]
fn e2e_contract_offerer_signature() {
    let vault = Address::repeat_byte(0xc5);
    let market = Market::with(|b| b.contract_signer(vault, Arc::new(Vault)));
    let engine = market.engine_address();
    market.seed(|assets| {
        assets.mint_erc20(coin(), vault, u(10));
        assets.approve_erc20(coin(), vault, engine, U256::MAX);
        assets.deal_native(buyer(), u(5));
    });
    let parameters = OrderParameters::dummy(
        vault,
        vec![OfferItem::erc20(coin(), u(10))],
        vec![ConsiderationItem::native(u(5), vault)],
    );
    let ctx = CallContext::new(buyer()).with_value(u(5));

    let rejected = Order {
        parameters: parameters.clone(),
        signature: b"forged".to_vec(),
    };
    assert!(matches!(
        market.engine.fulfill_order(&ctx, &rejected, ConduitKey::NONE),
        Err(OpenbarterError::BadContractSignature { signer, .. }) if signer == vault
    ));

    let approved = Order {
        parameters,
        signature: b"vault-approved".to_vec(),
    };
    assert!(market.engine.fulfill_order(&ctx, &approved, ConduitKey::NONE).unwrap());
    assert_eq!(market.native(vault), u(5));
}

// ============================================================================
// Test: pre-validation and cancellation
// ============================================================================

#[test]
fn e2e_validated_order_fills_without_signature() {
    let market = Market::new();
    let seller = OrderSigner::from_seed(21);
    market.list_nft(seller.address(), 50);
    market.seed(|assets| assets.deal_native(buyer(), u(12)));
    let order = market.sign(&seller, nft_for_native(seller.address(), 50));
    let order_hash = market.hash(&order.parameters);

    // Anyone may relay the signed order for validation
    let relayer = CallContext::new(Address::repeat_byte(0x3e));
    assert!(market.engine.validate(&relayer, &[order.clone()]).unwrap());
    assert!(market.engine.get_order_status(&order_hash).unwrap().is_validated);
    let events = market.engine.events().unwrap();
    assert!(matches!(
        &events[0],
        SettlementEvent::OrderValidated { order_hash: h, .. } if *h == order_hash
    ));

    let unsigned = Order {
        signature: Vec::new(),
        ..order
    };
    let ctx = CallContext::new(buyer()).with_value(u(12));
    assert!(market.engine.fulfill_order(&ctx, &unsigned, ConduitKey::NONE).unwrap());
    assert_eq!(market.read(|a| a.erc721_owner(nft(), u(50))), Some(buyer()));
}

#[test]
fn e2e_cancellation_is_terminal() {
    let market = Market::new();
    let seller = OrderSigner::from_seed(22);
    market.list_nft(seller.address(), 51);
    market.seed(|assets| assets.deal_native(buyer(), u(12)));
    let order = market.sign(&seller, nft_for_native(seller.address(), 51));
    let order_hash = market.hash(&order.parameters);
    let components = order.parameters.to_components(U256::ZERO);
    assert_eq!(market.engine.get_order_hash(&components), order_hash);

    // 1. Only the offerer or zone may cancel
    assert_eq!(
        market
            .engine
            .cancel(&CallContext::new(buyer()), &[components.clone()])
            .unwrap_err(),
        OpenbarterError::InvalidCanceller { caller: buyer() }
    );

    // 2. Offerer cancels
    assert!(
        market
            .engine
            .cancel(&CallContext::new(seller.address()), &[components])
            .unwrap()
    );
    assert!(market.engine.get_order_status(&order_hash).unwrap().is_cancelled);

    // 3. Fills are refused from now on
    let ctx = CallContext::new(buyer()).with_value(u(12));
    assert_eq!(
        market
            .engine
            .fulfill_order(&ctx, &order, ConduitKey::NONE)
            .unwrap_err(),
        OpenbarterError::OrderIsCancelled(order_hash)
    );
    assert_eq!(market.native(buyer()), u(12));
}
