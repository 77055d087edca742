//! End-to-end checkout exercises over the in-memory collaborators and
//! in-memory client storage.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use boostline_client::{
    CheckoutFlow, CheckoutView, ConfirmOutcome, FlowError, InMemoryCatalog, InMemoryOrders,
    InMemoryPromotions, RecordingCheckout,
};
use boostline_core::domain::order::OrderState;
use boostline_core::domain::platform::{Platform, PlatformId};
use boostline_core::domain::product::{DropdownOption, Product, ProductId, ProductRecord};
use boostline_core::domain::promotion::{Promotion, PromotionId};
use boostline_core::materializer::LineDetail;
use boostline_core::selection::LineSelection;
use boostline_storage::{keys, ClientStorage, MemoryStorage};

struct Harness {
    catalog: Arc<InMemoryCatalog>,
    promotions: Arc<InMemoryPromotions>,
    checkout: Arc<RecordingCheckout>,
    orders: Arc<InMemoryOrders>,
    storage: Arc<dyn ClientStorage>,
}

impl Harness {
    fn new() -> Self {
        Self {
            catalog: Arc::new(InMemoryCatalog::new()),
            promotions: Arc::new(InMemoryPromotions::new()),
            checkout: Arc::new(RecordingCheckout::new()),
            orders: Arc::new(InMemoryOrders::new()),
            storage: Arc::new(MemoryStorage::new()),
        }
    }

    async fn flow(&self) -> CheckoutFlow {
        CheckoutFlow::load(
            Arc::clone(&self.catalog) as Arc<dyn boostline_client::CatalogService>,
            Arc::clone(&self.promotions) as Arc<dyn boostline_client::PromotionService>,
            Arc::clone(&self.checkout) as Arc<dyn boostline_client::CheckoutService>,
            Arc::clone(&self.orders) as Arc<dyn boostline_client::OrderService>,
            Arc::clone(&self.storage),
        )
        .await
        .expect("flow load")
    }
}

fn pc() -> Platform {
    Platform::new("pc", "PC")
}

fn xbox() -> Platform {
    Platform::new("xbox", "Xbox")
}

fn flat_record(id: &str, price: i64, tax: i64) -> ProductRecord {
    ProductRecord {
        id: ProductId(id.to_string()),
        name: format!("{id} service"),
        price: Decimal::new(price, 2),
        tax: Decimal::new(tax, 2),
        is_dropdown: false,
        dropdown_options: Vec::new(),
        is_slider: false,
        slider_range: Vec::new(),
        platforms: vec![pc(), xbox()],
    }
}

fn dropdown_record(id: &str, tax: i64) -> ProductRecord {
    ProductRecord {
        id: ProductId(id.to_string()),
        name: format!("{id} boost"),
        price: Decimal::ZERO,
        tax: Decimal::new(tax, 2),
        is_dropdown: true,
        dropdown_options: vec![
            DropdownOption { option: "Silver".to_string(), price: Decimal::new(1_000, 2) },
            DropdownOption { option: "Gold".to_string(), price: Decimal::new(1_500, 2) },
            DropdownOption { option: "Platinum".to_string(), price: Decimal::new(2_000, 2) },
            DropdownOption { option: "Diamond".to_string(), price: Decimal::new(2_500, 2) },
        ],
        is_slider: false,
        slider_range: Vec::new(),
        platforms: vec![pc(), xbox()],
    }
}

fn active_promotion(code: &str, percentage: i64) -> Promotion {
    let now = Utc::now();
    Promotion {
        id: PromotionId(format!("promo-{code}")),
        code: code.to_string(),
        discount_percentage: Decimal::new(percentage, 0),
        start_date: now - Duration::hours(1),
        end_date: now + Duration::hours(1),
    }
}

fn flat_selection(record: ProductRecord, platform: Platform, quantity: u32) -> LineSelection {
    let product = Product::try_from(record).expect("normalize product");
    LineSelection::flat(&product, platform, quantity).expect("flat selection")
}

fn dropdown_selection(
    record: ProductRecord,
    platform: Platform,
    start: usize,
    end: usize,
) -> LineSelection {
    let product = Product::try_from(record).expect("normalize product");
    LineSelection::dropdown_range(&product, platform, Some(start), Some(end))
        .expect("dropdown selection")
}

#[tokio::test]
async fn paid_checkout_confirms_to_the_same_total() {
    let harness = Harness::new();
    harness.catalog.insert(flat_record("coaching", 1_000, 100)).await;
    harness.catalog.insert(dropdown_record("rank-boost", 50)).await;
    harness.promotions.insert(active_promotion("SAVE20", 20)).await;

    let flow = harness.flow().await;
    let now = Utc::now();

    flow.cart().add(flat_selection(flat_record("coaching", 1_000, 100), pc(), 3)).await.expect("add");
    flow.cart()
        .add(dropdown_selection(dropdown_record("rank-boost", 50), pc(), 0, 3))
        .await
        .expect("add");
    flow.apply_promotion("SAVE20", now).await.expect("promotion");

    let view = flow.review(now).await.expect("review");
    let CheckoutView::Ready { snapshot, groups } = view else {
        panic!("expected a ready checkout");
    };
    assert_eq!(groups.len(), 1);

    let session = flow.pay(&PlatformId("pc".to_string()), snapshot.version, now).await.expect("pay");

    let outcome = flow.confirm(&session.session_id, now).await.expect("confirm");
    let ConfirmOutcome::Completed(summary) = outcome else {
        panic!("expected a completed order");
    };

    // The rehydrated totals must equal what the payment session was created for.
    assert_eq!(summary.totals.total, groups[0].totals.total);
    assert_eq!(summary.totals.total, summary.submitted_total);
    assert_eq!(summary.promotion.as_ref().map(|p| p.code.as_str()), Some("SAVE20"));
    assert!(summary.lines.iter().all(|line| matches!(line, LineDetail::Detailed(_))));
    assert_eq!(summary.state, OrderState::Assigned);

    // Confirming consumes both the cart and the pending snapshot.
    assert!(flow.cart().snapshot().await.lines.is_empty());
    let second = flow.confirm(&session.session_id, now).await.expect("second confirm");
    assert!(matches!(second, ConfirmOutcome::Redirect { .. }));
}

#[tokio::test]
async fn confirm_after_reload_keeps_the_paid_discount() {
    let harness = Harness::new();
    harness.catalog.insert(flat_record("coaching", 10_000, 0)).await;
    harness.promotions.insert(active_promotion("SAVE20", 20)).await;

    let flow = harness.flow().await;
    let now = Utc::now();
    flow.cart()
        .add(flat_selection(flat_record("coaching", 10_000, 0), pc(), 1))
        .await
        .expect("add");
    flow.apply_promotion("SAVE20", now).await.expect("promotion");

    let snapshot = flow.cart().snapshot().await;
    let session =
        flow.pay(&PlatformId("pc".to_string()), snapshot.version, now).await.expect("pay");

    let charged = harness.checkout.created_sessions().await[0].1.totals.total;
    assert_eq!(charged, Decimal::new(8_000, 2));

    // The payment redirect lands in a fresh flow over the same storage; the
    // confirmed order must still carry the discount the session charged.
    let fresh = harness.flow().await;
    let outcome = fresh.confirm(&session.session_id, now).await.expect("confirm");
    let ConfirmOutcome::Completed(summary) = outcome else {
        panic!("expected a completed order");
    };

    assert_eq!(summary.submitted_total, charged);
    assert_eq!(summary.totals.total, charged);
    assert_eq!(summary.promotion.as_ref().map(|p| p.code.as_str()), Some("SAVE20"));
}

#[tokio::test]
async fn each_platform_group_pays_through_its_own_session() {
    let harness = Harness::new();
    harness.catalog.insert(flat_record("coaching", 1_000, 0)).await;
    harness.catalog.insert(flat_record("placements", 2_000, 0)).await;

    let flow = harness.flow().await;
    let now = Utc::now();

    flow.cart().add(flat_selection(flat_record("coaching", 1_000, 0), pc(), 1)).await.expect("add");
    flow.cart()
        .add(flat_selection(flat_record("placements", 2_000, 0), xbox(), 1))
        .await
        .expect("add");

    let view = flow.review(now).await.expect("review");
    let CheckoutView::Ready { snapshot, groups } = view else {
        panic!("expected a ready checkout");
    };
    assert_eq!(groups.len(), 2);

    let first = flow.pay(&PlatformId("pc".to_string()), snapshot.version, now).await.expect("pay pc");
    let second =
        flow.pay(&PlatformId("xbox".to_string()), snapshot.version, now).await.expect("pay xbox");
    assert_ne!(first.session_id, second.session_id);

    let sessions = harness.checkout.created_sessions().await;
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].1.platform.id, PlatformId("pc".to_string()));
    assert_eq!(sessions[0].1.totals.total, Decimal::new(1_000, 2));
    assert_eq!(sessions[1].1.platform.id, PlatformId("xbox".to_string()));
    assert_eq!(sessions[1].1.totals.total, Decimal::new(2_000, 2));
}

#[tokio::test]
async fn unresolvable_product_empties_the_cart_and_redirects() {
    let harness = Harness::new();
    harness.catalog.insert(flat_record("coaching", 1_000, 0)).await;

    let flow = harness.flow().await;
    let now = Utc::now();
    flow.cart().add(flat_selection(flat_record("coaching", 1_000, 0), pc(), 2)).await.expect("add");

    // The product disappears from the catalog between add and checkout.
    harness.catalog.set_failing(true);

    let view = flow.review(now).await.expect("review");
    assert!(matches!(view, CheckoutView::Redirect { .. }));
    assert!(flow.cart().snapshot().await.lines.is_empty());
    assert_eq!(
        harness.storage.get(keys::CART_ITEMS).await.expect("get").as_deref(),
        Some("[]")
    );
}

#[tokio::test]
async fn stale_cart_version_aborts_the_payment() {
    let harness = Harness::new();
    harness.catalog.insert(flat_record("coaching", 1_000, 0)).await;

    let flow = harness.flow().await;
    let now = Utc::now();
    let rendered = flow
        .cart()
        .add(flat_selection(flat_record("coaching", 1_000, 0), pc(), 1))
        .await
        .expect("add");

    // Another mutation lands after the checkout screen rendered.
    flow.cart().increase(&ProductId("coaching".to_string())).await.expect("increase");

    let error = flow
        .pay(&PlatformId("pc".to_string()), rendered.version, now)
        .await
        .expect_err("stale pay");
    assert!(matches!(error, FlowError::StaleCart { .. }));
    assert!(harness.checkout.created_sessions().await.is_empty());
}

#[tokio::test]
async fn withdrawn_promotion_is_dropped_before_payment() {
    let harness = Harness::new();
    harness.catalog.insert(flat_record("coaching", 1_000, 0)).await;
    harness.promotions.insert(active_promotion("FLASH", 50)).await;

    let flow = harness.flow().await;
    let now = Utc::now();
    flow.cart().add(flat_selection(flat_record("coaching", 1_000, 0), pc(), 1)).await.expect("add");
    flow.apply_promotion("FLASH", now).await.expect("promotion");

    // The promotion is withdrawn while the user sits on the checkout screen.
    harness.promotions.remove("FLASH").await;

    let snapshot = flow.cart().snapshot().await;
    flow.pay(&PlatformId("pc".to_string()), snapshot.version, now).await.expect("pay");

    let sessions = harness.checkout.created_sessions().await;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].1.totals.discount_total, Decimal::ZERO);
    assert_eq!(sessions[0].1.totals.total, Decimal::new(1_000, 2));
    assert!(flow.cart().snapshot().await.promotion.is_none());
}

#[tokio::test]
async fn unknown_session_confirm_routes_home() {
    let harness = Harness::new();
    let flow = harness.flow().await;

    let outcome = flow.confirm("cs_never_created", Utc::now()).await.expect("confirm");
    assert!(matches!(outcome, ConfirmOutcome::Redirect { .. }));
}

#[tokio::test]
async fn order_transitions_follow_the_legality_table() {
    let harness = Harness::new();
    harness.catalog.insert(flat_record("coaching", 1_000, 0)).await;

    let flow = harness.flow().await;
    let now = Utc::now();
    flow.cart().add(flat_selection(flat_record("coaching", 1_000, 0), pc(), 1)).await.expect("add");
    let snapshot = flow.cart().snapshot().await;
    let session =
        flow.pay(&PlatformId("pc".to_string()), snapshot.version, now).await.expect("pay");
    let ConfirmOutcome::Completed(summary) = flow.confirm(&session.session_id, now).await.expect("confirm")
    else {
        panic!("expected a completed order");
    };

    // Assigned cannot complete directly.
    let error = flow.advance_order(&summary.id, OrderState::Complete).await.expect_err("illegal");
    assert!(matches!(error, FlowError::Collaborator(_)));

    let started = flow.advance_order(&summary.id, OrderState::InProgress).await.expect("start");
    assert_eq!(started.state, OrderState::InProgress);
    let done = flow.advance_order(&summary.id, OrderState::Complete).await.expect("complete");
    assert_eq!(done.state, OrderState::Complete);
}

#[tokio::test]
async fn corrupt_persisted_cart_is_discarded_on_load() {
    let harness = Harness::new();
    harness.storage.set(keys::CART_ITEMS, "{definitely not json".to_string()).await.expect("set");

    let flow = harness.flow().await;
    assert!(flow.cart().snapshot().await.lines.is_empty());
    assert_eq!(harness.storage.get(keys::CART_ITEMS).await.expect("get"), None);
}
