//! The checkout orchestration: loads the persisted cart, re-verifies it
//! against the catalog, spins up one payment session per platform group, and
//! turns the paid snapshot into a backend order.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use boostline_core::cart::CartSnapshot;
use boostline_core::domain::order::{OrderId, OrderState};
use boostline_core::domain::platform::PlatformId;
use boostline_core::materializer::{
    encode_promo_data, materialize, rehydrate, CheckoutGroup, OrderSummary, PlaceOrderSnapshot,
    PromoData,
};
use boostline_core::pricing;
use boostline_storage::{
    keys, ClientStorage, PlaceOrderStore, SessionCart, SessionCartError, StorageError,
};

use crate::services::{
    CatalogService, CheckoutService, CheckoutSession, CollaboratorError, OrderService,
    PromotionService,
};

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Cart(#[from] SessionCartError),
    #[error("cart changed since the checkout screen was rendered (expected version {expected}, found {actual})")]
    StaleCart { expected: u64, actual: u64 },
    #[error("promotion code `{0}` does not exist")]
    UnknownPromotion(String),
    #[error("promotion `{0}` is no longer active")]
    ExpiredPromotion(String),
    #[error("cart has no lines for platform `{0}`")]
    NoGroupForPlatform(String),
}

/// What the checkout screen should render.
#[derive(Clone, Debug)]
pub enum CheckoutView {
    Ready { snapshot: CartSnapshot, groups: Vec<CheckoutGroup> },
    Redirect { to: String },
}

/// Outcome of the post-payment confirm step.
#[derive(Clone, Debug)]
pub enum ConfirmOutcome {
    Completed(OrderSummary),
    Redirect { to: String },
}

pub struct CheckoutFlow {
    catalog: Arc<dyn CatalogService>,
    promotions: Arc<dyn PromotionService>,
    checkout: Arc<dyn CheckoutService>,
    orders: Arc<dyn OrderService>,
    cart: SessionCart,
    place_orders: PlaceOrderStore,
}

impl CheckoutFlow {
    /// Loads the flow over whatever the storage holds. A corrupt `cartItems`
    /// value is wiped and replaced with an empty cart instead of wedging the
    /// whole checkout.
    pub async fn load(
        catalog: Arc<dyn CatalogService>,
        promotions: Arc<dyn PromotionService>,
        checkout: Arc<dyn CheckoutService>,
        orders: Arc<dyn OrderService>,
        storage: Arc<dyn ClientStorage>,
    ) -> Result<Self, FlowError> {
        let cart = match SessionCart::load(Arc::clone(&storage)).await {
            Ok(cart) => cart,
            Err(SessionCartError::Storage(StorageError::Decode { key, .. })) => {
                warn!(key, "discarding undecodable cart state");
                storage.remove(keys::CART_ITEMS).await?;
                storage.remove(keys::TOTAL_PRICE).await?;
                storage.remove(keys::PROMOTION).await?;
                SessionCart::new(Arc::clone(&storage))
            }
            Err(error) => return Err(error.into()),
        };

        Ok(Self {
            catalog,
            promotions,
            checkout,
            orders,
            cart,
            place_orders: PlaceOrderStore::new(storage),
        })
    }

    pub fn cart(&self) -> &SessionCart {
        &self.cart
    }

    /// Builds the checkout screen. Every cart line is re-resolved against the
    /// catalog first; if any product no longer resolves the whole cart is
    /// emptied and the caller is sent back to the storefront, never a
    /// partially priced checkout.
    pub async fn review(&self, now: DateTime<Utc>) -> Result<CheckoutView, FlowError> {
        let snapshot = self.cart.snapshot().await;
        if snapshot.lines.is_empty() {
            return Ok(CheckoutView::Redirect { to: "/".to_string() });
        }

        for line in &snapshot.lines {
            let resolved = match self.catalog.fetch_product(&line.product_id).await {
                Ok(record) => record,
                Err(error) => {
                    warn!(product = %line.product_id.0, %error, "catalog lookup failed, emptying cart");
                    None
                }
            };
            if resolved.is_none() {
                self.cart.clear().await?;
                self.place_orders.clear().await?;
                return Ok(CheckoutView::Redirect { to: "/".to_string() });
            }
        }

        let snapshot = self.revalidate_promotion(snapshot, now).await?;
        let groups = materialize(&snapshot.lines, snapshot.promotion.as_ref(), now);
        Ok(CheckoutView::Ready { snapshot, groups })
    }

    pub async fn apply_promotion(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<CartSnapshot, FlowError> {
        let promotion = self
            .promotions
            .fetch_by_code(code)
            .await?
            .ok_or_else(|| FlowError::UnknownPromotion(code.to_string()))?;
        Ok(self.cart.apply_promotion(promotion, now).await?)
    }

    /// Creates the payment session for one platform group and parks the
    /// submitted lines under the `place_order` key for the confirm step.
    /// `expected_version` is the cart version the screen rendered from; any
    /// mutation since then aborts the payment.
    pub async fn pay(
        &self,
        platform: &PlatformId,
        expected_version: u64,
        now: DateTime<Utc>,
    ) -> Result<CheckoutSession, FlowError> {
        let snapshot = self.cart.snapshot().await;
        if snapshot.version != expected_version {
            return Err(FlowError::StaleCart {
                expected: expected_version,
                actual: snapshot.version,
            });
        }

        let snapshot = self.revalidate_promotion(snapshot, now).await?;
        let groups = materialize(&snapshot.lines, snapshot.promotion.as_ref(), now);
        let group = groups
            .into_iter()
            .find(|group| &group.platform.id == platform)
            .ok_or_else(|| FlowError::NoGroupForPlatform(platform.0.clone()))?;

        let session = self.checkout.create_session(&group).await?;
        info!(session = %session.session_id, platform = %platform.0, "payment session created");

        let sub_platform =
            group.platform.has_sub_platforms.then(|| group.platform.name.clone());
        self.place_orders
            .save(&PlaceOrderSnapshot {
                orders: group.lines,
                session_id: session.session_id.clone(),
                promo: snapshot.promotion.as_ref().map(PromoData::from),
                sub_platform,
            })
            .await?;

        Ok(session)
    }

    /// Completes a checkout after the payment redirect. An unknown or stale
    /// session id means there is nothing to confirm, so the caller is routed
    /// home instead of receiving an error page.
    pub async fn confirm(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ConfirmOutcome, FlowError> {
        let Some(snapshot) = self.place_orders.load_for_session(session_id).await? else {
            warn!(session = session_id, "no pending snapshot for session");
            return Ok(ConfirmOutcome::Redirect { to: "/".to_string() });
        };

        let cart = self.cart.snapshot().await;
        // The paid lines came out of this cart before the redirect; the line
        // that matches by product carries the platform the group was built for.
        let platform = snapshot.orders.first().and_then(|order| {
            cart.lines
                .iter()
                .find(|line| line.product_id == order.product_id)
                .map(|line| line.platform.clone())
        });

        let total = submitted_total(&snapshot);
        let promo_data = snapshot.promo.as_ref().map(encode_promo_data);
        let record =
            self.orders.place_order(&snapshot, promo_data, platform, total, now).await?;
        info!(order = %record.id.0, session = session_id, "order placed");

        self.cart.clear().await?;
        self.place_orders.clear().await?;

        Ok(ConfirmOutcome::Completed(rehydrate(&record)))
    }

    pub async fn order_status(&self, id: &OrderId) -> Result<Option<OrderSummary>, FlowError> {
        Ok(self.orders.fetch_order(id).await?.map(|record| rehydrate(&record)))
    }

    /// Requests a state change, pre-checking the legality table so obviously
    /// invalid requests never reach the wire.
    pub async fn advance_order(
        &self,
        id: &OrderId,
        next: OrderState,
    ) -> Result<OrderSummary, FlowError> {
        let current = self
            .orders
            .fetch_order(id)
            .await?
            .ok_or_else(|| CollaboratorError::Rejected(format!("unknown order `{}`", id.0)))?;
        if !current.state.can_transition_to(next) {
            return Err(CollaboratorError::Rejected(format!(
                "order `{}` cannot move from {:?} to {:?}",
                id.0, current.state, next
            ))
            .into());
        }

        let record = self.orders.request_transition(id, next).await?;
        Ok(rehydrate(&record))
    }

    /// Re-checks a stored promotion against the collaborator. A code that was
    /// deleted or whose window closed since it was applied is dropped from
    /// the cart before any amount is shown or charged.
    async fn revalidate_promotion(
        &self,
        snapshot: CartSnapshot,
        now: DateTime<Utc>,
    ) -> Result<CartSnapshot, FlowError> {
        let Some(promotion) = &snapshot.promotion else {
            return Ok(snapshot);
        };

        let still_valid = self
            .promotions
            .fetch_by_code(&promotion.code)
            .await?
            .map(|current| current.is_active_at(now))
            .unwrap_or(false);

        if still_valid {
            Ok(snapshot)
        } else {
            warn!(code = %promotion.code, "stored promotion is no longer valid");
            Ok(self.cart.clear_promotion().await?)
        }
    }
}

/// The amount the payment session actually charged. The snapshot's promo was
/// window-checked when the session was created, so it is applied here even if
/// the window closed during the redirect.
fn submitted_total(snapshot: &PlaceOrderSnapshot) -> rust_decimal::Decimal {
    let combined = pricing::subtotal(&snapshot.orders) + pricing::tax_total(&snapshot.orders);
    let discount = snapshot
        .promo
        .as_ref()
        .map(|promo| pricing::percentage_discount(combined, promo.discount_percentage))
        .unwrap_or(rust_decimal::Decimal::ZERO);
    pricing::present(combined - discount)
}
