//! In-memory collaborator fakes for tests and offline development. Each fake
//! supports failure injection so callers can exercise the degraded paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use boostline_core::domain::order::{OrderId, OrderRecord, OrderState};
use boostline_core::domain::platform::Platform;
use boostline_core::domain::product::{ProductId, ProductRecord};
use boostline_core::domain::promotion::Promotion;
use boostline_core::materializer::{CheckoutGroup, PlaceOrderSnapshot};

use crate::services::{
    CatalogService, CheckoutService, CheckoutSession, CollaboratorError, OrderService,
    PromotionService,
};

fn injected_failure(service: &str) -> CollaboratorError {
    CollaboratorError::Status { endpoint: format!("memory://{service}"), status: 503 }
}

#[derive(Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<String, ProductRecord>>,
    categories: RwLock<HashMap<String, Vec<String>>>,
    attributes: RwLock<HashMap<(String, String), Vec<String>>>,
    failing: AtomicBool,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: ProductRecord) {
        self.products.write().await.insert(record.id.0.clone(), record);
    }

    pub async fn insert_in_category(&self, category: &str, record: ProductRecord) {
        self.categories
            .write()
            .await
            .entry(category.to_string())
            .or_default()
            .push(record.id.0.clone());
        self.insert(record).await;
    }

    pub async fn tag_attribute(&self, id: &ProductId, attribute: &str, value: &str) {
        self.attributes
            .write()
            .await
            .entry((attribute.to_string(), value.to_string()))
            .or_default()
            .push(id.0.clone());
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    async fn collect(&self, ids: &[String]) -> Vec<ProductRecord> {
        let products = self.products.read().await;
        ids.iter().filter_map(|id| products.get(id).cloned()).collect()
    }
}

#[async_trait]
impl CatalogService for InMemoryCatalog {
    async fn fetch_product(
        &self,
        id: &ProductId,
    ) -> Result<Option<ProductRecord>, CollaboratorError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected_failure("catalog"));
        }
        Ok(self.products.read().await.get(&id.0).cloned())
    }

    async fn fetch_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<ProductRecord>, CollaboratorError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected_failure("catalog"));
        }
        let ids = self.categories.read().await.get(category).cloned().unwrap_or_default();
        Ok(self.collect(&ids).await)
    }

    async fn fetch_by_attribute(
        &self,
        attribute: &str,
        value: &str,
    ) -> Result<Vec<ProductRecord>, CollaboratorError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected_failure("catalog"));
        }
        let key = (attribute.to_string(), value.to_string());
        let ids = self.attributes.read().await.get(&key).cloned().unwrap_or_default();
        Ok(self.collect(&ids).await)
    }
}

#[derive(Default)]
pub struct InMemoryPromotions {
    promotions: RwLock<HashMap<String, Promotion>>,
    failing: AtomicBool,
}

impl InMemoryPromotions {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, promotion: Promotion) {
        self.promotions.write().await.insert(promotion.code.clone(), promotion);
    }

    pub async fn remove(&self, code: &str) {
        self.promotions.write().await.remove(code);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl PromotionService for InMemoryPromotions {
    async fn fetch_by_code(&self, code: &str) -> Result<Option<Promotion>, CollaboratorError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected_failure("promotions"));
        }
        Ok(self.promotions.read().await.get(code).cloned())
    }
}

/// Records every session it creates so tests can assert on the submitted
/// groups.
#[derive(Default)]
pub struct RecordingCheckout {
    sessions: RwLock<Vec<(CheckoutSession, CheckoutGroup)>>,
    counter: AtomicU64,
    failing: AtomicBool,
}

impl RecordingCheckout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn created_sessions(&self) -> Vec<(CheckoutSession, CheckoutGroup)> {
        self.sessions.read().await.clone()
    }
}

#[async_trait]
impl CheckoutService for RecordingCheckout {
    async fn create_session(
        &self,
        group: &CheckoutGroup,
    ) -> Result<CheckoutSession, CollaboratorError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected_failure("checkout"));
        }
        let serial = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let session = CheckoutSession {
            session_id: format!("cs_{serial}"),
            redirect_url: format!("memory://checkout/cs_{serial}"),
        };
        self.sessions.write().await.push((session.clone(), group.clone()));
        Ok(session)
    }
}

#[derive(Default)]
pub struct InMemoryOrders {
    orders: RwLock<HashMap<String, OrderRecord>>,
    failing: AtomicBool,
}

impl InMemoryOrders {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: OrderRecord) {
        self.orders.write().await.insert(record.id.0.clone(), record);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl OrderService for InMemoryOrders {
    async fn fetch_order(&self, id: &OrderId) -> Result<Option<OrderRecord>, CollaboratorError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected_failure("orders"));
        }
        Ok(self.orders.read().await.get(&id.0).cloned())
    }

    async fn place_order(
        &self,
        snapshot: &PlaceOrderSnapshot,
        promo_data: Option<String>,
        platform: Option<Platform>,
        total_price: Decimal,
        placed_at: DateTime<Utc>,
    ) -> Result<OrderRecord, CollaboratorError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected_failure("orders"));
        }

        let record = OrderRecord {
            id: OrderId(format!("ord_{}", Uuid::new_v4().simple())),
            order_data: boostline_core::materializer::encode_order_data(&snapshot.orders),
            promo_data,
            platform,
            state: OrderState::Assigned,
            total_price,
            created_at: placed_at,
        };
        self.orders.write().await.insert(record.id.0.clone(), record.clone());
        Ok(record)
    }

    async fn request_transition(
        &self,
        id: &OrderId,
        next: OrderState,
    ) -> Result<OrderRecord, CollaboratorError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected_failure("orders"));
        }

        let mut orders = self.orders.write().await;
        let record = orders
            .get_mut(&id.0)
            .ok_or_else(|| CollaboratorError::Rejected(format!("unknown order `{}`", id.0)))?;
        let state = record
            .state
            .request_transition(next)
            .map_err(|error| CollaboratorError::Rejected(error.to_string()))?;
        record.state = state;
        Ok(record.clone())
    }
}
