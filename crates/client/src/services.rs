//! Contracts for the four external collaborators. Everything downstream of
//! the cart talks to these traits; the HTTP implementations and the in-memory
//! fakes are interchangeable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use boostline_core::domain::order::{OrderId, OrderRecord, OrderState};
use boostline_core::domain::platform::Platform;
use boostline_core::domain::product::{ProductId, ProductRecord};
use boostline_core::domain::promotion::Promotion;
use boostline_core::materializer::{CheckoutGroup, PlaceOrderSnapshot};

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("transport failure talking to {endpoint}: {source}")]
    Transport { endpoint: String, source: reqwest::Error },
    #[error("{endpoint} answered with status {status}")]
    Status { endpoint: String, status: u16 },
    #[error("{endpoint} returned a body that could not be decoded: {source}")]
    Decode { endpoint: String, source: reqwest::Error },
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// The payment collaborator's handle for one created session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub session_id: String,
    pub redirect_url: String,
}

#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn fetch_product(
        &self,
        id: &ProductId,
    ) -> Result<Option<ProductRecord>, CollaboratorError>;

    async fn fetch_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<ProductRecord>, CollaboratorError>;

    async fn fetch_by_attribute(
        &self,
        attribute: &str,
        value: &str,
    ) -> Result<Vec<ProductRecord>, CollaboratorError>;
}

#[async_trait]
pub trait PromotionService: Send + Sync {
    /// Looks up a promotion by its user-facing code. `None` means the code
    /// does not exist; window validation is the caller's concern.
    async fn fetch_by_code(&self, code: &str) -> Result<Option<Promotion>, CollaboratorError>;
}

#[async_trait]
pub trait CheckoutService: Send + Sync {
    /// Creates one payment session for one platform group.
    async fn create_session(
        &self,
        group: &CheckoutGroup,
    ) -> Result<CheckoutSession, CollaboratorError>;
}

#[async_trait]
pub trait OrderService: Send + Sync {
    async fn fetch_order(&self, id: &OrderId) -> Result<Option<OrderRecord>, CollaboratorError>;

    /// Registers the paid snapshot as a backend order record.
    async fn place_order(
        &self,
        snapshot: &PlaceOrderSnapshot,
        promo_data: Option<String>,
        platform: Option<Platform>,
        total_price: Decimal,
        placed_at: DateTime<Utc>,
    ) -> Result<OrderRecord, CollaboratorError>;

    /// Asks the backend to move an order to `next`. The backend enforces the
    /// same legality table the client uses to build its options list.
    async fn request_transition(
        &self,
        id: &OrderId,
        next: OrderState,
    ) -> Result<OrderRecord, CollaboratorError>;
}
