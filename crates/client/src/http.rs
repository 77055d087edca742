//! HTTP implementations of the collaborator contracts. All services share
//! one pooled [`Client`]; each carries its own base URL and applies its
//! configured timeout per request.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use boostline_core::config::{CheckoutConfig, CollaboratorConfig};
use boostline_core::domain::order::{OrderId, OrderRecord, OrderState};
use boostline_core::domain::platform::Platform;
use boostline_core::domain::product::{ProductId, ProductRecord};
use boostline_core::domain::promotion::Promotion;
use boostline_core::materializer::{encode_order_data, CheckoutGroup, PlaceOrderSnapshot};

use crate::services::{
    CatalogService, CheckoutService, CheckoutSession, CollaboratorError, OrderService,
    PromotionService,
};

/// Builds the connection-pooled client every service shares.
pub fn shared_client() -> reqwest::Result<Client> {
    Client::builder().build()
}

fn transport(endpoint: &str) -> impl FnOnce(reqwest::Error) -> CollaboratorError + '_ {
    move |source| CollaboratorError::Transport { endpoint: endpoint.to_string(), source }
}

/// The uniform error body collaborators answer with when they reject a
/// request outright.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

fn classify_error(endpoint: &str, status: StatusCode, body: &str) -> CollaboratorError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(shape) => CollaboratorError::Rejected(shape.error),
        Err(_) => CollaboratorError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        },
    }
}

async fn check_status(endpoint: &str, response: Response) -> Result<Response, CollaboratorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    warn!(endpoint, status = status.as_u16(), "collaborator returned an error status");
    let body = response.text().await.unwrap_or_default();
    Err(classify_error(endpoint, status, &body))
}

async fn decode<T: DeserializeOwned>(
    endpoint: &str,
    response: Response,
) -> Result<T, CollaboratorError> {
    response
        .json::<T>()
        .await
        .map_err(|source| CollaboratorError::Decode { endpoint: endpoint.to_string(), source })
}

/// GET that treats 404 as `None` rather than an error.
async fn get_optional<T: DeserializeOwned>(
    client: &Client,
    endpoint: &str,
    timeout: Duration,
) -> Result<Option<T>, CollaboratorError> {
    let response =
        client.get(endpoint).timeout(timeout).send().await.map_err(transport(endpoint))?;
    if response.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    let response = check_status(endpoint, response).await?;
    decode(endpoint, response).await.map(Some)
}

pub struct HttpCatalogService {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpCatalogService {
    pub fn from_config(client: Client, config: &CollaboratorConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl CatalogService for HttpCatalogService {
    async fn fetch_product(
        &self,
        id: &ProductId,
    ) -> Result<Option<ProductRecord>, CollaboratorError> {
        let endpoint = format!("{}/products/{}", self.base_url, id.0);
        debug!(product = %id.0, "fetching product record");
        get_optional(&self.client, &endpoint, self.timeout).await
    }

    async fn fetch_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<ProductRecord>, CollaboratorError> {
        let endpoint = format!("{}/products", self.base_url);
        let response = self
            .client
            .get(&endpoint)
            .timeout(self.timeout)
            .query(&[("category", category)])
            .send()
            .await
            .map_err(transport(&endpoint))?;
        let response = check_status(&endpoint, response).await?;
        decode(&endpoint, response).await
    }

    async fn fetch_by_attribute(
        &self,
        attribute: &str,
        value: &str,
    ) -> Result<Vec<ProductRecord>, CollaboratorError> {
        let endpoint = format!("{}/products", self.base_url);
        let response = self
            .client
            .get(&endpoint)
            .timeout(self.timeout)
            .query(&[("attribute", attribute), ("value", value)])
            .send()
            .await
            .map_err(transport(&endpoint))?;
        let response = check_status(&endpoint, response).await?;
        decode(&endpoint, response).await
    }
}

pub struct HttpPromotionService {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpPromotionService {
    pub fn from_config(client: Client, config: &CollaboratorConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl PromotionService for HttpPromotionService {
    async fn fetch_by_code(&self, code: &str) -> Result<Option<Promotion>, CollaboratorError> {
        let endpoint = format!("{}/promotions/{}", self.base_url, code);
        debug!(code, "looking up promotion");
        get_optional(&self.client, &endpoint, self.timeout).await
    }
}

pub struct HttpCheckoutService {
    client: Client,
    base_url: String,
    timeout: Duration,
    api_key: Option<SecretString>,
}

impl HttpCheckoutService {
    pub fn from_config(client: Client, config: &CheckoutConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl CheckoutService for HttpCheckoutService {
    async fn create_session(
        &self,
        group: &CheckoutGroup,
    ) -> Result<CheckoutSession, CollaboratorError> {
        let endpoint = format!("{}/sessions", self.base_url);
        info!(
            platform = %group.platform.id.0,
            lines = group.lines.len(),
            total = %group.totals.total,
            "creating payment session"
        );

        let mut request = self.client.post(&endpoint).timeout(self.timeout).json(group);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.map_err(transport(&endpoint))?;
        let response = check_status(&endpoint, response).await?;
        decode(&endpoint, response).await
    }
}

pub struct HttpOrderService {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpOrderService {
    pub fn from_config(client: Client, config: &CollaboratorConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl OrderService for HttpOrderService {
    async fn fetch_order(&self, id: &OrderId) -> Result<Option<OrderRecord>, CollaboratorError> {
        let endpoint = format!("{}/orders/{}", self.base_url, id.0);
        get_optional(&self.client, &endpoint, self.timeout).await
    }

    async fn place_order(
        &self,
        snapshot: &PlaceOrderSnapshot,
        promo_data: Option<String>,
        platform: Option<Platform>,
        total_price: Decimal,
        placed_at: DateTime<Utc>,
    ) -> Result<OrderRecord, CollaboratorError> {
        let endpoint = format!("{}/orders", self.base_url);
        info!(session = %snapshot.session_id, lines = snapshot.orders.len(), "placing order");

        let body = json!({
            "order_data": encode_order_data(&snapshot.orders),
            "promo_data": promo_data,
            "platform": platform,
            "total_price": total_price,
            "created_at": placed_at,
            "session_id": snapshot.session_id,
        });

        let response = self
            .client
            .post(&endpoint)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(transport(&endpoint))?;
        let response = check_status(&endpoint, response).await?;
        decode(&endpoint, response).await
    }

    async fn request_transition(
        &self,
        id: &OrderId,
        next: OrderState,
    ) -> Result<OrderRecord, CollaboratorError> {
        let endpoint = format!("{}/orders/{}/transition", self.base_url, id.0);
        info!(order = %id.0, ?next, "requesting order transition");

        let response = self
            .client
            .post(&endpoint)
            .timeout(self.timeout)
            .json(&json!({ "state": next }))
            .send()
            .await
            .map_err(transport(&endpoint))?;
        let response = check_status(&endpoint, response).await?;
        decode(&endpoint, response).await
    }
}
