//! Persistence wrappers over the live cart and the checkout hand-off
//! snapshot. Every cart mutation is written through immediately, so a reload
//! mid-session reconstructs exactly what the user had.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;

use boostline_core::cart::{Cart, CartError, CartSnapshot};
use boostline_core::domain::product::ProductId;
use boostline_core::domain::promotion::Promotion;
use boostline_core::materializer::PlaceOrderSnapshot;
use boostline_core::selection::LineSelection;

use crate::store::{keys, ClientStorage, StorageError};

#[derive(Debug, Error)]
pub enum SessionCartError {
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A [`Cart`] that writes `cartItems` and `totalPrice` through to client
/// storage after every mutation.
pub struct SessionCart {
    storage: Arc<dyn ClientStorage>,
    cart: Cart,
}

impl SessionCart {
    pub fn new(storage: Arc<dyn ClientStorage>) -> Self {
        Self { storage, cart: Cart::new() }
    }

    /// Reconstructs the cart from whatever `cartItems` and `promotion` hold.
    /// An absent key is an empty cart; a corrupt value is a decode error, not
    /// a panic.
    pub async fn load(storage: Arc<dyn ClientStorage>) -> Result<Self, SessionCartError> {
        let cart = match storage.get(keys::CART_ITEMS).await? {
            Some(raw) => {
                let lines: Vec<LineSelection> =
                    serde_json::from_str(&raw).map_err(|source| StorageError::Decode {
                        key: keys::CART_ITEMS.to_string(),
                        source,
                    })?;
                let promotion = match storage.get(keys::PROMOTION).await? {
                    Some(raw) => Some(serde_json::from_str::<Promotion>(&raw).map_err(
                        |source| StorageError::Decode {
                            key: keys::PROMOTION.to_string(),
                            source,
                        },
                    )?),
                    None => None,
                };
                Cart::from_parts(lines, promotion)
            }
            None => Cart::new(),
        };

        Ok(Self { storage, cart })
    }

    pub async fn snapshot(&self) -> CartSnapshot {
        self.cart.snapshot().await
    }

    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.cart.subscribe()
    }

    pub async fn add(&self, selection: LineSelection) -> Result<CartSnapshot, SessionCartError> {
        let snapshot = self.cart.add(selection).await;
        self.persist(&snapshot).await?;
        Ok(snapshot)
    }

    pub async fn increase(&self, product_id: &ProductId) -> Result<CartSnapshot, SessionCartError> {
        let snapshot = self.cart.increase(product_id).await?;
        self.persist(&snapshot).await?;
        Ok(snapshot)
    }

    pub async fn decrease(&self, product_id: &ProductId) -> Result<CartSnapshot, SessionCartError> {
        let snapshot = self.cart.decrease(product_id).await?;
        self.persist(&snapshot).await?;
        Ok(snapshot)
    }

    pub async fn remove(&self, product_id: &ProductId) -> Result<CartSnapshot, SessionCartError> {
        let snapshot = self.cart.remove(product_id).await?;
        self.persist(&snapshot).await?;
        Ok(snapshot)
    }

    pub async fn clear(&self) -> Result<CartSnapshot, SessionCartError> {
        let snapshot = self.cart.clear().await;
        self.persist(&snapshot).await?;
        Ok(snapshot)
    }

    pub async fn apply_promotion(
        &self,
        promotion: Promotion,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<CartSnapshot, SessionCartError> {
        let snapshot = self.cart.apply_promotion(promotion, now).await?;
        self.persist(&snapshot).await?;
        Ok(snapshot)
    }

    pub async fn clear_promotion(&self) -> Result<CartSnapshot, SessionCartError> {
        let snapshot = self.cart.clear_promotion().await;
        self.persist(&snapshot).await?;
        Ok(snapshot)
    }

    async fn persist(&self, snapshot: &CartSnapshot) -> Result<(), StorageError> {
        let lines = serde_json::to_string(&snapshot.lines).map_err(|source| {
            StorageError::Encode { key: keys::CART_ITEMS.to_string(), source }
        })?;
        self.storage.set(keys::CART_ITEMS, lines).await?;
        match &snapshot.promotion {
            Some(promotion) => {
                let encoded = serde_json::to_string(promotion).map_err(|source| {
                    StorageError::Encode { key: keys::PROMOTION.to_string(), source }
                })?;
                self.storage.set(keys::PROMOTION, encoded).await?;
            }
            None => self.storage.remove(keys::PROMOTION).await?,
        }
        // The persisted total is the displayed one, so it is rounded the same
        // way the screens round.
        let total = boostline_core::pricing::present(snapshot.total_price);
        self.storage.set(keys::TOTAL_PRICE, total.to_string()).await
    }
}

/// The single-slot store for the pending checkout snapshot. Each save
/// replaces the previous one; the session id inside is the correlation
/// token for the post-payment confirm step.
pub struct PlaceOrderStore {
    storage: Arc<dyn ClientStorage>,
}

impl PlaceOrderStore {
    pub fn new(storage: Arc<dyn ClientStorage>) -> Self {
        Self { storage }
    }

    pub async fn save(&self, snapshot: &PlaceOrderSnapshot) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(snapshot).map_err(|source| StorageError::Encode {
            key: keys::PLACE_ORDER.to_string(),
            source,
        })?;
        self.storage.set(keys::PLACE_ORDER, encoded).await
    }

    pub async fn load(&self) -> Result<Option<PlaceOrderSnapshot>, StorageError> {
        match self.storage.get(keys::PLACE_ORDER).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| StorageError::Decode {
                    key: keys::PLACE_ORDER.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Loads the snapshot only when it belongs to `session_id`. A mismatch
    /// means the snapshot is from an older checkout and must not be confirmed.
    pub async fn load_for_session(
        &self,
        session_id: &str,
    ) -> Result<Option<PlaceOrderSnapshot>, StorageError> {
        Ok(self.load().await?.filter(|snapshot| snapshot.session_id == session_id))
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(keys::PLACE_ORDER).await
    }
}
