use async_trait::async_trait;
use thiserror::Error;

/// Storage keys shared with the persisted-format contract. Renaming any of
/// these orphans data written by earlier builds.
pub mod keys {
    pub const CART_ITEMS: &str = "cartItems";
    pub const TOTAL_PRICE: &str = "totalPrice";
    pub const PROMOTION: &str = "promotion";
    pub const PLACE_ORDER: &str = "place_order";
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error for key `{key}`: {source}")]
    Io { key: String, source: std::io::Error },
    #[error("stored value for key `{key}` could not be decoded: {source}")]
    Decode { key: String, source: serde_json::Error },
    #[error("value for key `{key}` could not be encoded: {source}")]
    Encode { key: String, source: serde_json::Error },
}

/// A flat string key-value store, the only persistence surface the
/// application has. Values are JSON documents serialized by the caller.
#[async_trait]
pub trait ClientStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
