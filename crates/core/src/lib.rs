pub mod cart;
pub mod config;
pub mod domain;
pub mod errors;
pub mod materializer;
pub mod pricing;
pub mod selection;

pub use cart::{Cart, CartError, CartSnapshot};
pub use config::{
    AppConfig, CheckoutConfig, CollaboratorConfig, ConfigError, ConfigOverrides, LoadOptions,
    LogFormat, LoggingConfig, StorageBackend, StorageConfig,
};
pub use domain::order::{OrderId, OrderRecord, OrderState};
pub use domain::platform::{Platform, PlatformId};
pub use domain::product::{
    DropdownOption, PricingModel, Product, ProductId, ProductRecord, ProductRecordError,
    SliderBand,
};
pub use domain::promotion::{Promotion, PromotionId};
pub use errors::{ApplicationError, DomainError, ErrorShape};
pub use materializer::{
    encode_order_data, encode_promo_data, materialize, rehydrate, CheckoutGroup, CheckoutLine,
    LineDetail, OrderSummary, PlaceOrderSnapshot, PromoData,
};
pub use pricing::{
    group_by_platform, grand_total, present, price_lines, DeterministicPricingEngine,
    PlatformGroup, Priced, PricingEngine, PricingResult,
};
pub use selection::{
    DropdownMenu, LineSelection, SelectionError, SelectionKind, SliderUnit,
};
