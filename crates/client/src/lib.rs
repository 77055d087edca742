pub mod flow;
pub mod http;
pub mod memory;
pub mod services;

pub use flow::{CheckoutFlow, CheckoutView, ConfirmOutcome, FlowError};
pub use http::{
    shared_client, HttpCatalogService, HttpCheckoutService, HttpOrderService, HttpPromotionService,
};
pub use memory::{InMemoryCatalog, InMemoryOrders, InMemoryPromotions, RecordingCheckout};
pub use services::{
    CatalogService, CheckoutService, CheckoutSession, CollaboratorError, OrderService,
    PromotionService,
};
