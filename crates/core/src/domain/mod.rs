pub mod order;
pub mod platform;
pub mod product;
pub mod promotion;
