use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PromotionId(pub String);

/// A percentage discount with a validity window. The window is enforced at
/// application time, never trusted from cache: a promotion that expires
/// mid-session must fail re-validation at the payment boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: PromotionId,
    pub code: String,
    /// Percentage in 0..=100, applied to the combined price+tax total.
    pub discount_percentage: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl Promotion {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now && now <= self.end_date
    }
}
