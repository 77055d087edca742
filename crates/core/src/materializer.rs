//! Two-directional mapping between the cart and the external checkout/order
//! collaborators: cart lines become per-platform submission groups on the way
//! out, and persisted `order_data` strings become a recomputed, display-ready
//! summary on the way back. Both directions price through [`crate::pricing`]
//! so the checkout and confirmation screens can never disagree.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order::{OrderId, OrderRecord, OrderState};
use crate::domain::platform::Platform;
use crate::domain::product::ProductId;
use crate::domain::promotion::Promotion;
use crate::pricing::{self, Priced, PricingResult};
use crate::selection::{LineSelection, SelectionKind};

/// Immutable snapshot of one cart line as submitted for payment. For ranged
/// lines the derived tax is folded into the price and the tax field zeroed:
/// the payment collaborator bills a single amount per line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub price: Decimal,
    pub tax: Decimal,
    pub item_qty: i64,
    #[serde(default)]
    pub is_dropdown: bool,
    #[serde(default)]
    pub is_slider: bool,
    #[serde(default)]
    pub start_label: Option<String>,
    #[serde(default)]
    pub end_label: Option<String>,
}

impl CheckoutLine {
    pub fn from_selection(selection: &LineSelection) -> Self {
        let (is_dropdown, is_slider) = match selection.kind {
            SelectionKind::Flat => (false, false),
            SelectionKind::DropdownRange { .. } => (true, false),
            SelectionKind::SliderRange { .. } => (false, true),
        };
        let ranged = is_dropdown || is_slider;
        let price = if ranged {
            selection.price + selection.tax * Decimal::from(selection.item_qty)
        } else {
            selection.price
        };
        let tax = if ranged { Decimal::ZERO } else { selection.tax };

        Self {
            product_id: selection.product_id.clone(),
            product_name: selection.product_name.clone(),
            quantity: selection.quantity,
            price,
            tax,
            item_qty: selection.item_qty,
            is_dropdown,
            is_slider,
            start_label: selection.start_label.clone(),
            end_label: selection.end_label.clone(),
        }
    }
}

impl Priced for CheckoutLine {
    fn unit_price(&self) -> Decimal {
        self.price
    }

    fn unit_tax(&self) -> Decimal {
        self.tax
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }

    fn item_qty(&self) -> i64 {
        self.item_qty
    }

    fn is_ranged(&self) -> bool {
        self.is_dropdown || self.is_slider
    }
}

/// One platform's payable unit: the submission lines plus
/// presentation-rounded totals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutGroup {
    pub platform: Platform,
    pub lines: Vec<CheckoutLine>,
    pub totals: PricingResult,
}

/// Builds one checkout group per platform present in the cart. Each group is
/// paid independently; a single cart can spawn one payment session per group.
pub fn materialize(
    lines: &[LineSelection],
    promotion: Option<&Promotion>,
    now: DateTime<Utc>,
) -> Vec<CheckoutGroup> {
    pricing::group_by_platform(lines)
        .into_iter()
        .map(|group| {
            let totals = pricing::price_lines(&group.lines, promotion, now).presented();
            CheckoutGroup {
                platform: group.platform,
                lines: group.lines.iter().map(CheckoutLine::from_selection).collect(),
                totals,
            }
        })
        .collect()
}

/// The snapshot written to session storage under the `place_order` key after
/// a payment session is created, so the thank-you screen can reconstruct
/// line-level detail the backend order record does not retain verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderSnapshot {
    pub orders: Vec<CheckoutLine>,
    pub session_id: String,
    /// The promotion the payment session was priced with. The session has
    /// already charged this discount, so the confirm step applies it without
    /// re-checking the window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo: Option<PromoData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_platform: Option<String>,
}

/// Promotion detail as persisted in an order's `promo_data` column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoData {
    pub code: String,
    pub discount_percentage: Decimal,
}

impl From<&Promotion> for PromoData {
    fn from(promotion: &Promotion) -> Self {
        Self { code: promotion.code.clone(), discount_percentage: promotion.discount_percentage }
    }
}

/// Encodes submission lines the way the backend stores them: one JSON string
/// per line.
pub fn encode_order_data(lines: &[CheckoutLine]) -> Vec<String> {
    lines
        .iter()
        .map(|line| serde_json::to_string(line).unwrap_or_else(|_| String::from("{}")))
        .collect()
}

pub fn encode_promo_data(promo: &PromoData) -> String {
    serde_json::to_string(promo).unwrap_or_else(|_| String::from("{}"))
}

/// A rehydrated order line. A parse failure on one persisted string degrades
/// that single line to quantity-only detail; it never aborts the others.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "detail", rename_all = "snake_case")]
pub enum LineDetail {
    Detailed(CheckoutLine),
    Degraded { quantity: u32, raw: String },
}

#[derive(Debug, Deserialize)]
struct QuantityProbe {
    #[serde(default = "default_quantity")]
    quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Display model for the confirmation and order-detail screens.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: OrderId,
    pub state: OrderState,
    pub platform: Option<Platform>,
    pub lines: Vec<LineDetail>,
    pub promotion: Option<PromoData>,
    /// Totals recomputed from the parsed lines through the pricing engine.
    pub totals: PricingResult,
    /// The total the backend recorded at submission time.
    pub submitted_total: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Rehydrates a persisted order into display totals. Each `order_data` entry
/// is parsed independently; `promo_data` reapplies the submitted percentage
/// to the combined total (the window was validated at submission).
pub fn rehydrate(record: &OrderRecord) -> OrderSummary {
    let mut detailed: Vec<CheckoutLine> = Vec::new();
    let lines: Vec<LineDetail> = record
        .order_data
        .iter()
        .map(|raw| match serde_json::from_str::<CheckoutLine>(raw) {
            Ok(line) => {
                detailed.push(line.clone());
                LineDetail::Detailed(line)
            }
            Err(_) => {
                let quantity = serde_json::from_str::<QuantityProbe>(raw)
                    .map(|probe| probe.quantity)
                    .unwrap_or(1);
                LineDetail::Degraded { quantity, raw: raw.clone() }
            }
        })
        .collect();

    let promotion = record
        .promo_data
        .as_deref()
        .and_then(|raw| serde_json::from_str::<PromoData>(raw).ok());

    let subtotal = pricing::subtotal(&detailed);
    let tax_total = pricing::tax_total(&detailed);
    let combined = subtotal + tax_total;
    let discount_total = promotion
        .as_ref()
        .map(|promo| pricing::percentage_discount(combined, promo.discount_percentage))
        .unwrap_or(Decimal::ZERO);
    let totals = PricingResult {
        subtotal,
        tax_total,
        discount_total,
        total: combined - discount_total,
    }
    .presented();

    OrderSummary {
        id: record.id.clone(),
        state: record.state,
        platform: record.platform.clone(),
        lines,
        promotion,
        totals,
        submitted_total: record.total_price,
        created_at: record.created_at,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use super::{
        encode_order_data, encode_promo_data, materialize, rehydrate, CheckoutLine, LineDetail,
        PlaceOrderSnapshot, PromoData,
    };
    use crate::domain::order::{OrderId, OrderRecord, OrderState};
    use crate::domain::platform::Platform;
    use crate::domain::product::ProductId;
    use crate::domain::promotion::{Promotion, PromotionId};
    use crate::selection::{LineSelection, SelectionKind};

    fn flat_line(product: &str, platform: Platform, quantity: u32, price: i64, tax: i64) -> LineSelection {
        LineSelection {
            product_id: ProductId(product.to_string()),
            product_name: product.to_string(),
            platform,
            quantity,
            price: Decimal::new(price, 2),
            tax: Decimal::new(tax, 2),
            item_qty: i64::from(quantity),
            kind: SelectionKind::Flat,
            start_label: None,
            end_label: None,
        }
    }

    fn ranged_line(product: &str, platform: Platform, price: i64, tax: i64, item_qty: i64) -> LineSelection {
        LineSelection {
            product_id: ProductId(product.to_string()),
            product_name: product.to_string(),
            platform,
            quantity: 1,
            price: Decimal::new(price, 2),
            tax: Decimal::new(tax, 2),
            item_qty,
            kind: SelectionKind::DropdownRange { start: 0, end: item_qty as usize },
            start_label: Some("Gold".to_string()),
            end_label: Some("Diamond".to_string()),
        }
    }

    fn promotion(percentage: i64) -> Promotion {
        let now = Utc::now();
        Promotion {
            id: PromotionId("p".to_string()),
            code: "SAVE".to_string(),
            discount_percentage: Decimal::new(percentage, 0),
            start_date: now - Duration::hours(1),
            end_date: now + Duration::hours(1),
        }
    }

    #[test]
    fn ranged_submission_folds_tax_into_price() {
        let pc = Platform::new("pc", "PC");
        let line = ranged_line("rank", pc, 2_500, 200, 4);
        let snapshot = CheckoutLine::from_selection(&line);

        // 25.00 + 4 * 2.00 tax folded in, tax zeroed for the payment line.
        assert_eq!(snapshot.price, Decimal::new(3_300, 2));
        assert_eq!(snapshot.tax, Decimal::ZERO);
        assert!(snapshot.is_dropdown);
    }

    #[test]
    fn flat_submission_keeps_tax_separate() {
        let pc = Platform::new("pc", "PC");
        let snapshot = CheckoutLine::from_selection(&flat_line("coach", pc, 2, 1_000, 150));
        assert_eq!(snapshot.price, Decimal::new(1_000, 2));
        assert_eq!(snapshot.tax, Decimal::new(150, 2));
    }

    #[test]
    fn one_group_per_platform() {
        let pc = Platform::new("pc", "PC");
        let xbox = Platform::new("xbox", "Xbox");
        let lines = vec![
            flat_line("one", pc.clone(), 2, 500, 0),
            flat_line("two", xbox.clone(), 1, 2_000, 0),
        ];

        let groups = materialize(&lines, None, Utc::now());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].totals.subtotal, Decimal::new(1_000, 2));
        assert_eq!(groups[1].totals.subtotal, Decimal::new(2_000, 2));
    }

    #[test]
    fn submitted_snapshot_round_trips_to_the_same_total() {
        let pc = Platform::new("pc", "PC");
        let lines = vec![
            flat_line("coach", pc.clone(), 3, 1_000, 100),
            ranged_line("rank", pc, 2_500, 200, 4),
        ];
        let promo = promotion(20);
        let now = Utc::now();

        let groups = materialize(&lines, Some(&promo), now);
        assert_eq!(groups.len(), 1);
        let submitted = &groups[0];

        let record = OrderRecord {
            id: OrderId("ord-1".to_string()),
            order_data: encode_order_data(&submitted.lines),
            promo_data: Some(encode_promo_data(&PromoData::from(&promo))),
            platform: Some(submitted.platform.clone()),
            state: OrderState::Assigned,
            total_price: submitted.totals.total,
            created_at: now,
        };

        let summary = rehydrate(&record);
        // The folded lines shift tax into subtotal, but the combined figure
        // and the discounted total must match what was submitted.
        assert_eq!(summary.totals.total, record.total_price);
        assert_eq!(summary.totals.discount_total, submitted.totals.discount_total);
        assert_eq!(
            summary.totals.subtotal + summary.totals.tax_total,
            submitted.totals.subtotal + submitted.totals.tax_total
        );
        assert_eq!(summary.promotion.as_ref().map(|p| p.code.as_str()), Some("SAVE"));
    }

    #[test]
    fn one_bad_line_degrades_without_aborting_the_rest() {
        let pc = Platform::new("pc", "PC");
        let good = CheckoutLine::from_selection(&flat_line("coach", pc, 2, 1_000, 0));
        let record = OrderRecord {
            id: OrderId("ord-2".to_string()),
            order_data: vec![
                serde_json::to_string(&good).expect("encode"),
                "{\"quantity\": 7}".to_string(),
                "not json at all".to_string(),
            ],
            promo_data: None,
            platform: None,
            state: OrderState::InProgress,
            total_price: Decimal::new(2_000, 2),
            created_at: Utc::now(),
        };

        let summary = rehydrate(&record);
        assert_eq!(summary.lines.len(), 3);
        assert!(matches!(summary.lines[0], LineDetail::Detailed(_)));
        assert!(matches!(summary.lines[1], LineDetail::Degraded { quantity: 7, .. }));
        assert!(matches!(summary.lines[2], LineDetail::Degraded { quantity: 1, .. }));
        // Totals come from the one parseable line.
        assert_eq!(summary.totals.total, Decimal::new(2_000, 2));
    }

    #[test]
    fn place_order_snapshot_uses_the_stable_wire_names() {
        let pc = Platform::new("pc", "PC");
        let snapshot = PlaceOrderSnapshot {
            orders: vec![CheckoutLine::from_selection(&flat_line("coach", pc, 1, 1_000, 0))],
            session_id: "cs_123".to_string(),
            promo: Some(PromoData::from(&promotion(20))),
            sub_platform: None,
        };

        let json = serde_json::to_string(&snapshot).expect("serialize");
        assert!(json.contains("\"sessionId\":\"cs_123\""));
        assert!(json.contains("\"promo\":{\"code\":\"SAVE\",\"discountPercentage\":\"20\"}"));
        assert!(!json.contains("subPlatform"));

        // Older snapshots without a promo field still decode.
        let legacy: PlaceOrderSnapshot =
            serde_json::from_str("{\"orders\":[],\"sessionId\":\"cs_9\"}").expect("decode");
        assert!(legacy.promo.is_none());
    }
}
