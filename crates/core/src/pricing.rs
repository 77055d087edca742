//! The single pricing engine every display surface calls. Checkout, order
//! dialogs, and the thank-you screen all fold lines through these functions
//! instead of inlining their own reductions.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::platform::Platform;
use crate::domain::promotion::Promotion;
use crate::selection::LineSelection;

/// Anything the engine can price: a live cart line or a persisted order line.
pub trait Priced {
    fn unit_price(&self) -> Decimal;
    fn unit_tax(&self) -> Decimal;
    fn quantity(&self) -> u32;
    fn item_qty(&self) -> i64;
    fn is_ranged(&self) -> bool;
}

impl Priced for LineSelection {
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
        self.is_ranged()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingResult {
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub discount_total: Decimal,
    pub total: Decimal,
}

impl PricingResult {
    /// Presentation-rounded copy. Rounding happens only here, never
    /// mid-calculation, so summed lines don't compound rounding error.
    pub fn presented(&self) -> Self {
        Self {
            subtotal: present(self.subtotal),
            tax_total: present(self.tax_total),
            discount_total: present(self.discount_total),
            total: present(self.total),
        }
    }
}

/// Rounds a monetary amount to 2 decimal places for display or submission.
pub fn present(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Flat lines contribute `price * quantity`; ranged lines contribute `price`
/// as-is, because their price already aggregates the selected range and their
/// quantity is pinned to 1. Quantity is never reapplied to a ranged line.
pub fn subtotal<L: Priced>(lines: &[L]) -> Decimal {
    lines.iter().fold(Decimal::ZERO, |acc, line| {
        if line.is_ranged() {
            acc + line.unit_price()
        } else {
            acc + line.unit_price() * Decimal::from(line.quantity())
        }
    })
}

/// Flat lines are taxed per `quantity`; ranged lines per unit of `item_qty`.
pub fn tax_total<L: Priced>(lines: &[L]) -> Decimal {
    lines.iter().fold(Decimal::ZERO, |acc, line| {
        if line.is_ranged() {
            acc + line.unit_tax() * Decimal::from(line.item_qty())
        } else {
            acc + line.unit_tax() * Decimal::from(line.quantity())
        }
    })
}

/// `combined * percentage / 100` — the one place the discount formula lives.
pub fn percentage_discount(combined: Decimal, percentage: Decimal) -> Decimal {
    combined * percentage / Decimal::ONE_HUNDRED
}

/// Discount for the combined price+tax total. Zero unless the promotion is
/// active at `now`; the window is checked at application time, never cached.
pub fn discount_total(
    combined: Decimal,
    promotion: Option<&Promotion>,
    now: DateTime<Utc>,
) -> Decimal {
    match promotion {
        Some(promotion) if promotion.is_active_at(now) => {
            percentage_discount(combined, promotion.discount_percentage)
        }
        _ => Decimal::ZERO,
    }
}

pub fn grand_total<L: Priced>(
    lines: &[L],
    promotion: Option<&Promotion>,
    now: DateTime<Utc>,
) -> Decimal {
    price_lines(lines, promotion, now).total
}

pub fn price_lines<L: Priced>(
    lines: &[L],
    promotion: Option<&Promotion>,
    now: DateTime<Utc>,
) -> PricingResult {
    let subtotal = subtotal(lines);
    let tax_total = tax_total(lines);
    let combined = subtotal + tax_total;
    let discount_total = discount_total(combined, promotion, now);

    PricingResult { subtotal, tax_total, discount_total, total: combined - discount_total }
}

/// The lines of one cart that share a target platform: the independent unit
/// of checkout. One cart can spawn one payment session per group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformGroup {
    pub platform: Platform,
    pub lines: Vec<LineSelection>,
}

/// Groups lines by platform id, preserving first-appearance order.
pub fn group_by_platform(lines: &[LineSelection]) -> Vec<PlatformGroup> {
    let mut groups: Vec<PlatformGroup> = Vec::new();
    for line in lines {
        match groups.iter_mut().find(|group| group.platform.id == line.platform.id) {
            Some(group) => group.lines.push(line.clone()),
            None => groups.push(PlatformGroup {
                platform: line.platform.clone(),
                lines: vec![line.clone()],
            }),
        }
    }
    groups
}

pub trait PricingEngine: Send + Sync {
    fn price(
        &self,
        lines: &[LineSelection],
        promotion: Option<&Promotion>,
        now: DateTime<Utc>,
    ) -> PricingResult;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicPricingEngine;

impl PricingEngine for DeterministicPricingEngine {
    fn price(
        &self,
        lines: &[LineSelection],
        promotion: Option<&Promotion>,
        now: DateTime<Utc>,
    ) -> PricingResult {
        price_lines(lines, promotion, now)
    }
}
