//! Option selector: translates raw selection state (flat quantity, dropdown
//! start/end pair, slider start/end pair) into a normalized [`LineSelection`]
//! with no knowledge of any UI.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::platform::Platform;
use crate::domain::product::{DropdownOption, PricingModel, Product, ProductId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliderUnit {
    pub index: i64,
    pub price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SelectionKind {
    Flat,
    DropdownRange { start: usize, end: usize },
    SliderRange { start: i64, end: i64, units: Vec<SliderUnit> },
}

/// One priced cart entry derived from one product plus one option selection.
///
/// For ranged kinds `price` already aggregates the whole selected range and
/// `quantity` is pinned to 1; `tax` is charged per unit of `item_qty`. For
/// flat kinds `price`/`tax` are per unit and multiply by `quantity`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSelection {
    pub product_id: ProductId,
    pub product_name: String,
    pub platform: Platform,
    pub quantity: u32,
    pub price: Decimal,
    pub tax: Decimal,
    pub item_qty: i64,
    pub kind: SelectionKind,
    pub start_label: Option<String>,
    pub end_label: Option<String>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("quantity must be at least 1")]
    QuantityBelowMinimum,
    #[error("product `{product}` is not priced in {expected} mode")]
    WrongPricingMode { product: String, expected: &'static str },
    #[error("product `{0}` is not offered on the selected platform")]
    PlatformNotOffered(String),
    #[error("select both a start and an end before adding to cart")]
    IncompleteRange,
    #[error("the end option must come after the start option")]
    EndNotAfterStart,
    #[error("option index {index} is out of range ({len} options)")]
    OptionOutOfRange { index: usize, len: usize },
    #[error("slider value {value} is outside the allowed range {min}..={max}")]
    ValueOutOfRange { value: i64, min: i64, max: i64 },
    #[error("slider start {start} is greater than end {end}")]
    StartAfterEnd { start: i64, end: i64 },
    #[error("no price band covers unit {0}")]
    UncoveredUnit(i64),
}

impl LineSelection {
    pub fn is_ranged(&self) -> bool {
        !matches!(self.kind, SelectionKind::Flat)
    }

    /// Flat mode: simple per-unit quantity pricing.
    pub fn flat(
        product: &Product,
        platform: Platform,
        quantity: u32,
    ) -> Result<Self, SelectionError> {
        if !matches!(product.pricing, PricingModel::Flat) {
            return Err(SelectionError::WrongPricingMode {
                product: product.id.0.clone(),
                expected: "flat",
            });
        }
        check_platform(product, &platform)?;
        if quantity < 1 {
            return Err(SelectionError::QuantityBelowMinimum);
        }

        Ok(Self {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            platform,
            quantity,
            price: product.price,
            tax: product.tax,
            item_qty: i64::from(quantity),
            kind: SelectionKind::Flat,
            start_label: None,
            end_label: None,
        })
    }

    /// Dropdown mode: a start/end pair into the product's options, sorted
    /// ascending by price. The price aggregates the steps after `start` up to
    /// and including `end`; `item_qty` is the step count `end - start`.
    pub fn dropdown_range(
        product: &Product,
        platform: Platform,
        start: Option<usize>,
        end: Option<usize>,
    ) -> Result<Self, SelectionError> {
        let PricingModel::Dropdown { options } = &product.pricing else {
            return Err(SelectionError::WrongPricingMode {
                product: product.id.0.clone(),
                expected: "dropdown",
            });
        };
        check_platform(product, &platform)?;

        let (start, end) = match (start, end) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(SelectionError::IncompleteRange),
        };
        if end >= options.len() {
            return Err(SelectionError::OptionOutOfRange { index: end, len: options.len() });
        }
        if start >= options.len() {
            return Err(SelectionError::OptionOutOfRange { index: start, len: options.len() });
        }
        if start >= end {
            return Err(SelectionError::EndNotAfterStart);
        }

        let price: Decimal = options[start + 1..=end].iter().map(|option| option.price).sum();
        let item_qty = (end - start) as i64;

        Ok(Self {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            platform,
            quantity: 1,
            price,
            tax: product.tax,
            item_qty,
            kind: SelectionKind::DropdownRange { start, end },
            start_label: Some(options[start].option.clone()),
            end_label: Some(options[end].option.clone()),
        })
    }

    /// Slider mode: a start/end pair over an integer range backed by price
    /// bands. Every unit in the inclusive range is priced by the band that
    /// contains it; `item_qty` is the step count `end - start`.
    pub fn slider_range(
        product: &Product,
        platform: Platform,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<Self, SelectionError> {
        let PricingModel::Slider { bands } = &product.pricing else {
            return Err(SelectionError::WrongPricingMode {
                product: product.id.0.clone(),
                expected: "slider",
            });
        };
        check_platform(product, &platform)?;

        let (start, end) = match (start, end) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(SelectionError::IncompleteRange),
        };
        if start > end {
            return Err(SelectionError::StartAfterEnd { start, end });
        }

        let min = bands.first().map(|band| band.min_quantity).unwrap_or_default();
        let max = bands.last().map(|band| band.max_quantity).unwrap_or_default();
        for value in [start, end] {
            if value < min || value > max {
                return Err(SelectionError::ValueOutOfRange { value, min, max });
            }
        }

        let mut units = Vec::with_capacity((end - start + 1) as usize);
        for unit in start..=end {
            let band = bands
                .iter()
                .find(|band| band.contains(unit))
                .ok_or(SelectionError::UncoveredUnit(unit))?;
            units.push(SliderUnit { index: unit, price: band.price });
        }
        let price: Decimal = units.iter().map(|unit| unit.price).sum();

        Ok(Self {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            platform,
            quantity: 1,
            price,
            tax: product.tax,
            item_qty: end - start,
            kind: SelectionKind::SliderRange { start, end, units },
            start_label: Some(start.to_string()),
            end_label: Some(end.to_string()),
        })
    }
}

/// View over a dropdown product's options that enforces range monotonicity:
/// the end selector only ever sees options strictly after the chosen start.
#[derive(Clone, Copy, Debug)]
pub struct DropdownMenu<'a> {
    options: &'a [DropdownOption],
}

impl<'a> DropdownMenu<'a> {
    pub fn new(product: &'a Product) -> Result<Self, SelectionError> {
        let PricingModel::Dropdown { options } = &product.pricing else {
            return Err(SelectionError::WrongPricingMode {
                product: product.id.0.clone(),
                expected: "dropdown",
            });
        };
        Ok(Self { options })
    }

    pub fn start_options(&self) -> &'a [DropdownOption] {
        self.options
    }

    /// Options selectable as the range end for the given start. Empty when
    /// the start is the last option: no further progression is available.
    pub fn end_options(&self, start: usize) -> &'a [DropdownOption] {
        if start + 1 >= self.options.len() {
            return &[];
        }
        &self.options[start + 1..]
    }
}

fn check_platform(product: &Product, platform: &Platform) -> Result<(), SelectionError> {
    if product.platforms.is_empty() {
        return Ok(());
    }
    if product.platforms.iter().any(|offered| offered.id == platform.id) {
        return Ok(());
    }
    Err(SelectionError::PlatformNotOffered(product.id.0.clone()))
}
