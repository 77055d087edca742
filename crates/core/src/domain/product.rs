use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::platform::Platform;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

/// A named progression step ("Level 10", "Diamond II") with the price of
/// reaching it from the previous step. Consumed sorted ascending by price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownOption {
    pub option: String,
    pub price: Decimal,
}

/// An inclusive integer band with a per-unit price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliderBand {
    pub min_quantity: i64,
    pub max_quantity: i64,
    pub price: Decimal,
}

impl SliderBand {
    pub fn contains(&self, unit: i64) -> bool {
        self.min_quantity <= unit && unit <= self.max_quantity
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PricingModel {
    Flat,
    Dropdown { options: Vec<DropdownOption> },
    Slider { bands: Vec<SliderBand> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Flat-mode unit price.
    pub price: Decimal,
    /// Flat per-unit tax amount, not a percentage. Ranged lines charge it
    /// once per unit of `item_qty`.
    pub tax: Decimal,
    pub pricing: PricingModel,
    pub platforms: Vec<Platform>,
}

impl Product {
    pub fn is_ranged(&self) -> bool {
        !matches!(self.pricing, PricingModel::Flat)
    }
}

/// Wire shape of a catalog product. Keeps the legacy `isDropdown`/`isSlider`
/// flags plus both option lists for read-compatibility with the backend;
/// normalize into [`Product`] with `TryFrom` before any pricing use.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub tax: Decimal,
    #[serde(default)]
    pub is_dropdown: bool,
    #[serde(default)]
    pub dropdown_options: Vec<DropdownOption>,
    #[serde(default)]
    pub is_slider: bool,
    #[serde(default)]
    pub slider_range: Vec<SliderBand>,
    #[serde(default)]
    pub platforms: Vec<Platform>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProductRecordError {
    #[error("product `{0}` is flagged as both dropdown and slider")]
    ConflictingModes(String),
    #[error("product `{0}` is flagged as dropdown but has no options")]
    EmptyDropdown(String),
    #[error("product `{0}` is flagged as slider but has no price bands")]
    EmptySlider(String),
    #[error("product `{product}` has a slider band with min {min} greater than max {max}")]
    InvertedBand { product: String, min: i64, max: i64 },
}

impl TryFrom<ProductRecord> for Product {
    type Error = ProductRecordError;

    fn try_from(record: ProductRecord) -> Result<Self, Self::Error> {
        let pricing = match (record.is_dropdown, record.is_slider) {
            (true, true) => {
                return Err(ProductRecordError::ConflictingModes(record.id.0));
            }
            (true, false) => {
                if record.dropdown_options.is_empty() {
                    return Err(ProductRecordError::EmptyDropdown(record.id.0));
                }
                let mut options = record.dropdown_options;
                options.sort_by(|left, right| left.price.cmp(&right.price));
                PricingModel::Dropdown { options }
            }
            (false, true) => {
                if record.slider_range.is_empty() {
                    return Err(ProductRecordError::EmptySlider(record.id.0));
                }
                for band in &record.slider_range {
                    if band.min_quantity > band.max_quantity {
                        return Err(ProductRecordError::InvertedBand {
                            product: record.id.0,
                            min: band.min_quantity,
                            max: band.max_quantity,
                        });
                    }
                }
                let mut bands = record.slider_range;
                bands.sort_by_key(|band| band.min_quantity);
                PricingModel::Slider { bands }
            }
            (false, false) => PricingModel::Flat,
        };

        Ok(Product {
            id: record.id,
            name: record.name,
            price: record.price,
            tax: record.tax,
            pricing,
            platforms: record.platforms,
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{
        DropdownOption, PricingModel, Product, ProductId, ProductRecord, ProductRecordError,
        SliderBand,
    };

    fn record() -> ProductRecord {
        ProductRecord {
            id: ProductId("rocket-rank".to_string()),
            name: "Rocket Rank Boost".to_string(),
            price: Decimal::new(1_000, 2),
            tax: Decimal::new(100, 2),
            is_dropdown: false,
            dropdown_options: Vec::new(),
            is_slider: false,
            slider_range: Vec::new(),
            platforms: Vec::new(),
        }
    }

    #[test]
    fn flat_record_normalizes_to_flat_pricing() {
        let product = Product::try_from(record()).expect("flat record");
        assert_eq!(product.pricing, PricingModel::Flat);
        assert!(!product.is_ranged());
    }

    #[test]
    fn dropdown_options_are_sorted_ascending_by_price() {
        let mut raw = record();
        raw.is_dropdown = true;
        raw.dropdown_options = vec![
            DropdownOption { option: "Level 50".to_string(), price: Decimal::new(5_000, 2) },
            DropdownOption { option: "Level 10".to_string(), price: Decimal::new(1_000, 2) },
            DropdownOption { option: "Level 30".to_string(), price: Decimal::new(3_000, 2) },
        ];

        let product = Product::try_from(raw).expect("dropdown record");
        let PricingModel::Dropdown { options } = product.pricing else {
            panic!("expected dropdown pricing");
        };
        let names: Vec<&str> = options.iter().map(|opt| opt.option.as_str()).collect();
        assert_eq!(names, vec!["Level 10", "Level 30", "Level 50"]);
    }

    #[test]
    fn conflicting_mode_flags_are_rejected() {
        let mut raw = record();
        raw.is_dropdown = true;
        raw.is_slider = true;
        raw.dropdown_options =
            vec![DropdownOption { option: "Level 10".to_string(), price: Decimal::ONE }];
        raw.slider_range =
            vec![SliderBand { min_quantity: 1, max_quantity: 10, price: Decimal::ONE }];

        let error = Product::try_from(raw).expect_err("both flags set");
        assert!(matches!(error, ProductRecordError::ConflictingModes(id) if id == "rocket-rank"));
    }

    #[test]
    fn inverted_slider_band_is_rejected() {
        let mut raw = record();
        raw.is_slider = true;
        raw.slider_range =
            vec![SliderBand { min_quantity: 20, max_quantity: 10, price: Decimal::ONE }];

        let error = Product::try_from(raw).expect_err("inverted band");
        assert!(matches!(error, ProductRecordError::InvertedBand { min: 20, max: 10, .. }));
    }

    #[test]
    fn record_round_trips_through_camel_case_json() {
        let json = r#"{
            "id": "wow-levels",
            "name": "WoW Leveling",
            "price": "12.50",
            "tax": "0.75",
            "isSlider": true,
            "sliderRange": [{"minQuantity": 1, "maxQuantity": 60, "price": "0.80"}]
        }"#;

        let record: ProductRecord = serde_json::from_str(json).expect("wire record");
        assert!(record.is_slider);
        assert_eq!(record.slider_range[0].max_quantity, 60);
        let product = Product::try_from(record).expect("normalized");
        assert!(product.is_ranged());
    }
}
