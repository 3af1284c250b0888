//! Product sheet: the rows a user picks products on, and the per-product
//! totals they add up to.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::Product;

pub const MAX_PRODUCT_ROWS: usize = 5;
pub const MAX_ROW_QUANTITY: u32 = 9;

/// Product groups and the products offered in each.
pub const PRODUCT_GROUPS: &[(&str, &[&str])] = &[
    (
        "Coolers",
        &["ArcticCool", "BreezeMax", "CoolPro", "FrostLine", "ThermoFlow"],
    ),
    (
        "MRIs",
        &["MagniScan", "NeuroView", "QuantumMRI", "SpectraMag", "UltraMag"],
    ),
    (
        "Lathe",
        &["PrecisionTurn", "MetalMaster", "ProLathe", "SpinCraft", "TurboTurn"],
    ),
    (
        "Pumps",
        &["HydroJet", "AquaFlow", "MegaPump", "FlowMaster", "PulsePump"],
    ),
];

static PRODUCT_CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<prefix>[A-Z]{3})[0-9]{4}$").expect("static pattern"));

pub fn products_in_group(group: &str) -> &'static [&'static str] {
    PRODUCT_GROUPS
        .iter()
        .find(|(name, _)| *name == group)
        .map(|(_, products)| *products)
        .unwrap_or(&[])
}

/// A code is the first three letters of the product name, uppercased,
/// followed by four digits.
pub fn is_product_code_valid(product_name: &str, code: &str) -> bool {
    let expected: String = product_name
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(3)
        .collect::<String>()
        .to_ascii_uppercase();
    if expected.len() < 3 {
        return false;
    }
    PRODUCT_CODE_PATTERN
        .captures(code)
        .and_then(|caps| caps.name("prefix"))
        .is_some_and(|prefix| prefix.as_str() == expected)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductRow {
    pub group: String,
    pub product: String,
    pub code: String,
    pub quantity: Option<u32>,
}

impl ProductRow {
    pub fn is_code_valid(&self) -> bool {
        !self.product.is_empty() && is_product_code_valid(&self.product, &self.code)
    }

    pub fn is_quantity_valid(&self) -> bool {
        matches!(self.quantity, Some(q) if (1..=MAX_ROW_QUANTITY).contains(&q))
    }
}

/// Between one and five product rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSheet {
    rows: Vec<ProductRow>,
}

impl Default for ProductSheet {
    fn default() -> Self {
        Self {
            rows: vec![ProductRow::default()],
        }
    }
}

impl ProductSheet {
    pub fn rows(&self) -> &[ProductRow] {
        &self.rows
    }

    pub fn add_row(&mut self) -> bool {
        if self.rows.len() >= MAX_PRODUCT_ROWS {
            return false;
        }
        self.rows.push(ProductRow::default());
        true
    }

    pub fn remove_row(&mut self, index: usize) -> bool {
        if self.rows.len() <= 1 || index >= self.rows.len() {
            return false;
        }
        self.rows.remove(index);
        true
    }

    /// A new group invalidates the product and its code.
    pub fn set_group(&mut self, index: usize, group: &str) {
        if let Some(row) = self.rows.get_mut(index) {
            row.group = group.to_string();
            row.product.clear();
            row.code.clear();
        }
    }

    pub fn set_product(&mut self, index: usize, product: &str) {
        if let Some(row) = self.rows.get_mut(index) {
            row.product = product.to_string();
        }
    }

    pub fn set_code(&mut self, index: usize, code: &str) {
        if let Some(row) = self.rows.get_mut(index) {
            row.code = code.trim().to_string();
        }
    }

    pub fn set_quantity(&mut self, index: usize, quantity: Option<u32>) {
        if let Some(row) = self.rows.get_mut(index) {
            row.quantity = quantity;
        }
    }

    /// Per-product totals in first-seen order. Rows without a product or
    /// without a positive quantity do not count.
    pub fn summary(&self) -> Vec<Product> {
        let mut summary: Vec<Product> = Vec::new();
        for row in &self.rows {
            let quantity = row.quantity.unwrap_or(0);
            if row.product.is_empty() || quantity == 0 {
                continue;
            }
            match summary.iter_mut().find(|p| p.name == row.product) {
                Some(existing) => existing.total_quantity += quantity,
                None => summary.push(Product::new(row.product.clone(), quantity)),
            }
        }
        summary
    }
}
