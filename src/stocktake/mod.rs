//! Stock take: walking the ULD catalog location by location and recording
//! what is actually there.

pub mod grouping;
pub mod movement;
pub mod service;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::domain::{AdditionalUld, CatalogUld};
use crate::error::StockTakeError;

pub use grouping::*;
pub use movement::*;
pub use service::*;

static ULD_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2,3}\d{5,6}[A-Z]{2}$").expect("static pattern"));

/// Uppercases and checks a ULD identifier such as `AKE12345LH`.
pub fn normalize_identifier(raw: &str) -> Result<String, StockTakeError> {
    let identifier = raw.trim().to_uppercase();
    if ULD_IDENTIFIER.is_match(&identifier) {
        Ok(identifier)
    } else {
        Err(StockTakeError::InvalidIdentifier(raw.to_string()))
    }
}

/// Whether an event went through or was cancelled at its prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Committed,
    Cancelled,
}

/// What observers of a stock take see after every committed change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockTakeView {
    pub catalog: Vec<CatalogUld>,
    pub additional: Vec<AdditionalUld>,
    pub groups: Vec<LocationGroup>,
}

impl StockTakeView {
    pub fn of(stock_take: &StockTake) -> Self {
        Self {
            catalog: stock_take.catalog().to_vec(),
            additional: stock_take.additional().to_vec(),
            groups: group_by_location(stock_take.catalog(), stock_take.additional()),
        }
    }

    pub fn filtered(&self, locations: &[String]) -> Vec<LocationGroup> {
        filter_locations(&self.groups, locations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_uppercased_and_checked() {
        assert_eq!(normalize_identifier(" ake12345lh "), Ok("AKE12345LH".to_string()));
        assert_eq!(normalize_identifier("PMC123456LH"), Ok("PMC123456LH".to_string()));
        assert!(normalize_identifier("AKE1234LH").is_err());
        assert!(normalize_identifier("A12345LH").is_err());
        assert!(normalize_identifier("AKE12345L").is_err());
        assert!(normalize_identifier("").is_err());
    }
}
