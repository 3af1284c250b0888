use std::fmt;

use serde::{Deserialize, Serialize};

pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    #[default]
    Serviceable,
    Damaged,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Serviceable => write!(f, "Serviceable"),
            Condition::Damaged => write!(f, "Damaged"),
        }
    }
}

/// A ULD sitting at the location its catalog record names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogUld {
    pub identifier: String,
    pub uld_type: String,
    pub location: String,
    pub condition: Condition,
    pub is_found: bool,
}

impl CatalogUld {
    pub fn new(
        identifier: impl Into<String>,
        uld_type: impl Into<String>,
        location: impl Into<String>,
        condition: Condition,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            uld_type: uld_type.into(),
            location: location.into(),
            condition,
            is_found: false,
        }
    }
}

/// The catalog home a ULD was taken from, and whether it had been found there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Displacement {
    pub location: String,
    pub was_found: bool,
}

/// A ULD recorded outside its catalog location: moved, or newly discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalUld {
    pub identifier: String,
    pub uld_type: Option<String>,
    pub location: String,
    pub condition: Condition,
    pub is_found: bool,
    pub displaced_from: Option<Displacement>,
}

impl AdditionalUld {
    pub fn original_location(&self) -> Option<&str> {
        self.displaced_from.as_ref().map(|d| d.location.as_str())
    }

    pub fn original_is_found(&self) -> Option<bool> {
        self.displaced_from.as_ref().map(|d| d.was_found)
    }
}

/// Where a ULD identifier currently lives in a stock take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UldState<'a> {
    Unknown,
    AtCatalogLocation(&'a CatalogUld),
    Additional(&'a AdditionalUld),
}
