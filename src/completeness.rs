//! Required-field checks that gate saving and publishing an order.
//!
//! These are about form completeness only. Whether the flight legs actually
//! move the declared quantities is the flow validator's job.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{is_airport_code, product_total, same_code, OrderDetails, OrderDraft};
use crate::order_details::{AWB_PREFIX_LEN, AWB_SUFFIX_MAX_LEN};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn all_digits(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_digit())
}

/// Problems with the AWB number alone. An order without one cannot be
/// matched against stored drafts.
pub fn awb_issues(details: &OrderDetails) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let prefix = details.awb_prefix.trim();
    if prefix.len() != AWB_PREFIX_LEN || !all_digits(prefix) {
        issues.push(ValidationIssue::new("awbPrefix", "must be exactly 3 digits"));
    }
    let suffix = details.awb_suffix.trim();
    if suffix.is_empty() || suffix.len() > AWB_SUFFIX_MAX_LEN || !all_digits(suffix) {
        issues.push(ValidationIssue::new("awbSuffix", "must be 1 to 6 digits"));
    }
    issues
}

/// Every required field of an order, in form order.
pub fn check_order(draft: &OrderDraft) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if draft.order_type.trim().is_empty() {
        issues.push(ValidationIssue::new("orderType", "is required"));
    }
    if draft.supplier.trim().is_empty() {
        issues.push(ValidationIssue::new("supplier", "is required"));
    }

    let details = &draft.details;
    issues.extend(awb_issues(details));
    if !is_airport_code(&details.awb_origin) {
        issues.push(ValidationIssue::new("awbOrg", "must be a 3-letter airport code"));
    }
    if !is_airport_code(&details.awb_destination) {
        issues.push(ValidationIssue::new("awbDest", "must be a 3-letter airport code"));
    }

    if draft.products.is_empty() {
        issues.push(ValidationIssue::new("products", "at least one product is required"));
    }
    for (idx, product) in draft.products.iter().enumerate() {
        if product.total_quantity == 0 {
            issues.push(ValidationIssue::new(
                format!("products[{idx}].totalQuantity"),
                "must be at least 1",
            ));
        }
    }

    if draft.flights.is_empty() {
        issues.push(ValidationIssue::new("flights", "at least one flight is required"));
    }
    for (idx, leg) in draft.flights.iter().enumerate() {
        let field = |name: &str| format!("flights[{idx}].{name}");

        let id_ok = (1..=6).contains(&leg.flight_id.len())
            && leg
                .flight_id
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
        if !id_ok {
            issues.push(ValidationIssue::new(field("flightId"), "must be 1 to 6 letters or digits"));
        }
        if leg.date.is_none() {
            issues.push(ValidationIssue::new(field("date"), "is required"));
        }
        if !is_airport_code(&leg.origin) {
            issues.push(ValidationIssue::new(field("origin"), "must be a 3-letter airport code"));
        }
        if !is_airport_code(&leg.destination) {
            issues.push(ValidationIssue::new(
                field("destination"),
                "must be a 3-letter airport code",
            ));
        }
        if same_code(&leg.origin, &leg.destination) {
            issues.push(ValidationIssue::new(field("destination"), "must differ from origin"));
        }
        if product_total(&draft.products, &leg.product_name).is_none() {
            issues.push(ValidationIssue::new(
                field("productName"),
                "must be one of the order's products",
            ));
        }
        if leg.quantity.unwrap_or(0) == 0 {
            issues.push(ValidationIssue::new(field("quantity"), "must be at least 1"));
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FlightLeg, Product};
    use chrono::Utc;

    fn complete_draft() -> OrderDraft {
        let mut leg = FlightLeg::new("LH400", "FRA", "JFK", "CoolPro", 2);
        leg.date = Some(Utc::now());
        OrderDraft {
            id: None,
            order_type: "Lease".into(),
            supplier: "Envirotainer".into(),
            details: OrderDetails {
                awb_prefix: "020".into(),
                awb_suffix: "123456".into(),
                awb_origin: "FRA".into(),
                awb_destination: "JFK".into(),
                ..Default::default()
            },
            products: vec![Product::new("CoolPro", 2)],
            flights: vec![leg],
        }
    }

    #[test]
    fn complete_order_has_no_issues() {
        assert!(check_order(&complete_draft()).is_empty());
    }

    #[test]
    fn blank_order_reports_every_missing_header_field() {
        let issues = check_order(&OrderDraft::default());
        let fields: Vec<_> = issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "orderType", "supplier", "awbPrefix", "awbSuffix", "awbOrg", "awbDest", "products",
                "flights"
            ]
        );
    }

    #[test]
    fn flight_rows_are_checked_individually() {
        let mut draft = complete_draft();
        let mut bad = FlightLeg::new("lh 1", "FRA", "fra", "MegaPump", 1);
        bad.quantity = None;
        draft.flights.push(bad);
        let issues = check_order(&draft);
        let fields: Vec<_> = issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "flights[1].flightId",
                "flights[1].date",
                "flights[1].destination",
                "flights[1].destination",
                "flights[1].productName",
                "flights[1].quantity"
            ]
        );
    }

    #[test]
    fn awb_suffix_may_be_short_but_not_empty() {
        let mut details = complete_draft().details;
        details.awb_suffix = "12".into();
        assert!(awb_issues(&details).is_empty());
        details.awb_suffix = String::new();
        assert_eq!(awb_issues(&details).len(), 1);
    }
}
