use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::order_details::LeaseWindow;

/// A product on an order with the quantity its flights must move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub name: String,
    pub total_quantity: u32,
}

impl Product {
    pub fn new(name: impl Into<String>, total_quantity: u32) -> Self {
        Self {
            name: name.into(),
            total_quantity,
        }
    }
}

/// Looks up a product's declared total by name.
pub fn product_total(products: &[Product], name: &str) -> Option<u32> {
    if name.is_empty() {
        return None;
    }
    products
        .iter()
        .find(|p| p.name == name)
        .map(|p| p.total_quantity)
}

/// One flight movement of one product between two airports.
///
/// `quantity` stays `None` until a product has been chosen for the row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightLeg {
    pub flight_id: String,
    pub date: Option<DateTime<Utc>>,
    pub origin: String,
    pub destination: String,
    pub product_name: String,
    pub quantity: Option<u32>,
}

impl FlightLeg {
    pub fn new(
        flight_id: impl Into<String>,
        origin: impl Into<String>,
        destination: impl Into<String>,
        product_name: impl Into<String>,
        quantity: u32,
    ) -> Self {
        Self {
            flight_id: flight_id.into(),
            date: None,
            origin: origin.into(),
            destination: destination.into(),
            product_name: product_name.into(),
            quantity: Some(quantity),
        }
    }

    pub fn carries(&self, product: &str) -> bool {
        !product.is_empty() && self.product_name == product
    }

    pub fn quantity_or_zero(&self) -> u32 {
        self.quantity.unwrap_or(0)
    }
}

/// Header fields of an order: air waybill and lease.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub awb_prefix: String,
    pub awb_suffix: String,
    #[serde(rename = "awbOrg")]
    pub awb_origin: String,
    #[serde(rename = "awbDest")]
    pub awb_destination: String,
    pub pickup_port: String,
    pub return_port: String,
    #[serde(default)]
    pub lease: LeaseWindow,
}

impl OrderDetails {
    /// The AWB prefix/suffix pair, when both halves are filled in.
    pub fn awb_key(&self) -> Option<(&str, &str)> {
        let prefix = self.awb_prefix.trim();
        let suffix = self.awb_suffix.trim();
        if prefix.is_empty() || suffix.is_empty() {
            None
        } else {
            Some((prefix, suffix))
        }
    }

    /// `prefix-suffix`, or `-` when nothing is filled in.
    pub fn awb_number(&self) -> String {
        format!("{}-{}", self.awb_prefix.trim(), self.awb_suffix.trim())
    }
}

/// Working copy of an order as the editor produces it.
///
/// `id` is `None` until the first save assigns one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub id: Option<String>,
    pub order_type: String,
    pub supplier: String,
    #[serde(rename = "orderDetails")]
    pub details: OrderDetails,
    pub products: Vec<Product>,
    pub flights: Vec<FlightLeg>,
}

/// A persisted order, either in the draft table or the published table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub order_type: String,
    pub supplier: String,
    #[serde(rename = "orderDetails")]
    pub details: OrderDetails,
    pub products: Vec<Product>,
    pub flights: Vec<FlightLeg>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Order {
    pub fn from_draft(draft: OrderDraft, id: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            order_type: draft.order_type,
            supplier: draft.supplier,
            details: draft.details,
            products: draft.products,
            flights: draft.flights,
            created_at,
            last_updated: None,
        }
    }

    /// Reopens the order in the editor, keeping its id.
    pub fn to_draft(&self) -> OrderDraft {
        OrderDraft {
            id: Some(self.id.clone()),
            order_type: self.order_type.clone(),
            supplier: self.supplier.clone(),
            details: self.details.clone(),
            products: self.products.clone(),
            flights: self.flights.clone(),
        }
    }

    pub fn same_awb(&self, details: &OrderDetails) -> bool {
        match (self.details.awb_key(), details.awb_key()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_total_ignores_unknown_and_blank_names() {
        let products = vec![Product::new("CoolPro", 4)];
        assert_eq!(product_total(&products, "CoolPro"), Some(4));
        assert_eq!(product_total(&products, "MegaPump"), None);
        assert_eq!(product_total(&products, ""), None);
    }

    #[test]
    fn awb_key_requires_both_halves() {
        let mut details = OrderDetails {
            awb_prefix: "020".into(),
            ..Default::default()
        };
        assert!(details.awb_key().is_none());
        details.awb_suffix = "123456".into();
        assert_eq!(details.awb_key(), Some(("020", "123456")));
        assert_eq!(details.awb_number(), "020-123456");
    }

    #[test]
    fn order_serializes_with_storage_field_names() {
        let order = Order::from_draft(OrderDraft::default(), "o1".into(), Utc::now());
        let json = serde_json::to_value(&order).unwrap();
        assert!(json.get("orderDetails").is_some());
        assert!(json["orderDetails"].get("awbOrg").is_some());
        assert!(json.get("createdAt").is_some());
    }
}
