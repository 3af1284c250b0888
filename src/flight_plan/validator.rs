use std::fmt;

use serde::{Deserialize, Serialize};

use super::{node_balances, used_quantity, RouteContext};
use crate::domain::{normalize_code, same_code, FlightLeg};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    /// Net outflow at the AWB origin differs from the product total.
    OriginOutflow,
    /// Net inflow at the AWB destination differs from the product total.
    DestinationInflow,
    /// An intermediate airport does not pass on everything it receives.
    NodeLeftover,
}

/// One broken conservation rule for one product at one airport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowViolation {
    pub product: String,
    pub kind: ViolationKind,
    pub node: String,
    pub expected: i64,
    pub actual: i64,
}

impl fmt::Display for FlowViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ViolationKind::OriginOutflow => write!(
                f,
                "{}: total leaving AWB Org {} must equal {} (currently {})",
                self.product, self.node, self.expected, self.actual
            ),
            ViolationKind::DestinationInflow => write!(
                f,
                "{}: total arriving at AWB Dest {} must equal {} (currently {})",
                self.product, self.node, self.expected, self.actual
            ),
            ViolationKind::NodeLeftover => write!(
                f,
                "{}: node {} must not have leftover (currently {})",
                self.product, self.node, self.actual
            ),
        }
    }
}

/// Outcome of a flow validation run. Never an error: an unbalanced plan is a
/// report with violations in it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowReport {
    violations: Vec<FlowViolation>,
}

impl FlowReport {
    pub fn ok(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[FlowViolation] {
        &self.violations
    }

    pub fn into_violations(self) -> Vec<FlowViolation> {
        self.violations
    }

    /// Human-readable form, one line per violation.
    pub fn errors(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }
}

/// Checks flow conservation for every declared product.
///
/// For each product with total `T`: the AWB origin must net `-T`, the AWB
/// destination must net `+T`, and every other airport touched by its legs
/// must net zero. An undeclared AWB code skips its check, and that airport
/// is then treated like any intermediate node. Legs of undeclared products
/// are ignored.
pub fn validate_flow(ctx: &RouteContext<'_>, legs: &[FlightLeg]) -> FlowReport {
    let origin = normalize_code(ctx.awb_origin);
    let destination = normalize_code(ctx.awb_destination);
    let mut violations = Vec::new();

    for product in ctx.products {
        let total = i64::from(product.total_quantity);
        let balances = node_balances(legs, &product.name);

        if !origin.is_empty() {
            let balance = balances.get(&origin).copied().unwrap_or(0);
            if balance != -total {
                violations.push(FlowViolation {
                    product: product.name.clone(),
                    kind: ViolationKind::OriginOutflow,
                    node: origin.clone(),
                    expected: total,
                    actual: -balance,
                });
            }
        }

        if !destination.is_empty() {
            let balance = balances.get(&destination).copied().unwrap_or(0);
            if balance != total {
                violations.push(FlowViolation {
                    product: product.name.clone(),
                    kind: ViolationKind::DestinationInflow,
                    node: destination.clone(),
                    expected: total,
                    actual: balance,
                });
            }
        }

        for (node, balance) in &balances {
            let declared = (!origin.is_empty() && *node == origin)
                || (!destination.is_empty() && *node == destination);
            if declared || *balance == 0 {
                continue;
            }
            violations.push(FlowViolation {
                product: product.name.clone(),
                kind: ViolationKind::NodeLeftover,
                node: node.clone(),
                expected: 0,
                actual: *balance,
            });
        }
    }

    FlowReport { violations }
}

/// At least one leg departs from the declared AWB origin.
pub fn departs_from_awb_origin(ctx: &RouteContext<'_>, legs: &[FlightLeg]) -> bool {
    legs.iter().any(|leg| same_code(ctx.awb_origin, &leg.origin))
}

/// At least one leg arrives at the declared AWB destination.
pub fn arrives_at_awb_destination(ctx: &RouteContext<'_>, legs: &[FlightLeg]) -> bool {
    legs.iter()
        .any(|leg| same_code(ctx.awb_destination, &leg.destination))
}

/// Every product's departures from the AWB origin add up to its total.
/// Looks at the origin only, not at conservation elsewhere.
pub fn origin_totals_match(ctx: &RouteContext<'_>, legs: &[FlightLeg]) -> bool {
    ctx.products.iter().all(|product| {
        used_quantity(legs, &product.name, None, |leg| {
            same_code(ctx.awb_origin, &leg.origin)
        }) == u64::from(product.total_quantity)
    })
}

/// Every product's arrivals at the AWB destination add up to its total.
pub fn destination_totals_match(ctx: &RouteContext<'_>, legs: &[FlightLeg]) -> bool {
    ctx.products.iter().all(|product| {
        used_quantity(legs, &product.name, None, |leg| {
            same_code(ctx.awb_destination, &leg.destination)
        }) == u64::from(product.total_quantity)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Product;

    #[test]
    fn direct_legs_moving_the_total_are_valid() {
        let products = vec![Product::new("CoolPro", 6)];
        let ctx = RouteContext::new(&products, "FRA", "JFK");
        let legs = vec![
            FlightLeg::new("LH400", "FRA", "JFK", "CoolPro", 4),
            FlightLeg::new("LH404", "FRA", "JFK", "CoolPro", 2),
        ];
        let report = validate_flow(&ctx, &legs);
        assert!(report.ok());
        assert!(report.errors().is_empty());
    }

    #[test]
    fn short_delivery_flags_destination_and_leftover() {
        let products = vec![Product::new("CoolPro", 10)];
        let ctx = RouteContext::new(&products, "FRA", "ORD");
        let legs = vec![
            FlightLeg::new("LH400", "FRA", "JFK", "CoolPro", 10),
            FlightLeg::new("AA100", "JFK", "ORD", "CoolPro", 6),
        ];
        let report = validate_flow(&ctx, &legs);
        assert!(!report.ok());

        let violations = report.violations();
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].kind, ViolationKind::DestinationInflow);
        assert_eq!(violations[0].node, "ORD");
        assert_eq!((violations[0].expected, violations[0].actual), (10, 6));
        assert_eq!(violations[1].kind, ViolationKind::NodeLeftover);
        assert_eq!(violations[1].node, "JFK");
        assert_eq!(violations[1].actual, 4);
        assert!(report.errors()[1].contains("must not have leftover"));
    }

    #[test]
    fn product_without_legs_fails_origin_and_destination() {
        let products = vec![Product::new("CoolPro", 3)];
        let ctx = RouteContext::new(&products, "FRA", "JFK");
        let report = validate_flow(&ctx, &[]);
        let kinds: Vec<_> = report.violations().iter().map(|v| v.kind).collect();
        assert_eq!(
            kinds,
            vec![ViolationKind::OriginOutflow, ViolationKind::DestinationInflow]
        );
        assert!(report.errors()[0].contains("total leaving AWB Org"));
    }

    #[test]
    fn undeclared_origin_is_checked_as_a_plain_node() {
        let products = vec![Product::new("CoolPro", 3)];
        let ctx = RouteContext::new(&products, "", "JFK");
        let legs = vec![FlightLeg::new("LH400", "FRA", "JFK", "CoolPro", 3)];
        let report = validate_flow(&ctx, &legs);
        assert_eq!(report.violations().len(), 1);
        assert_eq!(report.violations()[0].kind, ViolationKind::NodeLeftover);
        assert_eq!(report.violations()[0].node, "FRA");
        assert_eq!(report.violations()[0].actual, -3);
    }

    #[test]
    fn legs_of_undeclared_products_are_skipped() {
        let products = vec![Product::new("CoolPro", 2)];
        let ctx = RouteContext::new(&products, "FRA", "JFK");
        let legs = vec![
            FlightLeg::new("LH400", "FRA", "JFK", "CoolPro", 2),
            FlightLeg::new("LH401", "FRA", "MUC", "HydroJet", 7),
        ];
        assert!(validate_flow(&ctx, &legs).ok());
    }

    #[test]
    fn revalidation_is_stable() {
        let products = vec![Product::new("CoolPro", 5), Product::new("MegaPump", 1)];
        let ctx = RouteContext::new(&products, "FRA", "JFK");
        let legs = vec![
            FlightLeg::new("LH400", "FRA", "MUC", "CoolPro", 5),
            FlightLeg::new("LH401", "MUC", "JFK", "CoolPro", 3),
            FlightLeg::new("LH402", "FRA", "JFK", "MegaPump", 1),
        ];
        assert_eq!(validate_flow(&ctx, &legs), validate_flow(&ctx, &legs));
    }

    #[test]
    fn auxiliary_checks_look_at_endpoints_only() {
        let products = vec![Product::new("CoolPro", 4)];
        let ctx = RouteContext::new(&products, "FRA", "JFK");
        let legs = vec![
            FlightLeg::new("LH400", "fra", "MUC", "CoolPro", 4),
            FlightLeg::new("LH401", "MUC", "JFK", "CoolPro", 1),
        ];
        assert!(departs_from_awb_origin(&ctx, &legs));
        assert!(arrives_at_awb_destination(&ctx, &legs));
        assert!(origin_totals_match(&ctx, &legs));
        assert!(!destination_totals_match(&ctx, &legs));
        assert!(!validate_flow(&ctx, &legs).ok());
    }

    #[test]
    fn endpoint_totals_add_up_huge_legs_without_wrapping() {
        let products = vec![Product::new("CoolPro", 2)];
        let ctx = RouteContext::new(&products, "FRA", "JFK");
        let legs = vec![
            FlightLeg::new("LH400", "FRA", "JFK", "CoolPro", u32::MAX),
            FlightLeg::new("LH402", "FRA", "JFK", "CoolPro", 3),
        ];
        assert!(!origin_totals_match(&ctx, &legs));
        assert!(!destination_totals_match(&ctx, &legs));
    }
}
