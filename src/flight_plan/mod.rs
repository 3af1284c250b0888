//! Flight-leg quantity allocation and network-flow validation.
//!
//! Both halves read the same aggregation primitives: per-product sums over a
//! filtered set of legs, and per-airport net balances.

mod allocator;
mod sheet;
mod validator;

pub use allocator::*;
pub use sheet::*;
pub use validator::*;

use std::collections::BTreeMap;

use crate::domain::{normalize_code, FlightLeg, Product};

/// The declared side of an order that flight legs are checked against.
#[derive(Debug, Clone, Copy)]
pub struct RouteContext<'a> {
    pub products: &'a [Product],
    pub awb_origin: &'a str,
    pub awb_destination: &'a str,
}

impl<'a> RouteContext<'a> {
    pub fn new(products: &'a [Product], awb_origin: &'a str, awb_destination: &'a str) -> Self {
        Self {
            products,
            awb_origin,
            awb_destination,
        }
    }
}

/// Sums the quantity of `product` over legs accepted by `filter`, skipping
/// the leg at `exclude`. Summed as `u64` so stored legs of any size add up.
pub(crate) fn used_quantity<F>(
    legs: &[FlightLeg],
    product: &str,
    exclude: Option<usize>,
    filter: F,
) -> u64
where
    F: Fn(&FlightLeg) -> bool,
{
    legs.iter()
        .enumerate()
        .filter(|(idx, _)| Some(*idx) != exclude)
        .filter(|(_, leg)| leg.carries(product) && filter(leg))
        .map(|(_, leg)| u64::from(leg.quantity_or_zero()))
        .sum()
}

/// Net balance per airport for one product: departures subtract, arrivals add.
///
/// Legs missing either code are not part of the network yet and are skipped.
pub fn node_balances(legs: &[FlightLeg], product: &str) -> BTreeMap<String, i64> {
    let mut balances = BTreeMap::new();
    for leg in legs.iter().filter(|leg| leg.carries(product)) {
        let origin = normalize_code(&leg.origin);
        let destination = normalize_code(&leg.destination);
        if origin.is_empty() || destination.is_empty() {
            continue;
        }
        let quantity = i64::from(leg.quantity_or_zero());
        *balances.entry(origin).or_insert(0) -= quantity;
        *balances.entry(destination).or_insert(0) += quantity;
    }
    balances
}
