use tracing::debug;

use super::{used_quantity, RouteContext};
use crate::domain::{product_total, same_code, FlightLeg};

/// Largest quantity the leg at `index` may carry without over-allocating its
/// product.
///
/// Caps considered, each as `total - used by the other legs`:
/// - legs of the same product leaving the same origin;
/// - legs leaving the declared AWB origin, when this leg does;
/// - legs arriving at the declared AWB destination, when this leg does.
///
/// A single leg can never carry more than the product total, even when none
/// of the three caps applies (blank origin, no AWB code match). That is
/// stricter than leaving such a leg unbounded. Returns `None` when the leg's
/// product is not declared, meaning "no cap".
pub fn max_quantity(ctx: &RouteContext<'_>, legs: &[FlightLeg], index: usize) -> Option<u32> {
    let leg = legs.get(index)?;
    let total = product_total(ctx.products, &leg.product_name)?;
    let product = leg.product_name.as_str();
    let remaining = |used: u64| u32::try_from(u64::from(total).saturating_sub(used)).unwrap_or(total);

    let mut bound = total;

    if !leg.origin.trim().is_empty() {
        let used = used_quantity(legs, product, Some(index), |other| {
            same_code(&other.origin, &leg.origin)
        });
        bound = bound.min(remaining(used));
    }

    if same_code(ctx.awb_origin, &leg.origin) {
        let used = used_quantity(legs, product, Some(index), |other| {
            same_code(ctx.awb_origin, &other.origin)
        });
        bound = bound.min(remaining(used));
    }

    if same_code(ctx.awb_destination, &leg.destination) {
        let used = used_quantity(legs, product, Some(index), |other| {
            same_code(ctx.awb_destination, &other.destination)
        });
        bound = bound.min(remaining(used));
    }

    Some(bound)
}

/// Floors at 1 and caps at `bound`. The floor wins over a zero bound.
pub fn clamp_quantity(proposed: u32, bound: Option<u32>) -> u32 {
    let capped = match bound {
        Some(bound) => proposed.min(bound),
        None => proposed,
    };
    capped.max(1)
}

/// Re-clamps the quantity of one leg in place. Rows without a quantity are
/// left alone.
pub fn enforce_bounds(ctx: &RouteContext<'_>, legs: &mut [FlightLeg], index: usize) -> Option<u32> {
    let bound = max_quantity(ctx, legs, index);
    let leg = legs.get_mut(index)?;
    let proposed = leg.quantity?;
    let clamped = clamp_quantity(proposed, bound);
    if clamped != proposed {
        debug!(index, proposed, clamped, product = %leg.product_name, "Clamped leg quantity");
    }
    leg.quantity = Some(clamped);
    Some(clamped)
}

/// Re-clamps every leg after an edit to the leg at `edited`. The edited leg
/// goes first so it absorbs any excess and untouched rows keep their values
/// where possible; the rest follow in row order.
pub fn enforce_all_bounds(ctx: &RouteContext<'_>, legs: &mut [FlightLeg], edited: usize) {
    enforce_bounds(ctx, legs, edited);
    for index in (0..legs.len()).filter(|&i| i != edited) {
        enforce_bounds(ctx, legs, index);
    }
}
