use chrono::{DateTime, Utc};

use super::{enforce_all_bounds, enforce_bounds, validate_flow, FlowReport, RouteContext};
use crate::domain::{sanitize_code, FlightLeg};
use crate::order_details::tomorrow_midnight;

const FLIGHT_ID_MAX_LEN: usize = 6;

/// Uppercases and keeps `[A-Z0-9]`, at most six characters.
pub fn sanitize_flight_id(raw: &str) -> String {
    raw.chars()
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .take(FLIGHT_ID_MAX_LEN)
        .collect()
}

/// Editable list of flight legs for one order.
///
/// Every edit that can change an allocation re-clamps the affected rows, so
/// the sheet never holds an over-allocated quantity for a declared product.
/// Edits addressed at a row that does not exist are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightSheet {
    entries: Vec<FlightLeg>,
}

impl Default for FlightSheet {
    fn default() -> Self {
        Self {
            entries: vec![FlightLeg::default()],
        }
    }
}

impl FlightSheet {
    pub fn from_legs(legs: Vec<FlightLeg>) -> Self {
        if legs.is_empty() {
            Self::default()
        } else {
            Self { entries: legs }
        }
    }

    pub fn entries(&self) -> &[FlightLeg] {
        &self.entries
    }

    pub fn into_legs(self) -> Vec<FlightLeg> {
        self.entries
    }

    pub fn add_entry(&mut self) {
        self.entries.push(FlightLeg::default());
    }

    /// Removes a row. The last remaining row cannot be removed.
    pub fn remove_entry(&mut self, index: usize) -> bool {
        if self.entries.len() <= 1 || index >= self.entries.len() {
            return false;
        }
        self.entries.remove(index);
        true
    }

    pub fn set_flight_id(&mut self, index: usize, raw: &str) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.flight_id = sanitize_flight_id(raw);
        }
    }

    /// Sets the departure date, raised to tomorrow 00:00 if earlier.
    pub fn set_date(&mut self, index: usize, date: DateTime<Utc>, now: DateTime<Utc>) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.date = Some(date.max(tomorrow_midnight(now)));
        }
    }

    /// A code edit changes the aggregation key of every row sharing it, so all
    /// rows are re-clamped.
    pub fn set_origin(&mut self, ctx: &RouteContext<'_>, index: usize, raw: &str) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.origin = sanitize_code(raw);
            enforce_all_bounds(ctx, &mut self.entries, index);
        }
    }

    pub fn set_destination(&mut self, ctx: &RouteContext<'_>, index: usize, raw: &str) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.destination = sanitize_code(raw);
            enforce_all_bounds(ctx, &mut self.entries, index);
        }
    }

    /// Switching product starts the row over at quantity 1.
    pub fn set_product(&mut self, ctx: &RouteContext<'_>, index: usize, product_name: &str) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.product_name = product_name.to_string();
            entry.quantity = Some(1);
            enforce_bounds(ctx, &mut self.entries, index);
        }
    }

    pub fn set_quantity(&mut self, ctx: &RouteContext<'_>, index: usize, quantity: Option<u32>) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.quantity = quantity;
            enforce_bounds(ctx, &mut self.entries, index);
        }
    }

    pub fn validate(&self, ctx: &RouteContext<'_>) -> FlowReport {
        validate_flow(ctx, &self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Product;
    use chrono::TimeZone;

    #[test]
    fn starts_with_one_row_that_cannot_be_removed() {
        let mut sheet = FlightSheet::default();
        assert_eq!(sheet.entries().len(), 1);
        assert!(!sheet.remove_entry(0));
        sheet.add_entry();
        assert!(sheet.remove_entry(1));
        assert!(!sheet.remove_entry(5));
    }

    #[test]
    fn flight_ids_are_sanitized() {
        let mut sheet = FlightSheet::default();
        sheet.set_flight_id(0, "lh-4001234");
        assert_eq!(sheet.entries()[0].flight_id, "LH4001");
    }

    #[test]
    fn code_edit_reclamps_every_row() {
        let products = vec![Product::new("CoolPro", 5)];
        let ctx = RouteContext::new(&products, "FRA", "JFK");
        let mut sheet = FlightSheet::from_legs(vec![
            FlightLeg::new("LH400", "FRA", "JFK", "CoolPro", 3),
            FlightLeg::new("LH402", "MUC", "ORD", "CoolPro", 4),
        ]);

        // Row 1 now leaves FRA too; the edited row gives way.
        sheet.set_origin(&ctx, 1, "fra");
        assert_eq!(sheet.entries()[1].origin, "FRA");
        assert_eq!(sheet.entries()[0].quantity, Some(3));
        assert_eq!(sheet.entries()[1].quantity, Some(2));
    }

    #[test]
    fn choosing_a_product_resets_quantity_to_one() {
        let products = vec![Product::new("CoolPro", 5)];
        let ctx = RouteContext::new(&products, "", "");
        let mut sheet = FlightSheet::default();
        sheet.set_product(&ctx, 0, "CoolPro");
        assert_eq!(sheet.entries()[0].quantity, Some(1));
        sheet.set_quantity(&ctx, 0, Some(9));
        assert_eq!(sheet.entries()[0].quantity, Some(5));
        sheet.set_quantity(&ctx, 0, None);
        assert_eq!(sheet.entries()[0].quantity, None);
    }

    #[test]
    fn past_dates_move_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 15, 30, 0).unwrap();
        let mut sheet = FlightSheet::default();
        sheet.set_date(0, Utc.with_ymd_and_hms(2026, 3, 9, 8, 0, 0).unwrap(), now);
        assert_eq!(
            sheet.entries()[0].date,
            Some(Utc.with_ymd_and_hms(2026, 3, 11, 0, 0, 0).unwrap())
        );
        let later = Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap();
        sheet.set_date(0, later, now);
        assert_eq!(sheet.entries()[0].date, Some(later));
    }
}
