//! Order header editing: AWB number, route codes, and the lease window.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{sanitize_code, OrderDetails};

pub const AWB_PREFIX_LEN: usize = 3;
pub const AWB_SUFFIX_MAX_LEN: usize = 6;

const UTC_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// 00:00 UTC on the day after `now`. Earliest allowed lease start and flight date.
pub fn tomorrow_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .succ_opt()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .unwrap_or(now)
}

fn digits(raw: &str, max: usize) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).take(max).collect()
}

/// Parses `YYYY-MM-DDTHH:MMZ`, `YYYY-MM-DDTHH:MM` or `YYYY-MM-DD HH:MM` as UTC.
pub fn parse_utc_input(raw: &str) -> Option<DateTime<Utc>> {
    let normalized = raw.trim().replacen(' ', "T", 1);
    let normalized = normalized.strip_suffix('Z').unwrap_or(&normalized);
    NaiveDateTime::parse_from_str(normalized, UTC_INPUT_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

pub fn format_utc(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%MZ").to_string()
}

/// Planned lease period. The end always lies within
/// `[start, start + booked_days]` once those are known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub booked_days: Option<u32>,
}

impl LeaseWindow {
    /// `start + booked_days`, or `None` when either is missing or the sum
    /// falls outside the representable date range (no upper bound then).
    pub fn latest_end(&self) -> Option<DateTime<Utc>> {
        let start = self.start?;
        let days = self.booked_days.filter(|d| *d > 0)?;
        start.checked_add_signed(Duration::days(i64::from(days)))
    }

    /// Start is raised to tomorrow 00:00 at minimum; the end follows.
    pub fn set_start(&mut self, start: Option<DateTime<Utc>>, now: DateTime<Utc>) {
        self.start = start.map(|s| s.max(tomorrow_midnight(now)));
        self.clamp_end();
    }

    pub fn set_end(&mut self, end: Option<DateTime<Utc>>) {
        self.end = end;
        self.clamp_end();
    }

    /// Booked days are at least one.
    pub fn set_booked_days(&mut self, days: Option<i64>) {
        self.booked_days = days.map(|d| u32::try_from(d.max(1)).unwrap_or(u32::MAX));
        self.clamp_end();
    }

    fn clamp_end(&mut self) {
        let Some(mut end) = self.end else {
            return;
        };
        if let Some(start) = self.start {
            end = end.max(start);
        }
        if let Some(latest) = self.latest_end() {
            end = end.min(latest);
        }
        self.end = Some(end);
    }
}

impl OrderDetails {
    pub fn set_awb_prefix(&mut self, raw: &str) {
        self.awb_prefix = digits(raw, AWB_PREFIX_LEN);
    }

    pub fn set_awb_suffix(&mut self, raw: &str) {
        self.awb_suffix = digits(raw, AWB_SUFFIX_MAX_LEN);
    }

    pub fn set_awb_origin(&mut self, raw: &str) {
        self.awb_origin = sanitize_code(raw);
    }

    pub fn set_awb_destination(&mut self, raw: &str) {
        self.awb_destination = sanitize_code(raw);
    }

    pub fn set_pickup_port(&mut self, raw: &str) {
        self.pickup_port = sanitize_code(raw);
    }

    pub fn set_return_port(&mut self, raw: &str) {
        self.return_port = sanitize_code(raw);
    }
}
