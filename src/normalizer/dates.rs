//! Tolerant publish-date parsing.
//!
//! Feeds use a loose mix of RFC 822, RFC 1123 and RFC 3339 timestamps. Each
//! candidate layout is a chrono format string; a layout ending in `%Z` takes
//! a zone abbreviation instead of a numeric offset.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

pub const RFC1123: &str = "%a, %d %b %Y %H:%M:%S %Z";
pub const RFC1123Z: &str = "%a, %d %b %Y %H:%M:%S %z";
pub const RFC822: &str = "%d %b %y %H:%M %Z";
pub const RFC822_SECONDS: &str = "%d %b %y %H:%M:%S %Z";
pub const RFC822Z: &str = "%d %b %y %H:%M %z";
pub const RFC822Z_SECONDS: &str = "%d %b %y %H:%M:%S %z";
pub const RFC3339: &str = "%+";
pub const NO_SECONDS: &str = "%a, %d %b %Y %H:%M %Z";
pub const NUMERIC_OFFSET: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Ordered list of accepted layouts. The first one that parses wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateLayouts(Vec<String>);

impl Default for DateLayouts {
    fn default() -> Self {
        Self(
            [
                RFC1123,
                RFC1123Z,
                RFC822,
                RFC822_SECONDS,
                RFC822Z,
                RFC822Z_SECONDS,
                RFC3339,
                NO_SECONDS,
                NUMERIC_OFFSET,
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        )
    }
}

impl DateLayouts {
    pub fn new(layouts: Vec<String>) -> Self {
        Self(layouts)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Parse `raw` against each layout in order. Unparseable or empty input
    /// yields `None`; a missing date never blocks ingestion.
    pub fn parse(&self, raw: &str) -> Option<DateTime<FixedOffset>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        self.0.iter().find_map(|layout| parse_with_layout(raw, layout))
    }
}

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Consume a leading `%a` from `layout` and a weekday name from `raw`.
///
/// The name must be a real weekday, but it is not checked against the
/// date: feeds routinely carry the wrong one.
fn skip_weekday<'a>(raw: &'a str, layout: &'a str) -> Option<(&'a str, &'a str)> {
    let Some(layout) = layout.strip_prefix("%a") else {
        return Some((raw, layout));
    };

    let end = raw
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(raw.len());
    let (name, rest) = raw.split_at(end);
    WEEKDAYS
        .iter()
        .any(|w| w.eq_ignore_ascii_case(name))
        .then_some((rest, layout))
}

fn parse_with_layout(raw: &str, layout: &str) -> Option<DateTime<FixedOffset>> {
    let (raw, layout) = skip_weekday(raw, layout)?;

    match layout.strip_suffix("%Z") {
        Some(naive_layout) => {
            let (stamp, zone) = raw.rsplit_once(' ')?;
            let offset = zone_offset(zone)?;
            let naive = NaiveDateTime::parse_from_str(stamp, naive_layout.trim_end()).ok()?;
            offset.from_local_datetime(&naive).single()
        }
        None => DateTime::parse_from_str(raw, layout).ok(),
    }
}

/// Resolve a zone abbreviation. Unknown alphabetic abbreviations are taken
/// as UTC.
fn zone_offset(zone: &str) -> Option<FixedOffset> {
    if zone.is_empty() || !zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let hours = match zone.to_ascii_uppercase().as_str() {
        "EST" => -5,
        "EDT" => -4,
        "CST" => -6,
        "CDT" => -5,
        "MST" => -7,
        "MDT" => -6,
        "PST" => -8,
        "PDT" => -7,
        _ => 0,
    };

    FixedOffset::east_opt(hours * 3600)
}
