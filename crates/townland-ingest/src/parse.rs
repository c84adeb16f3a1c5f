//! Lenient scalar parsing for CSV fields
//!
//! Blank means absent. Optional fields that do not parse are treated as
//! absent rather than rejecting the row; required fields are checked by the
//! loaders.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use csv::StringRecord;

/// Trimmed text, or `None` when blank
pub fn text(value: Option<&str>) -> Option<String> {
    let s = value?.trim();
    if s.is_empty() { None } else { Some(s.to_string()) }
}

/// Float, or `None` when blank or unparseable
pub fn float(value: Option<&str>) -> Option<f64> {
    value?.trim().parse::<f64>().ok()
}

/// Integer, also accepting float spellings such as `"12.0"` or `"1.2e1"`
pub fn int(value: Option<&str>) -> Option<i64> {
    let s = value?.trim();
    if s.is_empty() {
        return None;
    }
    if s.contains(['.', 'e', 'E']) {
        let f = s.parse::<f64>().ok()?;
        if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
            Some(f.trunc() as i64)
        } else {
            None
        }
    } else {
        s.parse::<i64>().ok()
    }
}

/// Timestamp in RFC 3339 (trailing `Z` included), or a naive ISO 8601
/// date-time taken as UTC
pub fn timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    let s = value?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Header name to column position, tolerant of a leading byte order mark
#[derive(Debug, Clone)]
pub struct Columns {
    positions: HashMap<String, usize>,
}

impl Columns {
    pub fn new(headers: &StringRecord) -> Self {
        let positions = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim_start_matches('\u{feff}').trim().to_string(), i))
            .collect();
        Self { positions }
    }

    /// Required headers that are absent
    pub fn missing(&self, required: &[&'static str]) -> Vec<&'static str> {
        required
            .iter()
            .copied()
            .filter(|h| !self.positions.contains_key(*h))
            .collect()
    }

    /// Raw value of a named column in a row
    pub fn get<'r>(&self, record: &'r StringRecord, header: &str) -> Option<&'r str> {
        self.positions.get(header).and_then(|&i| record.get(i))
    }
}
