//! Date period extraction from request bodies.
//!
//! Accepted shapes, tried in order (first match wins, never merged):
//! 1. `date_periods: [[start, end], ...]`
//! 2. `start_date_period_1` / `end_date_period_1`, `..._2`, ... up to the
//!    first missing index
//! 3. `start_date` / `end_date`
//! 4. nothing: a single default period

use serde::Serialize;
use serde_json::Value;

/// Start of the period used when a request names none.
pub const DEFAULT_START_DATE: &str = "2024-01-01";
/// End of the period used when a request names none.
pub const DEFAULT_END_DATE: &str = "2024-01-28";

/// A `{start_date, end_date}` window, passed through to the backend as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start_date: String,
    pub end_date: String,
}

impl DateWindow {
    pub fn new(start_date: impl Into<String>, end_date: impl Into<String>) -> Self {
        Self {
            start_date: start_date.into(),
            end_date: end_date.into(),
        }
    }
}

/// Named periods in discovery order. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Periods {
    entries: Vec<(String, DateWindow)>,
}

impl Periods {
    fn default_period() -> Self {
        Self {
            entries: vec![(
                period_name(1),
                DateWindow::new(DEFAULT_START_DATE, DEFAULT_END_DATE),
            )],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DateWindow)> {
        self.entries.iter().map(|(name, window)| (name.as_str(), window))
    }

    pub fn get(&self, name: &str) -> Option<&DateWindow> {
        self.iter().find(|(n, _)| *n == name).map(|(_, w)| w)
    }
}

fn period_name(index: usize) -> String {
    format!("period_{}", index)
}

fn date_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Extract named periods from a request body.
pub fn extract_periods(body: &Value) -> Periods {
    let entries = match body.get("date_periods") {
        Some(Value::Array(list)) => from_period_list(list),
        _ => {
            let numbered = from_numbered_keys(body);
            if numbered.is_empty() {
                from_single_pair(body)
            } else {
                numbered
            }
        }
    };

    if entries.is_empty() {
        Periods::default_period()
    } else {
        Periods { entries }
    }
}

/// Malformed entries are skipped but still consume their index, so
/// `period_i` always refers to the i-th list entry.
fn from_period_list(list: &[Value]) -> Vec<(String, DateWindow)> {
    list.iter()
        .enumerate()
        .filter_map(|(i, entry)| match entry.as_array().map(Vec::as_slice) {
            Some([start, end]) => Some((
                period_name(i + 1),
                DateWindow::new(date_value(start), date_value(end)),
            )),
            _ => None,
        })
        .collect()
}

fn from_numbered_keys(body: &Value) -> Vec<(String, DateWindow)> {
    let mut entries = Vec::new();
    for i in 1.. {
        let start = body.get(format!("start_date_period_{}", i));
        let end = body.get(format!("end_date_period_{}", i));
        match (start, end) {
            (Some(start), Some(end)) => entries.push((
                period_name(i),
                DateWindow::new(date_value(start), date_value(end)),
            )),
            _ => break,
        }
    }
    entries
}

fn from_single_pair(body: &Value) -> Vec<(String, DateWindow)> {
    match (body.get("start_date"), body.get("end_date")) {
        (Some(start), Some(end)) => vec![(
            period_name(1),
            DateWindow::new(date_value(start), date_value(end)),
        )],
        _ => Vec::new(),
    }
}
