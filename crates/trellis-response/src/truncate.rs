//! Shrinking one piece of content to fit a budget
//!
//! Truncation drops trailing items rather than corrupting structure, and is
//! idempotent: truncating an already truncated value against the same
//! budget returns it unchanged, marker included.

use serde_json::{Map, Value};

use crate::budget::Budget;
use crate::config::ResponseConfig;

/// Content after truncation, with whether anything was removed
#[derive(Debug, Clone, PartialEq)]
pub struct Truncated<T> {
    pub value: T,
    pub truncated: bool,
}

impl<T> Truncated<T> {
    fn unchanged(value: T) -> Self {
        Self {
            value,
            truncated: false,
        }
    }

    fn map<U>(self, f: impl FnOnce(T) -> U) -> Truncated<U> {
        Truncated {
            value: f(self.value),
            truncated: self.truncated,
        }
    }
}

/// Content-aware truncation of strings, arrays and objects
#[derive(Debug, Clone)]
pub struct SectionTruncator {
    marker: String,
    long_string_threshold: usize,
    array_allotment: f64,
}

impl SectionTruncator {
    pub fn new(marker: impl Into<String>, long_string_threshold: usize, array_allotment: f64) -> Self {
        Self {
            marker: marker.into(),
            long_string_threshold,
            array_allotment,
        }
    }

    pub fn from_config(config: &ResponseConfig) -> Self {
        Self::new(
            config.truncation_marker.clone(),
            config.long_string_threshold,
            config.array_allotment,
        )
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Truncate any JSON value. Scalars other than strings pass through.
    pub fn truncate(&self, value: Value, budget: &Budget) -> Truncated<Value> {
        match value {
            Value::String(text) => self.truncate_string(text, budget).map(Value::String),
            Value::Array(items) => self.truncate_array(items, budget).map(Value::Array),
            Value::Object(map) => self.truncate_object(map, budget).map(Value::Object),
            other => Truncated::unchanged(other),
        }
    }

    /// Hard-cut a string to [`Budget::max_safe_size`] characters and append
    /// the marker, unless it already fits.
    pub fn truncate_string(&self, text: String, budget: &Budget) -> Truncated<String> {
        if budget.fits(&text) {
            return Truncated::unchanged(text);
        }
        self.cut(&text, budget.max_safe_size())
    }

    /// Keep the longest prefix of `items` whose running cost stays within
    /// the budget. Returns an empty array only when the first item alone is
    /// too large.
    ///
    /// Each item is costed as a one-element array, which includes its
    /// nesting indentation. The per-item costs add up to at least the cost
    /// of the kept array, so the result always fits.
    pub fn truncate_array(&self, items: Vec<Value>, budget: &Budget) -> Truncated<Vec<Value>> {
        if budget.fits(&items) {
            return Truncated::unchanged(items);
        }

        let estimator = budget.estimator();
        let allowance = budget.available();
        let original_len = items.len();
        let mut spent = 0usize;
        let mut kept = Vec::new();

        for item in items {
            let cost = estimator.estimate_with_formatting_overhead(std::slice::from_ref(&item));
            if spent.saturating_add(cost) > allowance {
                break;
            }
            spent += cost;
            kept.push(item);
        }

        let truncated = kept.len() < original_len;
        Truncated {
            value: kept,
            truncated,
        }
    }

    /// Truncate an object field by field: array fields get a fixed share of
    /// the budget each, long strings are cut to the preview threshold, and
    /// nested objects recurse. If the object still does not fit, trailing
    /// entries are dropped.
    pub fn truncate_object(&self, map: Map<String, Value>, budget: &Budget) -> Truncated<Map<String, Value>> {
        let allotment = budget.allot(self.array_allotment);
        let mut truncated = false;
        let mut shaped = Map::new();

        for (key, value) in map {
            let field = match value {
                Value::Array(items) => self.truncate_array(items, &allotment).map(Value::Array),
                Value::String(text) if text.chars().count() > self.long_string_threshold => {
                    self.cut(&text, self.long_string_threshold).map(Value::String)
                }
                Value::Object(inner) => self.truncate_object(inner, budget).map(Value::Object),
                other => Truncated::unchanged(other),
            };
            truncated |= field.truncated;
            shaped.insert(key, field.value);
        }

        if budget.fits(&shaped) {
            return Truncated {
                value: shaped,
                truncated,
            };
        }

        let kept = self.keep_leading_entries(shaped, budget);
        Truncated {
            value: kept.value,
            truncated: truncated || kept.truncated,
        }
    }

    /// Entry-wise counterpart of [`truncate_array`](Self::truncate_array),
    /// costing each entry as a one-entry object.
    fn keep_leading_entries(&self, map: Map<String, Value>, budget: &Budget) -> Truncated<Map<String, Value>> {
        let estimator = budget.estimator();
        let allowance = budget.available();
        let original_len = map.len();
        let mut spent = 0usize;
        let mut kept = Map::new();

        for (key, value) in map {
            let mut probe = Map::new();
            probe.insert(key.clone(), value.clone());
            let cost = estimator.estimate_with_formatting_overhead(&probe);
            if spent.saturating_add(cost) > allowance {
                break;
            }
            spent += cost;
            kept.insert(key, value);
        }

        let truncated = kept.len() < original_len;
        Truncated {
            value: kept,
            truncated,
        }
    }

    /// Keep at most `max_chars` characters of the text before any existing
    /// marker, then append the marker exactly once.
    fn cut(&self, text: &str, max_chars: usize) -> Truncated<String> {
        let base = text.strip_suffix(self.marker.as_str()).unwrap_or(text);
        let mut cut: String = base.chars().take(max_chars).collect();
        cut.push_str(&self.marker);
        Truncated {
            value: cut,
            truncated: true,
        }
    }
}

impl Default for SectionTruncator {
    fn default() -> Self {
        Self::from_config(&ResponseConfig::default())
    }
}
