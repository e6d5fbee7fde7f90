//! Token cost approximation
//!
//! Real tokenizers are too heavy to run on every packing step, so cost is
//! approximated as `ceil(chars / K)` over the serialized text. Structured
//! content is serialized first, in the same form it will ship in.

use serde::Serialize;

use crate::error::{ResponseError, ResponseResult};

/// Cost assigned to content that cannot be serialized. Large enough that
/// it never fits, so callers truncate or skip instead of failing.
pub const UNBOUNDED: usize = usize::MAX;

/// Character-count token estimator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeEstimator {
    chars_per_token: usize,
}

impl SizeEstimator {
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }

    pub fn chars_per_token(&self) -> usize {
        self.chars_per_token
    }

    /// Estimate already-rendered text
    pub fn estimate_text(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }

    /// Estimate content in its compact serialized form.
    ///
    /// A `&str` is costed as its JSON string literal, quotes and escapes
    /// included, so it is never cheaper than [`estimate_text`](Self::estimate_text)
    /// on the same text. Use `estimate_text` for text that ships unquoted.
    pub fn try_estimate<T: Serialize + ?Sized>(&self, content: &T) -> ResponseResult<usize> {
        let text =
            serde_json::to_string(content).map_err(|e| ResponseError::Estimation(e.to_string()))?;
        Ok(self.estimate_text(&text))
    }

    /// Estimate content in the indented form used at the wire boundary.
    /// Indentation dominates the cost of deeply nested values.
    pub fn try_estimate_with_formatting_overhead<T: Serialize + ?Sized>(
        &self,
        content: &T,
    ) -> ResponseResult<usize> {
        let text = serde_json::to_string_pretty(content)
            .map_err(|e| ResponseError::Estimation(e.to_string()))?;
        Ok(self.estimate_text(&text))
    }

    /// Like [`try_estimate`](Self::try_estimate), with failures costed at
    /// [`UNBOUNDED`]. Strings are costed as quoted literals.
    pub fn estimate<T: Serialize + ?Sized>(&self, content: &T) -> usize {
        self.try_estimate(content).unwrap_or_else(|e| {
            tracing::warn!("{}; treating as unbounded", e);
            UNBOUNDED
        })
    }

    /// Like [`try_estimate_with_formatting_overhead`](Self::try_estimate_with_formatting_overhead),
    /// with failures costed at [`UNBOUNDED`]. Strings are costed as quoted literals.
    pub fn estimate_with_formatting_overhead<T: Serialize + ?Sized>(&self, content: &T) -> usize {
        self.try_estimate_with_formatting_overhead(content)
            .unwrap_or_else(|e| {
                tracing::warn!("{}; treating as unbounded", e);
                UNBOUNDED
            })
    }
}

impl Default for SizeEstimator {
    fn default() -> Self {
        Self::new(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::Error as _;
    use serde_json::json;
    use std::collections::HashMap;

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("refusing to serialize"))
        }
    }

    #[test]
    fn test_text_rounds_up() {
        let estimator = SizeEstimator::default();
        assert_eq!(estimator.estimate_text(""), 0);
        assert_eq!(estimator.estimate_text("abcd"), 1);
        assert_eq!(estimator.estimate_text("abcde"), 2);
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        let estimator = SizeEstimator::default();
        assert_eq!(estimator.estimate_text("ééé€"), 1);
    }

    #[test]
    fn test_structured_content_is_serialized() {
        let estimator = SizeEstimator::default();
        // {"a":1} is 7 chars
        assert_eq!(estimator.estimate(&json!({"a": 1})), 2);
    }

    #[test]
    fn test_strings_are_costed_as_literals() {
        let estimator = SizeEstimator::default();
        assert_eq!(estimator.estimate_text("abcd"), 1);
        // "abcd" with quotes is 6 chars
        assert_eq!(estimator.estimate(&"abcd"), 2);
        // a\"b escapes to 4 chars inside the quotes
        assert_eq!(estimator.estimate(&"a\"b"), 2);
        assert_eq!(estimator.estimate_text("a\"b"), 1);
        for text in ["", "x", "hello world", "tab\there", "üñí"] {
            assert!(estimator.estimate(&text) >= estimator.estimate_text(text), "{text}");
        }
    }

    #[test]
    fn test_formatting_overhead_never_cheaper() {
        let estimator = SizeEstimator::default();
        let value = json!({"outer": {"inner": [1, 2, 3], "name": "x"}});
        assert!(
            estimator.estimate_with_formatting_overhead(&value) > estimator.estimate(&value)
        );
    }

    #[test]
    fn test_monotonic_under_concatenation() {
        let estimator = SizeEstimator::default();
        let a: Vec<String> = (0..20).map(|i| format!("item-{i}")).collect();
        let mut ab = a.clone();
        ab.extend((0..5).map(|i| format!("extra-{i}")));

        assert!(estimator.estimate(&a) <= estimator.estimate(&ab));
        assert!(
            estimator.estimate_with_formatting_overhead(&a)
                <= estimator.estimate_with_formatting_overhead(&ab)
        );
        assert!(estimator.estimate_text("abc") <= estimator.estimate_text("abcdef"));
    }

    #[test]
    fn test_deterministic() {
        let estimator = SizeEstimator::default();
        let value = json!({"b": [1, 2], "a": "text"});
        assert_eq!(estimator.estimate(&value), estimator.estimate(&value));
    }

    #[test]
    fn test_unserializable_is_unbounded() {
        let estimator = SizeEstimator::default();
        assert!(estimator.try_estimate(&Unserializable).is_err());
        assert_eq!(estimator.estimate(&Unserializable), UNBOUNDED);
        assert_eq!(
            estimator.estimate_with_formatting_overhead(&Unserializable),
            UNBOUNDED
        );
    }

    #[test]
    fn test_non_string_map_keys_are_unbounded() {
        let estimator = SizeEstimator::default();
        let mut map = HashMap::new();
        map.insert(vec![1u8], 1);
        assert_eq!(estimator.estimate(&map), UNBOUNDED);
    }
}
