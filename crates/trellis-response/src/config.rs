//! Tuning knobs for response construction
//!
//! All values are empirically tuned defaults. They are exposed so a
//! deployment can match its consumer's context window and tokenizer.

use serde::{Deserialize, Serialize};

use crate::error::{ResponseError, ResponseResult};

/// Smallest token limit the assembler accepts. Below this even the
/// counts-only summary cannot be guaranteed to fit.
pub const MIN_TOKEN_LIMIT: usize = 32;

/// Minimum remaining budget required before a section is attempted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionReservations {
    pub structure: usize,
    pub api_surface: usize,
    pub dependencies: usize,
    pub relations: usize,
}

impl Default for SectionReservations {
    fn default() -> Self {
        Self {
            structure: 1000,
            api_surface: 500,
            dependencies: 300,
            relations: 200,
        }
    }
}

/// Configuration for [`ResponseAssembler`](crate::ResponseAssembler)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    /// Hard token ceiling of the consumer
    pub max_tokens: usize,
    /// Fraction of `max_tokens` actually spent, in (0, 1]
    pub safety_margin: f64,
    /// Characters per token for the size heuristic
    pub chars_per_token: usize,
    /// Share of the inverse estimate usable for raw characters, in (0, 1]
    pub overhead_discount: f64,
    /// Share of the remaining budget one array field of an object may take
    pub array_allotment: f64,
    /// Multiplier applied per shrink step in entities/relationships mode
    pub shrink_factor: f64,
    /// Strings longer than this are cut regardless of budget
    pub long_string_threshold: usize,
    pub truncation_marker: String,
    /// Per-type cap when the caller gives no `limit`
    pub default_limit: usize,
    pub reservations: SectionReservations,
    pub max_key_modules: usize,
    pub max_dependencies: usize,
    pub max_key_usages: usize,
    pub docstring_preview_chars: usize,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            max_tokens: 25_000,
            safety_margin: 0.96,
            chars_per_token: 4,
            overhead_discount: 0.8,
            array_allotment: 0.25,
            shrink_factor: 0.8,
            long_string_threshold: 500,
            truncation_marker: "...[truncated]".to_string(),
            default_limit: 50,
            reservations: SectionReservations::default(),
            max_key_modules: 10,
            max_dependencies: 20,
            max_key_usages: 30,
            docstring_preview_chars: 200,
        }
    }
}

impl ResponseConfig {
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_safety_margin(mut self, safety_margin: f64) -> Self {
        self.safety_margin = safety_margin;
        self
    }

    /// Reject values that would break the budget arithmetic
    pub fn validate(&self) -> ResponseResult<()> {
        let invalid = |msg: String| Err(ResponseError::InvalidConfig(msg));

        if self.max_tokens < MIN_TOKEN_LIMIT {
            return invalid(format!(
                "max_tokens must be at least {}, got {}",
                MIN_TOKEN_LIMIT, self.max_tokens
            ));
        }
        if !(self.safety_margin > 0.0 && self.safety_margin <= 1.0) {
            return invalid(format!(
                "safety_margin must be in (0, 1], got {}",
                self.safety_margin
            ));
        }
        if self.chars_per_token == 0 {
            return invalid("chars_per_token must be positive".to_string());
        }
        if !(self.overhead_discount > 0.0 && self.overhead_discount <= 1.0) {
            return invalid(format!(
                "overhead_discount must be in (0, 1], got {}",
                self.overhead_discount
            ));
        }
        if !(self.array_allotment > 0.0 && self.array_allotment <= 1.0) {
            return invalid(format!(
                "array_allotment must be in (0, 1], got {}",
                self.array_allotment
            ));
        }
        if !(self.shrink_factor > 0.0 && self.shrink_factor < 1.0) {
            return invalid(format!(
                "shrink_factor must be in (0, 1), got {}",
                self.shrink_factor
            ));
        }
        if self.default_limit == 0 {
            return invalid("default_limit must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ResponseConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_tokens, 25_000);
        assert_eq!(config.reservations.structure, 1000);
    }

    #[test]
    fn test_validate_rejects_bad_margin() {
        assert!(ResponseConfig::default()
            .with_safety_margin(0.0)
            .validate()
            .is_err());
        assert!(ResponseConfig::default()
            .with_safety_margin(1.2)
            .validate()
            .is_err());
        assert!(ResponseConfig::default()
            .with_safety_margin(1.0)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_validate_rejects_tiny_limit() {
        let err = ResponseConfig::default()
            .with_max_tokens(10)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("max_tokens"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ResponseConfig =
            serde_json::from_str(r#"{"max_tokens": 8000, "reservations": {"structure": 400}}"#)
                .unwrap();
        assert_eq!(config.max_tokens, 8000);
        assert_eq!(config.reservations.structure, 400);
        assert_eq!(config.reservations.api_surface, 500);
        assert_eq!(config.shrink_factor, 0.8);
    }
}
