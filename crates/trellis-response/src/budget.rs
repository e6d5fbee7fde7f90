//! Immutable token budget ledger

use serde::Serialize;

use crate::config::ResponseConfig;
use crate::estimator::SizeEstimator;

const DEFAULT_OVERHEAD_DISCOUNT: f64 = 0.8;

/// A shrinking token allowance
///
/// Budgets are values: [`consume`](Budget::consume) returns a new budget and
/// never refuses. `remaining` may go negative in try-then-check flows, so
/// callers check [`fits`](Budget::fits) before committing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Budget {
    total: usize,
    used: usize,
    remaining: i64,
    estimator: SizeEstimator,
    overhead_discount: f64,
}

impl Budget {
    /// Create a budget of `floor(total_limit * safety_margin)` tokens.
    ///
    /// The margin absorbs the divergence between the character heuristic
    /// and the consumer's real tokenizer.
    pub fn create(total_limit: usize, safety_margin: f64) -> Self {
        let total = (total_limit as f64 * safety_margin).floor().max(0.0) as usize;
        Self {
            total,
            used: 0,
            remaining: total as i64,
            estimator: SizeEstimator::default(),
            overhead_discount: DEFAULT_OVERHEAD_DISCOUNT,
        }
    }

    pub fn from_config(config: &ResponseConfig) -> Self {
        Self::create(config.max_tokens, config.safety_margin)
            .with_estimator(SizeEstimator::new(config.chars_per_token))
            .with_overhead_discount(config.overhead_discount)
    }

    pub fn with_estimator(mut self, estimator: SizeEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_overhead_discount(mut self, overhead_discount: f64) -> Self {
        self.overhead_discount = overhead_discount;
        self
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn used(&self) -> usize {
        self.used
    }

    /// Remaining tokens; negative after an over-commit
    pub fn remaining(&self) -> i64 {
        self.remaining
    }

    /// Remaining tokens, floored at zero
    pub fn available(&self) -> usize {
        self.remaining.max(0) as usize
    }

    pub fn estimator(&self) -> SizeEstimator {
        self.estimator
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining <= 0
    }

    /// Record `tokens` as spent
    pub fn consume(&self, tokens: usize) -> Budget {
        let tokens_i64 = i64::try_from(tokens).unwrap_or(i64::MAX);
        Budget {
            used: self.used.saturating_add(tokens),
            remaining: self.remaining.saturating_sub(tokens_i64),
            ..*self
        }
    }

    /// Whether `tokens` fits in what is left
    pub fn fits_tokens(&self, tokens: usize) -> bool {
        self.remaining >= 0 && tokens as u64 <= self.remaining as u64
    }

    /// Whether `content`, in its wire (indented) form, fits in what is left
    pub fn fits<T: Serialize + ?Sized>(&self, content: &T) -> bool {
        self.fits_tokens(self.estimator.estimate_with_formatting_overhead(content))
    }

    /// Characters of raw text that can safely be kept, discounted for
    /// the punctuation serialization adds around it
    pub fn max_safe_size(&self) -> usize {
        let chars = self.available() as f64
            * self.estimator.chars_per_token() as f64
            * self.overhead_discount;
        chars.floor() as usize
    }

    /// A fresh budget holding `fraction` of what is left here. Used to
    /// bound one field so it cannot exhaust the whole allowance.
    pub fn allot(&self, fraction: f64) -> Budget {
        let share = (self.available() as f64 * fraction).floor() as usize;
        Budget {
            total: share,
            used: 0,
            remaining: share as i64,
            ..*self
        }
    }
}
