use std::sync::Arc;

use tracing::trace;

use super::category::Category;
use super::combinatorics::{
    combinations, CombinationCache, CombinationKey, InMemoryCombinationCache,
};

/// Raised when probability inputs fall outside the domain the binomial model accepts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    #[error("success probability must be in (0, 1], found {0}")]
    ProbabilityOutOfRange(f64),
    #[error("subscription ratio for {category} must be a positive number, found {ratio}")]
    InvalidSubscriptionRatio { category: Category, ratio: f64 },
    #[error("combinations({n}, {r}) requires 0 <= r <= n")]
    CombinationOutOfRange { n: u64, r: u64 },
    #[error("{n} applications exceed the limit of {} per category", MAX_APPLICATIONS)]
    Overflow { n: u64 },
}

/// Largest application count whose binomial coefficients stay finite in `f64`.
pub const MAX_APPLICATIONS: u64 = 1_000;

/// Results closer than this to 0 or 1 are recomputed from the side of the
/// distribution that does not cancel.
const CANCELLATION_BAND: f64 = 1e-8;

/// Per-application success probability for a category at the given subscription ratio.
///
/// Undersubscribed categories (effective subscription below 1) allot every application,
/// so the probability is capped at 1.
pub fn effective_probability(category: Category, ratio: f64) -> Result<f64, DomainError> {
    if !(ratio.is_finite() && ratio > 0.0) {
        return Err(DomainError::InvalidSubscriptionRatio { category, ratio });
    }
    let effective_subscription = category.effective_subscription(ratio);
    Ok((1.0 / effective_subscription).min(1.0))
}

/// Lots an applicant can expect from `n` applications at probability `p`.
///
/// The expected number of successful applications is rounded half-to-even, so
/// 0.5 rounds to 0 and 1.5 rounds to 2. HNI categories then scale by the lots
/// credited per application.
pub fn expected_lots(n: u64, p: f64, category: Category) -> u64 {
    let successful = (n as f64 * p).round_ties_even().max(0.0) as u64;
    successful * category.lots_per_application()
}

/// Binomial tail calculator backed by an injectable coefficient cache.
#[derive(Debug)]
pub struct ProbabilityEngine<C = InMemoryCombinationCache> {
    cache: Arc<C>,
}

impl ProbabilityEngine<InMemoryCombinationCache> {
    pub fn new() -> Self {
        Self::with_cache(Arc::new(InMemoryCombinationCache::new()))
    }
}

impl Default for ProbabilityEngine<InMemoryCombinationCache> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for ProbabilityEngine<C> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<C: CombinationCache> ProbabilityEngine<C> {
    pub fn with_cache(cache: Arc<C>) -> Self {
        Self { cache }
    }

    /// `n choose r`, served from the cache when present.
    ///
    /// # Panics
    ///
    /// Panics when `r > n`; use [`Self::checked_combinations`] for untrusted input.
    pub fn combinations(&self, n: u64, r: u64) -> f64 {
        let key = CombinationKey { n, r };
        if let Some(value) = self.cache.get(key) {
            return value;
        }
        let value = combinations(n, r);
        trace!(n, r, value, "combination cache miss");
        self.cache.insert(key, value);
        value
    }

    pub fn checked_combinations(&self, n: u64, r: u64) -> Result<f64, DomainError> {
        if r > n {
            return Err(DomainError::CombinationOutOfRange { n, r });
        }
        Ok(self.combinations(n, r))
    }

    /// Probability of at least `x` successes in `n` Bernoulli(`p`) trials.
    ///
    /// Sums whichever side of the distribution has fewer terms: the complement of the
    /// `x` lower terms, or the `n - x + 1` upper terms directly. A complement within
    /// `CANCELLATION_BAND` of 0, or an upper sum within it of 1, is replaced by the other
    /// side, which keeps the result non-increasing in `x` across the switch.
    pub fn tail_probability(&self, n: u64, x: u64, p: f64) -> Result<f64, DomainError> {
        validate_probability(p)?;
        if n > MAX_APPLICATIONS {
            return Err(DomainError::Overflow { n });
        }
        if x == 0 {
            return Ok(1.0);
        }
        if x > n {
            return Ok(0.0);
        }

        let lower_terms = x;
        let upper_terms = n - x + 1;
        let probability = if lower_terms <= upper_terms {
            let complement = self.complement_sum(n, x, p)?;
            if complement < CANCELLATION_BAND {
                self.upper_sum(n, x, p)?
            } else {
                complement
            }
        } else {
            let upper = self.upper_sum(n, x, p)?;
            if upper > 1.0 - CANCELLATION_BAND {
                self.complement_sum(n, x, p)?
            } else {
                upper
            }
        };

        Ok(probability.clamp(0.0, 1.0))
    }

    /// Probabilities of at least `k` successes for every `k` in `1..=n`.
    pub fn tail_sweep(&self, n: u64, p: f64) -> Result<Vec<f64>, DomainError> {
        (1..=n).map(|k| self.tail_probability(n, k, p)).collect()
    }

    /// Probability of fewer than `x` successes, i.e. the complement of the tail.
    pub fn lower_cumulative(&self, n: u64, x: u64, p: f64) -> Result<f64, DomainError> {
        validate_probability(p)?;
        self.sum_terms(n, p, 0..x.min(n + 1))
    }

    // Prefix summed from i = 0 upward, so 1 - prefix never grows with x.
    fn complement_sum(&self, n: u64, x: u64, p: f64) -> Result<f64, DomainError> {
        Ok(1.0 - self.sum_terms(n, p, 0..x)?)
    }

    // Summed from i = n downward, so the upper sum never shrinks as x decreases.
    fn upper_sum(&self, n: u64, x: u64, p: f64) -> Result<f64, DomainError> {
        self.sum_terms(n, p, (x..=n).rev())
    }

    fn sum_terms(
        &self,
        n: u64,
        p: f64,
        indices: impl Iterator<Item = u64>,
    ) -> Result<f64, DomainError> {
        let mut total = 0.0;
        for i in indices {
            total += self.term(n, i, p)?;
        }
        Ok(total)
    }

    fn term(&self, n: u64, i: u64, p: f64) -> Result<f64, DomainError> {
        let coefficient = self.combinations(n, i);
        if !coefficient.is_finite() {
            return Err(DomainError::Overflow { n });
        }
        Ok(coefficient * p.powf(i as f64) * (1.0 - p).powf((n - i) as f64))
    }
}

fn validate_probability(p: f64) -> Result<(), DomainError> {
    if p > 0.0 && p <= 1.0 {
        Ok(())
    } else {
        Err(DomainError::ProbabilityOutOfRange(p))
    }
}
