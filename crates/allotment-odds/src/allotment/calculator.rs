use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::category::Category;
use super::combinatorics::{CombinationCache, InMemoryCombinationCache};
use super::engine::{effective_probability, expected_lots, DomainError, ProbabilityEngine};
use super::parser::{ApplicationBatch, InvalidCategoryError};
use crate::config::CalculatorConfig;

/// Failures surfaced to callers of the calculator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AllotmentError {
    #[error(transparent)]
    InvalidCategory(#[from] InvalidCategoryError),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Subscription ratio per category, falling back to a default for unlisted ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRatios {
    #[serde(default)]
    ratios: BTreeMap<Category, f64>,
    #[serde(default = "default_ratio")]
    default_ratio: f64,
}

fn default_ratio() -> f64 {
    CalculatorConfig::default().default_subscription_ratio
}

impl Default for SubscriptionRatios {
    fn default() -> Self {
        Self::with_default(default_ratio())
    }
}

impl SubscriptionRatios {
    pub fn with_default(default_ratio: f64) -> Self {
        Self {
            ratios: BTreeMap::new(),
            default_ratio,
        }
    }

    pub fn set(&mut self, category: Category, ratio: f64) -> &mut Self {
        self.ratios.insert(category, ratio);
        self
    }

    pub fn with(mut self, category: Category, ratio: f64) -> Self {
        self.set(category, ratio);
        self
    }

    pub fn ratio_for(&self, category: Category) -> f64 {
        self.ratios
            .get(&category)
            .copied()
            .unwrap_or(self.default_ratio)
    }
}

/// Chance of receiving at least `lots` successful applications.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LotProbability {
    pub lots: u64,
    pub probability: f64,
}

impl LotProbability {
    pub fn percent(&self) -> f64 {
        self.probability * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryEstimate {
    pub category: Category,
    pub applications: u64,
    pub subscription_ratio: f64,
    pub effective_subscription: f64,
    pub adjusted: bool,
    pub probability: f64,
    pub at_least: Vec<LotProbability>,
    pub expected_lots: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllotmentEstimate {
    pub applications: ApplicationBatch,
    pub summary: String,
    pub categories: Vec<CategoryEstimate>,
    pub total_expected_lots: u64,
}

/// Runs the probability engine once per distinct category in a batch and aggregates
/// the results.
#[derive(Debug)]
pub struct AllotmentCalculator<C = InMemoryCombinationCache> {
    engine: ProbabilityEngine<C>,
}

impl<C> Clone for AllotmentCalculator<C> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
        }
    }
}

impl Default for AllotmentCalculator<InMemoryCombinationCache> {
    fn default() -> Self {
        Self::new(ProbabilityEngine::new())
    }
}

impl<C: CombinationCache> AllotmentCalculator<C> {
    pub fn new(engine: ProbabilityEngine<C>) -> Self {
        Self { engine }
    }

    pub fn estimate_text(
        &self,
        input: &str,
        ratios: &SubscriptionRatios,
    ) -> Result<AllotmentEstimate, AllotmentError> {
        let batch = ApplicationBatch::parse(input)?;
        self.estimate(batch, ratios).map_err(AllotmentError::from)
    }

    pub fn estimate(
        &self,
        batch: ApplicationBatch,
        ratios: &SubscriptionRatios,
    ) -> Result<AllotmentEstimate, DomainError> {
        let categories = batch
            .category_counts()
            .into_iter()
            .map(|(category, applications)| {
                self.estimate_category(category, applications, ratios.ratio_for(category))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let total_expected_lots = categories.iter().map(|entry| entry.expected_lots).sum();

        Ok(AllotmentEstimate {
            summary: batch.summary(),
            applications: batch,
            categories,
            total_expected_lots,
        })
    }

    pub fn estimate_category(
        &self,
        category: Category,
        applications: u64,
        subscription_ratio: f64,
    ) -> Result<CategoryEstimate, DomainError> {
        let probability = effective_probability(category, subscription_ratio)?;
        let at_least = self
            .engine
            .tail_sweep(applications, probability)?
            .into_iter()
            .zip(1..)
            .map(|(probability, lots)| LotProbability { lots, probability })
            .collect();
        let expected_lots = expected_lots(applications, probability, category);

        debug!(
            %category,
            applications,
            subscription_ratio,
            probability,
            expected_lots,
            "estimated category allotment"
        );

        Ok(CategoryEstimate {
            category,
            applications,
            subscription_ratio,
            effective_subscription: category.effective_subscription(subscription_ratio),
            adjusted: category.is_adjusted(),
            probability,
            at_least,
            expected_lots,
        })
    }
}
