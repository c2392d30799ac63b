//! IPO allotment odds: application parsing, binomial tail probabilities and
//! expected-lot estimates per investor category.

pub mod calculator;
pub mod category;
pub mod combinatorics;
pub mod engine;
pub mod parser;
pub mod router;

pub use calculator::{
    AllotmentCalculator, AllotmentError, AllotmentEstimate, CategoryEstimate, LotProbability,
    SubscriptionRatios,
};
pub use category::Category;
pub use combinatorics::{
    combinations, CacheStats, CombinationCache, CombinationKey, InMemoryCombinationCache,
    NoopCombinationCache, DEFAULT_CACHE_CAPACITY,
};
pub use engine::{
    effective_probability, expected_lots, DomainError, ProbabilityEngine, MAX_APPLICATIONS,
};
pub use parser::{parse_applications, ApplicationBatch, InvalidCategoryError};
pub use router::{allotment_router, category_catalogue, AllotmentState, INPUT_FORMAT_HINT};
