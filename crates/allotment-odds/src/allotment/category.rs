use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::parser::InvalidCategoryError;

/// Investor category an IPO application is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Retail individual investor.
    Retail,
    /// Small high net-worth individual.
    Shni,
    /// Big high net-worth individual.
    Bhni,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Retail, Category::Shni, Category::Bhni];

    /// Lots credited per successful HNI application.
    pub const HNI_LOTS_PER_APPLICATION: u64 = 14;

    /// Lower-case tag accepted by the application parser.
    pub fn tag(self) -> &'static str {
        match self {
            Category::Retail => "retail",
            Category::Shni => "shni",
            Category::Bhni => "bhni",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Retail => "RETAIL",
            Category::Shni => "SHNI",
            Category::Bhni => "BHNI",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Category::Retail => "Retail Individual Investor (1 lot per application)",
            Category::Shni => "Small HNI (14 lots per application)",
            Category::Bhni => "Big HNI (14 lots per application)",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.tag().eq_ignore_ascii_case(tag))
    }

    /// Factor the published subscription ratio is divided by before deriving the
    /// per-application probability.
    pub fn subscription_divisor(self) -> f64 {
        match self {
            Category::Retail | Category::Shni => 1.0,
            Category::Bhni => 5.0,
        }
    }

    pub fn effective_subscription(self, subscription_ratio: f64) -> f64 {
        subscription_ratio / self.subscription_divisor()
    }

    pub fn is_adjusted(self) -> bool {
        self.subscription_divisor() != 1.0
    }

    pub fn lots_per_application(self) -> u64 {
        match self {
            Category::Retail => 1,
            Category::Shni | Category::Bhni => Self::HNI_LOTS_PER_APPLICATION,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Category {
    type Err = InvalidCategoryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_tag(value).ok_or_else(|| InvalidCategoryError {
            token: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_case_insensitively() {
        for category in Category::ALL {
            assert_eq!(Category::from_tag(category.tag()), Some(category));
            assert_eq!(Category::from_tag(category.label()), Some(category));
        }
        assert_eq!(Category::from_tag("hni"), None);
    }

    #[test]
    fn only_big_hni_is_adjusted() {
        assert_eq!(Category::Retail.effective_subscription(10.0), 10.0);
        assert_eq!(Category::Shni.effective_subscription(10.0), 10.0);
        assert_eq!(Category::Bhni.effective_subscription(10.0), 2.0);
        assert!(Category::Bhni.is_adjusted());
        assert!(!Category::Shni.is_adjusted());
    }

    #[test]
    fn hni_categories_carry_lot_multiplier() {
        assert_eq!(Category::Retail.lots_per_application(), 1);
        assert_eq!(Category::Shni.lots_per_application(), 14);
        assert_eq!(Category::Bhni.lots_per_application(), 14);
    }

    #[test]
    fn from_str_reports_offending_token() {
        let err = "foo".parse::<Category>().expect_err("unknown tag");
        assert_eq!(err.token, "foo");
    }

    #[test]
    fn serializes_as_lowercase_tag() {
        let json = serde_json::to_string(&Category::Bhni).expect("serialize");
        assert_eq!(json, "\"bhni\"");
        let parsed: Category = serde_json::from_str("\"shni\"").expect("deserialize");
        assert_eq!(parsed, Category::Shni);
    }
}
