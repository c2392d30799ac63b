use serde::Serialize;

use super::category::Category;
use super::engine::MAX_APPLICATIONS;

/// Raised when a token appears where a category tag is expected but names none.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid category: {token}")]
pub struct InvalidCategoryError {
    pub token: String,
}

/// Parse free-form input such as `"2 retail bhni 3 shni"` into one category per application.
///
/// Tokens are whitespace separated and case-insensitive. A positive integer followed by
/// another token is read as `<count> <category>`; every other token must be a bare category.
/// Counts may add up to at most [`MAX_APPLICATIONS`]; a count past that budget is not a
/// count and fails like any other unknown tag.
pub fn parse_applications(input: &str) -> Result<Vec<Category>, InvalidCategoryError> {
    let tokens: Vec<String> = input
        .split_whitespace()
        .map(|token| token.to_ascii_lowercase())
        .collect();
    let mut categories = Vec::new();
    let mut counted: u64 = 0;

    let mut index = 0;
    while index < tokens.len() {
        let token = &tokens[index];
        let budget = MAX_APPLICATIONS - counted;
        match (parse_count(token, budget), tokens.get(index + 1)) {
            (Some(count), Some(next)) => {
                let category = category_for(next)?;
                categories.extend(std::iter::repeat(category).take(count as usize));
                counted += count;
                index += 2;
            }
            _ => {
                categories.push(category_for(token)?);
                index += 1;
            }
        }
    }

    Ok(categories)
}

fn parse_count(token: &str, budget: u64) -> Option<u64> {
    if token.is_empty() || !token.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    token
        .parse::<u64>()
        .ok()
        .filter(|count| (1..=budget).contains(count))
}

fn category_for(token: &str) -> Result<Category, InvalidCategoryError> {
    Category::from_tag(token).ok_or_else(|| InvalidCategoryError {
        token: token.to_string(),
    })
}

/// The applications submitted for one calculation, in the order they were entered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplicationBatch {
    categories: Vec<Category>,
}

impl ApplicationBatch {
    pub fn parse(input: &str) -> Result<Self, InvalidCategoryError> {
        parse_applications(input).map(Self::from)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Application count per distinct category, ordered by first appearance.
    pub fn category_counts(&self) -> Vec<(Category, u64)> {
        let mut counts: Vec<(Category, u64)> = Vec::new();
        for category in &self.categories {
            match counts.iter_mut().find(|(seen, _)| seen == category) {
                Some((_, count)) => *count += 1,
                None => counts.push((*category, 1)),
            }
        }
        counts
    }

    /// Tags joined with `" + "`, e.g. `retail + retail + bhni`.
    pub fn summary(&self) -> String {
        self.categories
            .iter()
            .map(|category| category.tag())
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

impl From<Vec<Category>> for ApplicationBatch {
    fn from(categories: Vec<Category>) -> Self {
        Self { categories }
    }
}
