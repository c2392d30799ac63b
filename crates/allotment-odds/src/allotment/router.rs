use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use super::calculator::{AllotmentCalculator, AllotmentError, SubscriptionRatios};
use super::category::Category;
use super::combinatorics::CombinationCache;
use super::parser::ApplicationBatch;

pub const INPUT_FORMAT_HINT: &str = "Please try again using format like '2 retail bhni 3 shni'";

/// Shared handler state: the calculator plus the ratio used for omitted categories.
pub struct AllotmentState<C> {
    pub calculator: AllotmentCalculator<C>,
    pub default_ratio: f64,
}

/// Ratio keys stay raw so an unknown tag is reported like one in `applications`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EstimateRequest {
    pub applications: String,
    #[serde(default)]
    pub subscription_ratios: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParseRequest {
    pub applications: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParseResponse {
    pub categories: Vec<Category>,
    pub counts: BTreeMap<Category, u64>,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryView {
    pub tag: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub lots_per_application: u64,
    pub subscription_divisor: f64,
}

impl From<Category> for CategoryView {
    fn from(category: Category) -> Self {
        Self {
            tag: category.tag(),
            label: category.label(),
            description: category.description(),
            lots_per_application: category.lots_per_application(),
            subscription_divisor: category.subscription_divisor(),
        }
    }
}

pub fn category_catalogue() -> Vec<CategoryView> {
    Category::ALL.into_iter().map(CategoryView::from).collect()
}

/// Router exposing parsing and estimation endpoints.
pub fn allotment_router<C>(state: Arc<AllotmentState<C>>) -> Router
where
    C: CombinationCache + 'static,
{
    Router::new()
        .route("/api/v1/allotment/estimate", post(estimate_handler::<C>))
        .route("/api/v1/allotment/parse", post(parse_handler))
        .route("/api/v1/allotment/categories", get(categories_handler))
        .with_state(state)
}

pub(crate) async fn estimate_handler<C>(
    State(state): State<Arc<AllotmentState<C>>>,
    Json(request): Json<EstimateRequest>,
) -> Response
where
    C: CombinationCache + 'static,
{
    let mut ratios = SubscriptionRatios::with_default(state.default_ratio);
    for (tag, ratio) in &request.subscription_ratios {
        match tag.parse::<Category>() {
            Ok(category) => {
                ratios.set(category, *ratio);
            }
            Err(error) => return rejected(&request.applications, &AllotmentError::from(error)),
        }
    }

    match state
        .calculator
        .estimate_text(&request.applications, &ratios)
    {
        Ok(estimate) => (StatusCode::OK, Json(estimate)).into_response(),
        Err(error) => rejected(&request.applications, &error),
    }
}

pub(crate) async fn parse_handler(Json(request): Json<ParseRequest>) -> Response {
    match ApplicationBatch::parse(&request.applications) {
        Ok(batch) => {
            let payload = ParseResponse {
                counts: batch.category_counts().into_iter().collect(),
                summary: batch.summary(),
                categories: batch.categories().to_vec(),
            };
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => rejected(&request.applications, &AllotmentError::from(error)),
    }
}

pub(crate) async fn categories_handler() -> Json<Vec<CategoryView>> {
    Json(category_catalogue())
}

fn rejected(applications: &str, error: &AllotmentError) -> Response {
    warn!(%error, applications, "rejected allotment request");
    let payload = json!({
        "error": error.to_string(),
        "applications": applications,
        "hint": INPUT_FORMAT_HINT,
    });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}
