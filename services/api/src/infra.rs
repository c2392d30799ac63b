use allotment_odds::allotment::{
    AllotmentCalculator, AllotmentState, Category, InMemoryCombinationCache, ProbabilityEngine,
};
use allotment_odds::config::CalculatorConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// One calculator per process; its coefficient cache is shared by every request.
pub(crate) fn allotment_state(
    config: &CalculatorConfig,
) -> Arc<AllotmentState<InMemoryCombinationCache>> {
    Arc::new(AllotmentState {
        calculator: AllotmentCalculator::new(ProbabilityEngine::new()),
        default_ratio: config.default_subscription_ratio,
    })
}

/// Parse a `category=ratio` pair such as `bhni=42.5`.
pub(crate) fn parse_ratio_arg(raw: &str) -> Result<(Category, f64), String> {
    let (tag, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=RATIO, found '{raw}'"))?;
    let category = tag.trim().parse::<Category>().map_err(|err| err.to_string())?;
    let ratio = value
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("failed to parse '{value}' as a ratio ({err})"))?;
    Ok((category, ratio))
}
