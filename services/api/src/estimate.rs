use crate::infra::parse_ratio_arg;
use allotment_odds::allotment::{
    category_catalogue, AllotmentCalculator, AllotmentError, AllotmentEstimate, Category,
    ProbabilityEngine, SubscriptionRatios, INPUT_FORMAT_HINT,
};
use allotment_odds::config::AppConfig;
use allotment_odds::error::AppError;
use allotment_odds::telemetry::{self, LogTarget};
use clap::Args;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub(crate) struct EstimateArgs {
    /// Applications to evaluate, e.g. "2 retail bhni 3 shni"
    pub(crate) applications: String,
    /// Subscription ratio for a category as CATEGORY=RATIO (repeatable)
    #[arg(long = "ratio", value_parser = parse_ratio_arg)]
    pub(crate) ratios: Vec<(Category, f64)>,
    /// Ratio applied to categories without an explicit --ratio (defaults to configuration)
    #[arg(long)]
    pub(crate) default_ratio: Option<f64>,
    /// Emit the estimate as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_estimate(args: EstimateArgs) -> Result<(), AppError> {
    let EstimateArgs {
        applications,
        ratios,
        default_ratio,
        json,
    } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, LogTarget::Stderr)?;

    let default_ratio = default_ratio.unwrap_or(config.calculator.default_subscription_ratio);
    let ratios = ratios.into_iter().fold(
        SubscriptionRatios::with_default(default_ratio),
        |ratios, (category, ratio)| ratios.with(category, ratio),
    );

    let calculator = AllotmentCalculator::new(ProbabilityEngine::new());
    let estimate = match calculator.estimate_text(&applications, &ratios) {
        Ok(estimate) => estimate,
        Err(err) => {
            if matches!(err, AllotmentError::InvalidCategory(_)) {
                eprintln!("{INPUT_FORMAT_HINT}");
            }
            return Err(err.into());
        }
    };

    let mut stdout = io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut stdout, &estimate)?;
        writeln!(stdout)?;
    } else {
        render_estimate(&mut stdout, &estimate)?;
    }
    Ok(())
}

pub(crate) fn run_categories() -> Result<(), AppError> {
    render_categories(&mut io::stdout().lock())?;
    Ok(())
}

fn render_categories(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Available categories:")?;
    for (index, view) in category_catalogue().into_iter().enumerate() {
        writeln!(out, "{}. {:<6} - {}", index + 1, view.tag, view.description)?;
    }
    Ok(())
}

pub(crate) fn render_estimate(
    out: &mut impl Write,
    estimate: &AllotmentEstimate,
) -> io::Result<()> {
    if estimate.categories.is_empty() {
        return writeln!(out, "No applications entered.");
    }

    writeln!(out, "You applied from these categories: {}", estimate.summary)?;
    writeln!(out, "\nProbability Calculations:")?;
    writeln!(out, "---")?;

    for entry in &estimate.categories {
        let heading = if entry.adjusted {
            "Adjusted subscription ratio"
        } else {
            "Subscription ratio"
        };
        writeln!(
            out,
            "{} ({heading}: {:.2}x)",
            entry.category.label(),
            entry.effective_subscription
        )?;

        for lot in &entry.at_least {
            writeln!(
                out,
                "Probability of getting at least {} lot(s): {:.2}%",
                lot.lots,
                lot.percent()
            )?;
        }

        let lots_per_application = entry.category.lots_per_application();
        if lots_per_application > 1 {
            writeln!(
                out,
                "Expected number of lots: {} (multiple of {lots_per_application})",
                entry.expected_lots
            )?;
        } else {
            writeln!(out, "Expected number of lots: {}", entry.expected_lots)?;
        }
        writeln!(out, "---")?;
    }

    writeln!(out, "\nTotal Expected Lots")?;
    writeln!(
        out,
        "Total expected number of lots across all categories: {}",
        estimate.total_expected_lots
    )
}
