use serde_json::{json, Value};
use tracing::debug;
use crate::analysis::correlation::rent_correlations;
use crate::analysis::grouping::{latest_window, latest_year, latest_year_snapshot};
use crate::analysis::growth::{calculate_disparity, calculate_growth, calculate_rent_growth, calculate_year_over_year};
use crate::analysis::regression::ols_regression;
use crate::constants::REGRESSION_WINDOW_YEARS;
use crate::models::{CorrelationKind, Driver, Headline, HeadlineSelection, Metric, Record, Summary};

/// Records the regression is fitted on: the most recent distinct years.
pub fn regression_window(records: &[Record]) -> Vec<Record> {
    latest_window(records, REGRESSION_WINDOW_YEARS)
}

/// Composes every calculator into one payload.
///
/// An empty input yields [`Summary::empty`].
pub fn summarize(records: &[Record]) -> Summary {
    let Some(latest) = latest_year(records) else {
        return Summary::empty();
    };

    let window = regression_window(records);
    let mut summary = Summary {
        growth: calculate_rent_growth(records),
        income_growth: calculate_growth(records, Metric::MedianIncome),
        yoy: calculate_year_over_year(records),
        latest_rows: latest_year_snapshot(records),
        correlations: rent_correlations(records),
        regression: ols_regression(&window),
        disparity: calculate_disparity(records),
        headlines: Vec::new(),
        latest_year: Some(latest),
    };

    summary.headlines = select_headlines(&summary, &window, records.len())
        .map(|selection| generate_headlines(&selection))
        .unwrap_or_default();

    debug!(
        "Summarized {} records: {} growth entries, regression {}",
        records.len(),
        summary.growth.len(),
        if summary.regression.is_some() { "fitted" } else { "unavailable" }
    );
    summary
}

/// First element with the largest key; later elements must be strictly larger to win.
fn first_max_by<T, I, F>(items: I, key: F) -> Option<T>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> f64,
{
    items.into_iter().fold(None, |best, item| match best {
        Some(current) if key(&current) >= key(&item) => Some(current),
        _ => Some(item),
    })
}

/// Picks the entities the headlines talk about: the fastest-growing borough, the borough
/// with the highest current rent, the correlation of largest magnitude and the regression
/// term of largest magnitude.
///
/// Ties go to the earliest candidate: boroughs in name order, correlations in the order
/// income, subway, air quality and drivers in the order income, subway, inverse air.
/// Returns `None` when there is no growth or no latest-year row.
pub fn select_headlines(summary: &Summary, window: &[Record], observations: usize) -> Option<HeadlineSelection> {
    if summary.latest_rows.is_empty() || summary.growth.is_empty() {
        return None;
    }

    let (growth_leader, growth) = first_max_by(
        summary.growth.iter().filter(|(_, entry)| entry.pct.is_finite()),
        |(_, entry)| entry.pct,
    )?;
    let top_rent = summary
        .latest_rows
        .iter()
        .find(|row| row.median_rent.is_finite())?;

    let latest_spread = summary.disparity.values().next_back().copied();

    let strongest_correlation = first_max_by(
        CorrelationKind::ALL
            .into_iter()
            .filter_map(|kind| summary.correlations.get(kind).filter(|r| !r.is_nan()).map(|r| (kind, r))),
        |(_, r)| r.abs(),
    );

    let dominant_driver = summary.regression.as_ref().and_then(|regression| {
        first_max_by(
            Driver::ALL.into_iter().map(|d| (d, regression.coefficients.driver(d))),
            |(_, beta)| beta.abs(),
        )
    });

    let latest_year = window
        .iter()
        .map(|row| row.year)
        .max()
        .unwrap_or(growth.end_year);

    Some(HeadlineSelection {
        growth_leader: growth_leader.clone(),
        growth: growth.clone(),
        top_rent: top_rent.clone(),
        strongest_correlation,
        dominant_driver,
        latest_spread,
        latest_year,
        observations,
    })
}

fn format_thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Renders the three headline records for a selection.
pub fn generate_headlines(selection: &HeadlineSelection) -> Vec<Headline> {
    let leader = &selection.growth_leader;
    let growth = &selection.growth;
    let top = &selection.top_rent;

    let comparison = match selection.latest_spread {
        Some(spread) if spread.min.is_finite() => {
            format!("${} above", format_thousands(top.median_rent - spread.min))
        }
        Some(_) => format!("${} above", format_thousands(0.0)),
        None => "outpacing".to_string(),
    };

    let (correlation_label, correlation_value) = selection
        .strongest_correlation
        .map(|(kind, r)| (kind.label().to_string(), r))
        .unwrap_or_else(|| ("household income".to_string(), 0.0));
    let correlation_title = selection
        .strongest_correlation
        .map(|(kind, _)| kind.label().to_string())
        .unwrap_or_else(|| "Income".to_string());
    let (driver, beta) = selection
        .dominant_driver
        .unwrap_or((Driver::Income, 0.0));

    vec![
        Headline {
            title: format!("{} leads rent acceleration", leader),
            body: format!(
                "{} rents climbed {:.1}% from {} to {}, marking the fastest borough-scale gain.",
                leader, growth.pct, growth.start_year, growth.end_year
            ),
            evidence: vec![Value::String(format!("{:.1}", growth.pct))],
            caveats: "Growth is percentage-based; absolute rents remain below Manhattan levels.".to_string(),
        },
        Headline {
            title: format!("{} remains the price ceiling", top.borough),
            body: format!(
                "In {}, {} posts a median asking rent of ${}, {} the city-floor borough.",
                selection.latest_year,
                top.borough,
                format_thousands(top.median_rent),
                comparison
            ),
            evidence: vec![
                json!(top.median_rent),
                selection.latest_spread.map(|s| json!(s.spread)).unwrap_or(Value::Null),
            ],
            caveats: "Borough medians mask neighborhood heterogeneity and unit size mix.".to_string(),
        },
        Headline {
            title: format!("{} alignment is strongest", correlation_title),
            body: format!(
                "Across {} borough-year observations, rent moves with {} (r = {:.2}), while regression weights point to {} as the dominant driver in recent years (β ≈ {:.4}).",
                selection.observations, correlation_label, correlation_value, driver, beta
            ),
            evidence: vec![
                selection
                    .strongest_correlation
                    .map(|(kind, r)| json!({ "kind": kind, "r": r }))
                    .unwrap_or(Value::Null),
                selection
                    .dominant_driver
                    .map(|(driver, beta)| json!({ "driver": driver, "beta": beta }))
                    .unwrap_or(Value::Null),
            ],
            caveats: "Regression is observational; omitted variables (building quality, policy shocks) remain.".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(3600.0), "3,600");
        assert_eq!(format_thousands(1_234_567.4), "1,234,567");
        assert_eq!(format_thousands(999.0), "999");
        assert_eq!(format_thousands(-1800.0), "-1,800");
        assert_eq!(format_thousands(0.0), "0");
    }

    #[test]
    fn test_first_max_by_keeps_earliest_tie() {
        let picked = first_max_by(vec![("a", 2.0), ("b", 3.0), ("c", 3.0)], |(_, v)| *v);
        assert_eq!(picked, Some(("b", 3.0)));
        assert_eq!(first_max_by(Vec::<(&str, f64)>::new(), |(_, v)| *v), None);
    }
}
