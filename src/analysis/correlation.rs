use crate::models::{Correlations, CorrelationKind, Metric, Record};

/// Pearson correlation between two record fields.
///
/// Only rows where both fields hold a finite value take part. Returns `None` when no row
/// qualifies or when either field is constant over the qualifying rows.
pub fn pearson_correlation(records: &[Record], x: Metric, y: Metric) -> Option<f64> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = records
        .iter()
        .filter_map(|r| match (r.metric(x), r.metric(y)) {
            (Some(a), Some(b)) if a.is_finite() && b.is_finite() => Some((a, b)),
            _ => None,
        })
        .unzip();

    if xs.is_empty() {
        return None;
    }

    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut denom_x = 0.0;
    let mut denom_y = 0.0;
    for (a, b) in xs.iter().zip(&ys) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        numerator += dx * dy;
        denom_x += dx * dx;
        denom_y += dy * dy;
    }

    let denominator = (denom_x * denom_y).sqrt();
    if denominator == 0.0 {
        return None;
    }
    Some(numerator / denominator)
}

/// Rent correlated against income, subway access and air quality.
pub fn rent_correlations(records: &[Record]) -> Correlations {
    let rent = |kind: CorrelationKind| pearson_correlation(records, kind.predictor(), Metric::MedianRent);
    Correlations {
        rent_income: rent(CorrelationKind::RentIncome),
        rent_subway: rent(CorrelationKind::RentSubway),
        rent_air: rent(CorrelationKind::RentAir),
    }
}
