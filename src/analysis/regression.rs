use tracing::debug;
use crate::analysis::linalg::{invert, multiply, transpose, Matrix};
use crate::constants::REGRESSION_PARAMETERS;
use crate::models::{Coefficients, Record, RegressionResult};

/// Predictor and response matrices for the rent model.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    /// Rows of `[1, income, subway, 100 - air_quality_index]`.
    pub x: Matrix,
    /// Median rent as a column vector.
    pub y: Matrix,
    /// Year of each observation, aligned with the rows of `x`.
    pub years: Vec<i32>,
}

impl DesignMatrix {
    /// Builds the design with one row per record, in input order. A missing subway access
    /// score or air quality index enters the row as `0`. Returns `None` for an empty input.
    pub fn from_records(records: &[Record]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }

        let incomplete = records
            .iter()
            .filter(|r| r.subway_access_score.is_none() || r.air_quality_index.is_none())
            .count();
        if incomplete > 0 {
            debug!(
                "{} records lack subway or air quality values; treating them as 0 in the regression",
                incomplete
            );
        }

        let n = records.len();
        let x = Matrix::from_fn(n, REGRESSION_PARAMETERS, |i, j| {
            let row = &records[i];
            match j {
                0 => 1.0,
                1 => row.median_income,
                2 => row.subway_access_score.unwrap_or(0.0),
                _ => 100.0 - row.air_quality_index.unwrap_or(0.0),
            }
        });
        let y = Matrix::from_fn(n, 1, |i, _| records[i].median_rent);
        let years = records.iter().map(|r| r.year).collect();

        Some(Self { x, y, years })
    }

    pub fn nobs(&self) -> usize {
        self.x.nrows()
    }
}

/// Intermediate products of a least-squares solve, shared with the diagnostics.
#[derive(Debug, Clone)]
pub(crate) struct LeastSquares {
    pub beta: Vec<f64>,
    pub xtx_inv: Matrix,
    pub predictions: Vec<f64>,
    pub residuals: Vec<f64>,
    pub ss_res: f64,
    pub ss_tot: f64,
}

impl LeastSquares {
    pub fn r2(&self) -> f64 {
        if self.ss_tot == 0.0 {
            0.0
        } else {
            1.0 - self.ss_res / self.ss_tot
        }
    }

    pub fn residual_std(&self) -> f64 {
        let n = self.residuals.len() as i64;
        let k = self.beta.len() as i64;
        (self.ss_res / (n - k).max(1) as f64).sqrt()
    }
}

/// Solves the normal equations `(XᵗX)⁻¹ Xᵗy`. `None` when `XᵗX` is singular.
pub(crate) fn least_squares(x: &Matrix, y: &Matrix) -> Option<LeastSquares> {
    let xt = transpose(x);
    let xtx = multiply(&xt, x);
    let xtx_inv = invert(&xtx)?;
    let xty = multiply(&xt, y);
    let beta_matrix = multiply(&xtx_inv, &xty);
    let beta: Vec<f64> = beta_matrix.column(0).iter().copied().collect();

    let predictions: Vec<f64> = x
        .row_iter()
        .map(|row| row.iter().zip(&beta).fold(0.0, |sum, (value, b)| sum + value * b))
        .collect();
    let observed: Vec<f64> = y.column(0).iter().copied().collect();
    let residuals: Vec<f64> = observed
        .iter()
        .zip(&predictions)
        .map(|(actual, predicted)| actual - predicted)
        .collect();

    let mean_y = observed.iter().sum::<f64>() / observed.len() as f64;
    let ss_tot: f64 = observed.iter().map(|v| (v - mean_y).powi(2)).sum();
    let ss_res: f64 = residuals.iter().map(|r| r.powi(2)).sum();

    Some(LeastSquares {
        beta,
        xtx_inv,
        predictions,
        residuals,
        ss_res,
        ss_tot,
    })
}

/// Fits the design matrix, or returns `None` when the normal matrix is singular.
pub fn fit_design(design: &DesignMatrix) -> Option<RegressionResult> {
    let fit = least_squares(&design.x, &design.y)?;
    Some(RegressionResult {
        coefficients: Coefficients::from_beta(&fit.beta),
        r2: fit.r2(),
        residual_std: fit.residual_std(),
        predictions: fit.predictions,
        residuals: fit.residuals,
    })
}

/// Ordinary least squares of rent on income, subway access and inverted air quality.
///
/// Returns `None` for an empty input or when the predictors are degenerate (fewer
/// observations than coefficients, collinear columns). Predictions and residuals hold one
/// entry per input record, in input order.
pub fn ols_regression(records: &[Record]) -> Option<RegressionResult> {
    if records.is_empty() {
        return None;
    }
    let design = DesignMatrix::from_records(records)?;
    let result = fit_design(&design);
    if result.is_none() {
        debug!("Normal matrix is singular for {} observations", design.nobs());
    }
    result
}
