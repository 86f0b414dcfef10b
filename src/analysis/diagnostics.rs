use std::collections::BTreeMap;
use itertools::Itertools;
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, StudentsT};
use crate::analysis::linalg::Matrix;
use crate::analysis::regression::{least_squares, DesignMatrix};
use crate::analysis::summary::regression_window;
use crate::models::{BreuschPagan, Coefficients, ConfidenceInterval, Record, RegressionDiagnostics};

const TERMS: [&str; 4] = ["intercept", "income", "subway", "inverseAir"];

/// Diagnostics for the model fitted on the most recent regression window of `records`.
pub fn window_diagnostics(records: &[Record]) -> Option<RegressionDiagnostics> {
    let window = regression_window(records);
    diagnose(&DesignMatrix::from_records(&window)?)
}

/// Standard errors, significance tests, confidence intervals, variance inflation factors and
/// a Breusch-Pagan heteroskedasticity test for the rent model.
///
/// Needs more observations than coefficients and an invertible normal matrix.
pub fn diagnose(design: &DesignMatrix) -> Option<RegressionDiagnostics> {
    let fit = least_squares(&design.x, &design.y)?;
    let n = design.nobs();
    let k = fit.beta.len();
    if n <= k {
        return None;
    }

    let df_resid = (n - k) as f64;
    let sigma2 = fit.ss_res / df_resid;
    let t_dist = StudentsT::new(0.0, 1.0, df_resid).ok()?;
    let t_crit = t_dist.inverse_cdf(0.975);

    let stderr: Vec<f64> = (0..k).map(|j| (sigma2 * fit.xtx_inv[(j, j)]).sqrt()).collect();
    let tvalues: Vec<f64> = fit.beta.iter().zip(&stderr).map(|(b, se)| b / se).collect();
    let pvalues: Vec<f64> = tvalues
        .iter()
        .map(|t| 2.0 * (1.0 - t_dist.cdf(t.abs())))
        .collect();

    let confidence_intervals = TERMS
        .iter()
        .enumerate()
        .map(|(j, term)| {
            let half_width = t_crit * stderr[j];
            (term.to_string(), ConfidenceInterval {
                lower: fit.beta[j] - half_width,
                upper: fit.beta[j] + half_width,
            })
        })
        .collect();

    let adj_r2 = 1.0 - (1.0 - fit.r2()) * (n as f64 - 1.0) / df_resid;

    Some(RegressionDiagnostics {
        stderr: Coefficients::from_beta(&stderr),
        tvalues: Coefficients::from_beta(&tvalues),
        pvalues: Coefficients::from_beta(&pvalues),
        confidence_intervals,
        adj_r2,
        nobs: n,
        vif: variance_inflation(&design.x),
        breusch_pagan: breusch_pagan(&design.x, &fit.residuals),
        window_years: design.years.iter().copied().unique().sorted().collect(),
    })
}

/// VIF of each predictor column, regressing it on an intercept and the remaining predictors.
fn variance_inflation(x: &Matrix) -> BTreeMap<String, f64> {
    let predictors = x.ncols();
    (1..predictors)
        .filter_map(|target| {
            let others: Vec<usize> = (0..predictors).filter(|&c| c != target).collect();
            let exog = x.select_columns(others.iter());
            let endog = x.columns(target, 1).into_owned();
            let aux = least_squares(&exog, &endog)?;
            Some((TERMS[target].to_string(), 1.0 / (1.0 - aux.r2())))
        })
        .collect()
}

/// Breusch-Pagan LM and F tests of squared residuals against the model's predictors.
fn breusch_pagan(x: &Matrix, residuals: &[f64]) -> Option<BreuschPagan> {
    let n = x.nrows();
    let k = x.ncols();
    if k < 2 || n <= k {
        return None;
    }

    let squared = Matrix::from_iterator(n, 1, residuals.iter().map(|r| r * r));
    let aux = least_squares(x, &squared)?;
    let r2 = aux.r2();

    let df_model = (k - 1) as f64;
    let df_resid = (n - k) as f64;
    let lm_stat = n as f64 * r2;
    let f_stat = (r2 / df_model) / ((1.0 - r2) / df_resid);

    let chi2 = ChiSquared::new(df_model).ok()?;
    let fisher = FisherSnedecor::new(df_model, df_resid).ok()?;

    Some(BreuschPagan {
        lm_stat,
        lm_pvalue: 1.0 - chi2.cdf(lm_stat),
        f_stat,
        f_pvalue: 1.0 - fisher.cdf(f_stat),
    })
}
