use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;
use crate::analysis::{build_summary_payload, build_viz_payload};
use crate::constants::{DERIVED_SUMMARY_FILE, OLS_REPORT_FILE, VIZ_PAYLOAD_FILE};
use crate::models::{Record, RegressionDiagnostics, RegressionResult, Summary};

pub fn generated_at() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Writes the published artifacts: summary JSON, chart payload JSON and the OLS appendix.
pub struct SummaryWriter {
    output_dir: PathBuf,
    appendix_dir: PathBuf,
}

impl SummaryWriter {
    pub fn new(output_dir: impl Into<PathBuf>, appendix_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            appendix_dir: appendix_dir.into(),
        }
    }

    pub async fn write_derived_summary(
        &self,
        base: &Value,
        summary: &Summary,
        diagnostics: Option<&RegressionDiagnostics>,
    ) -> Result<PathBuf> {
        let payload = build_summary_payload(base, summary, diagnostics, &generated_at());
        let path = self.output_dir.join(DERIVED_SUMMARY_FILE);
        write_json(&path, &payload).await?;
        Ok(path)
    }

    pub async fn write_viz_payload(&self, records: &[Record]) -> Result<PathBuf> {
        let payload = build_viz_payload(records, &generated_at());
        let path = self.output_dir.join(VIZ_PAYLOAD_FILE);
        write_json(&path, &payload).await?;
        Ok(path)
    }

    pub async fn write_ols_report(
        &self,
        regression: &RegressionResult,
        diagnostics: &RegressionDiagnostics,
    ) -> Result<PathBuf> {
        let path = self.appendix_dir.join(OLS_REPORT_FILE);
        write_text(&path, &render_ols_report(regression, diagnostics)).await?;
        Ok(path)
    }
}

async fn write_json<T: Serialize>(path: &Path, payload: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(payload).context("Failed to serialize payload")?;
    write_text(path, &text).await
}

async fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// Markdown appendix describing the fitted rent model.
pub fn render_ols_report(regression: &RegressionResult, diagnostics: &RegressionDiagnostics) -> String {
    let window = match (diagnostics.window_years.first(), diagnostics.window_years.last()) {
        (Some(first), Some(last)) => format!("{}–{}", first, last),
        _ => "n/a".to_string(),
    };

    let mut lines = vec![
        "# OLS Appendix: NYC Housing Dynamics".to_string(),
        String::new(),
        "**Model:** `rent ~ const + income + subway + inverseAir`  ".to_string(),
        format!(
            "**Window:** {} (last {} years). **N:** {}",
            window,
            diagnostics.window_years.len(),
            diagnostics.nobs
        ),
        format!(
            "**R²:** {:.4} (**Adj. R²:** {:.4}), **σ (resid):** {:.2}",
            regression.r2, diagnostics.adj_r2, regression.residual_std
        ),
        String::new(),
        "## Coefficients".to_string(),
        "| term | coef | std err | t | p>|t| | 95% CI |".to_string(),
        "|---|---:|---:|---:|---:|---:|".to_string(),
    ];

    let terms = ["intercept", "income", "subway", "inverseAir"];
    let coef = regression.coefficients.as_array();
    let stderr = diagnostics.stderr.as_array();
    let tvalues = diagnostics.tvalues.as_array();
    let pvalues = diagnostics.pvalues.as_array();
    for (j, term) in terms.iter().enumerate() {
        let (lower, upper) = diagnostics
            .confidence_intervals
            .get(*term)
            .map(|ci| (ci.lower, ci.upper))
            .unwrap_or((f64::NAN, f64::NAN));
        lines.push(format!(
            "| {} | {:.4} | {:.4} | {:.3} | {:.4} | [{:.4}, {:.4}] |",
            term, coef[j], stderr[j], tvalues[j], pvalues[j], lower, upper
        ));
    }

    lines.push(String::new());
    if let Some(bp) = &diagnostics.breusch_pagan {
        lines.push(format!(
            "Breusch–Pagan: LM = {:.2} (p = {:.3e}), F = {:.2} (p = {:.3e}).",
            bp.lm_stat, bp.lm_pvalue, bp.f_stat, bp.f_pvalue
        ));
    }
    let vif_text = diagnostics
        .vif
        .iter()
        .map(|(feature, value)| format!("{}: {:.2}", feature, value))
        .collect::<Vec<_>>()
        .join(", ");
    lines.push(format!("Variance Inflation Factors: {}.", vif_text));
    lines.push(String::new());
    lines.push(
        "Notes: observational data; possible omitted-variable bias; limited window captures recent dynamics."
            .to_string(),
    );

    lines.join("\n") + "\n"
}
