use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use housing_insights::{
    clean_records, filter_records, init_logging, load_records_or_embedded, load_rows, serve,
    summarize, window_diagnostics, AppConfig, RecordFilter, SummaryWriter, Validator,
    DERIVED_SUMMARY_FILE,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "housing")]
#[command(about = "NYC borough housing analysis and API server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Compute the summary and write the published artifacts
    Derive {
        #[arg(short, long)]
        data: Option<PathBuf>,

        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        #[arg(short, long)]
        appendix_dir: Option<PathBuf>,
    },
    /// Check a dataset for schema, bounds and duplicate problems
    Validate {
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
    /// Print the summary as JSON
    Summary {
        #[arg(short, long)]
        data: Option<PathBuf>,

        #[arg(short, long)]
        year: Option<i32>,

        /// Comma-separated borough names
        #[arg(short, long)]
        boroughs: Option<String>,
    },
    /// Start the API server
    Serve {
        #[arg(short, long)]
        data: Option<PathBuf>,

        #[arg(short, long)]
        port: Option<u16>,

        #[arg(short = 'b', long)]
        host: Option<String>,
    },
}

async fn read_base_summary(path: &Path) -> Value {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            warn!("Ignoring unreadable {}: {}", path.display(), e);
            Value::Null
        }),
        Err(_) => Value::Null,
    }
}

async fn run_derive(data: &Path, output_dir: PathBuf, appendix_dir: PathBuf) -> Result<()> {
    let loaded = load_records_or_embedded(data).await;
    info!("Deriving summary from {} records ({:?})", loaded.records.len(), loaded.source);

    let summary = summarize(&loaded.records);
    let diagnostics = window_diagnostics(&loaded.records);
    let base = read_base_summary(&output_dir.join(DERIVED_SUMMARY_FILE)).await;

    let writer = SummaryWriter::new(output_dir, appendix_dir);
    writer.write_derived_summary(&base, &summary, diagnostics.as_ref()).await?;
    writer.write_viz_payload(&loaded.records).await?;

    match (&summary.regression, &diagnostics) {
        (Some(regression), Some(diagnostics)) => {
            writer.write_ols_report(regression, diagnostics).await?;
        }
        _ => warn!("Regression unavailable; skipping OLS appendix"),
    }

    info!("Produced {} headlines", summary.headlines.len());
    Ok(())
}

async fn run_validation(data: &Path) -> Result<()> {
    info!("Running data validation on {}", data.display());
    let rows = load_rows(data).await?;
    let records = clean_records(&rows);

    let report = Validator::default().validate(&rows, &records);
    if !report.is_ok() {
        error!("Validation failed for {}", data.display());
        return Err(anyhow::anyhow!(
            "Validation failed: {} missing columns, {} rent and {} income bound violations, {} duplicates",
            report.missing_columns.len(),
            report.rent_out_of_bounds.len(),
            report.income_out_of_bounds.len(),
            report.duplicates.len()
        ));
    }

    info!("Validation completed successfully for {} records", records.len());
    Ok(())
}

async fn run_summary(data: &Path, filter: RecordFilter) -> Result<()> {
    let loaded = load_records_or_embedded(data).await;
    let summary = summarize(&filter_records(&loaded.records, &filter));
    let text = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
    println!("{}", text);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_logging(config.level());

    let cli = Cli::parse();

    match cli.command {
        Commands::Derive { data, output_dir, appendix_dir } => {
            let data = data.unwrap_or(config.data_path);
            run_derive(
                &data,
                output_dir.unwrap_or(config.output_dir),
                appendix_dir.unwrap_or(config.appendix_dir),
            )
            .await?;
        }
        Commands::Validate { data } => {
            run_validation(&data.unwrap_or(config.data_path)).await?;
        }
        Commands::Summary { data, year, boroughs } => {
            let filter = RecordFilter {
                year,
                boroughs: housing_insights::parse_boroughs(boroughs.as_deref()),
            };
            run_summary(&data.unwrap_or(config.data_path), filter).await?;
        }
        Commands::Serve { data, host, port } => {
            let loaded = load_records_or_embedded(&data.unwrap_or(config.data_path)).await;
            info!("Starting API server with {} records ({:?})", loaded.records.len(), loaded.source);
            serve(
                host.unwrap_or(config.host),
                port.unwrap_or(config.port),
                loaded.records,
            )
            .await?;
        }
    }

    Ok(())
}
