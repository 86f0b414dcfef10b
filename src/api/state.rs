use std::sync::Arc;
use dashmap::DashMap;
use itertools::Itertools;
use tracing::{debug, info};
use crate::analysis::{filter_records, summarize, unique_boroughs, unique_years, window_diagnostics};
use crate::models::{Record, RecordFilter, RegressionDiagnostics, Summary};

/// Cleaned records plus the summaries derived from them. Records never change after
/// startup, so filtered summaries are cached by their canonical filter. Only known years and
/// boroughs reach the cache, which bounds it by the number of borough subsets per year.
pub struct AppState {
    pub records: Arc<Vec<Record>>,
    pub summary: Arc<Summary>,
    pub diagnostics: Option<Arc<RegressionDiagnostics>>,
    years: Vec<i32>,
    boroughs: Vec<String>,
    empty: Arc<Summary>,
    cache: DashMap<RecordFilter, Arc<Summary>>,
}

impl AppState {
    pub fn new(records: Vec<Record>) -> Self {
        let summary = summarize(&records);
        let diagnostics = window_diagnostics(&records).map(Arc::new);
        info!(
            "Prepared summary for {} records (latest year {:?})",
            records.len(),
            summary.latest_year
        );

        Self {
            years: unique_years(&records),
            boroughs: unique_boroughs(&records),
            records: Arc::new(records),
            summary: Arc::new(summary),
            diagnostics,
            empty: Arc::new(Summary::empty()),
            cache: DashMap::new(),
        }
    }

    pub fn filtered(&self, filter: &RecordFilter) -> Vec<Record> {
        filter_records(&self.records, filter)
    }

    /// Rewrites `filter` over known years and boroughs: boroughs are deduplicated, sorted and
    /// stripped of unknown names, and a year of `0` means any year. `None` when the filter
    /// can match no record.
    fn canonical(&self, filter: &RecordFilter) -> Option<RecordFilter> {
        let year = match filter.year {
            Some(0) | None => None,
            Some(year) if self.years.contains(&year) => Some(year),
            Some(_) => return None,
        };

        let boroughs: Vec<String> = filter
            .boroughs
            .iter()
            .filter(|name| self.boroughs.contains(*name))
            .unique()
            .sorted()
            .cloned()
            .collect();
        if !filter.boroughs.is_empty() && boroughs.is_empty() {
            return None;
        }

        Some(RecordFilter { year, boroughs })
    }

    /// Summary of the records matching `filter`. The unfiltered summary is precomputed and
    /// filters that match nothing share the empty summary.
    pub fn summary_for(&self, filter: &RecordFilter) -> Arc<Summary> {
        let Some(filter) = self.canonical(filter) else {
            return Arc::clone(&self.empty);
        };
        if filter.year.is_none() && filter.boroughs.is_empty() {
            return Arc::clone(&self.summary);
        }
        if let Some(cached) = self.cache.get(&filter) {
            return Arc::clone(cached.value());
        }

        debug!("Computing summary for {:?}", filter);
        let summary = Arc::new(summarize(&self.filtered(&filter)));
        self.cache.insert(filter, Arc::clone(&summary));
        summary
    }

    pub fn cached_summaries(&self) -> usize {
        self.cache.len()
    }
}
