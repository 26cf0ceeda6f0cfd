//! End-to-end station pipeline: URL → station page → cells → details → entries.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ekitime_fetch::{PageSource, ensure_http};
use ekitime_parser::{HourBlock, TimetableCell, normalize_train_id, parse_station_page};
use ekitime_shared::{
    AppConfig, DetailErrorPolicy, DetailField, PartialStopPolicy, Result, TrainDetail, TrainEntry,
};
use tracing::{info, instrument};
use url::Url;

use crate::enrich::{self, DetailOutcome, EnrichOptions};

/// Configuration for [`scrape_station`].
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Station timetable page.
    pub url: Url,
    /// Fetch every train's detail page.
    pub fetch_details: bool,
    /// Detail pages in flight at once.
    pub concurrency: usize,
    pub on_detail_error: DetailErrorPolicy,
    pub partial_stops: PartialStopPolicy,
    /// Delay before each detail request.
    pub rate_limit_ms: u64,
}

impl ScrapeConfig {
    /// Build from the loaded app config; CLI overrides are applied by the caller.
    pub fn from_app_config(url: Url, config: &AppConfig) -> Self {
        Self {
            url,
            fetch_details: config.extract.details,
            concurrency: config.extract.concurrency.max(1) as usize,
            on_detail_error: config.extract.on_detail_error,
            partial_stops: config.extract.partial_stops,
            rate_limit_ms: config.fetch.rate_limit_ms,
        }
    }

    fn enrich_options(&self) -> EnrichOptions {
        EnrichOptions {
            concurrency: self.concurrency,
            on_error: self.on_detail_error,
            partial_stops: self.partial_stops,
            rate_limit_ms: self.rate_limit_ms,
        }
    }
}

/// Result of [`scrape_station`].
#[derive(Debug)]
pub struct ScrapeResult {
    /// Entries in document order (hour block, then cell).
    pub entries: Vec<TrainEntry>,
    /// Whether detail pages were requested.
    pub with_details: bool,
    /// Detail pages fetched and parsed.
    pub details_fetched: usize,
    /// Detail pages skipped under the skip policy (URL, error message).
    pub detail_failures: Vec<(String, String)>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called for each hour block, before its trains.
    fn hour_block(&self, hour: u32);
    /// Called for each departure found on the station page.
    fn train_found(&self, cell: &TimetableCell);
    /// Called after each detail page is handled.
    fn detail_fetched(&self, url: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &ScrapeResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn hour_block(&self, _hour: u32) {}
    fn train_found(&self, _cell: &TimetableCell) {}
    fn detail_fetched(&self, _url: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &ScrapeResult) {}
}

/// Run the station pipeline.
///
/// 1. Fetch the station page
/// 2. Parse legends and hour blocks
/// 3. Fetch detail pages (if enabled)
/// 4. Assemble entries in document order
///
/// Any error aborts the run; nothing is returned for a partial page.
#[instrument(skip_all, fields(url = %config.url, details = config.fetch_details))]
pub async fn scrape_station<S>(
    source: Arc<S>,
    config: &ScrapeConfig,
    progress: &dyn ProgressReporter,
) -> Result<ScrapeResult>
where
    S: PageSource + 'static,
{
    let start = Instant::now();
    ensure_http(&config.url)?;

    // --- Phase 1: Station page ---
    progress.phase("Fetching station timetable");
    let html = source.fetch(&config.url).await?;

    // --- Phase 2: Parse ---
    progress.phase("Parsing timetable");
    let timetable = parse_station_page(&html, &config.url)?;
    info!(
        hours = timetable.hours.len(),
        trains = timetable.train_count(),
        train_types = timetable.train_types.len(),
        destinations = timetable.destinations.len(),
        "timetable parsed"
    );
    report_hours(&timetable.hours, progress);

    let cells: Vec<TimetableCell> = timetable.cells().cloned().collect();

    // --- Phase 3: Details ---
    let outcomes = if config.fetch_details {
        progress.phase("Fetching train details");
        Some(enrich::fetch_details(source, &cells, &config.enrich_options(), progress).await?)
    } else {
        None
    };

    // --- Phase 4: Assemble ---
    let mut details_fetched = 0;
    let mut detail_failures = Vec::new();
    let entries: Vec<TrainEntry> = match outcomes {
        None => cells.iter().map(|cell| entry(cell, None)).collect(),
        Some(outcomes) => cells
            .iter()
            .zip(outcomes)
            .map(|(cell, outcome)| match outcome {
                DetailOutcome::Fetched(detail) => {
                    details_fetched += 1;
                    entry(cell, Some(detail))
                }
                DetailOutcome::Skipped { url, error } => {
                    detail_failures.push((url, error));
                    entry(cell, None)
                }
            })
            .collect(),
    };

    let result = ScrapeResult {
        entries,
        with_details: config.fetch_details,
        details_fetched,
        detail_failures,
        elapsed: start.elapsed(),
    };

    info!(
        entries = result.entries.len(),
        details_fetched = result.details_fetched,
        details_skipped = result.detail_failures.len(),
        duration_ms = result.elapsed.as_millis(),
        "station scraped"
    );
    progress.done(&result);

    Ok(result)
}

fn report_hours(hours: &[HourBlock], progress: &dyn ProgressReporter) {
    for block in hours {
        progress.hour_block(block.hour);
        for cell in &block.trains {
            progress.train_found(cell);
        }
    }
}

/// Build the output record for a cell. The train id comes from the
/// detail page's 列車番号, so it stays empty without details.
fn entry(cell: &TimetableCell, details: Option<TrainDetail>) -> TrainEntry {
    let train_id = details
        .as_ref()
        .map(|d| normalize_train_id(d.get_or_empty(DetailField::TrainId)))
        .unwrap_or_default();

    TrainEntry {
        train_id,
        time: cell.time(),
        train_type: cell.train_type.clone(),
        destination: cell.destination.clone(),
        details,
    }
}
