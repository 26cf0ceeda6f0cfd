//! Detail-page enrichment stage.
//!
//! Given the parsed timetable cells, fetch and parse each train's detail
//! page. With `concurrency == 1` pages are fetched strictly one after another;
//! above that, up to `concurrency` fetches run at once and results are
//! collected back in cell order.

use std::sync::Arc;
use std::time::Duration;

use ekitime_fetch::PageSource;
use ekitime_parser::{TimetableCell, parse_detail_page};
use ekitime_shared::{DetailErrorPolicy, EkitimeError, PartialStopPolicy, Result, TrainDetail};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::pipeline::ProgressReporter;

/// Knobs for the enrichment stage.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Detail pages in flight at once (values below 1 are treated as 1).
    pub concurrency: usize,
    pub on_error: DetailErrorPolicy,
    pub partial_stops: PartialStopPolicy,
    /// Delay before each detail request.
    pub rate_limit_ms: u64,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            on_error: DetailErrorPolicy::Abort,
            partial_stops: PartialStopPolicy::Drop,
            rate_limit_ms: 0,
        }
    }
}

/// Result of enriching one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailOutcome {
    Fetched(TrainDetail),
    /// Only produced under [`DetailErrorPolicy::Skip`].
    Skipped { url: String, error: String },
}

/// Fetch every cell's detail page, returning one outcome per cell in order.
///
/// Under [`DetailErrorPolicy::Abort`] the first failure (in cell order) is
/// returned and outstanding fetches are cancelled.
pub async fn fetch_details<S>(
    source: Arc<S>,
    cells: &[TimetableCell],
    opts: &EnrichOptions,
    progress: &dyn ProgressReporter,
) -> Result<Vec<DetailOutcome>>
where
    S: PageSource + 'static,
{
    if opts.concurrency <= 1 {
        fetch_sequential(source.as_ref(), cells, opts, progress).await
    } else {
        fetch_concurrent(source, cells, opts, progress).await
    }
}

async fn fetch_sequential<S: PageSource>(
    source: &S,
    cells: &[TimetableCell],
    opts: &EnrichOptions,
    progress: &dyn ProgressReporter,
) -> Result<Vec<DetailOutcome>> {
    let total = cells.len();
    let mut outcomes = Vec::with_capacity(total);

    for (i, cell) in cells.iter().enumerate() {
        throttle(opts.rate_limit_ms).await;
        let result = fetch_one(source, cell.detail_url.as_ref(), &cell.cell_id, opts.partial_stops).await;
        outcomes.push(settle(cell, result, opts.on_error)?);
        progress.detail_fetched(&detail_label(cell), i + 1, total);
    }

    Ok(outcomes)
}

async fn fetch_concurrent<S>(
    source: Arc<S>,
    cells: &[TimetableCell],
    opts: &EnrichOptions,
    progress: &dyn ProgressReporter,
) -> Result<Vec<DetailOutcome>>
where
    S: PageSource + 'static,
{
    let total = cells.len();
    let semaphore = Arc::new(Semaphore::new(opts.concurrency));
    debug!(concurrency = opts.concurrency, total, "fetching details concurrently");

    let mut handles: Vec<JoinHandle<Result<TrainDetail>>> = Vec::with_capacity(total);
    for cell in cells {
        let source = Arc::clone(&source);
        let sem = Arc::clone(&semaphore);
        let url = cell.detail_url.clone();
        let cell_id = cell.cell_id.clone();
        let rate_limit = opts.rate_limit_ms;
        let policy = opts.partial_stops;

        handles.push(tokio::spawn(async move {
            let _permit = sem.acquire().await.expect("semaphore closed");
            throttle(rate_limit).await;
            fetch_one(source.as_ref(), url.as_ref(), &cell_id, policy).await
        }));
    }

    // Await in spawn order so outcomes line up with cells.
    let mut outcomes = Vec::with_capacity(total);
    let mut pending = handles.into_iter();
    for (i, cell) in cells.iter().enumerate() {
        let Some(handle) = pending.next() else {
            break;
        };
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(EkitimeError::Task(format!("detail fetch for cell {}: {e}", cell.cell_id))),
        };
        match settle(cell, result, opts.on_error) {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                for rest in pending {
                    rest.abort();
                }
                return Err(e);
            }
        }
        progress.detail_fetched(&detail_label(cell), i + 1, total);
    }

    Ok(outcomes)
}

async fn fetch_one<S: PageSource>(
    source: &S,
    url: Option<&url::Url>,
    cell_id: &str,
    partial_stops: PartialStopPolicy,
) -> Result<TrainDetail> {
    let url = url.ok_or_else(|| {
        EkitimeError::structure(format!("train cell {cell_id} has no detail link"))
    })?;
    let html = source.fetch(url).await?;
    Ok(parse_detail_page(&html, partial_stops))
}

/// Apply the failure policy to one fetch result.
fn settle(
    cell: &TimetableCell,
    result: Result<TrainDetail>,
    on_error: DetailErrorPolicy,
) -> Result<DetailOutcome> {
    match (result, on_error) {
        (Ok(detail), _) => Ok(DetailOutcome::Fetched(detail)),
        (Err(e), DetailErrorPolicy::Abort) => Err(e),
        (Err(e), DetailErrorPolicy::Skip) => {
            let url = detail_label(cell);
            warn!(%url, time = cell.time(), error = %e, "detail fetch failed, skipping");
            Ok(DetailOutcome::Skipped {
                url,
                error: e.to_string(),
            })
        }
    }
}

fn detail_label(cell: &TimetableCell) -> String {
    match &cell.detail_url {
        Some(url) => url.to_string(),
        None => format!("cell:{}", cell.cell_id),
    }
}

async fn throttle(rate_limit_ms: u64) {
    if rate_limit_ms > 0 {
        tokio::time::sleep(Duration::from_millis(rate_limit_ms)).await;
    }
}
