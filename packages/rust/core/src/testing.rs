//! In-memory page source and helpers shared by the pipeline tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ekitime_fetch::PageSource;
use ekitime_parser::TimetableCell;
use ekitime_shared::{EkitimeError, Result};
use url::Url;

/// Serves canned pages by exact URL; unknown URLs are network errors.
#[derive(Default)]
pub(crate) struct StaticPages {
    pages: HashMap<String, String>,
    delays_ms: HashMap<String, u64>,
    requests: AtomicUsize,
}

impl StaticPages {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, url: &str, body: &str) {
        self.pages.insert(url.to_string(), body.to_string());
    }

    pub(crate) fn with_delay(mut self, url: &str, ms: u64) -> Self {
        self.delays_ms.insert(url.to_string(), ms);
        self
    }

    /// Number of fetches made so far.
    pub(crate) fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl PageSource for StaticPages {
    async fn fetch(&self, url: &Url) -> Result<String> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(ms) = self.delays_ms.get(url.as_str()) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| EkitimeError::Network(format!("{url}: not found")))
    }
}

/// A cell linking to `http://ekikara.test/detail/<id>.htm`.
pub(crate) fn cell(id: &str, time: u32) -> TimetableCell {
    TimetableCell {
        cell_id: id.to_string(),
        hour: time / 100,
        minute: time % 100,
        train_type: "普通".into(),
        destination: "東京".into(),
        detail_url: Some(
            Url::parse(&format!("http://ekikara.test/detail/{id}.htm")).expect("test url"),
        ),
    }
}

/// Read an HTML fixture from the workspace `fixtures/html` directory.
pub(crate) fn load_fixture(name: &str) -> String {
    let path = format!("../../../fixtures/html/{name}");
    std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
}
