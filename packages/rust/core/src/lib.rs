//! Station extraction pipeline: fetch → parse → enrich → assemble.
//!
//! [`pipeline::scrape_station`] is the entry point; [`enrich`] holds the
//! detail-page stage so its strategy (sequential or bounded fan-out) can
//! change without touching parsing.

pub mod enrich;
pub mod pipeline;

pub use enrich::{DetailOutcome, EnrichOptions};
pub use pipeline::{ProgressReporter, ScrapeConfig, ScrapeResult, SilentProgress, scrape_station};

#[cfg(test)]
pub(crate) mod testing;
