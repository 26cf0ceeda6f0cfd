//! Shared types, error model, and configuration for ekitime.
//!
//! This crate is the foundation depended on by all other ekitime crates.
//! It provides:
//! - [`EkitimeError`]: the unified error type
//! - Domain types ([`LegendTable`], [`StopTime`], [`TrainDetail`], [`TrainEntry`])
//! - Configuration ([`AppConfig`], [`ExtractConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CsvQuoting, DetailErrorPolicy, ExtractConfig, FetchConfig, OutputConfig,
    PartialStopPolicy, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{EkitimeError, Result};
pub use types::{
    DETAIL_LABELS, DetailField, LegendKind, LegendTable, StopTime, TrainDetail, TrainEntry,
};
