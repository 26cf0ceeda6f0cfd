//! Output rendering and file writing for extracted timetables.
//!
//! - [`csv`]: `time,type,dest[,id,name,cars,remarks,dates]` rows
//! - [`json`]: the full entry list including details and schedules
//! - [`write_outputs`]: both files, named after the station page

pub mod csv;
pub mod json;

use std::path::{Path, PathBuf};

use ekitime_shared::{EkitimeError, OutputConfig, Result, TrainEntry};
use tracing::info;
use url::Url;

pub use crate::csv::to_csv;
pub use crate::json::{from_json, to_json};

/// Paths of the files [`write_outputs`] created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputPaths {
    pub csv: Option<PathBuf>,
    pub json: Option<PathBuf>,
}

/// File stem for a station URL: its last path segment without extension.
///
/// `.../1301131/up1_14205011.htm` → `up1_14205011`; an empty path gives `index`.
pub fn output_stem(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");
    let stem = Path::new(segment)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    if stem.is_empty() {
        "index".to_string()
    } else {
        stem
    }
}

/// Render and write `<stem>.csv` and/or `<stem>.json` under `config.dir`.
///
/// Both documents are rendered before anything touches the disk.
pub fn write_outputs(
    entries: &[TrainEntry],
    with_details: bool,
    stem: &str,
    config: &OutputConfig,
) -> Result<OutputPaths> {
    let csv_text = if config.csv {
        Some(to_csv(entries, with_details, config.csv_quoting)?)
    } else {
        None
    };
    let json_text = if config.json {
        Some(to_json(entries, config.json_pretty)?)
    } else {
        None
    };

    let dir = PathBuf::from(&config.dir);
    std::fs::create_dir_all(&dir).map_err(|e| EkitimeError::io(&dir, e))?;

    let mut paths = OutputPaths::default();
    if let Some(text) = csv_text {
        paths.csv = Some(write_file(&dir.join(format!("{stem}.csv")), &text)?);
    }
    if let Some(text) = json_text {
        paths.json = Some(write_file(&dir.join(format!("{stem}.json")), &text)?);
    }

    info!(
        csv = ?paths.csv,
        json = ?paths.json,
        entries = entries.len(),
        "outputs written"
    );
    Ok(paths)
}

fn write_file(path: &Path, text: &str) -> Result<PathBuf> {
    std::fs::write(path, text).map_err(|e| EkitimeError::io(path, e))?;
    Ok(path.to_path_buf())
}
