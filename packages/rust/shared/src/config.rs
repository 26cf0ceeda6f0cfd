//! Application configuration for ekitime.
//!
//! User config lives at `~/.ekitime/ekitime.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EkitimeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "ekitime.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".ekitime";

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// What to do when a single train's detail page cannot be fetched or parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailErrorPolicy {
    /// Abort the whole station extraction.
    #[default]
    Abort,
    /// Log, record the failure, and keep the train with empty details.
    Skip,
}

/// Which detail-page stop rows make it into a train's schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartialStopPolicy {
    /// Keep a stop only when both arrival and departure were found.
    #[default]
    Drop,
    /// Keep a stop when at least one of the two times was found.
    Keep,
}

/// CSV quoting flavour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsvQuoting {
    /// Detail columns wrapped in `"` with no escaping; other columns bare.
    #[default]
    Minimal,
    /// RFC 4180: quote when needed, double embedded quotes.
    Rfc4180,
}

macro_rules! impl_from_str {
    ($ty:ty, $($name:literal => $variant:expr),+ $(,)?) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($name => Ok($variant),)+
                    other => Err(format!(
                        "unknown value '{other}', expected one of: {}",
                        [$($name),+].join(", ")
                    )),
                }
            }
        }
    };
}

impl_from_str!(DetailErrorPolicy, "abort" => DetailErrorPolicy::Abort, "skip" => DetailErrorPolicy::Skip);
impl_from_str!(PartialStopPolicy, "drop" => PartialStopPolicy::Drop, "keep" => PartialStopPolicy::Keep);
impl_from_str!(CsvQuoting, "minimal" => CsvQuoting::Minimal, "rfc4180" => CsvQuoting::Rfc4180);

// ---------------------------------------------------------------------------
// Config structs (matching ekitime.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP transport settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Extraction behaviour.
    #[serde(default)]
    pub extract: ExtractConfig,

    /// Output files.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[fetch]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Redirects followed before giving up.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Delay in ms before each detail-page request.
    #[serde(default)]
    pub rate_limit_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
            rate_limit_ms: 0,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_max_redirects() -> usize {
    5
}
fn default_user_agent() -> String {
    concat!("ekitime/", env!("CARGO_PKG_VERSION")).into()
}

/// `[extract]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Fetch each train's detail page.
    #[serde(default = "default_true")]
    pub details: bool,

    /// Detail pages fetched at once; 1 is strictly sequential.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Failure handling for individual detail pages.
    #[serde(default)]
    pub on_detail_error: DetailErrorPolicy,

    /// Stop rows with only one of arrival/departure.
    #[serde(default)]
    pub partial_stops: PartialStopPolicy,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            details: true,
            concurrency: default_concurrency(),
            on_detail_error: DetailErrorPolicy::default(),
            partial_stops: PartialStopPolicy::default(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_concurrency() -> u32 {
    1
}

/// `[output]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the CSV/JSON files are written to.
    #[serde(default = "default_output_dir")]
    pub dir: String,

    #[serde(default)]
    pub csv_quoting: CsvQuoting,

    /// Indent the JSON output.
    #[serde(default)]
    pub json_pretty: bool,

    /// Write `<stem>.csv`.
    #[serde(default = "default_true")]
    pub csv: bool,

    /// Write `<stem>.json`.
    #[serde(default = "default_true")]
    pub json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            csv_quoting: CsvQuoting::default(),
            json_pretty: false,
            csv: true,
            json: true,
        }
    }
}

fn default_output_dir() -> String {
    ".".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.ekitime/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| EkitimeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.ekitime/ekitime.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| EkitimeError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        EkitimeError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    if config.extract.concurrency == 0 {
        return Err(EkitimeError::config(format!(
            "{}: extract.concurrency must be at least 1",
            path.display()
        )));
    }

    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| EkitimeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| EkitimeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| EkitimeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
