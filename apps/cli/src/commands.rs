//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, CommandFactory, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use ekitime_core::{ProgressReporter, ScrapeConfig, ScrapeResult, scrape_station};
use ekitime_export::{output_stem, write_outputs};
use ekitime_fetch::HttpFetcher;
use ekitime_parser::TimetableCell;
use ekitime_shared::{
    AppConfig, CsvQuoting, DetailErrorPolicy, PartialStopPolicy, init_config, load_config,
    load_config_from,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ekitime: station timetables from ekikara as CSV and JSON.
#[derive(Parser)]
#[command(
    name = "ekitime",
    version,
    about = "Extract an ekikara station timetable (with per-train details) into CSV and JSON.",
    long_about = None,
    args_conflicts_with_subcommands = true,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Print hours and trains and log at debug level; -vv logs at trace.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.ekitime/ekitime.toml.
    #[arg(long = "config", global = true, env = "EKITIME_CONFIG")]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub scrape: ScrapeArgs,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

/// Extraction arguments; each flag overrides the matching config value.
#[derive(Args, Debug)]
pub(crate) struct ScrapeArgs {
    /// Station timetable page URL.
    pub url: Option<String>,

    /// Skip the per-train detail pages.
    #[arg(long)]
    pub no_details: bool,

    /// Directory to write the CSV/JSON files to.
    #[arg(long)]
    pub out_dir: Option<String>,

    /// Detail pages fetched at once.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub concurrency: Option<u32>,

    /// On a failed detail page: abort or skip.
    #[arg(long)]
    pub on_detail_error: Option<DetailErrorPolicy>,

    /// Keep stops where only one of arrival/departure is listed.
    #[arg(long)]
    pub keep_partial_stops: bool,

    /// CSV quoting: minimal or rfc4180.
    #[arg(long)]
    pub csv_quoting: Option<CsvQuoting>,

    /// Do not write the CSV file.
    #[arg(long)]
    pub no_csv: bool,

    /// Do not write the JSON file.
    #[arg(long)]
    pub no_json: bool,
}

impl ScrapeArgs {
    /// Apply command-line overrides on top of the loaded config.
    fn apply(&self, config: &mut AppConfig) {
        if self.no_details {
            config.extract.details = false;
        }
        if let Some(n) = self.concurrency {
            config.extract.concurrency = n;
        }
        if let Some(policy) = self.on_detail_error {
            config.extract.on_detail_error = policy;
        }
        if self.keep_partial_stops {
            config.extract.partial_stops = PartialStopPolicy::Keep;
        }
        if let Some(dir) = &self.out_dir {
            config.output.dir = dir.clone();
        }
        if let Some(quoting) = self.csv_quoting {
            config.output.csv_quoting = quoting;
        }
        if self.no_csv {
            config.output.csv = false;
        }
        if self.no_json {
            config.output.json = false;
        }
    }
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout only
/// carries the verbose listing and the summary.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter(cli.verbose)));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

/// Default filter directive for a `-v` count.
fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "ekitime=info",
        1 => "ekitime=debug",
        _ => "ekitime=trace",
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Some(Command::Config { action }) => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(cli.config_path.as_deref()),
        },
        None => cmd_scrape(&cli).await,
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

async fn cmd_scrape(cli: &Cli) -> Result<()> {
    let Some(raw_url) = cli.scrape.url.as_deref() else {
        let mut cmd = Cli::command();
        eprintln!("{}", cmd.render_usage());
        eprintln!("\nFor more information, try '--help'.");
        std::process::exit(2);
    };

    let url = Url::parse(raw_url).map_err(|e| eyre!("invalid URL '{raw_url}': {e}"))?;

    let mut config = resolve_config(cli.config_path.as_deref())?;
    cli.scrape.apply(&mut config);
    if !config.output.csv && !config.output.json {
        warn!("both CSV and JSON output are disabled, nothing will be written");
    }

    let scrape = ScrapeConfig::from_app_config(url.clone(), &config);
    info!(
        %url,
        details = scrape.fetch_details,
        concurrency = scrape.concurrency,
        "extracting station timetable"
    );

    let fetcher = Arc::new(HttpFetcher::new(&config.fetch)?);
    let reporter = CliProgress::new(cli.verbose > 0);
    let result = scrape_station(fetcher, &scrape, &reporter).await?;

    let stem = output_stem(&url);
    let paths = write_outputs(&result.entries, result.with_details, &stem, &config.output)?;

    // Print summary
    println!();
    println!("  Timetable extracted!");
    println!("  Trains:  {}", result.entries.len());
    if result.with_details {
        println!(
            "  Details: {} fetched, {} skipped",
            result.details_fetched,
            result.detail_failures.len()
        );
    }
    if let Some(path) = &paths.csv {
        println!("  CSV:     {}", path.display());
    }
    if let Some(path) = &paths.json {
        println!("  JSON:    {}", path.display());
    }
    println!("  Time:    {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Spinner while fetching; with `--verbose` the spinner is hidden and the
/// parsed hours and trains are listed on stdout instead.
struct CliProgress {
    spinner: ProgressBar,
    verbose: bool,
}

impl CliProgress {
    fn new(verbose: bool) -> Self {
        if verbose {
            return Self {
                spinner: ProgressBar::hidden(),
                verbose,
            };
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid spinner template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner, verbose }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn hour_block(&self, hour: u32) {
        if self.verbose {
            println!("[{hour:02}]");
        }
    }

    fn train_found(&self, cell: &TimetableCell) {
        if self.verbose {
            println!(
                "- {:02}:{:02} {} {}",
                cell.hour, cell.minute, cell.train_type, cell.destination
            );
        }
    }

    fn detail_fetched(&self, url: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Fetching details [{current}/{total}] {url}"));
    }

    fn done(&self, _result: &ScrapeResult) {
        self.spinner.finish_and_clear();
    }
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn url_and_flags() {
        let cli = parse(&[
            "ekitime",
            "http://ekikara.jp/newdata/ekijikoku/1301131/up1_14205011.htm",
            "--no-details",
            "--concurrency",
            "4",
            "--on-detail-error",
            "skip",
            "--csv-quoting",
            "rfc4180",
        ]);

        assert!(cli.command.is_none());
        assert_eq!(
            cli.scrape.url.as_deref(),
            Some("http://ekikara.jp/newdata/ekijikoku/1301131/up1_14205011.htm")
        );

        let mut config = AppConfig::default();
        cli.scrape.apply(&mut config);
        assert!(!config.extract.details);
        assert_eq!(config.extract.concurrency, 4);
        assert_eq!(config.extract.on_detail_error, DetailErrorPolicy::Skip);
        assert_eq!(config.output.csv_quoting, CsvQuoting::Rfc4180);
        assert!(config.output.csv && config.output.json);
    }

    #[test]
    fn no_overrides_keep_config() {
        let cli = parse(&["ekitime", "http://ekikara.test/a.htm"]);
        let mut config = AppConfig::default();
        cli.scrape.apply(&mut config);
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn missing_url_parses_as_none() {
        let cli = parse(&["ekitime", "--verbose"]);
        assert!(cli.scrape.url.is_none());
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn verbose_raises_log_level() {
        assert_eq!(log_filter(0), "ekitime=info");
        assert_eq!(log_filter(1), "ekitime=debug");
        assert_eq!(log_filter(3), "ekitime=trace");
    }

    #[test]
    fn config_subcommand() {
        let cli = parse(&["ekitime", "config", "show"]);
        assert!(matches!(
            cli.command,
            Some(Command::Config {
                action: ConfigAction::Show
            })
        ));
    }

    #[test]
    fn rejects_zero_concurrency_and_unknown_policy() {
        assert!(Cli::try_parse_from(["ekitime", "http://x.test/", "--concurrency", "0"]).is_err());
        assert!(
            Cli::try_parse_from(["ekitime", "http://x.test/", "--on-detail-error", "retry"]).is_err()
        );
    }
}
