//! ekitime CLI: extract a station timetable from ekikara into CSV and JSON.
//!
//! Fetches the station page, resolves train types and destinations from the
//! page's legend scripts, optionally follows every train's detail page, and
//! writes `<stem>.csv` / `<stem>.json`.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
