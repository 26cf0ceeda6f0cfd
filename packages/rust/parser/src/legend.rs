//! Legend tables embedded in station-page scripts.
//!
//! Station pages define their train-type and destination legends as
//! JavaScript array assignments:
//!
//! ```text
//! trainlegends[0] = "普通";
//! destinationlegends[3] = "東京";
//! ```
//!
//! Train cells then refer to those labels by index.

use std::sync::LazyLock;

use ekitime_shared::{LegendKind, LegendTable};
use regex::Regex;
use tracing::debug;

static TRAIN_TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| assignment_regex(LegendKind::TrainType.array_name()));

static DESTINATION_RE: LazyLock<Regex> =
    LazyLock::new(|| assignment_regex(LegendKind::Destination.array_name()));

/// `<array>[<index>] = "<label>"`, case-insensitive, label may span lines.
fn assignment_regex(array: &str) -> Regex {
    let pattern = format!(
        r#"(?mi){}\[([0-9]+?)\]\s*=\s*"([\s\S]+?)""#,
        regex::escape(array)
    );
    Regex::new(&pattern).expect("legend regex")
}

/// The compiled assignment pattern for a legend.
pub fn legend_pattern(kind: LegendKind) -> &'static Regex {
    match kind {
        LegendKind::TrainType => &TRAIN_TYPE_RE,
        LegendKind::Destination => &DESTINATION_RE,
    }
}

/// Build the `kind` legend from concatenated script text.
pub fn parse_legend(script: &str, kind: LegendKind) -> LegendTable {
    parse_legend_with(script, kind, legend_pattern(kind))
}

/// Build a legend using a caller-supplied two-group pattern
/// (group 1 = index, group 2 = label).
///
/// Later assignments to the same index overwrite earlier ones. Labels are
/// kept exactly as written, escapes included.
pub fn parse_legend_with(script: &str, kind: LegendKind, pattern: &Regex) -> LegendTable {
    let mut table = LegendTable::new(kind);

    for caps in pattern.captures_iter(script) {
        let (Some(index), Some(label)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        match index.as_str().parse::<usize>() {
            Ok(i) => table.insert(i, label.as_str()),
            Err(e) => debug!(index = index.as_str(), error = %e, "unusable legend index"),
        }
    }

    debug!(%kind, entries = table.len(), "legend parsed");
    table
}
