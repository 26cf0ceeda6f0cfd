//! Arrival/departure extraction from a detail-page stop cell.
//!
//! Cells read like `9:05着 9:06発`. Each `H:MM` is followed by a marker
//! glyph; the digits of hour and minute are concatenated as written, so
//! `9:05` becomes `905` and `9:5` becomes `95`.

use std::sync::LazyLock;

use regex::Regex;

/// Marker following an arrival time.
pub const ARRIVAL_MARK: &str = "着";

/// Marker following a departure time.
pub const DEPARTURE_MARK: &str = "発";

/// `H:MM` plus its marker. The marker stops at whitespace or the next digit
/// so `9:05着10:12発` yields two matches.
static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)([0-9]{1,2}):([0-9]{1,2})([^\s0-9]+)").expect("time regex")
});

/// Times found in one stop cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StopTimes {
    pub arrival: Option<u32>,
    pub departure: Option<u32>,
}

impl StopTimes {
    pub fn is_complete(&self) -> bool {
        self.arrival.is_some() && self.departure.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.arrival.is_none() && self.departure.is_none()
    }
}

/// Scan `text` for marked times. The last match of each kind wins;
/// other markers are ignored.
pub fn extract_times(text: &str) -> StopTimes {
    let mut times = StopTimes::default();

    for caps in TIME_RE.captures_iter(text) {
        let value = concat_digits(&caps[1], &caps[2]);
        match &caps[3] {
            ARRIVAL_MARK => times.arrival = value,
            DEPARTURE_MARK => times.departure = value,
            _ => {}
        }
    }

    times
}

/// At most four ASCII digits, so this always parses.
fn concat_digits(hour: &str, minute: &str) -> Option<u32> {
    format!("{hour}{minute}").parse().ok()
}
