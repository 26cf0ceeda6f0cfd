//! Station timetable and train detail page parsing.
//!
//! Every function here is pure (text or HTML in, model out) so the page
//! format assumptions can be exercised without a network:
//! - [`time`]: `H:MM着` / `H:MM発` extraction from a stop cell
//! - [`legend`]: `trainlegends[i] = "..."` tables from inline scripts
//! - [`train_id`]: train-number token normalisation
//! - [`detail`]: one train's detail page → [`TrainDetail`](ekitime_shared::TrainDetail)
//! - [`timetable`]: a station page → hour blocks of resolved train cells

pub mod detail;
pub mod legend;
pub mod time;
pub mod timetable;
pub mod train_id;

pub use detail::parse_detail_page;
pub use legend::{legend_pattern, parse_legend, parse_legend_with};
pub use time::{ARRIVAL_MARK, DEPARTURE_MARK, StopTimes, extract_times};
pub use timetable::{
    HourBlock, StationTimetable, TimetableCell, collect_script_text, first_legend_pair,
    parse_station_page,
};
pub use train_id::normalize_train_id;

/// Class of the cell holding the whole station timetable.
pub(crate) const CONTAINER_CLASS: &str = "lowBg01";

/// Class of label cells: hour numbers on station pages, field labels and
/// station names on detail pages.
pub(crate) const LABEL_CLASS: &str = "lowBg06";

/// Concatenated text content of an element.
pub(crate) fn element_text(el: scraper::ElementRef<'_>) -> String {
    el.text().collect()
}

/// Whether the element carries `class` among its classes.
pub(crate) fn has_class(el: scraper::ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}
