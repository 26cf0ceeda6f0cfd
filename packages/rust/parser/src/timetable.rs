//! Station timetable page parsing.
//!
//! The page holds one container cell (`td.lowBg01`) wrapping a table with a
//! row per hour. Each hour row starts with a `td.lowBg06` holding the hour and
//! nests a table whose first row has one cell per departure:
//!
//! ```html
//! <td id="12" onmouseover="showLegend(event, 0, 3)"><a href="../detail/1234.htm">15</a></td>
//! ```
//!
//! The link text is the minute; the handler arguments index the train-type
//! and destination legends defined in the page scripts.

use std::sync::LazyLock;

use ekitime_shared::{EkitimeError, LegendKind, LegendTable, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use crate::legend::parse_legend;
use crate::{CONTAINER_CLASS, LABEL_CLASS, element_text};

/// Attribute carrying the `(typeIndex, destIndex)` handler call.
const HANDLER_ATTR: &str = "onmouseover";

static SCRIPT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("valid selector"));
static CONTAINER_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(&format!("td.{CONTAINER_CLASS}")).expect("valid selector")
});
static TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("valid selector"));
static ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
static HOUR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(&format!("td.{LABEL_CLASS}")).expect("valid selector"));
static TBODY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tbody").expect("valid selector"));
static TRAIN_CELL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td[id]").expect("valid selector"));
static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("valid selector"));

/// Two integers separated by a comma, e.g. the `0, 3` in `showLegend(event, 0, 3)`.
static PAIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)([0-9]+)\s*,\s*([0-9]+)").expect("pair regex"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One departure cell with its legend indices resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimetableCell {
    /// The cell's `id` attribute.
    pub cell_id: String,
    pub hour: u32,
    pub minute: u32,
    pub train_type: String,
    pub destination: String,
    /// Absolute URL of the train's detail page, when the cell links one.
    pub detail_url: Option<Url>,
}

impl TimetableCell {
    /// `hour * 100 + minute`.
    pub fn time(&self) -> u32 {
        self.hour * 100 + self.minute
    }
}

/// All departures listed under one hour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourBlock {
    pub hour: u32,
    pub trains: Vec<TimetableCell>,
}

/// A parsed station page.
#[derive(Debug, Clone)]
pub struct StationTimetable {
    pub train_types: LegendTable,
    pub destinations: LegendTable,
    /// Hour blocks in document order.
    pub hours: Vec<HourBlock>,
}

impl StationTimetable {
    /// Every departure, hour by hour, in document order.
    pub fn cells(&self) -> impl Iterator<Item = &TimetableCell> {
        self.hours.iter().flat_map(|h| h.trains.iter())
    }

    pub fn train_count(&self) -> usize {
        self.hours.iter().map(|h| h.trains.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a station timetable page.
///
/// `base_url` is the page's own URL, used to resolve detail links.
/// Fails on a missing container, unparsable hours or minutes, times outside
/// 00:00–23:59, cells without a handler pair, and legend indices the
/// scripts never defined.
#[instrument(skip_all, fields(url = %base_url))]
pub fn parse_station_page(html: &str, base_url: &Url) -> Result<StationTimetable> {
    let doc = Html::parse_document(html);

    let script = collect_script_text(&doc);
    let train_types = parse_legend(&script, LegendKind::TrainType);
    let destinations = parse_legend(&script, LegendKind::Destination);

    let container = doc.select(&CONTAINER_SEL).next().ok_or_else(|| {
        EkitimeError::structure(format!("no td.{CONTAINER_CLASS} timetable container"))
    })?;
    let table = container.select(&TABLE_SEL).next().ok_or_else(|| {
        EkitimeError::structure(format!("td.{CONTAINER_CLASS} holds no table"))
    })?;

    let mut hours = Vec::new();
    for row in table.select(&ROW_SEL) {
        let Some(hour_cell) = row.select(&HOUR_SEL).next() else {
            continue;
        };
        let hour = parse_number(&element_text(hour_cell), "hour", 23)?;
        let trains = parse_hour_row(row, hour, &train_types, &destinations, base_url)?;
        debug!(hour, trains = trains.len(), "hour block parsed");
        hours.push(HourBlock { hour, trains });
    }

    Ok(StationTimetable {
        train_types,
        destinations,
        hours,
    })
}

/// Text of every `<script>` element, concatenated in document order.
pub fn collect_script_text(doc: &Html) -> String {
    doc.select(&SCRIPT_SEL).map(element_text).collect()
}

/// The first `(typeIndex, destIndex)` pair in a handler attribute.
///
/// Later pairs are ignored.
pub fn first_legend_pair(handler: &str) -> Option<(usize, usize)> {
    let caps = PAIR_RE.captures(handler)?;
    let type_index = caps[1].parse().ok()?;
    let dest_index = caps[2].parse().ok()?;
    Some((type_index, dest_index))
}

fn parse_hour_row(
    row: ElementRef<'_>,
    hour: u32,
    train_types: &LegendTable,
    destinations: &LegendTable,
    base_url: &Url,
) -> Result<Vec<TimetableCell>> {
    let inner_row = row
        .select(&TBODY_SEL)
        .next()
        .and_then(|body| body.select(&ROW_SEL).next())
        .ok_or_else(|| EkitimeError::structure(format!("hour {hour} has no train row")))?;

    inner_row
        .select(&TRAIN_CELL_SEL)
        .filter(|cell| {
            cell.value()
                .attr("id")
                .is_some_and(|id| id.chars().any(|c| c.is_ascii_digit()))
        })
        .map(|cell| parse_train_cell(cell, hour, train_types, destinations, base_url))
        .collect()
}

fn parse_train_cell(
    cell: ElementRef<'_>,
    hour: u32,
    train_types: &LegendTable,
    destinations: &LegendTable,
    base_url: &Url,
) -> Result<TimetableCell> {
    let cell_id = cell.value().attr("id").unwrap_or_default().to_string();

    let link = cell.select(&LINK_SEL).next().ok_or_else(|| {
        EkitimeError::structure(format!("train cell {cell_id} at hour {hour} has no link"))
    })?;
    let minute = parse_number(&element_text(link), "minute", 59)?;

    let handler = cell.value().attr(HANDLER_ATTR).unwrap_or_default();
    let (type_index, dest_index) = first_legend_pair(handler).ok_or_else(|| {
        EkitimeError::structure(format!(
            "train cell {cell_id} has no legend pair in {HANDLER_ATTR}=\"{handler}\""
        ))
    })?;
    let train_type = train_types.lookup(type_index)?.to_string();
    let destination = destinations.lookup(dest_index)?.to_string();

    let detail_url = match link.value().attr("href") {
        Some(href) => Some(base_url.join(href).map_err(|e| {
            EkitimeError::structure(format!("train cell {cell_id}: bad link '{href}': {e}"))
        })?),
        None => None,
    };

    Ok(TimetableCell {
        cell_id,
        hour,
        minute,
        train_type,
        destination,
        detail_url,
    })
}

fn parse_number(text: &str, what: &str, max: u32) -> Result<u32> {
    let trimmed = text.trim();
    let value: u32 = trimmed
        .parse()
        .map_err(|e| EkitimeError::parse(format!("{what} '{trimmed}': {e}")))?;
    if value > max {
        return Err(EkitimeError::parse(format!(
            "{what} {value} out of range 0..={max}"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    fn station_url() -> Url {
        Url::parse("http://ekikara.test/newdata/ekijikoku/1301131/up1_14205011.htm").unwrap()
    }

    /// Minimal page: one script, one hour, the given cells.
    fn page(script: &str, hour: &str, cells: &str) -> String {
        format!(
            r#"<html><head><script>{script}</script></head><body>
            <table><tr><td class="lowBg01"><table>
              <tr><td class="lowBg06">{hour}</td><td><table><tbody><tr>{cells}</tr></tbody></table></td></tr>
            </table></td></tr></table>
            </body></html>"#
        )
    }

    const LEGENDS: &str =
        r#"trainlegends[0] = "普通"; destinationlegends[0] = "東京";"#;

    #[test]
    fn single_cell_without_details() {
        let html = page(
            LEGENDS,
            "9",
            r#"<td id="1" onmouseover="showLegend(event,0,0)"><a href="d/1.htm">15</a></td>"#,
        );
        let timetable = parse_station_page(&html, &station_url()).unwrap();

        assert_eq!(timetable.hours.len(), 1);
        let cells: Vec<_> = timetable.cells().collect();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].time(), 915);
        assert_eq!(cells[0].train_type, "普通");
        assert_eq!(cells[0].destination, "東京");
        assert_eq!(
            cells[0].detail_url.as_ref().map(Url::as_str),
            Some("http://ekikara.test/newdata/ekijikoku/1301131/d/1.htm")
        );
    }

    #[test]
    fn fixture_page_in_document_order() {
        let timetable =
            parse_station_page(&load_fixture("station.html"), &station_url()).unwrap();

        let hours: Vec<u32> = timetable.hours.iter().map(|h| h.hour).collect();
        assert_eq!(hours, vec![5, 6, 9]);
        assert!(timetable.hours[2].trains.is_empty());

        let summary: Vec<(u32, &str, &str)> = timetable
            .cells()
            .map(|c| (c.time(), c.train_type.as_str(), c.destination.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (512, "普通", "熱海"),
                (541, "快速", "小田原"),
                (603, "普通", "東京"),
                (630, "特急", "伊豆急下田"),
            ]
        );
        assert_eq!(timetable.train_count(), 4);
        assert_eq!(
            timetable.cells().next().and_then(|c| c.detail_url.as_ref()).map(Url::as_str),
            Some("http://ekikara.test/newdata/detail/1301131/1234m.htm")
        );
    }

    #[test]
    fn every_time_is_in_range() {
        let timetable =
            parse_station_page(&load_fixture("station.html"), &station_url()).unwrap();
        for cell in timetable.cells() {
            assert!(cell.time() <= 2359);
            assert!(cell.time() % 100 <= 59);
        }
    }

    #[test]
    fn undefined_legend_index_is_fatal() {
        let html = page(
            LEGENDS,
            "9",
            r#"<td id="1" onmouseover="showLegend(event,0,4)"><a href="d/1.htm">15</a></td>"#,
        );
        let err = parse_station_page(&html, &station_url()).unwrap_err();
        assert!(matches!(
            err,
            EkitimeError::LegendMismatch {
                kind: LegendKind::Destination,
                index: 4
            }
        ));
    }

    #[test]
    fn missing_container_is_structure_error() {
        let err = parse_station_page("<html><body><p>メンテナンス中</p></body></html>", &station_url())
            .unwrap_err();
        assert!(matches!(err, EkitimeError::Structure { .. }));
    }

    #[test]
    fn out_of_range_minute_is_rejected() {
        let html = page(
            LEGENDS,
            "9",
            r#"<td id="1" onmouseover="showLegend(event,0,0)"><a href="d/1.htm">75</a></td>"#,
        );
        let err = parse_station_page(&html, &station_url()).unwrap_err();
        assert!(err.to_string().contains("minute 75"));
    }

    #[test]
    fn out_of_range_hour_is_rejected() {
        let html = page(
            LEGENDS,
            "24",
            r#"<td id="1" onmouseover="showLegend(event,0,0)"><a href="d/1.htm">10</a></td>"#,
        );
        let err = parse_station_page(&html, &station_url()).unwrap_err();
        assert!(matches!(err, EkitimeError::Parse { .. }));
        assert!(err.to_string().contains("hour 24"));
    }

    #[test]
    fn cells_without_numeric_id_are_skipped() {
        let html = page(
            LEGENDS,
            "9",
            r#"<td id="blank"><a href="x">00</a></td><td>gap</td>
               <td id="t7" onmouseover="showLegend(event,0,0)"><a>20</a></td>"#,
        );
        let timetable = parse_station_page(&html, &station_url()).unwrap();
        let cells: Vec<_> = timetable.cells().collect();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].cell_id, "t7");
        assert_eq!(cells[0].detail_url, None);
    }

    #[test]
    fn first_pair_wins() {
        assert_eq!(first_legend_pair("showLegend(event, 2, 11); other(5,6)"), Some((2, 11)));
        assert_eq!(first_legend_pair("showLegend(event)"), None);
        assert_eq!(first_legend_pair(""), None);
    }
}
