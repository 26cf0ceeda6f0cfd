//! Train detail page parsing.
//!
//! A detail page is a two-column table. Rows whose first cell carries the
//! label class are either key/value rows (列車名, 列車番号, ...) or stop rows,
//! where the first cell links to the station and the second holds the times.

use std::sync::LazyLock;

use ekitime_shared::{DetailField, PartialStopPolicy, StopTime, TrainDetail};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, trace};

use crate::time::extract_times;
use crate::{LABEL_CLASS, element_text, has_class};

static ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
static CELL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("valid selector"));
static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("valid selector"));

/// Parse a detail page into its fields and stop list.
///
/// Fields the page does not carry stay `None`. Stops follow `policy`:
/// with [`PartialStopPolicy::Drop`] only rows with both an arrival and a
/// departure are kept.
pub fn parse_detail_page(html: &str, policy: PartialStopPolicy) -> TrainDetail {
    let doc = Html::parse_document(html);
    let mut detail = TrainDetail::default();

    for row in doc.select(&ROW_SEL) {
        let cells: Vec<ElementRef<'_>> = row.select(&CELL_SEL).collect();
        let Some(&label_cell) = cells.first() else {
            continue;
        };
        if !has_class(label_cell, LABEL_CLASS) {
            continue;
        }
        let Some(&value_cell) = cells.get(1) else {
            trace!("label row without a value cell");
            continue;
        };

        let label = element_text(label_cell);
        if let Some(field) = DetailField::from_label(label.trim()) {
            detail.set(field, strip_whitespace(&element_text(value_cell)));
        } else if let Some(link) = label_cell.select(&LINK_SEL).next() {
            let station = element_text(link).trim().to_string();
            if let Some(stop) = stop_row(station, &element_text(value_cell), policy) {
                detail.schedule.push(stop);
            }
        }
    }

    debug!(
        train_id = detail.get_or_empty(DetailField::TrainId),
        stops = detail.schedule.len(),
        "detail page parsed"
    );
    detail
}

/// Apply the partial-stop policy to one stop row.
fn stop_row(station: String, times_text: &str, policy: PartialStopPolicy) -> Option<StopTime> {
    let times = extract_times(times_text);
    let keep = match policy {
        PartialStopPolicy::Drop => times.is_complete(),
        PartialStopPolicy::Keep => !times.is_empty(),
    };
    if !keep {
        trace!(%station, ?times, "stop row dropped");
        return None;
    }
    Some(StopTime {
        station,
        arrival_time: times.arrival,
        departure_time: times.departure,
    })
}

/// Remove every whitespace character, ideographic spaces included.
fn strip_whitespace(text: &str) -> String {
    text.split_whitespace().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    #[test]
    fn fields_are_extracted_and_compacted() {
        let detail = parse_detail_page(&load_fixture("detail_1234m.html"), PartialStopPolicy::Drop);

        assert_eq!(detail.train_name.as_deref(), Some("快速アクティー"));
        assert_eq!(detail.train_id.as_deref(), Some("1234M"));
        assert_eq!(detail.cars.as_deref(), Some("10両編成(グリーン車付)"));
        assert_eq!(detail.remarks.as_deref(), Some("土休日は小田原止まり"));
        assert_eq!(detail.dates.as_deref(), Some("毎日運転"));
        // Not present on this page.
        assert_eq!(detail.reservation_code, None);
    }

    #[test]
    fn partial_stops_dropped_by_default() {
        let detail = parse_detail_page(&load_fixture("detail_1234m.html"), PartialStopPolicy::Drop);

        let stations: Vec<&str> = detail.schedule.iter().map(|s| s.station.as_str()).collect();
        // 東京 has only a departure and 熱海 only an arrival.
        assert_eq!(stations, vec!["品川", "横浜", "大船"]);
        assert_eq!(
            detail.schedule[0],
            StopTime {
                station: "品川".into(),
                arrival_time: Some(908),
                departure_time: Some(909),
            }
        );
    }

    #[test]
    fn partial_stops_kept_on_request() {
        let detail = parse_detail_page(&load_fixture("detail_1234m.html"), PartialStopPolicy::Keep);

        let stations: Vec<&str> = detail.schedule.iter().map(|s| s.station.as_str()).collect();
        assert_eq!(stations, vec!["東京", "品川", "横浜", "大船", "熱海"]);
        assert_eq!(detail.schedule[0].arrival_time, None);
        assert_eq!(detail.schedule[0].departure_time, Some(900));
        assert_eq!(detail.schedule[4].departure_time, None);
    }

    #[test]
    fn arrival_only_stop_is_not_scheduled() {
        let html = r#"<table>
            <tr><td class="lowBg06">列車番号</td><td>  801M </td></tr>
            <tr><td class="lowBg06"><a href="/st/1">終点</a></td><td>10:12着</td></tr>
        </table>"#;

        let detail = parse_detail_page(html, PartialStopPolicy::Drop);
        assert_eq!(detail.train_id.as_deref(), Some("801M"));
        assert!(detail.schedule.is_empty());
    }

    #[test]
    fn rows_without_label_class_are_ignored() {
        let html = r#"<table>
            <tr><td>列車名</td><td>ignored</td></tr>
            <tr><td class="lowBg06">列車名</td></tr>
            <tr></tr>
            <tr><td class="lowBg06">発車番線</td><td>3番線</td></tr>
        </table>"#;

        let detail = parse_detail_page(html, PartialStopPolicy::Drop);
        assert_eq!(detail, TrainDetail::default());
    }

    #[test]
    fn whitespace_removal_includes_ideographic_space() {
        assert_eq!(strip_whitespace(" 毎日\u{3000}運転\n"), "毎日運転");
    }
}
