//! Core domain types for station timetables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EkitimeError, Result};

// ---------------------------------------------------------------------------
// Legends
// ---------------------------------------------------------------------------

/// Which inline-script legend a table decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegendKind {
    /// `trainlegends[i] = "..."`: train type (普通, 快速, 特急, ...).
    TrainType,
    /// `destinationlegends[i] = "..."`: terminal station.
    Destination,
}

impl LegendKind {
    /// Name of the JavaScript array the page assigns this legend into.
    pub fn array_name(self) -> &'static str {
        match self {
            Self::TrainType => "trainlegends",
            Self::Destination => "destinationlegends",
        }
    }
}

impl std::fmt::Display for LegendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TrainType => f.write_str("train type"),
            Self::Destination => f.write_str("destination"),
        }
    }
}

/// Index → label lookup decoded from a station page's inline scripts.
///
/// Built once per page and read-only afterwards. Lookups of undefined
/// indices are errors, never defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegendTable {
    kind: LegendKind,
    labels: BTreeMap<usize, String>,
}

impl LegendTable {
    /// Create an empty table for the given legend.
    pub fn new(kind: LegendKind) -> Self {
        Self {
            kind,
            labels: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> LegendKind {
        self.kind
    }

    /// Insert a label, replacing any earlier label at the same index.
    pub fn insert(&mut self, index: usize, label: impl Into<String>) {
        self.labels.insert(index, label.into());
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(&index).map(String::as_str)
    }

    /// Resolve an index referenced by a train cell.
    pub fn lookup(&self, index: usize) -> Result<&str> {
        self.get(index).ok_or(EkitimeError::LegendMismatch {
            kind: self.kind,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Entries in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.labels.iter().map(|(i, l)| (*i, l.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Detail pages
// ---------------------------------------------------------------------------

/// A single stop in a train's run.
///
/// Times are the digits of `H:MM` concatenated (`9:05` → `905`, `9:5` → `95`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopTime {
    pub station: String,
    pub arrival_time: Option<u32>,
    pub departure_time: Option<u32>,
}

/// Key/value fields a detail page can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetailField {
    TrainName,
    TrainId,
    ReservationCode,
    Cars,
    Remarks,
    Dates,
}

/// Label cell text on detail pages → field it fills.
pub const DETAIL_LABELS: &[(&str, DetailField)] = &[
    ("列車名", DetailField::TrainName),
    ("列車番号", DetailField::TrainId),
    ("列車予約コード", DetailField::ReservationCode),
    ("連結車両", DetailField::Cars),
    ("備考", DetailField::Remarks),
    ("運転日", DetailField::Dates),
];

impl DetailField {
    /// Look up the field for a detail-page label, if it is one we record.
    pub fn from_label(label: &str) -> Option<Self> {
        DETAIL_LABELS
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, field)| *field)
    }
}

/// Everything extracted from one train's detail page.
///
/// Fields absent from the page stay `None` and are omitted from JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_name: Option<String>,
    /// Raw 列車番号 text, before token extraction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cars: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<String>,
    #[serde(default)]
    pub schedule: Vec<StopTime>,
}

impl TrainDetail {
    fn slot(&mut self, field: DetailField) -> &mut Option<String> {
        match field {
            DetailField::TrainName => &mut self.train_name,
            DetailField::TrainId => &mut self.train_id,
            DetailField::ReservationCode => &mut self.reservation_code,
            DetailField::Cars => &mut self.cars,
            DetailField::Remarks => &mut self.remarks,
            DetailField::Dates => &mut self.dates,
        }
    }

    /// Record a field value; a later row with the same label wins.
    pub fn set(&mut self, field: DetailField, value: impl Into<String>) {
        *self.slot(field) = Some(value.into());
    }

    pub fn get(&self, field: DetailField) -> Option<&str> {
        let value = match field {
            DetailField::TrainName => &self.train_name,
            DetailField::TrainId => &self.train_id,
            DetailField::ReservationCode => &self.reservation_code,
            DetailField::Cars => &self.cars,
            DetailField::Remarks => &self.remarks,
            DetailField::Dates => &self.dates,
        };
        value.as_deref()
    }

    /// Field value, or `""` when the page did not carry it.
    pub fn get_or_empty(&self, field: DetailField) -> &str {
        self.get(field).unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// TrainEntry
// ---------------------------------------------------------------------------

/// One departure on a station timetable: the unit record of the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainEntry {
    /// Dash-joined train-number tokens; empty when details were not fetched.
    pub train_id: String,
    /// `hour * 100 + minute`.
    pub time: u32,
    #[serde(rename = "type")]
    pub train_type: String,
    #[serde(rename = "dest")]
    pub destination: String,
    /// `None` serializes as `{}`.
    #[serde(with = "details_or_empty")]
    pub details: Option<TrainDetail>,
}

impl TrainEntry {
    pub fn hour(&self) -> u32 {
        self.time / 100
    }

    pub fn minute(&self) -> u32 {
        self.time % 100
    }
}

mod details_or_empty {
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{StopTime, TrainDetail};

    pub fn serialize<S: Serializer>(
        details: &Option<TrainDetail>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match details {
            Some(d) => d.serialize(serializer),
            None => serializer.serialize_map(Some(0))?.end(),
        }
    }

    /// Fetched details always carry `schedule`, so an object without any
    /// known key is the "not fetched" marker.
    #[derive(Deserialize)]
    struct Raw {
        train_name: Option<String>,
        train_id: Option<String>,
        reservation_code: Option<String>,
        cars: Option<String>,
        remarks: Option<String>,
        dates: Option<String>,
        schedule: Option<Vec<StopTime>>,
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Option<TrainDetail>, D::Error> {
        let raw = Raw::deserialize(deserializer)?;
        let empty = raw.train_name.is_none()
            && raw.train_id.is_none()
            && raw.reservation_code.is_none()
            && raw.cars.is_none()
            && raw.remarks.is_none()
            && raw.dates.is_none()
            && raw.schedule.is_none();
        if empty {
            return Ok(None);
        }
        Ok(Some(TrainDetail {
            train_name: raw.train_name,
            train_id: raw.train_id,
            reservation_code: raw.reservation_code,
            cars: raw.cars,
            remarks: raw.remarks,
            dates: raw.dates,
            schedule: raw.schedule.unwrap_or_default(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_detail() -> TrainDetail {
        let mut detail = TrainDetail::default();
        detail.set(DetailField::TrainName, "ひかり501号");
        detail.set(DetailField::TrainId, "501A");
        detail.set(DetailField::Dates, "毎日運転");
        detail.schedule.push(StopTime {
            station: "東京".into(),
            arrival_time: Some(555),
            departure_time: Some(600),
        });
        detail
    }

    #[test]
    fn legend_lookup_missing_index_is_error() {
        let mut table = LegendTable::new(LegendKind::TrainType);
        table.insert(0, "普通");

        assert_eq!(table.lookup(0).unwrap(), "普通");
        let err = table.lookup(4).unwrap_err();
        assert!(matches!(
            err,
            EkitimeError::LegendMismatch {
                kind: LegendKind::TrainType,
                index: 4
            }
        ));
    }

    #[test]
    fn legend_insert_overwrites() {
        let mut table = LegendTable::new(LegendKind::Destination);
        table.insert(3, "東京");
        table.insert(3, "品川");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(3), Some("品川"));
    }

    #[test]
    fn detail_label_table() {
        assert_eq!(DetailField::from_label("列車番号"), Some(DetailField::TrainId));
        assert_eq!(DetailField::from_label("運転日"), Some(DetailField::Dates));
        assert_eq!(DetailField::from_label("発車番線"), None);
    }

    #[test]
    fn missing_detail_field_reads_empty() {
        let detail = sample_detail();
        assert_eq!(detail.get_or_empty(DetailField::Cars), "");
        assert_eq!(detail.get_or_empty(DetailField::TrainId), "501A");
    }

    #[test]
    fn entry_without_details_serializes_empty_object() {
        let entry = TrainEntry {
            train_id: String::new(),
            time: 915,
            train_type: "普通".into(),
            destination: "東京".into(),
            details: None,
        };

        let json = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "train_id": "",
                "time": 915,
                "type": "普通",
                "dest": "東京",
                "details": {},
            })
        );
        assert_eq!(entry.hour(), 9);
        assert_eq!(entry.minute(), 15);
    }

    #[test]
    fn entry_json_roundtrip_preserves_fields() {
        let entries = vec![
            TrainEntry {
                train_id: "501A".into(),
                time: 600,
                train_type: "新幹線".into(),
                destination: "新大阪".into(),
                details: Some(sample_detail()),
            },
            TrainEntry {
                train_id: "".into(),
                time: 601,
                train_type: "普通".into(),
                destination: "熱海".into(),
                details: Some(TrainDetail::default()),
            },
            TrainEntry {
                train_id: "".into(),
                time: 2359,
                train_type: "快速".into(),
                destination: "大船".into(),
                details: None,
            },
        ];

        let json = serde_json::to_string(&entries).expect("serialize");
        let parsed: Vec<TrainEntry> = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, entries);
    }
}
