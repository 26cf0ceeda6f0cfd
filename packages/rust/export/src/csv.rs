//! CSV rendering.
//!
//! Without details the columns are `time,type,dest`; with details
//! `id,name,cars,remarks,dates` follow. `id` is the detail page's raw
//! 列車番号 text. Times are zero-padded to four digits.

use csv::{QuoteStyle, Terminator, WriterBuilder};
use ekitime_shared::{CsvQuoting, DetailField, EkitimeError, Result, TrainEntry};

const BASE_HEADER: [&str; 3] = ["time", "type", "dest"];
const DETAIL_HEADER: [&str; 5] = ["id", "name", "cars", "remarks", "dates"];
const DETAIL_COLUMNS: [DetailField; 5] = [
    DetailField::TrainId,
    DetailField::TrainName,
    DetailField::Cars,
    DetailField::Remarks,
    DetailField::Dates,
];

/// Render entries as CSV text, `\n`-terminated.
///
/// [`CsvQuoting::Minimal`] wraps every detail column in `"` and escapes
/// nothing, so values containing `"` or `,` produce ambiguous rows.
/// [`CsvQuoting::Rfc4180`] quotes only where needed and doubles quotes.
pub fn to_csv(entries: &[TrainEntry], with_details: bool, quoting: CsvQuoting) -> Result<String> {
    let quote_style = match quoting {
        CsvQuoting::Minimal => QuoteStyle::Never,
        CsvQuoting::Rfc4180 => QuoteStyle::Necessary,
    };
    let mut writer = WriterBuilder::new()
        .quote_style(quote_style)
        .terminator(Terminator::Any(b'\n'))
        .flexible(false)
        .from_writer(Vec::new());

    let mut header: Vec<&str> = BASE_HEADER.to_vec();
    if with_details {
        header.extend(DETAIL_HEADER);
    }
    writer.write_record(&header).map_err(csv_error)?;

    for entry in entries {
        let mut record = vec![
            format!("{:04}", entry.time),
            entry.train_type.clone(),
            entry.destination.clone(),
        ];
        if with_details {
            for field in DETAIL_COLUMNS {
                let value = entry
                    .details
                    .as_ref()
                    .map(|d| d.get_or_empty(field))
                    .unwrap_or_default();
                record.push(match quoting {
                    CsvQuoting::Minimal => format!("\"{value}\""),
                    CsvQuoting::Rfc4180 => value.to_string(),
                });
            }
        }
        writer.write_record(&record).map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| EkitimeError::Serialization(format!("csv flush failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| EkitimeError::Serialization(e.to_string()))
}

fn csv_error(e: csv::Error) -> EkitimeError {
    EkitimeError::Serialization(format!("csv: {e}"))
}
