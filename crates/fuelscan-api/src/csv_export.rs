//! CSV export of inspection rows.

use csv::{QuoteStyle, Terminator, WriterBuilder};

use fuelscan_core::{Error, InspectionRow, Result};

/// Column titles as printed on the inspection sheet.
pub const CSV_HEADER: [&str; 10] = [
    "Date",
    "Address",
    "Length",
    "+r",
    "r-",
    "Bow",
    "\u{394} Bow",
    "\u{394} Length",
    "Go-No Go",
    "Notes",
];

/// Render rows as CSV: unquoted header, every data cell quoted, `\n` line
/// endings, no trailing newline.
pub fn rows_to_csv(rows: &[InspectionRow]) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for row in rows {
        writer
            .write_record([
                &row.date,
                &row.address,
                &row.length,
                &row.plus_r,
                &row.minus_r,
                &row.bow,
                &row.delta_bow,
                &row.delta_length,
                &row.go_no_go,
                &row.notes,
            ])
            .map_err(|e| Error::Serialization(e.to_string()))?;
    }

    let body = writer
        .into_inner()
        .map_err(|e| Error::Serialization(e.to_string()))?;
    let body = String::from_utf8(body).map_err(|e| Error::Serialization(e.to_string()))?;

    let mut out = CSV_HEADER.join(",");
    if !body.is_empty() {
        out.push('\n');
        out.push_str(body.trim_end_matches('\n'));
    }
    Ok(out)
}

/// Download name for a result: `fuel_<element number or file name>.csv`,
/// restricted to characters that are safe in a header value.
pub fn export_file_name(element_number: &str, file_name: &str) -> String {
    let stem = if element_number.trim().is_empty() {
        file_name
    } else {
        element_number.trim()
    };
    let stem: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("fuel_{stem}.csv")
}
