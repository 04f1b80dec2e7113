//! Spreadsheet exports (`.xlsx`, `.xls`, `.ods`) read into the same all-text frame the
//! delimited reader produces.

use crate::source::error::ParseError;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use log::debug;
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];
const EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// `.xlsx`/`.ods` are zip containers; legacy `.xls` is an OLE compound file.
pub(crate) fn is_workbook(bytes: &[u8]) -> bool {
    bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC)
}

pub(crate) fn has_workbook_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// Reads the first worksheet. `header_rows` rows are skipped, counted from the top of
/// the sheet; the next row names the columns (trimmed) and the rest are data.
pub(crate) fn read_first_sheet(bytes: &[u8], header_rows: usize) -> Result<DataFrame, ParseError> {
    let mut sheets = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = sheets
        .worksheet_range_at(0)
        .ok_or(ParseError::NoWorksheet)??;

    // Leading empty rows are not part of the range.
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let mut rows = range.rows().skip(header_rows.saturating_sub(first_row));

    let Some(header) = rows.next() else {
        return Ok(DataFrame::empty());
    };
    let names = column_names(header);
    let data: Vec<&[Data]> = rows.collect();

    let columns = names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let cells: Vec<Option<String>> = data
                .iter()
                .map(|row| row.get(idx).and_then(cell_text))
                .collect();
            Column::new(name.as_str().into(), cells)
        })
        .collect();
    let df = DataFrame::new(columns).map_err(|source| ParseError::Csv {
        header_rows,
        source,
    })?;
    debug!("Read {} worksheet rows with columns {:?}", df.height(), names);
    Ok(df)
}

/// Trimmed header names. Blank or repeated names get a positional suffix so every
/// column stays addressable.
fn column_names(header: &[Data]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(header.len());
    for (idx, cell) in header.iter().enumerate() {
        let name = cell_text(cell)
            .map(|text| text.trim().to_string())
            .unwrap_or_default();
        let name = if name.is_empty() || names.contains(&name) {
            format!("{name}_{idx}")
        } else {
            name
        };
        names.push(name);
    }
    names
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(text) | Data::DateTimeIso(text) | Data::DurationIso(text) => {
            Some(text.clone())
        }
        Data::Float(value) => Some(value.to_string()),
        Data::Int(value) => Some(value.to_string()),
        Data::Bool(value) => Some(value.to_string()),
        Data::DateTime(value) => value
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_containers() {
        assert!(is_workbook(b"PK\x03\x04rest"));
        assert!(is_workbook(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1]));
        assert!(!is_workbook(b"Fecha,Valor\n"));
        assert!(has_workbook_extension(Path::new("C09/radiacion.XLSX")));
        assert!(has_workbook_extension(Path::new("humedad.ods")));
        assert!(!has_workbook_extension(Path::new("radiacion.csv")));
        assert!(!has_workbook_extension(Path::new("radiacion")));
    }

    #[test]
    fn test_column_names_are_unique() {
        let header = [
            Data::String(" Fecha ".to_string()),
            Data::Empty,
            Data::String("Valor".to_string()),
            Data::String("Valor".to_string()),
        ];
        assert_eq!(column_names(&header), vec!["Fecha", "_1", "Valor", "Valor_3"]);
    }

    #[test]
    fn test_garbage_after_magic_is_a_workbook_error() {
        let result = read_first_sheet(b"PK\x03\x04not really a zip", 0);
        assert!(matches!(result, Err(ParseError::Workbook(_))));
    }
}
