//! Reads single-variable station exports (the INAMHI daily spreadsheet layout) into a
//! [`Series`].
//!
//! The exports start with a block of station metadata, followed by a header row and the
//! data rows. Only the date and value columns are used. Delimited text and spreadsheet
//! workbooks share the same layout rules.

use crate::source::error::ParseError;
use crate::source::workbook::{has_workbook_extension, is_workbook, read_first_sheet};
use crate::types::observation::{Observation, PeriodLabel, ValueChannel};
use crate::types::series::Series;
use crate::types::traits::utils::parse_calendar_date;
use bon::Builder;
use log::{debug, info, warn};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;

/// Rows of station metadata preceding the header row in the exports.
pub const DEFAULT_HEADER_ROWS: usize = 11;
pub const DEFAULT_DATE_COLUMN: &str = "Fecha";
pub const DEFAULT_VALUE_COLUMN: &str = "Valor";

/// What to do with a data row whose date cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateParsePolicy {
    /// Abort the whole import with [`ParseError::InvalidDate`].
    #[default]
    Strict,
    /// Drop the row and keep going.
    Lenient,
}

/// Parser for the historical station record.
///
/// # Examples
///
/// ```
/// use solar_compare::{DateParsePolicy, HistoricalParser, ValueChannel};
///
/// let parser = HistoricalParser::builder()
///     .header_rows(0)
///     .channel(ValueChannel::Humidity)
///     .date_policy(DateParsePolicy::Lenient)
///     .build();
///
/// let series = parser.parse(b"Fecha,Valor\n2008-01-01,81.5\nbad,1\n", "2008").unwrap();
/// assert_eq!(series.len(), 1);
/// assert_eq!(series.observations()[0].humidity, Some(81.5));
/// ```
#[derive(Debug, Clone, Builder)]
pub struct HistoricalParser {
    #[builder(default = DEFAULT_HEADER_ROWS)]
    header_rows: usize,
    #[builder(into, default = DEFAULT_DATE_COLUMN.to_string())]
    date_column: String,
    #[builder(into, default = DEFAULT_VALUE_COLUMN.to_string())]
    value_column: String,
    #[builder(default)]
    channel: ValueChannel,
    #[builder(default)]
    date_policy: DateParsePolicy,
    #[builder(default = b',')]
    separator: u8,
}

impl Default for HistoricalParser {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl HistoricalParser {
    pub fn channel(&self) -> ValueChannel {
        self.channel
    }

    pub fn date_policy(&self) -> DateParsePolicy {
        self.date_policy
    }

    /// Same layout, reading the value column into `channel` instead.
    pub fn for_channel(&self, channel: ValueChannel) -> Self {
        Self {
            channel,
            ..self.clone()
        }
    }

    /// Parses the raw bytes of an export. The period label comes from the caller.
    ///
    /// Workbooks are recognised by their container signature and read from the first
    /// worksheet; anything else is treated as delimited text.
    ///
    /// Rows with both cells empty are skipped. Values that are empty or not numeric
    /// become missing; a decimal comma is accepted.
    ///
    /// # Errors
    ///
    /// * [`ParseError::MissingColumn`] if the date or value column is absent after the
    ///   header rows.
    /// * [`ParseError::InvalidDate`] for an unparsable date under
    ///   [`DateParsePolicy::Strict`].
    /// * [`ParseError::DuplicateDate`] if a date occurs twice.
    /// * [`ParseError::Csv`] if the delimited text itself cannot be read.
    /// * [`ParseError::Workbook`] if a workbook is corrupt.
    pub fn parse(&self, bytes: &[u8], label: impl Into<PeriodLabel>) -> Result<Series, ParseError> {
        let df = if is_workbook(bytes) {
            read_first_sheet(bytes, self.header_rows)?
        } else {
            self.read_frame(bytes)?
        };
        self.parse_frame(&df, label.into())
    }

    fn parse_frame(&self, df: &DataFrame, label: PeriodLabel) -> Result<Series, ParseError> {
        let dates = string_cells(df, &self.date_column, self.header_rows)?;
        let values = string_cells(df, &self.value_column, self.header_rows)?;

        let mut observations = Vec::with_capacity(dates.len());
        let mut dropped = 0usize;
        for (idx, (date_cell, value_cell)) in dates.iter().zip(values.iter()).enumerate() {
            let date_raw = date_cell.as_deref().map(str::trim).unwrap_or_default();
            let value_raw = value_cell.as_deref().map(str::trim).unwrap_or_default();
            if date_raw.is_empty() && value_raw.is_empty() {
                continue;
            }

            let Some(date) = parse_calendar_date(date_raw) else {
                match self.date_policy {
                    DateParsePolicy::Strict => {
                        return Err(ParseError::InvalidDate {
                            row: idx + 1,
                            value: date_raw.to_string(),
                        });
                    }
                    DateParsePolicy::Lenient => {
                        warn!("Dropping row {} with unparsable date '{}'", idx + 1, date_raw);
                        dropped += 1;
                        continue;
                    }
                }
            };

            observations.push(Observation::with_channel(
                date,
                self.channel,
                parse_value(value_raw),
            ));
        }

        info!(
            "Parsed {} {} observations for '{}' ({} rows dropped)",
            observations.len(),
            self.channel,
            label,
            dropped
        );
        Ok(Series::new(label, observations)?)
    }

    /// Reads and parses an export from disk. A workbook extension (`.xlsx`, `.xls`,
    /// `.ods`, ...) selects the spreadsheet reader, otherwise the content decides.
    pub async fn parse_path(
        &self,
        path: impl AsRef<Path>,
        label: impl Into<PeriodLabel>,
    ) -> Result<Series, ParseError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ParseError::Io(path.to_path_buf(), e))?;
        if has_workbook_extension(path) {
            let df = read_first_sheet(&bytes, self.header_rows)?;
            return self.parse_frame(&df, label.into());
        }
        self.parse(&bytes, label)
    }

    /// Loads the export with every column as text and header names trimmed.
    fn read_frame(&self, bytes: &[u8]) -> Result<DataFrame, ParseError> {
        let header_rows = self.header_rows;
        let to_csv_error = |source| ParseError::Csv {
            header_rows,
            source,
        };

        let separator = self.separator;
        let mut df = CsvReadOptions::default()
            .with_has_header(true)
            .with_skip_rows(header_rows)
            .with_infer_schema_length(Some(0))
            .map_parse_options(|opts| {
                opts.with_separator(separator)
                    .with_truncate_ragged_lines(true)
            })
            .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
            .finish()
            .map_err(to_csv_error)?;

        let trimmed: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.trim().to_string())
            .collect();
        df.set_column_names(trimmed.iter().map(String::as_str))
            .map_err(to_csv_error)?;
        debug!("Read {} data rows with columns {:?}", df.height(), trimmed);
        Ok(df)
    }
}

fn string_cells(
    df: &DataFrame,
    name: &str,
    header_rows: usize,
) -> Result<Vec<Option<String>>, ParseError> {
    let column = df.column(name).map_err(|_| ParseError::MissingColumn {
        column: name.to_string(),
        available: df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect(),
    })?;
    let as_text = column
        .cast(&DataType::String)
        .map_err(|source| ParseError::Csv {
            header_rows,
            source,
        })?;
    let cells = as_text
        .str()
        .map_err(|source| ParseError::Csv {
            header_rows,
            source,
        })?
        .into_iter()
        .map(|cell| cell.map(str::to_string))
        .collect();
    Ok(cells)
}

fn parse_value(raw: &str) -> Option<f64> {
    if raw.is_empty() {
        return None;
    }
    let parsed = raw
        .parse::<f64>()
        .ok()
        .or_else(|| raw.replace(',', ".").parse::<f64>().ok());
    match parsed {
        Some(v) if v.is_finite() => Some(v),
        _ => {
            debug!("Treating non-numeric value '{}' as missing", raw);
            None
        }
    }
}
