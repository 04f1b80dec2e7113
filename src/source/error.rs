use crate::types::series::DuplicateDateError;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to read historical file '{0}'")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Could not read the tabular data after skipping {header_rows} header rows")]
    Csv {
        header_rows: usize,
        #[source]
        source: PolarsError,
    },

    #[error("Could not read the workbook")]
    Workbook(#[from] calamine::Error),

    #[error("The workbook has no worksheet")]
    NoWorksheet,

    #[error("Required column '{column}' not found after the header rows (found: {available:?})")]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    #[error("Unparsable date '{value}' on data row {row}")]
    InvalidDate { row: usize, value: String },

    #[error(transparent)]
    DuplicateDate(#[from] DuplicateDateError),
}
