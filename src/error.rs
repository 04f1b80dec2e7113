use crate::remote::error::{DecodeError, NetworkError};
use crate::source::error::ParseError;
use crate::types::observation::PeriodLabel;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompareError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Series '{label}' has no rows, its statistics are undefined")]
    EmptyInput { label: PeriodLabel },

    #[error("Could not resolve the requested date bounds")]
    DateParsingError,

    #[error("Failed processing DataFrame: {0}")]
    Polars(#[from] PolarsError),

    #[error("Failed to write comparison export '{0}'")]
    ExportWrite(PathBuf, #[source] std::io::Error),
}
