pub mod error;
pub mod parser;
mod workbook;
