pub mod google;
pub mod reader;
mod row;

use std::io;

pub use reader::Sheet;
pub use row::Row;

pub type SheetResult<T> = std::result::Result<T, SheetError>;

#[derive(thiserror::Error, Debug)]
pub enum SheetError {
    #[error("read spreadsheet file")]
    ReadFile(#[from] io::Error),

    #[error("open workbook: {0}")]
    Open(#[from] calamine::Error),

    #[error("workbook has no worksheets")]
    NoSheet,

    #[error("parse csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid Google Sheets URL")]
    InvalidUrl,

    #[error("Failed to fetch Google Sheet ({0}). Please ensure link sharing is public")]
    Fetch(String),
}
