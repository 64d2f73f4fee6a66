use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PrepError>;

/// Setup and I/O failures. Per-record resolution failures never surface here.
#[derive(Error, Debug)]
pub enum PrepError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::XlsxError),

    #[error("Worksheet '{sheet}' not found in {}", path.display())]
    MissingWorksheet { sheet: String, path: PathBuf },

    #[error("Unsupported input format: {}", .0.display())]
    UnsupportedInput(PathBuf),

    #[error("{tool} is not available: {message}")]
    MissingTool { tool: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}
