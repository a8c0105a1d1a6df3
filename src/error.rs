use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File already added: {file_name} ({keyword})")]
    DuplicateFile { file_name: String, keyword: String },

    #[error("File not found: {file_name} ({keyword})")]
    FileNotFound { file_name: String, keyword: String },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Unknown list: {0} (expected a, b, c or all)")]
    UnknownList(String),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV export error: {0}")]
    Export(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::DuplicateFile { .. } => StatusCode::CONFLICT,
            AppError::FileNotFound { .. } | AppError::UnknownList(_) => StatusCode::NOT_FOUND,
            AppError::Csv(_)
            | AppError::InvalidSettings(_)
            | AppError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
