use thiserror::Error;
use arrow::error::ArrowError;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IO(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("General error: {0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<ArrowError> for Error {
    fn from(err: ArrowError) -> Self {
        Error::Csv(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IO(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}

/// Why a raw row could not become a [`crate::Record`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowRejection {
    #[error("year is missing, zero or not a whole number")]
    InvalidYear,

    #[error("borough is missing or empty")]
    MissingBorough,

    #[error("median_rent is missing, zero or not numeric")]
    InvalidRent,

    #[error("median_income is missing, zero or not numeric")]
    InvalidIncome,
}
