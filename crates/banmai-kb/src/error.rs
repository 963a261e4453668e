use thiserror::Error;

/// Errors from loading one tabular source file.
///
/// These never abort a directory load; the loader logs them and moves on
/// to the next file.
#[derive(Debug, Error)]
pub enum KbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("no question column in {0}")]
    MissingQuestionColumn(String),
}
