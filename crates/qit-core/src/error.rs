use thiserror::Error;

#[derive(Debug, Error)]
pub enum QitError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("usage error: {0}")]
    Usage(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
}

pub type QitResult<T> = Result<T, QitError>;

impl From<serde_json::Error> for QitError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            QitError::Io(err.into())
        } else {
            QitError::Parse(format!("json: {err}"))
        }
    }
}

impl From<ndarray::ShapeError> for QitError {
    fn from(err: ndarray::ShapeError) -> Self {
        QitError::Validation(format!("array shape: {err}"))
    }
}
