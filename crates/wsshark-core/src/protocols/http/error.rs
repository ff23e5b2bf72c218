use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    #[error("empty payload")]
    Empty,
    #[error("message head is not valid UTF-8")]
    NotUtf8,
    #[error("invalid request line: {0}")]
    InvalidRequestLine(String),
    #[error("invalid status line: {0}")]
    InvalidStatusLine(String),
}
