use thiserror::Error;

/// Errors that can occur while resolving stat names or sending items.
#[derive(Error, Debug)]
pub enum RelayError {
    /// A stat name could not be resolved to a non-empty host and key.
    #[error("failed to decode stat: {0}")]
    Decode(String),

    /// The trapper server rejected the batch.
    #[error("zabbix server error: {0}")]
    Server(String),

    /// An I/O error from the standard library.
    #[error("Std Io error: {0}")]
    StdIo(#[from] std::io::Error),

    /// The trapper request or response could not be (de)serialized.
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
}
