use thiserror::Error;

/// Defines the primary error types for the connector.
///
/// Read paths (event log, views) recover from `Transport`/`Rpc`/`Format`
/// internally and hand the caller an empty view instead; write paths
/// propagate everything.
#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("node rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed node response: {0}")]
    Format(String),

    #[error("execution failed: {0}")]
    Execution(String),

    #[error("signing cancelled by user")]
    SigningCancelled,

    #[error("no execution result within the polling window")]
    Timeout,

    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),
}

impl From<serde_json::Error> for ConnectorError {
    fn from(err: serde_json::Error) -> Self {
        ConnectorError::Format(err.to_string())
    }
}
