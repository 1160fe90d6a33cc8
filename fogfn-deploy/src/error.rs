use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("no packaged source available for function {0}")]
    /// The function store has no packaged source under the given reference.
    SourceUnavailable(String),

    #[error("node {node} rejected the function upload with status {status}")]
    /// A peer's deploy endpoint answered the upload with a non-success status.
    UploadFailed { node: String, status: StatusCode },

    #[error("node {node} rejected the function delete with status {status}")]
    DeleteFailed { node: String, status: StatusCode },

    #[error("node {node} failed to return logs with status {status}")]
    LogsFailed { node: String, status: StatusCode },

    #[error("{0}")]
    /// A management call could not be completed at the transport level.
    Http(#[from] hyper::Error),

    #[error("{0}")]
    InvalidUri(#[from] http::uri::InvalidUri),

    #[error("{0}")]
    Serialize(#[from] serde_json::Error),
}
