use thiserror::Error;

/// Failures talking to the grading platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("invalid server url '{server}': {reason}")]
    InvalidServer { server: String, reason: String },

    #[error("request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("environment variable {var} with the Canvas API token is not set")]
    MissingToken { var: String },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("roster fetch was cancelled")]
    Cancelled,

    #[error("roster fetch worker failed: {0}")]
    Worker(String),
}
