//! Client error types.
//!
//! Every variant drives the polling task into terminal `Failed`; there is
//! no automatic retry.

use thiserror::Error;

/// Errors produced by the polling client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network-level failure issuing the request or reading the body.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-success HTTP status.
    #[error("request failed with status {status}")]
    HttpStatus { status: reqwest::StatusCode },

    /// The response body was not a valid task status payload.
    #[error("malformed task response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    /// A document payload failed ingestion validation.
    #[error("malformed document: {0}")]
    Document(#[from] flowscope_core::CoreError),

    /// The base URL and parameter set do not form a valid request URL.
    #[error("invalid request url: {message}")]
    InvalidUrl { message: String },
}
