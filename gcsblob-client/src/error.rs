use reqwest::StatusCode;
use std::{path::PathBuf, time::Duration};
use thiserror::Error;

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("the client operates in read only mode. Change 'credentials_source' parameter value")]
    ReadOnly,

    #[error("object '{0}' not found")]
    NotFound(String),

    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: reqwest::Method,
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Config(#[from] gcsblob_models::Error),

    #[error("reading credentials {}: {source}", path.display())]
    CredentialsFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed credentials: {0}")]
    CredentialsFormat(#[from] serde_json::Error),

    #[error("token request to {url} returned {status}: {body}")]
    Token {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("signing with service account key: {0}")]
    Key(#[from] jsonwebtoken::errors::Error),

    #[error("malformed signature: {0}")]
    Signature(#[from] base64::DecodeError),

    #[error("sign URL requires a service account key")]
    SigningUnavailable,

    #[error("invalid object name '{0}': '.' and '..' segments are not allowed")]
    InvalidObjectName(String),

    #[error("expiry must be between 1s and 7 days, got {0:?}")]
    InvalidExpiry(Duration),
}
