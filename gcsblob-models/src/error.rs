use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no bucket name provided\nSee -help for usage")]
    MissingBucket,

    #[error("unknown storage class '{0}'")]
    UnknownStorageClass(String),

    #[error("unknown credentials_source '{0}', expected 'static', 'none' or an empty value")]
    UnknownCredentialsSource(String),

    #[error("json_key is required when credentials_source is 'static'")]
    MissingJsonKey,

    #[error("json_key is only allowed when credentials_source is 'static'")]
    UnexpectedJsonKey,

    #[error("encryption key is not valid base64: {0}")]
    EncryptionKeyEncoding(#[from] base64::DecodeError),

    #[error("encryption key must be 32 bytes, got {0}")]
    EncryptionKeyLength(usize),

    #[error("invalid signing action: {0} must be GET, PUT, or DELETE")]
    InvalidSignAction(String),

    #[error("malformed config: {0}")]
    Malformed(#[from] serde_json::Error),
}
