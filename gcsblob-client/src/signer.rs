//! V4 signed urls (`GOOG4-RSA-SHA256`).
//!
//! ```text
//! canonical request = METHOD \n PATH \n QUERY \n HEADERS \n\n SIGNED_HEADERS \n UNSIGNED-PAYLOAD
//! string to sign    = GOOG4-RSA-SHA256 \n TIMESTAMP \n SCOPE \n hex(sha256(canonical request))
//! signature         = hex(rsa_sha256(string to sign))
//! ```

use crate::error::{ClientError, Result};
use chrono::{DateTime, Utc};
use gcsblob_models::SignAction;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};
use std::{collections::BTreeMap, time::Duration};
use url::Url;

const ALGORITHM: &str = "GOOG4-RSA-SHA256";
const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";
const MIN_EXPIRY: Duration = Duration::from_secs(1);
pub const MAX_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Everything except the RFC 3986 unreserved characters gets encoded.
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub fn uri_encode(value: &str) -> String {
    utf8_percent_encode(value, URI_ENCODE_SET).to_string()
}

/// `/<bucket>/<object>` with every path segment of the object name encoded
/// separately, so `/` inside names survives. `.` and `..` segments are
/// refused: url parsing resolves them even when percent-encoded, which would
/// move the request to another object or bucket.
pub fn object_path(bucket: &str, object: &str) -> Result<String> {
    let segments = object
        .split('/')
        .map(|segment| match segment {
            "." | ".." => Err(ClientError::InvalidObjectName(object.to_string())),
            segment => Ok(uri_encode(segment)),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(format!("/{}/{}", uri_encode(bucket), segments.join("/")))
}

#[derive(Debug)]
pub struct SignedUrlRequest<'a> {
    pub action: SignAction,
    pub endpoint: &'a Url,
    pub bucket: &'a str,
    pub object: &'a str,
    pub expiry: Duration,
    pub timestamp: DateTime<Utc>,
    pub client_email: &'a str,
    /// Extra headers the url user has to send, e.g. encryption headers.
    pub headers: Vec<(&'static str, String)>,
}

impl SignedUrlRequest<'_> {
    fn host(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    fn datestamp(&self) -> String {
        self.timestamp.format("%Y%m%d").to_string()
    }

    fn timestamp(&self) -> String {
        self.timestamp.format("%Y%m%dT%H%M%SZ").to_string()
    }

    fn credential_scope(&self) -> String {
        format!("{}/auto/storage/goog4_request", self.datestamp())
    }

    fn canonical_headers(&self) -> BTreeMap<String, String> {
        let mut headers: BTreeMap<String, String> = self
            .headers
            .iter()
            .map(|(name, value)| (name.to_lowercase(), value.trim().to_string()))
            .collect();
        headers.insert("host".to_string(), self.host());
        headers
    }

    fn canonical_query(&self, signed_headers: &str) -> String {
        let credential = format!("{}/{}", self.client_email, self.credential_scope());
        let expires = self.expiry.as_secs().to_string();
        let timestamp = self.timestamp();

        let mut params = vec![
            ("X-Goog-Algorithm", ALGORITHM),
            ("X-Goog-Credential", credential.as_str()),
            ("X-Goog-Date", timestamp.as_str()),
            ("X-Goog-Expires", expires.as_str()),
            ("X-Goog-SignedHeaders", signed_headers),
        ]
        .into_iter()
        .map(|(key, value)| (uri_encode(key), uri_encode(value)))
        .collect::<Vec<_>>();
        params.sort();

        params
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn canonical_request(&self) -> Result<String> {
        let headers = self.canonical_headers();
        let signed_headers = headers.keys().cloned().collect::<Vec<_>>().join(";");
        let canonical_headers = headers
            .iter()
            .map(|(name, value)| format!("{}:{}\n", name, value))
            .collect::<String>();

        Ok(format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            self.action,
            object_path(self.bucket, self.object)?,
            self.canonical_query(&signed_headers),
            canonical_headers,
            signed_headers,
            UNSIGNED_PAYLOAD
        ))
    }

    pub fn string_to_sign(&self) -> Result<String> {
        let digest = Sha256::digest(self.canonical_request()?.as_bytes());
        Ok(format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            self.timestamp(),
            self.credential_scope(),
            hex::encode(digest)
        ))
    }

    /// Builds the final url. `sign` receives the string to sign and returns
    /// the raw RSA-SHA256 signature.
    pub fn sign_with<F>(&self, sign: F) -> Result<String>
    where
        F: FnOnce(&[u8]) -> Result<Vec<u8>>,
    {
        if self.expiry < MIN_EXPIRY || self.expiry > MAX_EXPIRY {
            return Err(ClientError::InvalidExpiry(self.expiry));
        }

        let signature = sign(self.string_to_sign()?.as_bytes())?;
        let signed_headers = self
            .canonical_headers()
            .keys()
            .cloned()
            .collect::<Vec<_>>()
            .join(";");

        Ok(format!(
            "{}://{}{}?{}&X-Goog-Signature={}",
            self.endpoint.scheme(),
            self.host(),
            object_path(self.bucket, self.object)?,
            self.canonical_query(&signed_headers),
            hex::encode(signature)
        ))
    }
}
