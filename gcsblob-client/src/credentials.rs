//! OAuth2 access tokens for the storage API.
//!
//! Credentials are resolved once when the client is built. Tokens are fetched
//! lazily on the first authenticated request and reused until shortly before
//! they expire.

use crate::error::{ClientError, Result};
use chrono::{DateTime, Duration, Utc};
use gcsblob_models::{Config, CredentialsSource};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    path::{Path, PathBuf},
};

pub const STORAGE_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.full_control";

const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug)]
pub enum TokenProvider {
    Anonymous,
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUserKey),
    Metadata,
}

impl TokenProvider {
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.credentials_source {
            CredentialsSource::None => Ok(Self::Anonymous),
            CredentialsSource::Static => {
                let json = config
                    .json_key
                    .as_deref()
                    .ok_or(gcsblob_models::Error::MissingJsonKey)?;
                Ok(serde_json::from_str::<KeyFile>(json)?.into())
            }
            CredentialsSource::Default => Self::application_default(),
        }
    }

    fn application_default() -> Result<Self> {
        if let Some(path) = std::env::var_os(CREDENTIALS_ENV) {
            return Self::from_path(Path::new(&path));
        }

        match well_known_file().filter(|path| path.is_file()) {
            Some(path) => Self::from_path(&path),
            None => {
                log::debug!("no credentials file found, using the metadata server");
                Ok(Self::Metadata)
            }
        }
    }

    fn from_path(path: &Path) -> Result<Self> {
        log::debug!("loading credentials from {}", path.display());

        let contents = std::fs::read_to_string(path).map_err(|source| {
            ClientError::CredentialsFile {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Ok(serde_json::from_str::<KeyFile>(&contents)?.into())
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    pub fn service_account(&self) -> Option<&ServiceAccountKey> {
        match self {
            Self::ServiceAccount(key) => Some(key),
            _ => None,
        }
    }

    /// Requests a fresh access token. Anonymous providers never have one.
    pub async fn fetch(&self, http: &reqwest::Client) -> Result<Option<AccessToken>> {
        let (url, request) = match self {
            Self::Anonymous => return Ok(None),
            Self::ServiceAccount(key) => {
                let assertion = key.assertion(Utc::now())?;
                let request = http.post(&key.token_uri).form(&[
                    ("grant_type", JWT_BEARER_GRANT),
                    ("assertion", assertion.as_str()),
                ]);
                (key.token_uri.as_str(), request)
            }
            Self::AuthorizedUser(key) => {
                let request = http.post(GOOGLE_TOKEN_URI).form(&[
                    ("grant_type", "refresh_token"),
                    ("client_id", key.client_id.as_str()),
                    ("client_secret", key.client_secret.as_str()),
                    ("refresh_token", key.refresh_token.as_str()),
                ]);
                (GOOGLE_TOKEN_URI, request)
            }
            Self::Metadata => {
                let request = http
                    .get(METADATA_TOKEN_URL)
                    .header("Metadata-Flavor", "Google");
                (METADATA_TOKEN_URL, request)
            }
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Token {
                url: url.to_string(),
                status,
                body: response.text().await.unwrap_or_default(),
            });
        }

        let token: TokenResponse = response.json().await?;
        Ok(Some(AccessToken::new(token, Utc::now())))
    }
}

impl From<KeyFile> for TokenProvider {
    fn from(key_file: KeyFile) -> Self {
        match key_file {
            KeyFile::ServiceAccount(key) => Self::ServiceAccount(key),
            KeyFile::AuthorizedUser(key) => Self::AuthorizedUser(key),
        }
    }
}

/// `gcloud auth application-default login` stores its credentials here.
fn well_known_file() -> Option<PathBuf> {
    dirs_next::config_dir().map(|dir| {
        dir.join("gcloud")
            .join("application_default_credentials.json")
    })
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeyFile {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUserKey),
}

#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    private_key: String,

    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    fn encoding_key(&self) -> Result<EncodingKey> {
        Ok(EncodingKey::from_rsa_pem(self.private_key.as_bytes())?)
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let iat = now.timestamp();
        let claims = Claims {
            iss: &self.client_email,
            scope: STORAGE_SCOPE,
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.encoding_key()?,
        )?)
    }

    /// RSASSA-PKCS1-v1_5 SHA-256 signature over `message`.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

        let signature =
            jsonwebtoken::crypto::sign(message, &self.encoding_key()?, Algorithm::RS256)?;
        Ok(URL_SAFE_NO_PAD.decode(signature)?)
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Clone, Deserialize)]
pub struct AuthorizedUserKey {
    client_id: String,
    client_secret: String,
    refresh_token: String,
}

impl fmt::Debug for AuthorizedUserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedUserKey")
            .field("client_id", &self.client_id)
            .finish()
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Clone)]
pub struct AccessToken {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    fn new(response: TokenResponse, now: DateTime<Utc>) -> Self {
        Self {
            value: response.access_token,
            expires_at: response
                .expires_in
                .map(|secs| now + Duration::seconds(secs)),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now + Duration::seconds(EXPIRY_MARGIN_SECS) < expires_at,
            None => true,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
