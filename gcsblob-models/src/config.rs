use crate::Error;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer};
use sha2::{Digest, Sha256};
use std::{fmt, io::Read, str::FromStr};
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// Everything the blobstore client needs to talk to a single bucket.
///
/// The JSON form mirrors the blobstore config file:
///
/// ```json
/// {
///   "bucket_name": "my-bucket",
///   "credentials_source": "static",
///   "json_key": "{ ...service account... }",
///   "storage_class": "NEARLINE",
///   "encryption_key": "<base64, 32 bytes>"
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bucket_name: String,

    #[serde(default)]
    pub credentials_source: CredentialsSource,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub json_key: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub storage_class: Option<StorageClass>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub encryption_key: Option<EncryptionKey>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub endpoint: Option<Url>,
}

impl Config {
    pub fn new(bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            ..Self::default()
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Error> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.bucket_name.trim().is_empty() {
            return Err(Error::MissingBucket);
        }

        match (&self.credentials_source, &self.json_key) {
            (CredentialsSource::Static, None) => Err(Error::MissingJsonKey),
            (CredentialsSource::Default, Some(_)) | (CredentialsSource::None, Some(_)) => {
                Err(Error::UnexpectedJsonKey)
            }
            _ => Ok(()),
        }
    }

    /// Service base url, `https://storage.googleapis.com` unless overridden.
    pub fn endpoint_url(&self) -> Url {
        match &self.endpoint {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid url"),
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.credentials_source == CredentialsSource::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialsSource {
    /// Application default credentials
    #[default]
    Default,
    /// Service account key taken from `json_key`
    Static,
    /// Anonymous access, the client is read-only
    None,
}

impl FromStr for CredentialsSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Ok(Self::Default),
            "static" => Ok(Self::Static),
            "none" => Ok(Self::None),
            other => Err(Error::UnknownCredentialsSource(other.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for CredentialsSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    Standard,
    MultiRegional,
    Regional,
    Nearline,
    Coldline,
    Archive,
    DurableReducedAvailability,
}

impl StorageClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
            Self::MultiRegional => "MULTI_REGIONAL",
            Self::Regional => "REGIONAL",
            Self::Nearline => "NEARLINE",
            Self::Coldline => "COLDLINE",
            Self::Archive => "ARCHIVE",
            Self::DurableReducedAvailability => "DURABLE_REDUCED_AVAILABILITY",
        }
    }
}

impl FromStr for StorageClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let class = match s.trim().to_ascii_uppercase().as_str() {
            "STANDARD" => Self::Standard,
            "MULTI_REGIONAL" => Self::MultiRegional,
            "REGIONAL" => Self::Regional,
            "NEARLINE" => Self::Nearline,
            "COLDLINE" => Self::Coldline,
            "ARCHIVE" => Self::Archive,
            "DURABLE_REDUCED_AVAILABILITY" => Self::DurableReducedAvailability,
            _ => return Err(Error::UnknownStorageClass(s.to_string())),
        };
        Ok(class)
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Customer-supplied AES-256 key. Every object request carries it in the
/// `x-goog-encryption-*` headers.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey {
    key: Vec<u8>,
}

impl EncryptionKey {
    pub const LEN: usize = 32;
    pub const ALGORITHM: &'static str = "AES256";

    pub fn encoded(&self) -> String {
        STANDARD.encode(&self.key)
    }

    pub fn sha256_encoded(&self) -> String {
        STANDARD.encode(Sha256::digest(&self.key))
    }

    pub fn headers(&self) -> [(&'static str, String); 3] {
        [
            ("x-goog-encryption-algorithm", Self::ALGORITHM.to_string()),
            ("x-goog-encryption-key", self.encoded()),
            ("x-goog-encryption-key-sha256", self.sha256_encoded()),
        ]
    }
}

impl FromStr for EncryptionKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = STANDARD.decode(s.trim())?;
        if key.len() != Self::LEN {
            return Err(Error::EncryptionKeyLength(key.len()));
        }
        Ok(Self { key })
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("sha256", &self.sha256_encoded())
            .finish()
    }
}

fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
