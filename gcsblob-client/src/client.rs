use crate::{
    credentials::{AccessToken, TokenProvider},
    error::{ClientError, Result},
    signer::{object_path, SignedUrlRequest},
    Blobstore, Download, PutOptions, UploadBody,
};
use async_trait::async_trait;
use chrono::Utc;
use futures::{StreamExt, TryStreamExt};
use gcsblob_models::{Config, EncryptionKey, SignAction, StorageClass};
use reqwest::{header, Body, Method, RequestBuilder, Response, StatusCode};
use std::{io, time::Duration};
use tokio::sync::Mutex;
use url::Url;

const STORAGE_CLASS_HEADER: &str = "x-goog-storage-class";

#[derive(Debug)]
pub struct GcsClient {
    http: reqwest::Client,
    endpoint: Url,
    bucket: String,
    storage_class: Option<StorageClass>,
    encryption_key: Option<EncryptionKey>,
    credentials: TokenProvider,
    token: Mutex<Option<AccessToken>>,
}

impl GcsClient {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let credentials = TokenProvider::from_config(config)?;
        Self::with_credentials(config, credentials)
    }

    pub fn with_credentials(config: &Config, credentials: TokenProvider) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("gcsblob/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint_url(),
            bucket: config.bucket_name.clone(),
            storage_class: config.storage_class,
            encryption_key: config.encryption_key.clone(),
            credentials,
            token: Mutex::new(None),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_url(&self, id: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.set_path(&object_path(&self.bucket, id)?);
        Ok(url)
    }

    fn check_writable(&self) -> Result<()> {
        if self.credentials.is_anonymous() {
            return Err(ClientError::ReadOnly);
        }
        Ok(())
    }

    fn with_encryption(&self, mut request: RequestBuilder) -> RequestBuilder {
        if let Some(key) = &self.encryption_key {
            for (name, value) in key.headers() {
                request = request.header(name, value);
            }
        }
        request
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let mut token = self.token.lock().await;
        let fresh = token
            .as_ref()
            .map_or(false, |token| token.is_fresh(Utc::now()));
        if !fresh {
            *token = self.credentials.fetch(&self.http).await?;
        }

        let request = match token.as_ref() {
            Some(token) => request.bearer_auth(token.value()),
            None => request,
        };
        drop(token);

        Ok(request.send().await?)
    }
}

async fn status_error(method: Method, response: Response) -> ClientError {
    let url = response.url().to_string();
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    ClientError::Status {
        method,
        url,
        status,
        body,
    }
}

#[async_trait]
impl Blobstore for GcsClient {
    async fn put(&self, body: UploadBody, dst: &str, options: PutOptions) -> Result<()> {
        self.check_writable()?;

        let url = self.object_url(dst)?;
        log::debug!("PUT {} (gzip: {})", url, options.gzipped);

        let mut request = self.http.put(url).body(Body::wrap_stream(body.stream));
        if let Some(len) = body.len {
            request = request.header(header::CONTENT_LENGTH, len);
        }
        if let Some(class) = self.storage_class {
            request = request.header(STORAGE_CLASS_HEADER, class.as_str());
        }
        if options.gzipped {
            request = request.header(header::CONTENT_ENCODING, "gzip");
        }

        let response = self.send(self.with_encryption(request)).await?;
        if !response.status().is_success() {
            return Err(status_error(Method::PUT, response).await);
        }
        Ok(())
    }

    async fn get(&self, src: &str) -> Result<Download> {
        let url = self.object_url(src)?;
        log::debug!("GET {}", url);

        let response = self.send(self.with_encryption(self.http.get(url))).await?;
        match response.status() {
            status if status.is_success() => Ok(Download {
                len: response.content_length(),
                stream: response
                    .bytes_stream()
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
                    .boxed(),
            }),
            StatusCode::NOT_FOUND => Err(ClientError::NotFound(src.to_string())),
            _ => Err(status_error(Method::GET, response).await),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.check_writable()?;

        let url = self.object_url(id)?;
        log::debug!("DELETE {}", url);

        let response = self.send(self.http.delete(url)).await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                log::debug!("{} is already gone", id);
                Ok(())
            }
            _ => Err(status_error(Method::DELETE, response).await),
        }
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        let url = self.object_url(id)?;
        log::debug!("HEAD {}", url);

        let response = self.send(self.with_encryption(self.http.head(url))).await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(status_error(Method::HEAD, response).await),
        }
    }

    fn sign(&self, id: &str, action: SignAction, expiry: Duration) -> Result<String> {
        let key = self
            .credentials
            .service_account()
            .ok_or(ClientError::SigningUnavailable)?;

        let request = SignedUrlRequest {
            action,
            endpoint: &self.endpoint,
            bucket: &self.bucket,
            object: id,
            expiry,
            timestamp: Utc::now(),
            client_email: &key.client_email,
            headers: self
                .encryption_key
                .as_ref()
                .map(|key| key.headers().into_iter().collect())
                .unwrap_or_default(),
        };

        request.sign_with(|message| key.sign(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcsblob_models::CredentialsSource;

    fn anonymous_client() -> GcsClient {
        let mut config = Config::new("blobs");
        config.credentials_source = CredentialsSource::None;
        GcsClient::new(&config).unwrap()
    }

    #[test]
    fn builds_object_urls() {
        let client = anonymous_client();

        assert_eq!(client.bucket(), "blobs");
        assert_eq!(
            client.object_url("dir/a b").unwrap().as_str(),
            "https://storage.googleapis.com/blobs/dir/a%20b"
        );
    }

    #[test]
    fn object_urls_stay_inside_the_bucket() {
        let client = anonymous_client();

        for id in ["a/../b", "..", "../other-bucket/x", "./x"] {
            assert!(
                matches!(client.object_url(id), Err(ClientError::InvalidObjectName(_))),
                "{} was accepted",
                id
            );
        }
        assert_eq!(
            client.object_url("a/..b/c.").unwrap().as_str(),
            "https://storage.googleapis.com/blobs/a/..b/c."
        );
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(matches!(
            GcsClient::new(&Config::default()),
            Err(ClientError::Config(gcsblob_models::Error::MissingBucket))
        ));
    }

    #[tokio::test]
    async fn anonymous_client_is_read_only() {
        let client = anonymous_client();
        let empty = futures::stream::empty::<io::Result<bytes::Bytes>>();
        let body = UploadBody::new(Box::pin(empty), Some(0));

        assert!(matches!(
            client.put(body, "blob", PutOptions::default()).await,
            Err(ClientError::ReadOnly)
        ));
        assert!(matches!(
            client.delete("blob").await,
            Err(ClientError::ReadOnly)
        ));
    }

    #[test]
    fn signing_needs_service_account() {
        let client = anonymous_client();

        assert!(matches!(
            client.sign("blob", SignAction::Get, Duration::from_secs(60)),
            Err(ClientError::SigningUnavailable)
        ));
    }
}
