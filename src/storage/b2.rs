//! Backblaze B2 native API client
//!
//! A [`B2Client`] authorizes once at construction and keeps that account
//! session for its lifetime; it is never refreshed. Every upload asks for a
//! fresh upload URL and token, which is used once and dropped.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info};

use super::{ArchiveStore, Result, StorageError, StoreConnector, build_url, encode_object_name};
use crate::config::StorageConfig;
use crate::humanize::ByteSize;

const AUTHORIZE_ACCOUNT_PATH: &str = "/b2api/v2/b2_authorize_account";
const GET_UPLOAD_URL_PATH: &str = "/b2api/v4/b2_get_upload_url";

/// Sentinel accepted by B2 in place of a SHA1 to skip content verification
const SKIP_SHA1_VERIFICATION: &str = "do_not_verify";
const FILE_AUTHOR: &str = "zipbox";

/// Everything needed to talk to one B2 bucket
#[derive(Debug, Clone)]
pub struct B2Config {
    pub auth_url: String,
    pub key_id: String,
    pub application_key: String,
    pub bucket_id: String,
    pub bucket_name: String,
    pub public_host: String,
    pub request_timeout: Duration,
    pub insecure_skip_verify: bool,
}

impl B2Config {
    pub fn from_storage_config(config: &StorageConfig) -> Result<Self> {
        let require = |value: &Option<String>, name: &str| {
            value
                .clone()
                .ok_or_else(|| StorageError::Misconfigured(format!("{name} is not set")))
        };

        Ok(Self {
            auth_url: config.auth_url.trim_end_matches('/').to_string(),
            key_id: require(&config.key_id, "B2_USER")?,
            application_key: require(&config.application_key, "B2_KEY")?,
            bucket_id: require(&config.bucket_id, "storage.bucket_id")?,
            bucket_name: require(&config.bucket_name, "storage.bucket_name")?,
            public_host: config.public_host.clone(),
            request_timeout: config.request_timeout(),
            insecure_skip_verify: config.insecure_skip_verify,
        })
    }

    /// HTTP client for the account and upload endpoints
    pub fn http_client(&self) -> Result<Client> {
        let mut builder = Client::builder().timeout(self.request_timeout);

        if self.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder
            .build()
            .map_err(|e| StorageError::Misconfigured(format!("HTTP client: {e}")))
    }
}

/// Account-level session returned by `b2_authorize_account`
#[derive(Debug, Clone)]
pub struct AccountSession {
    pub api_url: String,
    pub authorization_token: String,
}

/// Single-use upload target returned by `b2_get_upload_url`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCredential {
    pub upload_url: String,
    pub authorization_token: String,
    pub bucket_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizeAccountResponse {
    api_url: String,
    authorization_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetUploadUrlResponse {
    upload_url: String,
    authorization_token: String,
    #[serde(default)]
    bucket_id: Option<String>,
}

pub struct B2Client {
    http: Client,
    config: B2Config,
    session: AccountSession,
}

impl B2Client {
    /// Authorize the account. Any failure here is fatal; there is no
    /// fallback identity.
    pub async fn connect(http: Client, config: B2Config) -> Result<Self> {
        info!(bucket = %config.bucket_name, "Authenticating with B2 API");

        let response = http
            .get(format!("{}{}", config.auth_url, AUTHORIZE_ACCOUNT_PATH))
            .basic_auth(&config.key_id, Some(&config.application_key))
            .send()
            .await
            .map_err(|e| StorageError::Authentication(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), %body, "B2 account authorization rejected");
            return Err(StorageError::Authentication(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let auth: AuthorizeAccountResponse = response
            .json()
            .await
            .map_err(|e| StorageError::Authentication(format!("malformed response: {e}")))?;

        info!("Successfully authenticated with B2 API");

        Ok(Self {
            http,
            config,
            session: AccountSession {
                api_url: auth.api_url.trim_end_matches('/').to_string(),
                authorization_token: auth.authorization_token,
            },
        })
    }

    pub fn session(&self) -> &AccountSession {
        &self.session
    }

    /// Ask for a fresh upload URL and token using the account session.
    ///
    /// An expired or invalid session surfaces as
    /// [`StorageError::Authentication`] and is not retried.
    pub async fn request_upload_credential(&self) -> Result<UploadCredential> {
        debug!(bucket_id = %self.config.bucket_id, "Requesting B2 upload URL");

        let response = self
            .http
            .post(format!("{}{}", self.session.api_url, GET_UPLOAD_URL_PATH))
            .header(AUTHORIZATION, &self.session.authorization_token)
            .json(&json!({ "bucketId": self.config.bucket_id }))
            .send()
            .await
            .map_err(|e| StorageError::Authentication(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), %body, "B2 upload URL request rejected");
            return Err(StorageError::Authentication(format!(
                "upload credential request returned HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let data: GetUploadUrlResponse = response
            .json()
            .await
            .map_err(|e| StorageError::Authentication(format!("malformed response: {e}")))?;

        Ok(UploadCredential {
            upload_url: data.upload_url,
            authorization_token: data.authorization_token,
            bucket_id: data.bucket_id.unwrap_or_else(|| self.config.bucket_id.clone()),
        })
    }

    /// Upload `data` as `destination` with one fresh credential and exactly
    /// one request. Returns the public download URL.
    pub async fn upload(&self, data: Bytes, destination: &str) -> Result<String> {
        let credential = self.request_upload_credential().await?;
        let size = data.len();

        info!(file = destination, size = %ByteSize(size as u64), "Uploading file to B2");

        let response = self
            .http
            .post(&credential.upload_url)
            .header(AUTHORIZATION, &credential.authorization_token)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, size)
            .header("X-Bz-File-Name", encode_object_name(destination))
            .header("X-Bz-Content-Sha1", SKIP_SHA1_VERIFICATION)
            .header("X-Bz-Info-Author", FILE_AUTHOR)
            .body(data)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!(file = destination, status = status.as_u16(), %body, "B2 upload failed");
            return Err(StorageError::UploadFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let download_url = build_url(
            &self.config.public_host,
            &self.config.bucket_name,
            destination,
        );
        info!(file = destination, %download_url, "Uploaded file to B2");

        Ok(download_url)
    }
}

#[async_trait]
impl ArchiveStore for B2Client {
    async fn upload(&self, data: Bytes, destination: &str) -> Result<String> {
        B2Client::upload(self, data, destination).await
    }
}

/// Authorizes a new [`B2Client`] for every job. Sessions are not shared.
pub struct B2Connector {
    http: Client,
    config: B2Config,
}

impl B2Connector {
    pub fn new(config: B2Config) -> Result<Self> {
        let http = config.http_client()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl StoreConnector for B2Connector {
    async fn connect(&self) -> Result<Box<dyn ArchiveStore>> {
        let client = B2Client::connect(self.http.clone(), self.config.clone()).await?;
        Ok(Box::new(client))
    }
}
