use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: ByteSize,
    #[serde(default = "default_max_urls_per_job")]
    pub max_urls_per_job: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            ledger_path: default_ledger_path(),
            max_payload_bytes: default_max_payload_bytes(),
            max_urls_per_job: default_max_urls_per_job(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("data/ledger")
}

fn default_max_payload_bytes() -> ByteSize {
    ByteSize(1024 * 1024) // 1 MB
}

fn default_max_urls_per_job() -> usize {
    500
}

/// Storage provider type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    /// Backblaze B2 native API
    #[default]
    B2,
    /// Local filesystem through `object_store`
    Local,
    /// In-process memory store, for development
    Memory,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub provider: StorageProvider,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    pub bucket_id: Option<String>,
    pub bucket_name: Option<String>,
    /// Host serving public downloads, without scheme
    #[serde(default = "default_public_host")]
    pub public_host: String,
    #[serde(default = "default_local_root")]
    pub local_root: PathBuf,
    #[serde(default)]
    pub insecure_skip_verify: bool,
    #[serde(default = "default_storage_timeout_secs")]
    pub request_timeout_secs: u64,
    /// B2 key id (loaded from environment, not from config file)
    #[serde(skip)]
    pub key_id: Option<String>,
    /// B2 application key (loaded from environment, not from config file)
    #[serde(skip)]
    pub application_key: Option<String>,
}

impl StorageConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: StorageProvider::default(),
            auth_url: default_auth_url(),
            bucket_id: None,
            bucket_name: None,
            public_host: default_public_host(),
            local_root: default_local_root(),
            insecure_skip_verify: false,
            request_timeout_secs: default_storage_timeout_secs(),
            key_id: None,
            application_key: None,
        }
    }
}

fn default_auth_url() -> String {
    "https://api.backblazeb2.com".to_string()
}

fn default_public_host() -> String {
    "f004.backblazeb2.com".to_string()
}

fn default_local_root() -> PathBuf {
    PathBuf::from("data/archives")
}

fn default_storage_timeout_secs() -> u64 {
    300
}

/// Media fetch configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

impl FetchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            request_timeout_secs: default_request_timeout_secs(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
            insecure_skip_verify: false,
        }
    }
}

fn default_batch_size() -> usize {
    4
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    10
}

fn default_user_agent() -> String {
    format!("ZipBox/{}", env!("CARGO_PKG_VERSION"))
}

/// Webhook delivery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookConfig {
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

impl WebhookConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_channel_size")]
    pub channel_size: usize,
    /// Parent directory for per-job scratch space (system temp dir when unset)
    pub temp_root: Option<PathBuf>,
    /// Deflate level 1-9 for archive entries (zip default when unset)
    #[serde(default)]
    pub archive_compression_level: Option<i64>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            channel_size: default_channel_size(),
            temp_root: None,
            archive_compression_level: None,
        }
    }
}

fn default_workers() -> usize {
    2
}

fn default_channel_size() -> usize {
    100
}

/// Retention configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    #[serde(default = "default_job_ttl_days")]
    pub job_ttl_days: u32,
}

impl RetentionConfig {
    pub fn job_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.job_ttl_days) * 86_400)
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            job_ttl_days: default_job_ttl_days(),
        }
    }
}

fn default_job_ttl_days() -> u32 {
    1
}
