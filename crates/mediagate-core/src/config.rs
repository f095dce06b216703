//! Configuration module
//!
//! The whole process configuration is read from the environment exactly once
//! (`Config::from_env`) and then passed around explicitly. Nothing downstream
//! reads environment variables on its own.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::storage_types::StorageBackend;

const SERVER_PORT: u16 = 3000;
const MAX_UPLOAD_SIZE_MB: usize = 500;
const URL_FETCH_TIMEOUT_SECS: u64 = 30;
const URL_FETCH_MAX_REDIRECTS: usize = 5;
const STORAGE_TIMEOUT_SECS: u64 = 300;
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// How callers authenticate towards the remote storage collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Every upload request carries its own `Authorization: Bearer` credential.
    Bearer,
    /// A long-lived service credential configured for the backend is used.
    Service,
}

impl FromStr for AuthMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bearer" | "oauth" => Ok(AuthMode::Bearer),
            "service" | "service_account" => Ok(AuthMode::Service),
            _ => Err(anyhow::anyhow!("Invalid auth mode: {}", s)),
        }
    }
}

impl Display for AuthMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AuthMode::Bearer => write!(f, "bearer"),
            AuthMode::Service => write!(f, "service"),
        }
    }
}

/// Console log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compact" | "pretty" | "text" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!("Invalid log format: {}", s)),
        }
    }
}

/// Server-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub log_format: LogFormat,
}

/// Media ingestion configuration
#[derive(Clone, Debug)]
pub struct MediaGateConfig {
    pub base: BaseConfig,
    // Local artifacts
    pub upload_dir: PathBuf,
    pub public_base_url: Option<String>,
    pub max_upload_size_bytes: usize,
    pub max_name_attempts: u32,
    // Derived audio
    pub ffmpeg_path: String,
    // Upload-by-URL
    pub url_fetch_timeout_secs: u64,
    pub url_fetch_max_redirects: usize,
    pub url_upload_allow_private_ips: bool,
    pub url_upload_allowlist: Option<Vec<String>>,
    // Remote storage
    pub storage_backend: Option<StorageBackend>,
    pub storage_timeout_secs: u64,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    // Authentication
    pub auth_mode: AuthMode,
    pub auth_token: Option<String>,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<MediaGateConfig>);

impl Config {
    fn inner(&self) -> &MediaGateConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = MediaGateConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn log_format(&self) -> LogFormat {
        self.inner().base.log_format
    }

    pub fn upload_dir(&self) -> &Path {
        &self.inner().upload_dir
    }

    pub fn public_base_url(&self) -> Option<&str> {
        self.inner().public_base_url.as_deref()
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.inner().max_upload_size_bytes
    }

    pub fn max_name_attempts(&self) -> u32 {
        self.inner().max_name_attempts
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.inner().ffmpeg_path
    }

    pub fn url_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.inner().url_fetch_timeout_secs)
    }

    pub fn url_fetch_max_redirects(&self) -> usize {
        self.inner().url_fetch_max_redirects
    }

    pub fn url_upload_allow_private_ips(&self) -> bool {
        self.inner().url_upload_allow_private_ips
    }

    pub fn url_upload_allowlist(&self) -> Option<&[String]> {
        self.inner().url_upload_allowlist.as_deref()
    }

    pub fn storage_backend(&self) -> Option<StorageBackend> {
        self.inner().storage_backend
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_secs(self.inner().storage_timeout_secs)
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.inner().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.inner().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.inner().aws_region.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.inner().local_storage_path.as_deref()
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.inner().auth_mode
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.inner().auth_token.as_deref()
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl MediaGateConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // APP_SERVER_PORT may carry a Go-style ":3000" listen address.
        let server_port = env::var("PORT")
            .or_else(|_| env::var("APP_SERVER_PORT"))
            .unwrap_or_else(|_| SERVER_PORT.to_string())
            .trim()
            .trim_start_matches(':')
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?;

        let log_format = env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "compact".to_string())
            .parse()?;

        let base = BaseConfig {
            server_port,
            cors_origins,
            environment,
            log_format,
        };

        let max_upload_size_mb = env::var("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_UPLOAD_SIZE_MB);

        let storage_backend = match non_empty_var("STORAGE_BACKEND") {
            Some(value) => Some(value.parse()?),
            None => None,
        };

        let auth_mode = env::var("AUTH_MODE")
            .unwrap_or_else(|_| "service".to_string())
            .parse()?;

        let config = MediaGateConfig {
            base,
            upload_dir: PathBuf::from(
                env::var("UPLOAD_DIR").unwrap_or_else(|_| "upload".to_string()),
            ),
            public_base_url: non_empty_var("PUBLIC_BASE_URL"),
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
            max_name_attempts: env::var("MAX_NAME_ATTEMPTS")
                .unwrap_or_else(|_| MAX_NAME_ATTEMPTS.to_string())
                .parse()
                .unwrap_or(MAX_NAME_ATTEMPTS),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            url_fetch_timeout_secs: env::var("URL_FETCH_TIMEOUT_SECS")
                .unwrap_or_else(|_| URL_FETCH_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(URL_FETCH_TIMEOUT_SECS),
            url_fetch_max_redirects: env::var("URL_FETCH_MAX_REDIRECTS")
                .unwrap_or_else(|_| URL_FETCH_MAX_REDIRECTS.to_string())
                .parse()
                .unwrap_or(URL_FETCH_MAX_REDIRECTS),
            url_upload_allow_private_ips: env::var("URL_UPLOAD_ALLOW_PRIVATE_IPS")
                .unwrap_or_else(|_| "false".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(false),
            url_upload_allowlist: env::var("URL_UPLOAD_ALLOWLIST").ok().map(|s| {
                s.split(',')
                    .map(|domain| domain.trim().to_lowercase())
                    .filter(|domain| !domain.is_empty())
                    .collect()
            }),
            storage_backend,
            storage_timeout_secs: env::var("STORAGE_TIMEOUT_SECS")
                .unwrap_or_else(|_| STORAGE_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(STORAGE_TIMEOUT_SECS),
            s3_bucket: non_empty_var("S3_BUCKET"),
            s3_region: non_empty_var("S3_REGION"),
            s3_endpoint: non_empty_var("S3_ENDPOINT"),
            aws_region: non_empty_var("AWS_REGION"),
            local_storage_path: non_empty_var("LOCAL_STORAGE_PATH"),
            auth_mode,
            auth_token: non_empty_var("AUTH_TOKEN"),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let environment = self.base.environment.to_lowercase();
        let is_production = environment == "production" || environment == "prod";
        if is_production && self.base.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.upload_dir.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("UPLOAD_DIR must not be empty"));
        }

        if let Some(ref base_url) = self.public_base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err(anyhow::anyhow!(
                    "PUBLIC_BASE_URL must start with http:// or https://"
                ));
            }
        }

        if self.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than 0"));
        }

        if self.max_name_attempts == 0 {
            return Err(anyhow::anyhow!("MAX_NAME_ATTEMPTS must be greater than 0"));
        }

        if self.url_fetch_timeout_secs == 0 || self.storage_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "URL_FETCH_TIMEOUT_SECS and STORAGE_TIMEOUT_SECS must be greater than 0"
            ));
        }

        if is_production && self.url_upload_allow_private_ips {
            return Err(anyhow::anyhow!(
                "URL_UPLOAD_ALLOW_PRIVATE_IPS cannot be enabled in production"
            ));
        }

        if self.auth_token.is_some() && self.auth_mode != AuthMode::Bearer {
            return Err(anyhow::anyhow!("AUTH_TOKEN requires AUTH_MODE=bearer"));
        }

        let backend = self.storage_backend.unwrap_or(StorageBackend::Local);
        match backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}
