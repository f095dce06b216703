//! Startup checks that need the filesystem or the environment, on top of
//! `Config::validate`.

use anyhow::{Context, Result};
use mediagate_core::{AuthMode, Config};

pub async fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    let upload_dir = config.upload_dir();
    tokio::fs::create_dir_all(upload_dir)
        .await
        .with_context(|| format!("Cannot create upload directory {}", upload_dir.display()))?;

    let probe = tempfile::Builder::new()
        .prefix(".write-check-")
        .tempfile_in(upload_dir)
        .with_context(|| format!("Upload directory {} is not writable", upload_dir.display()))?;
    drop(probe);

    if config.is_production() && config.auth_mode() == AuthMode::Bearer && config.auth_token().is_none() {
        tracing::warn!(
            "AUTH_MODE=bearer without AUTH_TOKEN accepts any bearer token - the storage backend must verify it"
        );
    }

    if config.url_upload_allow_private_ips() {
        tracing::warn!("URL_UPLOAD_ALLOW_PRIVATE_IPS is enabled - upload-by-URL can reach internal hosts");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediagate_core::{BaseConfig, LogFormat, MediaGateConfig, StorageBackend};
    use std::path::PathBuf;

    fn config_for(upload_dir: PathBuf) -> Config {
        Config(Box::new(MediaGateConfig {
            base: BaseConfig {
                server_port: 3000,
                cors_origins: vec!["*".to_string()],
                environment: "test".to_string(),
                log_format: LogFormat::Compact,
            },
            upload_dir,
            public_base_url: None,
            max_upload_size_bytes: 1024,
            max_name_attempts: 10,
            ffmpeg_path: "ffmpeg".to_string(),
            url_fetch_timeout_secs: 30,
            url_fetch_max_redirects: 5,
            url_upload_allow_private_ips: false,
            url_upload_allowlist: None,
            storage_backend: Some(StorageBackend::Local),
            storage_timeout_secs: 30,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            aws_region: None,
            local_storage_path: Some("remote".to_string()),
            auth_mode: AuthMode::Service,
            auth_token: None,
        }))
    }

    #[tokio::test]
    async fn creates_missing_upload_dir() {
        let root = tempfile::tempdir().unwrap();
        let upload_dir = root.path().join("nested").join("upload");

        validate_config(&config_for(upload_dir.clone())).await.unwrap();

        assert!(upload_dir.is_dir());
        assert_eq!(std::fs::read_dir(&upload_dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn rejects_upload_dir_that_is_a_file() {
        let root = tempfile::tempdir().unwrap();
        let not_a_dir = root.path().join("upload");
        std::fs::write(&not_a_dir, b"").unwrap();

        assert!(validate_config(&config_for(not_a_dir)).await.is_err());
    }
}
