//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p mediagate-api`. Everything runs
//! in-process against temporary directories; the remote store is
//! `LocalStorage` unless a test swaps it.

#![allow(dead_code)]

pub mod fixtures;
pub mod storage;

use axum_test::TestServer;
use mediagate_api::setup::routes;
use mediagate_api::AppState;
use mediagate_core::{AuthMode, BaseConfig, Config, LogFormat, MediaGateConfig, StorageBackend};
use mediagate_processing::AudioExtractor;
use mediagate_storage::{LocalStorage, RemoteStore, StaticStoreProvider};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const PUBLIC_BASE_URL: &str = "http://media.test";
pub const TEST_TOKEN: &str = "test-token";

pub fn create_test_config(upload_dir: &Path, remote_dir: &Path) -> MediaGateConfig {
    MediaGateConfig {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            environment: "test".to_string(),
            log_format: LogFormat::Compact,
        },
        upload_dir: upload_dir.to_path_buf(),
        public_base_url: Some(PUBLIC_BASE_URL.to_string()),
        max_upload_size_bytes: 10 * 1024 * 1024,
        max_name_attempts: 100,
        ffmpeg_path: "ffmpeg".to_string(),
        url_fetch_timeout_secs: 5,
        url_fetch_max_redirects: 3,
        url_upload_allow_private_ips: false,
        url_upload_allowlist: None,
        storage_backend: Some(StorageBackend::Local),
        storage_timeout_secs: 5,
        s3_bucket: None,
        s3_region: None,
        s3_endpoint: None,
        aws_region: None,
        local_storage_path: Some(remote_dir.display().to_string()),
        auth_mode: AuthMode::Service,
        auth_token: None,
    }
}

/// Test application: server plus the directories it writes to.
pub struct TestApp {
    pub server: TestServer,
    pub extractor_calls: Arc<AtomicUsize>,
    pub upload_dir: PathBuf,
    pub remote_dir: PathBuf,
    _upload_root: TempDir,
    _remote_root: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn upload_dir_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.upload_dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Files currently held by the remote store, relative to its root.
    pub fn remote_objects(&self) -> Vec<String> {
        let mut found = Vec::new();
        collect_files(&self.remote_dir, &self.remote_dir, &mut found);
        found.sort();
        found
    }

    /// Remote compensation runs in the background; wait for it to settle.
    pub async fn wait_for_remote_count(&self, expected: usize) -> Vec<String> {
        for _ in 0..50 {
            let objects = self.remote_objects();
            if objects.len() == expected {
                return objects;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.remote_objects()
    }
}

fn collect_files(root: &Path, dir: &Path, found: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, found);
        } else if let Ok(relative) = path.strip_prefix(root) {
            found.push(relative.to_string_lossy().into_owned());
        }
    }
}

/// Builder for a [`TestApp`]; defaults to local storage and a fake extractor.
pub struct TestAppBuilder {
    tweak: Box<dyn FnOnce(&mut MediaGateConfig)>,
    store: Option<Arc<dyn RemoteStore>>,
    fail_upload: Option<usize>,
    extractor: Option<Arc<dyn AudioExtractor>>,
}

impl TestAppBuilder {
    pub fn configure(mut self, f: impl FnOnce(&mut MediaGateConfig) + 'static) -> Self {
        self.tweak = Box::new(f);
        self
    }

    pub fn store(mut self, store: Arc<dyn RemoteStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Keep the local remote store but refuse its `n`-th upload.
    pub fn fail_upload(mut self, n: usize) -> Self {
        self.fail_upload = Some(n);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn AudioExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub async fn build(self) -> TestApp {
        let upload_root = tempfile::tempdir().expect("Failed to create upload directory");
        let remote_root = tempfile::tempdir().expect("Failed to create remote directory");
        let upload_dir = upload_root.path().join("upload");

        let mut inner = create_test_config(&upload_dir, remote_root.path());
        (self.tweak)(&mut inner);
        let config = Config(Box::new(inner));

        let mut store: Arc<dyn RemoteStore> = match self.store {
            Some(store) => store,
            None => Arc::new(
                LocalStorage::new(remote_root.path())
                    .await
                    .expect("Failed to create local storage"),
            ),
        };
        if let Some(n) = self.fail_upload {
            store = Arc::new(storage::FailNthUpload::new(store, n));
        }

        let fake = storage::FakeExtractor::default();
        let extractor_calls = fake.calls();
        let extractor = self.extractor.unwrap_or_else(|| Arc::new(fake));

        let state = Arc::new(AppState::new(
            config.clone(),
            Arc::new(StaticStoreProvider::new(store)),
            extractor,
        ));
        let router = routes::setup_routes(&config, state).expect("Failed to build router");
        let server = TestServer::new(router).expect("Failed to start test server");

        TestApp {
            server,
            extractor_calls,
            upload_dir,
            remote_dir: remote_root.path().to_path_buf(),
            _upload_root: upload_root,
            _remote_root: remote_root,
        }
    }
}

pub fn test_app() -> TestAppBuilder {
    TestAppBuilder {
        tweak: Box::new(|_| {}),
        store: None,
        fail_upload: None,
        extractor: None,
    }
}

/// Setup test app with local storage and a fake extractor.
pub async fn setup_test_app() -> TestApp {
    test_app().build().await
}
