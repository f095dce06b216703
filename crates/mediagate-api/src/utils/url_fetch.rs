//! Guarded outbound fetch for upload-by-URL.
//!
//! Every hop (the first request and each redirect) goes through
//! [`validate_url`], hostnames are resolved once and checked, and the
//! connection is pinned to exactly the addresses that were checked so a
//! second DNS answer cannot redirect it.

use async_trait::async_trait;
use mediagate_core::{AppError, Config};
use reqwest::{header::LOCATION, redirect::Policy, StatusCode, Url};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use super::ssrf_validation::{check_resolved, validate_url, UrlPolicy, UrlRejection, ValidatedUrl};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("URL rejected: {0}")]
    Rejected(#[from] UrlRejection),

    #[error("could not resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("URL returned status {0}")]
    Status(StatusCode),

    #[error("more than {0} redirects")]
    TooManyRedirects(usize),

    #[error("redirect without a usable Location header")]
    BadRedirect,

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("response body exceeds {0} bytes")]
    TooLarge(u64),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err)
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Rejected(reason) => AppError::UrlNotAllowed(reason.to_string()),
            FetchError::TooLarge(limit) => {
                AppError::PayloadTooLarge(format!("Remote file exceeds {} bytes", limit))
            }
            other => AppError::UpstreamUnavailable(other.to_string()),
        }
    }
}

/// Name resolution used by the guard.
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>>;
}

/// Resolver backed by the system's `getaddrinfo`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
        Ok(tokio::net::lookup_host((host, port)).await?.collect())
    }
}

/// A successful fetch: the 200 response, ready to be streamed.
pub struct Fetched {
    /// The URL the client asked for (before redirects).
    pub requested: Url,
    pub response: reqwest::Response,
}

#[derive(Clone)]
pub struct UrlFetcher {
    policy: UrlPolicy,
    timeout: Duration,
    max_redirects: usize,
    resolver: Arc<dyn HostResolver>,
}

impl UrlFetcher {
    pub fn new(policy: UrlPolicy, timeout: Duration, max_redirects: usize) -> Self {
        Self {
            policy,
            timeout,
            max_redirects,
            resolver: Arc::new(SystemResolver),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let policy = UrlPolicy {
            allow_private_ips: config.url_upload_allow_private_ips(),
            allowlist: config.url_upload_allowlist().map(|list| list.to_vec()),
        };
        Self::new(
            policy,
            config.url_fetch_timeout(),
            config.url_fetch_max_redirects(),
        )
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn HostResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Validate `raw` and GET it, following redirects by hand.
    ///
    /// The whole exchange, including reading the body later, is bounded by
    /// the configured timeout.
    pub async fn fetch(&self, raw: &str) -> Result<Fetched, FetchError> {
        let deadline = Instant::now() + self.timeout;
        let mut target = validate_url(raw, &self.policy)?;
        let requested = target.url.clone();

        for hop in 0..=self.max_redirects {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(FetchError::Timeout(self.timeout));
            }

            let addrs = self.checked_addrs(&target).await?;
            let mut builder = reqwest::Client::builder()
                .redirect(Policy::none())
                .no_proxy()
                .timeout(remaining);
            if target.literal_ip.is_none() {
                builder = builder.resolve_to_addrs(&target.host, &addrs);
            }
            let client = builder.build()?;

            tracing::debug!(url = %target.url, hop, "Fetching remote file");
            let response = client
                .get(target.url.clone())
                .send()
                .await
                .map_err(|e| self.classify_transport(e))?;

            let status = response.status();
            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or(FetchError::BadRedirect)?;
                let next = target.url.join(location).map_err(|_| FetchError::BadRedirect)?;
                tracing::debug!(from = %target.url, to = %next, "Following redirect");
                target = validate_url(next.as_str(), &self.policy)?;
                continue;
            }

            if status != StatusCode::OK {
                return Err(FetchError::Status(status));
            }

            return Ok(Fetched {
                requested,
                response,
            });
        }

        Err(FetchError::TooManyRedirects(self.max_redirects))
    }

    /// Map a body-read error the same way as a request error.
    pub fn classify_transport(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Transport(err)
        }
    }

    async fn checked_addrs(&self, target: &ValidatedUrl) -> Result<Vec<SocketAddr>, FetchError> {
        if let Some(ip) = target.literal_ip {
            return Ok(vec![SocketAddr::new(ip, target.port)]);
        }

        let addrs = self
            .resolver
            .resolve(&target.host, target.port)
            .await
            .map_err(|source| FetchError::Resolve {
                host: target.host.clone(),
                source,
            })?;
        if addrs.is_empty() {
            return Err(FetchError::Resolve {
                host: target.host.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "no addresses"),
            });
        }

        if let Err(rejection) = check_resolved(&addrs, &self.policy) {
            tracing::warn!(
                host = %target.host,
                error = %rejection,
                "Hostname resolves to a blocked address"
            );
            return Err(rejection.into());
        }
        Ok(addrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::header,
        response::{IntoResponse, Redirect},
        routing::get,
        Router,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedResolver(Vec<SocketAddr>);

    #[async_trait]
    impl HostResolver for FixedResolver {
        async fn resolve(&self, _host: &str, _port: u16) -> io::Result<Vec<SocketAddr>> {
            Ok(self.0.clone())
        }
    }

    fn permissive(max_redirects: usize) -> UrlFetcher {
        let policy = UrlPolicy {
            allow_private_ips: true,
            allowlist: None,
        };
        UrlFetcher::new(policy, Duration::from_secs(5), max_redirects)
    }

    async fn serve(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn metadata_endpoint_is_refused_before_connecting() {
        let fetcher = UrlFetcher::new(UrlPolicy::default(), Duration::from_secs(5), 5);
        let err = fetcher
            .fetch("http://169.254.169.254/latest/meta-data")
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            FetchError::Rejected(UrlRejection::ForbiddenAddress(_))
        ));
        assert!(matches!(AppError::from(err), AppError::UrlNotAllowed(_)));
    }

    #[tokio::test]
    async fn rebinding_hostname_is_refused() {
        let resolver = FixedResolver(vec!["10.0.0.7:80".parse().unwrap()]);
        let fetcher = UrlFetcher::new(UrlPolicy::default(), Duration::from_secs(5), 5)
            .with_resolver(Arc::new(resolver));

        let err = fetcher.fetch("http://innocent.example/v.mp4").await.err().unwrap();
        assert!(matches!(err, FetchError::Rejected(_)));
    }

    #[tokio::test]
    async fn pins_connection_to_checked_address() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let addr = serve(Router::new().route(
            "/clip.mp4",
            get(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { ([(header::CONTENT_TYPE, "video/mp4")], "payload").into_response() }
            }),
        ))
        .await;

        let fetcher = permissive(5).with_resolver(Arc::new(FixedResolver(vec![addr])));
        let url = format!("http://media.invalid:{}/clip.mp4", addr.port());
        let fetched = fetcher.fetch(&url).await.unwrap();

        assert_eq!(fetched.requested.as_str(), url);
        assert_eq!(fetched.response.text().await.unwrap(), "payload");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn follows_redirects_up_to_the_limit() {
        let addr = serve(
            Router::new()
                .route("/a", get(|| async { Redirect::temporary("/b") }))
                .route("/b", get(|| async { Redirect::temporary("/c") }))
                .route("/c", get(|| async { "done" })),
        )
        .await;

        let ok = permissive(2)
            .fetch(&format!("http://{}/a", addr))
            .await
            .unwrap();
        assert_eq!(ok.response.text().await.unwrap(), "done");

        let err = permissive(1)
            .fetch(&format!("http://{}/a", addr))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, FetchError::TooManyRedirects(1)));
    }

    #[tokio::test]
    async fn redirect_targets_are_revalidated() {
        let addr = serve(Router::new().route(
            "/hop",
            get(|| async { Redirect::temporary("ftp://files.example/clip.mp4") }),
        ))
        .await;

        let err = permissive(5)
            .fetch(&format!("http://{}/hop", addr))
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            FetchError::Rejected(UrlRejection::SchemeNotAllowed(_))
        ));
    }

    #[tokio::test]
    async fn non_200_is_a_fetch_failure() {
        let addr = serve(Router::new()).await;
        let err = permissive(5)
            .fetch(&format!("http://{}/missing", addr))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, FetchError::Status(StatusCode::NOT_FOUND)));
        assert!(matches!(
            AppError::from(err),
            AppError::UpstreamUnavailable(_)
        ));
    }
}
