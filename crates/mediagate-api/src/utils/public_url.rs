//! Public URLs for stored artifacts.

use axum::http::{HeaderMap, Uri};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped in a single path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

pub const UPLOADS_PATH: &str = "/uploads/";

/// Where the request came from, as far as URL building is concerned.
#[derive(Debug, Clone, Default)]
pub struct RequestOrigin {
    pub scheme: Option<String>,
    pub host: Option<String>,
}

impl RequestOrigin {
    /// Forwarded headers first, then the request itself. Without TLS
    /// information at this layer the scheme falls back to `http`.
    pub fn from_request(headers: &HeaderMap, uri: &Uri) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.split(',').next().unwrap_or(v).trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let scheme = header("x-forwarded-proto").or_else(|| uri.scheme_str().map(String::from));
        let host = header("x-forwarded-host")
            .or_else(|| header("host"))
            .or_else(|| uri.authority().map(|a| a.to_string()));

        Self { scheme, host }
    }
}

/// Public URL of the artifact stored as `file_name`.
pub fn public_file_url(base_url: Option<&str>, origin: &RequestOrigin, file_name: &str) -> String {
    let escaped = utf8_percent_encode(file_name, SEGMENT);

    if let Some(base) = base_url {
        return format!("{}{}{}", base.trim_end_matches('/'), UPLOADS_PATH, escaped);
    }

    match origin.host.as_deref() {
        Some(host) => {
            let scheme = origin.scheme.as_deref().unwrap_or("http");
            format!("{}://{}{}{}", scheme, host, UPLOADS_PATH, escaped)
        }
        None => format!("{}{}", UPLOADS_PATH, escaped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn base_url_wins_and_is_trimmed() {
        let origin = RequestOrigin {
            scheme: Some("http".into()),
            host: Some("internal:3000".into()),
        };
        assert_eq!(
            public_file_url(Some("https://media.example.com/"), &origin, "clip.mp4"),
            "https://media.example.com/uploads/clip.mp4"
        );
    }

    #[test]
    fn names_are_escaped_as_one_segment() {
        let url = public_file_url(None, &RequestOrigin::default(), "my clip #1?.mp4");
        assert_eq!(url, "/uploads/my%20clip%20%231%3F.mp4");
    }

    #[test]
    fn forwarded_headers_take_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("10.0.0.2:3000"));
        headers.insert("x-forwarded-host", HeaderValue::from_static("media.example.com"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https, http"));

        let origin = RequestOrigin::from_request(&headers, &Uri::from_static("/upload"));
        assert_eq!(
            public_file_url(None, &origin, "a.mp3"),
            "https://media.example.com/uploads/a.mp3"
        );
    }

    #[test]
    fn host_header_with_default_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("localhost:3000"));

        let origin = RequestOrigin::from_request(&headers, &Uri::from_static("/upload"));
        assert_eq!(
            public_file_url(None, &origin, "a.mp3"),
            "http://localhost:3000/uploads/a.mp3"
        );
    }
}
