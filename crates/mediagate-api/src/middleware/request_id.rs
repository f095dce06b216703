//! Request ID middleware
//!
//! Reuses an incoming `X-Request-ID` or generates one, exposes it to handlers
//! as [`RequestId`] and echoes it on the response.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Debug, Clone)]
pub struct RequestId(pub String);

pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|s| !s.is_empty() && s.len() <= 128)
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    tracing::debug!(
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
        "Request received"
    );
    let mut response = next.run(request).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER.clone(), header_value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Extension, Router};
    use axum_test::TestServer;

    async fn echo(Extension(request_id): Extension<RequestId>) -> String {
        request_id.0
    }

    fn server() -> TestServer {
        let app = Router::new()
            .route("/", get(echo))
            .layer(axum::middleware::from_fn(request_id_middleware));
        TestServer::new(app).unwrap()
    }

    #[tokio::test]
    async fn handlers_see_the_incoming_id() {
        let response = server().get("/").add_header("x-request-id", "abc-1").await;
        assert_eq!(response.text(), "abc-1");
        assert_eq!(response.header("x-request-id"), "abc-1");
    }

    #[tokio::test]
    async fn missing_id_is_generated() {
        let response = server().get("/").await;
        let generated = response.text();
        assert!(Uuid::parse_str(&generated).is_ok());
        assert_eq!(response.header("x-request-id"), generated.as_str());
    }
}
