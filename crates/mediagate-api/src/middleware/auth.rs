//! Credential extraction for upload routes.
//!
//! In bearer mode the request must carry `Authorization: Bearer <token>`;
//! when `AUTH_TOKEN` is configured the token must also match it. In service
//! mode the backend's own credential is used. Either way the handler receives
//! a [`Credential`] extension that is only ever handed to the store provider.

use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use mediagate_core::{AppError, AuthMode, Config};
use mediagate_storage::Credential;
use std::sync::Arc;
use subtle::ConstantTimeEq;

#[derive(Clone)]
pub struct AuthState {
    pub mode: AuthMode,
    pub expected_token: Option<String>,
}

impl AuthState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            mode: config.auth_mode(),
            expected_token: config.auth_token().map(String::from),
        }
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn bearer_token(request: &Request) -> Option<&str> {
    let value = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}

fn unauthorized(message: &str) -> Response {
    HttpAppError(AppError::Unauthorized(message.to_string())).into_response()
}

pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let credential = match auth_state.mode {
        AuthMode::Service => Credential::Service,
        AuthMode::Bearer => {
            let token = match bearer_token(&request) {
                Some(token) => token.to_string(),
                None => return unauthorized("Missing bearer token"),
            };

            if let Some(expected) = auth_state.expected_token.as_deref() {
                if !secure_compare(&token, expected) {
                    tracing::warn!(path = %request.uri().path(), "Rejected bearer token");
                    return unauthorized("Invalid bearer token");
                }
            }

            Credential::Bearer(token)
        }
    };

    request.extensions_mut().insert(credential);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn secure_compare_matches_exactly() {
        assert!(secure_compare("abc", "abc"));
        assert!(!secure_compare("abc", "abd"));
        assert!(!secure_compare("abc", "abcd"));
    }

    #[test]
    fn bearer_token_parsing() {
        let request = Request::builder()
            .header(AUTHORIZATION, "Bearer  tok-123 ")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&request), Some("tok-123"));

        let request = Request::builder()
            .header(AUTHORIZATION, "Basic dXNlcjpwdw==")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&request), None);

        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(bearer_token(&request), None);
    }
}
