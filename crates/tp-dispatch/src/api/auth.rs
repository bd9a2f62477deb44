//! Shared-secret authentication for the send endpoints
//!
//! Callers present the secret in the `X-API-Key` header. The comparison is
//! constant-time.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

use super::ApiError;

pub const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Clone)]
pub struct ApiKeyAuth {
    api_key: Arc<str>,
}

impl ApiKeyAuth {
    pub fn new(api_key: impl Into<Arc<str>>) -> Self {
        Self { api_key: api_key.into() }
    }

    pub fn verify(&self, provided: Option<&str>) -> bool {
        match provided {
            Some(key) => key.as_bytes().ct_eq(self.api_key.as_bytes()).into(),
            None => false,
        }
    }
}

/// Reject the request with 401 unless it carries the configured API key.
pub async fn api_key_middleware(State(auth): State<ApiKeyAuth>, request: Request, next: Next) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if !auth.verify(provided) {
        warn!(
            path = %request.uri().path(),
            header_present = provided.is_some(),
            "Rejected request with invalid API key"
        );
        return ApiError::Unauthorized.into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify() {
        let auth = ApiKeyAuth::new("s3cret");
        assert!(auth.verify(Some("s3cret")));
        assert!(!auth.verify(Some("s3cret ")));
        assert!(!auth.verify(Some("S3CRET")));
        assert!(!auth.verify(Some("")));
        assert!(!auth.verify(None));
    }
}
