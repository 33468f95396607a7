//! API key authentication.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::config::SecurityConfig;

/// Header carrying the shared API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// API key authentication middleware.
///
/// Checks the `X-API-Key` header against the configured key. Returns 401
/// Unauthorized if the key is missing or wrong. `/api/health` is always open.
pub async fn api_key_auth(
    headers: HeaderMap,
    State(config): State<Arc<SecurityConfig>>,
    request: Request,
    next: Next,
) -> Response {
    if !config.api_key_enabled {
        return next.run(request).await;
    }

    // Monitoring must work without a key.
    if request.uri().path() == "/api/health" {
        return next.run(request).await;
    }

    let provided_key = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());

    let valid = match (&config.api_key, provided_key) {
        (Some(expected), Some(provided)) => {
            bool::from(expected.as_bytes().ct_eq(provided.as_bytes()))
        }
        _ => false,
    };

    if valid {
        next.run(request).await
    } else {
        warn!("API key authentication failed for {}", request.uri().path());
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "Invalid or missing API key",
                "hint": "Provide a valid API key in the X-API-Key header"
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, middleware::from_fn_with_state, routing::get};
    use tower::ServiceExt;

    fn app(config: SecurityConfig) -> Router {
        Router::new()
            .route("/api/health", get(|| async { "ok" }))
            .route("/api/public/levels", get(|| async { "levels" }))
            .layer(from_fn_with_state(Arc::new(config), api_key_auth))
    }

    fn enabled() -> SecurityConfig {
        SecurityConfig {
            api_key_enabled: true,
            api_key: Some("0123456789abcdef".to_string()),
        }
    }

    async fn status(app: Router, uri: &str, key: Option<&str>) -> StatusCode {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some(key) = key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        app.oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_disabled_passes_through() {
        let app = app(SecurityConfig::default());
        assert_eq!(status(app, "/api/public/levels", None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_or_wrong_key_rejected() {
        assert_eq!(
            status(app(enabled()), "/api/public/levels", None).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(app(enabled()), "/api/public/levels", Some("0123456789abcdeX")).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(app(enabled()), "/api/public/levels", Some("0123")).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_valid_key_accepted() {
        assert_eq!(
            status(app(enabled()), "/api/public/levels", Some("0123456789abcdef")).await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_health_is_open() {
        assert_eq!(status(app(enabled()), "/api/health", None).await, StatusCode::OK);
    }
}
