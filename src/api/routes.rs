//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    add_handler, clear_handler, delete_handler, get_handler, health_handler, raw_handler,
    replace_handler, set_handler, stats_handler, sweep_handler, touch_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /set` - Store a value
/// - `GET /get/:key` - Retrieve a live value by key
/// - `DELETE /del/:key` - Delete a key
/// - `POST /add` - Store only if no live entry exists
/// - `POST /replace` - Store only if a live entry exists
/// - `POST /touch` - Refresh the expiry of a live entry
/// - `POST /sweep` - Delete all expired entries
/// - `DELETE /clear` - Empty the store
/// - `GET /raw/:key` - Stored envelope, still obfuscated
/// - `GET /stats` - Get cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router with all endpoints
    Router::new()
        .route("/set", put(set_handler))
        .route("/get/:key", get(get_handler))
        .route("/del/:key", delete(delete_handler))
        .route("/add", post(add_handler))
        .route("/replace", post(replace_handler))
        .route("/touch", post(touch_handler))
        .route("/sweep", post(sweep_handler))
        .route("/clear", delete(clear_handler))
        .route("/raw/:key", get(raw_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheOptions, WebCache};
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let cache = WebCache::open(CacheOptions::session()).unwrap();
        create_router(AppState::new(cache))
    }

    async fn status_of(method: Method, uri: &str, json: Option<&str>) -> StatusCode {
        let request = Request::builder().method(method).uri(uri);
        let request = match json {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        };
        create_test_app()
            .oneshot(request.unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_read_only_endpoints() {
        assert_eq!(status_of(Method::GET, "/health", None).await, StatusCode::OK);
        assert_eq!(status_of(Method::GET, "/stats", None).await, StatusCode::OK);
        assert_eq!(status_of(Method::GET, "/get/nope", None).await, StatusCode::NOT_FOUND);
        assert_eq!(status_of(Method::GET, "/raw/nope", None).await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_write_endpoints() {
        let body = r#"{"key":"test","value":"hello"}"#;
        assert_eq!(status_of(Method::PUT, "/set", Some(body)).await, StatusCode::OK);
        assert_eq!(status_of(Method::POST, "/add", Some(body)).await, StatusCode::OK);
        assert_eq!(status_of(Method::POST, "/replace", Some(body)).await, StatusCode::OK);

        let touch = r#"{"key":"test","exp":10}"#;
        assert_eq!(status_of(Method::POST, "/touch", Some(touch)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_maintenance_endpoints() {
        assert_eq!(status_of(Method::POST, "/sweep", None).await, StatusCode::OK);
        assert_eq!(status_of(Method::DELETE, "/clear", None).await, StatusCode::NO_CONTENT);
        assert_eq!(status_of(Method::DELETE, "/del/any", None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_wrong_method_is_rejected() {
        let body = r#"{"key":"test","value":"hello"}"#;
        assert_eq!(
            status_of(Method::POST, "/set", Some(body)).await,
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(status_of(Method::GET, "/clear", None).await, StatusCode::METHOD_NOT_ALLOWED);
    }
}
