//! HTTP route handlers.
//!
//! Every route is a read-only diagnostic and is served with `Cache-Control: no-store`.
//! Unknown paths and methods get JSON error bodies instead of empty responses.
//!
//! Request tracing is enabled via middleware that generates a unique request ID
//! for each incoming request, allowing correlation of all logs within a request.

pub mod debug;
pub mod health;

use axum::{middleware, routing::get, Router};
use http::header::{HeaderValue, CACHE_CONTROL};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::{Settings, CACHE_CONTROL_NO_STORE};
use crate::error::AppError;
use crate::middleware::request_id_layer;
use crate::state::AppState;

/// Creates the Axum router with all routes, CORS and request tracing.
pub fn create_router(state: AppState) -> Router {
    let diagnostic_routes = Router::new()
        .route("/health", get(health::health))
        .route("/ping", get(health::ping))
        .route("/debug", get(debug::debug))
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_NO_STORE),
        ));

    let cors = cors_layer(&state.settings);

    Router::new()
        .merge(diagnostic_routes)
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state)
        .layer(cors)
        // Request ID middleware - creates root span with request_id for correlation
        .layer(middleware::from_fn(request_id_layer))
}

/// Build the CORS layer from the configured origin list.
///
/// A `*` entry allows any origin without credentials. Otherwise credentials are
/// allowed and request methods and headers are mirrored back.
pub fn cors_layer(settings: &Settings) -> CorsLayer {
    let origins = settings.cors_origin_list();

    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn not_found() -> AppError {
    AppError::NotFound
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
