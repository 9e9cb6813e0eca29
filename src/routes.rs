use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::error::ApiError;
use crate::handlers::{protected, public};
use crate::middleware::require_identity;
use crate::state::AppState;

pub const FETCH_USER: &str = "/fetch-user-data";
pub const UPDATE_USER: &str = "/update-user-data";
pub const CREATE_USER: &str = "/create-user-data";

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state);
    let body_limit = state.config.server.max_request_size_bytes;

    Router::new()
        // Public
        .route("/", get(public::root).fallback(method_not_allowed))
        .route("/health", get(public::health).fallback(method_not_allowed))
        // Protected
        .merge(profile_routes(state.clone()))
        .fallback(|| async { ApiError::not_found("Route not found") })
        // Global middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(|_panic: Box<dyn std::any::Any + Send + 'static>| {
            tracing::error!("Handler panicked");
            axum::response::IntoResponse::into_response(ApiError::internal("Internal Server Error"))
        }))
        .with_state(state)
}

fn profile_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(FETCH_USER, get(protected::fetch_user_data).fallback(method_not_allowed))
        .route(UPDATE_USER, put(protected::update_user_data).fallback(method_not_allowed))
        .route(CREATE_USER, post(protected::create_user_data).fallback(method_not_allowed))
        .route_layer(from_fn_with_state(state, require_identity))
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let security = &state.config.security;
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::PUT, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}
