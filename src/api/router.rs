//! Router construction, middleware layers and rate limiting.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use governor::{
    DefaultDirectRateLimiter, Quota, RateLimiter,
    clock::{Clock, DefaultClock},
};
use tower_http::{
    cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{
    ApiDoc, broadcast_handler, health_check_handler, liveness_handler, plan_sweep_handler,
    readiness_handler,
};
use crate::app::AppState;
use crate::domain::{ErrorDetail, RateLimitResponse};

/// Signed sweep transactions are a few hundred bytes
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Global request rate limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            burst_size: 20,
        }
    }
}

impl RateLimitConfig {
    #[must_use]
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size,
        }
    }

    fn limiter(&self) -> DefaultDirectRateLimiter {
        let rps = NonZeroU32::new(self.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(self.burst_size).unwrap_or(rps);
        RateLimiter::direct(Quota::per_second(rps).allow_burst(burst))
    }
}

/// Create the router without rate limiting
pub fn create_router(state: Arc<AppState>) -> Router {
    let timeout = state.request_timeout;
    with_layers(api_routes(state), timeout)
}

/// Create the router with a global rate limit in front of the API routes
pub fn create_router_with_rate_limit(state: Arc<AppState>, config: RateLimitConfig) -> Router {
    let timeout = state.request_timeout;
    let limiter = Arc::new(config.limiter());
    let routes = api_routes(state).layer(middleware::from_fn_with_state(
        limiter,
        rate_limit_middleware,
    ));
    with_layers(routes, timeout)
}

fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sweep/plan", post(plan_sweep_handler))
        .route("/sweep/broadcast", post(broadcast_handler))
        .route("/health", get(health_check_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .with_state(state)
}

fn with_layers(routes: Router, timeout: Duration) -> Router {
    routes
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
}

async fn rate_limit_middleware(
    State(limiter): State<Arc<DefaultDirectRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    match limiter.check() {
        Ok(()) => next.run(request).await,
        Err(not_until) => {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            let retry_after = wait.as_secs().max(1);
            warn!(path = %request.uri().path(), retry_after, "Rate limit exceeded");

            let body = RateLimitResponse {
                error: ErrorDetail {
                    r#type: "rate_limited".to_string(),
                    message: "Too many requests, please slow down".to_string(),
                    details: None,
                },
                retry_after,
            };
            (
                StatusCode::TOO_MANY_REQUESTS,
                [("retry-after", retry_after.to_string())],
                Json(body),
            )
                .into_response()
        }
    }
}
