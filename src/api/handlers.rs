//! HTTP request handlers with OpenAPI documentation.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::error;
use utoipa::OpenApi;

use crate::app::AppState;
use crate::domain::{
    AppError, BlockchainError, BroadcastRequest, BroadcastResult, ErrorDetail, ErrorResponse,
    ExternalServiceError, HealthResponse, HealthStatus, PlanSweepRequest, RateLimitResponse,
    RejectionDetails, SweepError, SweepPlan,
};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Solana Sweep Service API",
        version = "0.1.0",
        description = "Plans and broadcasts owner-signed sweeps of a wallet's SOL balance",
        license(
            name = "MIT"
        )
    ),
    paths(
        plan_sweep_handler,
        broadcast_handler,
        health_check_handler,
        liveness_handler,
        readiness_handler,
    ),
    components(
        schemas(
            PlanSweepRequest,
            SweepPlan,
            crate::domain::PriceQuote,
            BroadcastRequest,
            BroadcastResult,
            HealthResponse,
            HealthStatus,
            crate::domain::EndpointHealth,
            ErrorResponse,
            ErrorDetail,
            RejectionDetails,
            RateLimitResponse,
        )
    ),
    tags(
        (name = "sweep", description = "Sweep planning and broadcast endpoints"),
        (name = "health", description = "Health check endpoints")
    )
)]
pub struct ApiDoc;

/// Plan a sweep of a wallet's SOL balance
///
/// Reads the balance from the first live planner endpoint, reserves fees and
/// rent, and returns an unsigned transfer to the configured destination.
/// The owner's wallet signs it and submits it to `POST /sweep/broadcast`.
#[utoipa::path(
    post,
    path = "/sweep/plan",
    tag = "sweep",
    request_body = PlanSweepRequest,
    responses(
        (status = 200, description = "Unsigned sweep transaction", body = SweepPlan),
        (status = 400, description = "Invalid address", body = ErrorResponse),
        (status = 422, description = "Balance too low to sweep", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = RateLimitResponse),
        (status = 502, description = "Blockhash unavailable", body = ErrorResponse),
        (status = 503, description = "No RPC endpoint reachable", body = ErrorResponse)
    )
)]
pub async fn plan_sweep_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PlanSweepRequest>,
) -> Result<Json<SweepPlan>, AppError> {
    let plan = state.service.plan_sweep(&payload).await?;
    Ok(Json(plan))
}

/// Broadcast an owner-signed sweep transaction
///
/// Tries each broadcast endpoint in order and returns once one of them
/// confirms the transaction.
#[utoipa::path(
    post,
    path = "/sweep/broadcast",
    tag = "sweep",
    request_body = BroadcastRequest,
    responses(
        (status = 200, description = "Transaction confirmed", body = BroadcastResult),
        (status = 400, description = "Malformed or unsigned transaction", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = RateLimitResponse),
        (status = 502, description = "Every broadcast endpoint failed", body = ErrorResponse)
    )
)]
pub async fn broadcast_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BroadcastRequest>,
) -> Result<Json<BroadcastResult>, AppError> {
    let result = state.service.broadcast_sweep(&payload).await?;
    Ok(Json(result))
}

/// Detailed health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Health status", body = HealthResponse)
    )
)]
pub async fn health_check_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let health = state.service.health_check().await;
    Json(health)
}

/// Kubernetes liveness check
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "health",
    responses(
        (status = 200, description = "Application is alive")
    )
)]
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Kubernetes readiness check
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "health",
    responses(
        (status = 200, description = "Application is ready to serve traffic"),
        (status = 503, description = "Application is not ready")
    )
)]
pub async fn readiness_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    let health = state.service.health_check().await;
    match health.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn sweep_rejection(err: &SweepError) -> (StatusCode, &'static str, Option<RejectionDetails>) {
    match err {
        SweepError::InvalidAddress(_) => (StatusCode::BAD_REQUEST, "invalid_address", None),
        SweepError::NetworkUnavailable { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            "network_unavailable",
            None,
        ),
        SweepError::InsufficientBalance {
            balance_lamports,
            required_lamports,
        } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "insufficient_balance",
            Some(RejectionDetails {
                balance_lamports: *balance_lamports,
                required_lamports: Some(*required_lamports),
                transfer_lamports: None,
            }),
        ),
        SweepError::TransferTooSmall {
            balance_lamports,
            transfer_lamports,
            dust_threshold,
        } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "transfer_too_small",
            Some(RejectionDetails {
                balance_lamports: *balance_lamports,
                required_lamports: Some(*dust_threshold),
                transfer_lamports: Some(*transfer_lamports),
            }),
        ),
        SweepError::BlockhashFetchFailed(_) => {
            (StatusCode::BAD_GATEWAY, "blockhash_fetch_failed", None)
        }
        SweepError::SigningRejected(_) => (StatusCode::BAD_REQUEST, "signing_rejected", None),
        SweepError::AllEndpointsFailed { .. } => {
            (StatusCode::BAD_GATEWAY, "all_endpoints_failed", None)
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let mut details = None;
        let (status, error_type, message) = match &self {
            AppError::Sweep(sweep_err) => {
                let (status, error_type, rejection) = sweep_rejection(sweep_err);
                details = rejection;
                (status, error_type, self.to_string())
            }
            AppError::Blockchain(bc_err) => match bc_err {
                BlockchainError::Connection(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "blockchain_error",
                    self.to_string(),
                ),
                BlockchainError::Timeout(_) => {
                    (StatusCode::GATEWAY_TIMEOUT, "timeout", self.to_string())
                }
                _ => (
                    StatusCode::BAD_GATEWAY,
                    "blockchain_error",
                    self.to_string(),
                ),
            },
            AppError::ExternalService(ext_err) => match ext_err {
                ExternalServiceError::Timeout(_) => {
                    (StatusCode::GATEWAY_TIMEOUT, "timeout", self.to_string())
                }
                ExternalServiceError::RateLimited(_) => (
                    StatusCode::TOO_MANY_REQUESTS,
                    "rate_limited",
                    self.to_string(),
                ),
                _ => (
                    StatusCode::BAD_GATEWAY,
                    "external_service_error",
                    self.to_string(),
                ),
            },
            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "configuration_error",
                self.to_string(),
            ),
            AppError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                self.to_string(),
            ),
            AppError::Serialization(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "serialization_error",
                self.to_string(),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                self.to_string(),
            ),
            AppError::NotSupported(_) => (
                StatusCode::NOT_IMPLEMENTED,
                "not_supported",
                self.to_string(),
            ),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "Rate limit exceeded".to_string(),
            ),
        };

        if status.is_server_error() {
            error!(error_type = %error_type, message = %message, "Server error");
        }

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                r#type: error_type.to_string(),
                message,
                details,
            },
        });

        (status, body).into_response()
    }
}
