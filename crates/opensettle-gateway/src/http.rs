//! HTTP claim surface.
//!
//! `POST /claim-payment` is the protocol's x402 face: `200` with the
//! release on success, `402 Payment Required` while the proof is absent or
//! unverified, and a conventional error status otherwise. A worker
//! legitimately waiting sees only 402s; dispatch-path internals never leak
//! into responses.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;

use opensettle_types::{
    ClaimRequest, ClaimResponse, EscrowId, OpensettleError, ProofStatus, Result, constants,
};

use crate::gateway::PaymentGateway;

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<PaymentGateway>,
}

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/claim-payment", post(claim_payment))
        .route("/verify-proof/{escrow_id}", get(verify_proof))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "gateway listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentRequiredBody {
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyProofBody {
    pub escrow_id: EscrowId,
    pub verified: bool,
    pub status: ProofStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthBody {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn claim_payment(
    State(state): State<AppState>,
    Json(request): Json<ClaimRequest>,
) -> Response {
    match state.gateway.claim(&request).await {
        Ok(ClaimResponse::Released(released)) => (StatusCode::OK, Json(released)).into_response(),
        Ok(ClaimResponse::PaymentRequired { reason }) => (
            StatusCode::PAYMENT_REQUIRED,
            Json(PaymentRequiredBody { reason }),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

async fn verify_proof(State(state): State<AppState>, Path(escrow_id): Path<String>) -> Response {
    let escrow_id = match EscrowId::from_str(&escrow_id) {
        Ok(id) => id,
        Err(err) => return error_response(&err),
    };
    match state.gateway.verify(&escrow_id).await {
        Ok(status) => (
            StatusCode::OK,
            Json(VerifyProofBody {
                escrow_id,
                verified: status == ProofStatus::Verified,
                status,
            }),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

async fn health() -> Response {
    (
        StatusCode::OK,
        Json(HealthBody {
            status: "ok".to_string(),
            version: constants::VERSION.to_string(),
        }),
    )
        .into_response()
}

fn error_response(err: &OpensettleError) -> Response {
    let status = match err {
        OpensettleError::EscrowNotFound(_) => StatusCode::NOT_FOUND,
        OpensettleError::Unauthorized { .. } | OpensettleError::SignatureInvalid { .. } => {
            StatusCode::FORBIDDEN
        }
        OpensettleError::InvalidState { .. }
        | OpensettleError::AlreadyFinalized(_)
        | OpensettleError::DuplicateEscrow(_) => StatusCode::CONFLICT,
        OpensettleError::InvalidIdentifier { .. }
        | OpensettleError::InvalidAmount { .. }
        | OpensettleError::TaskLabelTooLong { .. }
        | OpensettleError::MalformedProof { .. } => StatusCode::BAD_REQUEST,
        OpensettleError::DispatchFailed { .. }
        | OpensettleError::InstructionExpired
        | OpensettleError::SettlementPending(_)
        | OpensettleError::Transport { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
        .into_response()
}
