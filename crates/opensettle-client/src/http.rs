//! Typed HTTP client for the Payment Gateway.
//!
//! Maps the gateway's x402 surface back into protocol types: a 402 answer
//! becomes `ClaimResponse::PaymentRequired` (retryable, not an error);
//! everything non-2xx keeps its specific kind so the retry loop can decide
//! retry vs. abort.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use opensettle_types::{
    ClaimRequest, ClaimResponse, EscrowId, OpensettleError, Released, Result,
};

use crate::retry::ClaimEndpoint;

/// Client for one gateway base URL.
pub struct GatewayClient {
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct PaymentRequiredBody {
    reason: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct VerifyProofBody {
    verified: bool,
}

/// Gateway health report.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthInfo {
    pub status: String,
    pub version: String,
}

impl GatewayClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `GET /health`
    pub async fn health(&self) -> Result<HealthInfo> {
        let response = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(OpensettleError::GatewayRejected {
                status: response.status().as_u16(),
                message: "health check failed".to_string(),
            });
        }
        response.json().await.map_err(transport)
    }

    /// `GET /verify-proof/{escrow_id}`
    pub async fn verify_proof(&self, escrow_id: &EscrowId) -> Result<bool> {
        let response = self
            .client
            .get(self.url(&format!("/verify-proof/{}", escrow_id.to_hex())))
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(OpensettleError::EscrowNotFound(*escrow_id));
        }
        if !status.is_success() {
            return Err(OpensettleError::GatewayRejected {
                status: status.as_u16(),
                message: error_message(response).await,
            });
        }
        let body: VerifyProofBody = response.json().await.map_err(transport)?;
        Ok(body.verified)
    }

    /// `POST /claim-payment`
    pub async fn claim_payment(&self, request: &ClaimRequest) -> Result<ClaimResponse> {
        let response = self
            .client
            .post(self.url("/claim-payment"))
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();

        if status == StatusCode::PAYMENT_REQUIRED {
            let body: PaymentRequiredBody = response.json().await.map_err(transport)?;
            return Ok(ClaimResponse::PaymentRequired {
                reason: body.reason,
            });
        }
        if status.is_success() {
            let released: Released = response.json().await.map_err(transport)?;
            return Ok(ClaimResponse::Released(released));
        }

        let message = error_message(response).await;
        Err(match status {
            StatusCode::FORBIDDEN => OpensettleError::Unauthorized { reason: message },
            StatusCode::NOT_FOUND => OpensettleError::EscrowNotFound(request.escrow_id),
            _ => OpensettleError::GatewayRejected {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl ClaimEndpoint for GatewayClient {
    async fn claim(&self, request: &ClaimRequest) -> Result<ClaimResponse> {
        self.claim_payment(request).await
    }
}

fn transport(err: reqwest::Error) -> OpensettleError {
    OpensettleError::Transport {
        reason: format!("gateway: {err}"),
    }
}

async fn error_message(response: reqwest::Response) -> String {
    match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => "unparseable error body".to_string(),
    }
}
