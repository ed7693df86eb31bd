//! JSON-RPC relay delivery paths.
//!
//! A relay accepts a hex-encoded signed instruction via `submitInstruction`
//! and returns a confirmation reference. Priority relays additionally
//! accept a pre-paid incentive and expose `reclaimIncentive` for the
//! losing-path refund.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use opensettle_types::{Amount, OpensettleError, Result, SettlementRef, SignedInstruction};

use crate::path::DeliveryPath;

/// A delivery path backed by a JSON-RPC relay endpoint.
pub struct JsonRpcRelay {
    name: String,
    url: String,
    client: Client,
    incentive: Amount,
}

impl JsonRpcRelay {
    /// A standard relay: no incentive, base fee only.
    #[must_use]
    pub fn standard(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            client: Client::new(),
            incentive: Amount::ZERO,
        }
    }

    /// A priority relay carrying a pre-paid incentive.
    #[must_use]
    pub fn priority(name: impl Into<String>, url: impl Into<String>, incentive: Amount) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            client: Client::new(),
            incentive,
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": format!("opensettle-{method}"),
            "method": method,
            "params": params,
        });
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| OpensettleError::Transport {
                reason: format!("relay {}: {e}", self.name),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(OpensettleError::RelayRejected {
                path: self.name.clone(),
                reason: format!("HTTP {status}"),
            });
        }

        let envelope: Value = response.json().await.map_err(|e| OpensettleError::Transport {
            reason: format!("relay {}: invalid JSON response: {e}", self.name),
        })?;
        if let Some(error) = envelope.get("error") {
            return Err(OpensettleError::RelayRejected {
                path: self.name.clone(),
                reason: error.to_string(),
            });
        }
        envelope
            .get("result")
            .cloned()
            .ok_or_else(|| OpensettleError::RelayRejected {
                path: self.name.clone(),
                reason: "response missing result".to_string(),
            })
    }
}

#[async_trait]
impl DeliveryPath for JsonRpcRelay {
    fn name(&self) -> &str {
        &self.name
    }

    fn incentive(&self) -> Amount {
        self.incentive
    }

    async fn deliver(&self, instruction: &SignedInstruction) -> Result<SettlementRef> {
        let params = json!([
            hex::encode(&instruction.payload),
            {
                "signature": hex::encode(&instruction.signature),
                "authority": instruction.authority.to_hex(),
                "validUntil": instruction.valid_until.to_rfc3339(),
                "incentive": self.incentive,
            }
        ]);
        let result = self.call("submitInstruction", params).await?;

        // Relays answer with either a bare reference string or an object
        // carrying a `signature` field.
        let reference = result
            .as_str()
            .map(str::to_owned)
            .or_else(|| {
                result
                    .get("signature")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
            })
            .ok_or_else(|| OpensettleError::RelayRejected {
                path: self.name.clone(),
                reason: format!("unrecognized confirmation shape: {result}"),
            })?;
        Ok(SettlementRef::from(reference))
    }

    async fn reclaim_incentive(&self, instruction: &SignedInstruction) -> Result<Amount> {
        if self.incentive.is_zero() {
            return Ok(Amount::ZERO);
        }
        let result = self
            .call(
                "reclaimIncentive",
                json!([instruction.escrow_id.to_hex()]),
            )
            .await?;
        // Relays that report the reclaimed amount are trusted; the rest
        // reclaim the full pre-paid incentive.
        Ok(result.as_u64().map_or(self.incentive, Amount::new))
    }
}
