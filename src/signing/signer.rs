//! Client for the remote signing service.
//!
//! Keys never enter this process: the service builds, signs and broadcasts the
//! transactions for an action and reports back.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::config::SignerConfig;
use crate::error::{MaxiError, Result};
use crate::strategy::Action;

type HmacSha256 = Hmac<Sha256>;

const ACTIONS_PATH: &str = "/v1/actions";

/// Request for one exposure-changing action
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub action: Action,
    pub vault_id: String,
    pub address: String,
    pub lm_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_ratio: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_delta_usd: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reinvest_threshold: Option<Decimal>,
}

/// Outcome reported by the signing service
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionReceipt {
    pub success: bool,
    /// Whether any transaction changed the vault
    #[serde(default)]
    pub changed: bool,
    #[serde(default)]
    pub tx_ids: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// HMAC-authenticated signer client
pub struct SignerClient {
    http: Client,
    base_url: String,
    api_key: String,
    secret: Zeroizing<String>,
}

impl SignerClient {
    pub fn new(config: &SignerConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("vault-maxi/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MaxiError::Internal(format!("failed to build signer HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            secret: Zeroizing::new(config.secret.clone()),
        })
    }

    /// Base64 HMAC-SHA256 over `timestamp + METHOD + path + body`
    fn sign(&self, timestamp: &str, method: &str, path: &str, body: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| MaxiError::Signature(format!("HMAC init failed: {}", e)))?;
        mac.update(timestamp.as_bytes());
        mac.update(method.to_uppercase().as_bytes());
        mac.update(path.as_bytes());
        mac.update(body.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }

    fn auth_headers(&self, method: &str, path: &str, body: &str) -> Result<HeaderMap> {
        let timestamp = Utc::now().timestamp_millis().to_string();
        let signature = self.sign(&timestamp, method, path, body)?;

        let header = |value: &str, name: &str| {
            HeaderValue::from_str(value)
                .map_err(|e| MaxiError::Signer(format!("invalid {} header: {}", name, e)))
        };

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("x-maxi-key"), header(&self.api_key, "key")?);
        headers.insert(
            HeaderName::from_static("x-maxi-timestamp"),
            header(&timestamp, "timestamp")?,
        );
        headers.insert(
            HeaderName::from_static("x-maxi-signature"),
            header(&signature, "signature")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// Submit an action and wait for the receipt
    pub async fn execute(&self, request: &ActionRequest) -> Result<ActionReceipt> {
        let body = serde_json::to_string(request)?;
        let headers = self.auth_headers("POST", ACTIONS_PATH, &body)?;
        let url = format!("{}{}", self.base_url, ACTIONS_PATH);

        debug!("submitting {} for vault {} to signer", request.action, request.vault_id);
        let resp = self.http.post(&url).headers(headers).body(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(MaxiError::Signer(format!("HTTP {}: {}", status, text)));
        }

        let receipt: ActionReceipt = resp.json().await?;
        info!(
            "signer finished {}: success={} changed={} txs={:?}",
            request.action, receipt.success, receipt.changed, receipt.tx_ids
        );
        Ok(receipt)
    }
}

impl std::fmt::Debug for SignerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key)
            .finish()
    }
}
