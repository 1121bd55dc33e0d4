use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize)]
pub struct InitializeTransaction {
    pub email: String,
    /// Minor units (kobo).
    pub amount: i64,
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializedTransaction {
    pub authorization_url: String,
    #[serde(default)]
    pub access_code: Option<String>,
    pub reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedTransaction {
    pub status: String,
    pub amount: i64,
    pub reference: String,
    #[serde(default)]
    pub metadata: Option<JsonValue>,
    #[serde(default)]
    pub gateway_response: Option<String>,
    #[serde(default)]
    pub paid_at: Option<String>,
}

impl VerifiedTransaction {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// Reads a string field from the transaction metadata.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key)?.as_str()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedAccount {
    pub account_number: String,
    pub account_name: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize(&self, request: InitializeTransaction) -> Result<InitializedTransaction>;
    async fn verify(&self, reference: &str) -> Result<VerifiedTransaction>;
    async fn resolve_account(&self, account_number: &str, bank_code: &str) -> Result<ResolvedAccount>;
}

/// Paystack REST client.
#[derive(Clone)]
pub struct PaystackClient {
    client: Client,
    base_url: String,
    secret_key: String,
}

impl PaystackClient {
    pub fn new(base_url: impl Into<String>, secret_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(20)).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }

    pub fn from_config() -> Result<Self> {
        let config = crate::config::get_config();
        if config.paystack_secret_key.is_empty() {
            tracing::warn!("PAYSTACK_SECRET_KEY is not set; gateway calls will be rejected");
        }
        Self::new(config.paystack_base_url.clone(), config.paystack_secret_key.clone())
    }

    async fn read<T: DeserializeOwned>(&self, response: reqwest::Response, what: &str) -> Result<T> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let envelope: Envelope<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(Error::Gateway(format!("{} failed with status {}", what, status.as_u16())))
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!("{} returned an unreadable body", what)).into())
            }
        };
        if !status.is_success() || !envelope.status {
            let message = envelope
                .message
                .unwrap_or_else(|| format!("{} failed with status {}", what, status.as_u16()));
            return Err(Error::Gateway(message));
        }
        envelope
            .data
            .ok_or_else(|| Error::Gateway(format!("{} returned no data", what)))
    }
}

#[async_trait]
impl PaymentGateway for PaystackClient {
    async fn initialize(&self, request: InitializeTransaction) -> Result<InitializedTransaction> {
        let response = self
            .client
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&request)
            .send()
            .await
            .context("paystack initialize request failed")?;
        let data: InitializedTransaction = self.read(response, "transaction initialize").await?;
        tracing::info!(reference = %data.reference, amount = request.amount, "payment initialized");
        Ok(data)
    }

    async fn verify(&self, reference: &str) -> Result<VerifiedTransaction> {
        let response = self
            .client
            .get(format!("{}/transaction/verify/{}", self.base_url, urlencoding(reference)))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .context("paystack verify request failed")?;
        self.read(response, "transaction verify").await
    }

    async fn resolve_account(&self, account_number: &str, bank_code: &str) -> Result<ResolvedAccount> {
        let response = self
            .client
            .get(format!("{}/bank/resolve", self.base_url))
            .query(&[("account_number", account_number), ("bank_code", bank_code)])
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .context("paystack bank resolve request failed")?;
        self.read(response, "bank resolve").await
    }
}

fn urlencoding(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn verified_transaction_reads_metadata() {
        let tx: VerifiedTransaction = serde_json::from_value(json!({
            "status": "success",
            "amount": 300000,
            "reference": "CONSULT-1-ABCDEFGH",
            "metadata": {"professionalId": "5f1c", "type": "consultation_payment"}
        }))
        .unwrap();
        assert!(tx.is_success());
        assert_eq!(tx.metadata_str("professionalId"), Some("5f1c"));
        assert_eq!(tx.metadata_str("missing"), None);
    }

    #[test]
    fn envelope_without_data_parses() {
        let envelope: Envelope<ResolvedAccount> =
            serde_json::from_value(json!({"status": false, "message": "Could not resolve account name"}))
                .unwrap();
        assert!(!envelope.status);
        assert!(envelope.data.is_none());
    }

    #[test]
    fn references_are_path_safe() {
        assert_eq!(urlencoding("PRO-DOCTOR-1700000000000"), "PRO-DOCTOR-1700000000000");
        assert_eq!(urlencoding("a/b"), "a%2Fb");
    }
}
