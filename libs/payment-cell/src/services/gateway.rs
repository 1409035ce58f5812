use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::models::{GatewayOrder, GatewayOrderRequest, GatewayPayment, GatewayRefund, PaymentError};

/// Operations the platform needs from a card/UPI payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, request: &GatewayOrderRequest) -> Result<GatewayOrder, PaymentError>;

    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment, PaymentError>;

    /// Refund `amount` paise, or the full captured amount when `None`.
    async fn refund(
        &self,
        payment_id: &str,
        amount: Option<i64>,
        notes: serde_json::Value,
    ) -> Result<GatewayRefund, PaymentError>;

    /// Public key handed to the checkout widget.
    fn key_id(&self) -> &str;

    /// Secret used for checkout signatures.
    fn key_secret(&self) -> &str;
}

/// Razorpay REST client, authenticated with HTTP basic auth (key id / key secret).
/// Based on: https://razorpay.com/docs/api/
pub struct RazorpayClient {
    client: Client,
    key_id: String,
    key_secret: String,
    base_url: String,
}

impl RazorpayClient {
    pub fn new(config: &AppConfig) -> Result<Self, PaymentError> {
        if !config.is_payment_configured() {
            return Err(PaymentError::NotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            key_id: config.razorpay_key_id.clone(),
            key_secret: config.razorpay_key_secret.clone(),
            base_url: config.razorpay_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn parse<T: DeserializeOwned>(response: Response, action: &str) -> Result<T, PaymentError> {
        let status = response.status();
        let response_text = response.text().await?;

        debug!("Razorpay {} response: {} - {}", action, status, response_text);

        if !status.is_success() {
            error!("Razorpay {} failed: {} - {}", action, status, response_text);
            let message = serde_json::from_str::<serde_json::Value>(&response_text)
                .ok()
                .and_then(|v| v["error"]["description"].as_str().map(str::to_string))
                .unwrap_or(response_text);
            return Err(PaymentError::Gateway {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&response_text).map_err(|e| PaymentError::Gateway {
            status: status.as_u16(),
            message: format!("Failed to parse {} response: {}", action, e),
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    /// POST /orders
    async fn create_order(&self, request: &GatewayOrderRequest) -> Result<GatewayOrder, PaymentError> {
        info!("Creating Razorpay order for {} paise ({})", request.amount, request.receipt);

        let response = self
            .client
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(request)
            .send()
            .await?;

        let order: GatewayOrder = Self::parse(response, "order creation").await?;
        info!("Created Razorpay order {}", order.id);
        Ok(order)
    }

    /// GET /payments/{id}
    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment, PaymentError> {
        debug!("Fetching Razorpay payment {}", payment_id);

        let response = self
            .client
            .get(format!("{}/payments/{}", self.base_url, payment_id))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await?;

        Self::parse(response, "payment fetch").await
    }

    /// POST /payments/{id}/refund
    async fn refund(
        &self,
        payment_id: &str,
        amount: Option<i64>,
        notes: serde_json::Value,
    ) -> Result<GatewayRefund, PaymentError> {
        info!("Requesting refund for Razorpay payment {}", payment_id);

        let mut body = json!({ "notes": notes });
        if let Some(amount) = amount {
            body["amount"] = json!(amount);
        }

        let response = self
            .client
            .post(format!("{}/payments/{}/refund", self.base_url, payment_id))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await?;

        let refund: GatewayRefund = Self::parse(response, "refund").await?;
        info!("Razorpay refund {} created for payment {}", refund.id, payment_id);
        Ok(refund)
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn key_secret(&self) -> &str {
        &self.key_secret
    }
}
