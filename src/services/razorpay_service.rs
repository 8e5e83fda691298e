use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::settings::RazorpayConfig;
use crate::services::gateway::{GatewayError, GatewayOrder, GatewayOrderStatus, PaymentGateway};

type HmacSha256 = Hmac<Sha256>;

/// Razorpay REST client. Orders are created with Basic auth
/// (key id / key secret); callback signatures are HMAC-SHA256 over
/// `"{order_id}|{payment_id}"`, hex-encoded.
#[derive(Debug, Clone)]
pub struct RazorpayClient {
    client: Client,
    key_id: String,
    key_secret: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Debug, Deserialize)]
struct RazorpayOrder {
    id: String,
    amount: i64,
    currency: String,
    receipt: Option<String>,
    status: String,
}

#[derive(Debug, Deserialize)]
struct RazorpayPaymentCollection {
    items: Vec<RazorpayPayment>,
}

#[derive(Debug, Deserialize)]
struct RazorpayPayment {
    id: String,
    status: String,
}

impl RazorpayClient {
    pub fn new(config: &RazorpayConfig) -> Self {
        Self {
            client: Client::new(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_order(&self, gateway_order_id: &str) -> Result<RazorpayOrder, GatewayError> {
        let url = format!("{}/orders/{}", self.base_url, gateway_order_id);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("Order fetch request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GatewayError::Unavailable(format!(
                "Order fetch failed ({}): {}",
                status, body
            )));
        }

        response
            .json::<RazorpayOrder>()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("Failed to parse order response: {}", e)))
    }

    async fn get_captured_payment_id(&self, gateway_order_id: &str) -> Result<Option<String>, GatewayError> {
        let url = format!("{}/orders/{}/payments", self.base_url, gateway_order_id);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("Payments fetch request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GatewayError::Unavailable(format!(
                "Payments fetch failed ({}): {}",
                status, body
            )));
        }

        let collection = response
            .json::<RazorpayPaymentCollection>()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("Failed to parse payments response: {}", e)))?;

        Ok(collection
            .items
            .into_iter()
            .find(|p| p.status == "captured")
            .map(|p| p.id))
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        let url = format!("{}/orders", self.base_url);
        let body = CreateOrderBody {
            amount: amount_minor,
            currency,
            receipt,
        };

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("Order creation request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GatewayError::Unavailable(format!(
                "Order creation failed ({}): {}",
                status, body
            )));
        }

        let order = response
            .json::<RazorpayOrder>()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("Failed to parse order response: {}", e)))?;

        log::info!("Created gateway order {} ({})", order.id, order.status);

        Ok(GatewayOrder {
            id: order.id,
            amount_minor: order.amount,
            currency: order.currency,
            receipt: order.receipt,
        })
    }

    async fn fetch_order_status(&self, gateway_order_id: &str) -> Result<GatewayOrderStatus, GatewayError> {
        let order = self.get_order(gateway_order_id).await?;

        match order.status.as_str() {
            "paid" => {
                let payment_id = self.get_captured_payment_id(gateway_order_id).await?;
                Ok(GatewayOrderStatus::Paid { payment_id })
            }
            "attempted" => Ok(GatewayOrderStatus::Attempted),
            _ => Ok(GatewayOrderStatus::Created),
        }
    }

    fn verify_payment_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<bool, GatewayError> {
        let mut mac = HmacSha256::new_from_slice(self.key_secret.as_bytes())
            .map_err(|e| GatewayError::Configuration(format!("HMAC error: {}", e)))?;

        mac.update(gateway_order_id.as_bytes());
        mac.update(b"|");
        mac.update(gateway_payment_id.as_bytes());

        let expected = hex::encode(mac.finalize().into_bytes());

        // Constant-time comparison; a plain equality check would leak where
        // the digests first differ.
        Ok(expected.as_bytes().ct_eq(signature.as_bytes()).into())
    }

    fn checkout_key_id(&self) -> &str {
        &self.key_id
    }
}
