use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::handlers::payment_handlers::{
    CreateOrderRequest, CreateOrderResponse, VerifyPaymentRequest, VerifyPaymentResponse,
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("payment API unreachable: {0}")]
    Transport(String),
    #[error("payment API rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// The two server endpoints as seen from the checkout flow.
///
/// A verification mismatch is a normal `VerifyPaymentResponse` with
/// `verified: false`, not an `ApiError`.
#[async_trait]
pub trait PaymentApi: Send + Sync {
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<CreateOrderResponse, ApiError>;

    async fn verify_payment(&self, request: &VerifyPaymentRequest) -> Result<VerifyPaymentResponse, ApiError>;
}

/// HTTP implementation against the payment service.
#[derive(Debug, Clone)]
pub struct HttpPaymentApi {
    client: Client,
    base_url: String,
}

impl HttpPaymentApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PaymentApi for HttpPaymentApi {
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<CreateOrderResponse, ApiError> {
        let url = format!("{}/api/payments/create-order", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiError::Rejected { status, message });
        }

        response
            .json::<CreateOrderResponse>()
            .await
            .map_err(|e| ApiError::Transport(format!("Invalid create-order response: {}", e)))
    }

    async fn verify_payment(&self, request: &VerifyPaymentRequest) -> Result<VerifyPaymentResponse, ApiError> {
        let url = format!("{}/api/payments/verify", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        // 400 carries a regular `verified: false` body.
        if response.status().is_success() || response.status() == StatusCode::BAD_REQUEST {
            return response
                .json::<VerifyPaymentResponse>()
                .await
                .map_err(|e| ApiError::Transport(format!("Invalid verify response: {}", e)));
        }

        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        Err(ApiError::Rejected { status, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_create_order_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/payments/create-order")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"razorpayOrderId":"order_1","orderId":"6a0b7f9e-1f8e-4f4e-9a3e-2d6a1c0b5e77","amount":10000,"currency":"INR"}"#,
            )
            .create_async()
            .await;

        let api = HttpPaymentApi::new(&server.url());
        let response = api
            .create_order(&CreateOrderRequest {
                amount: BigDecimal::from_str("100.00").unwrap(),
                currency: "INR".to_string(),
                order_id: None,
                idempotency_key: None,
            })
            .await
            .unwrap();

        assert_eq!(response.razorpay_order_id, "order_1");
        assert_eq!(response.amount, 10000);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_verify_bad_request_parses_as_unverified() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/payments/verify")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"verified":false,"message":"Payment signature verification failed"}"#)
            .create_async()
            .await;

        let api = HttpPaymentApi::new(&server.url());
        let response = api
            .verify_payment(&VerifyPaymentRequest {
                order_id: "6a0b7f9e-1f8e-4f4e-9a3e-2d6a1c0b5e77".to_string(),
                razorpay_payment_id: "pay_1".to_string(),
                razorpay_order_id: "order_1".to_string(),
                razorpay_signature: "bad".to_string(),
            })
            .await
            .unwrap();

        assert!(!response.verified);
    }

    #[tokio::test]
    async fn test_server_error_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/payments/verify")
            .with_status(500)
            .with_body(r#"{"error":"Persistence error: connection lost"}"#)
            .create_async()
            .await;

        let api = HttpPaymentApi::new(&server.url());
        let err = api
            .verify_payment(&VerifyPaymentRequest {
                order_id: "6a0b7f9e-1f8e-4f4e-9a3e-2d6a1c0b5e77".to_string(),
                razorpay_payment_id: "pay_1".to_string(),
                razorpay_order_id: "order_1".to_string(),
                razorpay_signature: "sig".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Rejected { status: 500, .. }));
    }
}
