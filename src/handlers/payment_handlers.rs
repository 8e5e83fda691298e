use actix_web::{web, HttpResponse, get, post};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use log::{debug, info};

use crate::error::AppError;
use crate::services::payment_service::{CreateOrderIntent, PaymentService, VerifyPayment};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// Charge amount in major units.
    pub amount: BigDecimal,
    pub currency: String,
    /// Commerce order being settled, when checkout started from one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub razorpay_order_id: String,
    /// Local payment intent id; the verify call correlates on this.
    pub order_id: String,
    /// Minor units, as the checkout SDK expects.
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    /// Local payment intent id returned by create-order.
    pub order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_order_id: String,
    pub razorpay_signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutKeyResponse {
    pub key_id: String,
}

/// Public key id the storefront hands to the gateway's checkout SDK.
#[get("/checkout-key")]
pub async fn checkout_key(
    payment_service: web::Data<PaymentService>,
) -> Result<HttpResponse, AppError> {
    debug!("Returning checkout key id");

    Ok(HttpResponse::Ok().json(CheckoutKeyResponse {
        key_id: payment_service.checkout_key_id().to_string(),
    }))
}

/// Create a gateway order and the matching local pending payment intent.
#[post("/create-order")]
pub async fn create_order(
    payment_service: web::Data<PaymentService>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    debug!("Creating order intent for {} {}", request.amount, request.currency);

    let related_order_id = match request.order_id.as_deref() {
        Some(raw) => Some(
            Uuid::parse_str(raw)
                .map_err(|_| AppError::BadRequest(format!("Invalid orderId: {}", raw)))?,
        ),
        None => None,
    };

    let created = payment_service
        .create_order_intent(CreateOrderIntent {
            amount: request.amount,
            currency: request.currency,
            related_order_id,
            idempotency_key: request.idempotency_key,
        })
        .await?;

    Ok(HttpResponse::Ok().json(CreateOrderResponse {
        razorpay_order_id: created.gateway_order_id,
        order_id: created.local_intent_id.to_string(),
        amount: created.amount_minor,
        currency: created.currency,
    }))
}

/// Verify the checkout callback signature and settle the payment intent.
///
/// A signature mismatch is an expected outcome, answered with a plain 400
/// body rather than a server error; only persistence problems surface as
/// 5xx.
#[post("/verify")]
pub async fn verify_payment(
    payment_service: web::Data<PaymentService>,
    body: web::Json<VerifyPaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();

    let local_intent_id = Uuid::parse_str(&request.order_id)
        .map_err(|_| AppError::BadRequest(format!("Invalid orderId: {}", request.order_id)))?;

    // The full callback payload is retained on the intent for audit.
    let raw_payload = serde_json::to_value(&request)?;

    let outcome = payment_service
        .verify_payment(VerifyPayment {
            local_intent_id,
            gateway_order_id: request.razorpay_order_id,
            gateway_payment_id: request.razorpay_payment_id,
            signature: request.razorpay_signature,
            raw_payload,
        })
        .await?;

    if outcome.verified {
        info!("Payment intent {} verified", outcome.local_intent_id);
        Ok(HttpResponse::Ok().json(VerifyPaymentResponse {
            verified: true,
            payment_id: outcome.gateway_payment_id,
            message: "Payment verified".to_string(),
        }))
    } else {
        Ok(HttpResponse::BadRequest().json(VerifyPaymentResponse {
            verified: false,
            payment_id: None,
            message: "Payment signature verification failed".to_string(),
        }))
    }
}
