use std::sync::Arc;

use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::db::store::PaymentStore;
use crate::error::AppError;
use crate::models::NewPaymentIntent;
use crate::services::gateway::PaymentGateway;
use crate::utils::currency::{major_to_minor, round_for_currency};

/// Orchestrates the payment intent lifecycle: order-intent creation against
/// the gateway and signature verification of its callback. Stateless across
/// requests; all state lives in the store.
#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn PaymentStore>,
    gateway: Arc<dyn PaymentGateway>,
}

#[derive(Debug, Clone)]
pub struct CreateOrderIntent {
    /// Charge amount in major units.
    pub amount: BigDecimal,
    pub currency: String,
    /// Commerce order this payment settles, when the checkout started from
    /// one.
    pub related_order_id: Option<Uuid>,
    /// Client-generated key; a resubmission with the same key returns the
    /// existing intent instead of creating a second gateway order.
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OrderIntentCreated {
    pub local_intent_id: Uuid,
    pub gateway_order_id: String,
    pub amount_minor: i64,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct VerifyPayment {
    pub local_intent_id: Uuid,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
    /// Full callback payload, stored opaquely for audit.
    pub raw_payload: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub verified: bool,
    pub local_intent_id: Uuid,
    pub gateway_payment_id: Option<String>,
}

impl PaymentService {
    pub fn new(store: Arc<dyn PaymentStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { store, gateway }
    }

    pub fn checkout_key_id(&self) -> &str {
        self.gateway.checkout_key_id()
    }

    /// Create a gateway order and the matching local `pending` intent.
    ///
    /// The gateway call happens before any insert, so a gateway failure
    /// leaves no orphaned row. Exactly one row is inserted per acknowledged
    /// gateway order.
    pub async fn create_order_intent(
        &self,
        request: CreateOrderIntent,
    ) -> Result<OrderIntentCreated, AppError> {
        let amount = round_for_currency(&request.amount, &request.currency);

        if amount <= BigDecimal::from(0) {
            return Err(AppError::InvalidAmount(format!(
                "Charge amount must be positive, got {}",
                request.amount
            )));
        }

        if let Some(key) = request.idempotency_key.as_deref() {
            if let Some(existing) = self.store.find_by_idempotency_key(key).await? {
                log::info!(
                    "Returning existing payment intent {} for idempotency key {}",
                    existing.id,
                    key
                );
                let amount_minor = major_to_minor(&existing.amount, &existing.currency)?;
                return Ok(OrderIntentCreated {
                    local_intent_id: existing.id,
                    gateway_order_id: existing.gateway_order_id,
                    amount_minor,
                    currency: existing.currency,
                });
            }
        }

        let amount_minor = major_to_minor(&amount, &request.currency)?;

        let intent_id = Uuid::new_v4();
        let receipt = request
            .related_order_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| intent_id.to_string());

        let gateway_order = self
            .gateway
            .create_order(amount_minor, &request.currency, &receipt)
            .await?;

        let record = self
            .store
            .insert_pending(NewPaymentIntent {
                id: intent_id,
                order_id: request.related_order_id,
                gateway_order_id: gateway_order.id.clone(),
                amount,
                currency: request.currency,
                payment_method: Some("razorpay".to_string()),
                idempotency_key: request.idempotency_key,
            })
            .await?;

        log::info!(
            "Created payment intent {} for gateway order {} ({} {} minor units)",
            record.id,
            gateway_order.id,
            amount_minor,
            record.currency
        );

        Ok(OrderIntentCreated {
            local_intent_id: record.id,
            gateway_order_id: gateway_order.id,
            amount_minor,
            currency: record.currency,
        })
    }

    /// Verify a gateway callback and settle the intent.
    ///
    /// A valid signature completes the intent and advances the linked order
    /// in one transaction; anything else marks the intent failed with the
    /// payload retained for audit. Store errors abort the request; there is
    /// no partial success path.
    pub async fn verify_payment(
        &self,
        request: VerifyPayment,
    ) -> Result<VerificationOutcome, AppError> {
        let intent = self
            .store
            .find_by_id(request.local_intent_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Payment intent {} not found", request.local_intent_id))
            })?;

        // The callback must reference the gateway order recorded at
        // creation; a different order id with a valid signature would settle
        // someone else's charge against this intent.
        if intent.gateway_order_id != request.gateway_order_id {
            log::warn!(
                "Callback order id {} does not match intent {} (expected {})",
                request.gateway_order_id,
                intent.id,
                intent.gateway_order_id
            );
            self.store.mark_failed(intent.id, Some(request.raw_payload)).await?;
            return Ok(VerificationOutcome {
                verified: false,
                local_intent_id: intent.id,
                gateway_payment_id: None,
            });
        }

        let verified = self.gateway.verify_payment_signature(
            &intent.gateway_order_id,
            &request.gateway_payment_id,
            &request.signature,
        )?;

        if !verified {
            log::warn!("Signature verification failed for payment intent {}", intent.id);
            self.store.mark_failed(intent.id, Some(request.raw_payload)).await?;
            return Ok(VerificationOutcome {
                verified: false,
                local_intent_id: intent.id,
                gateway_payment_id: None,
            });
        }

        let record = self
            .store
            .complete_payment(intent.id, &request.gateway_payment_id, request.raw_payload)
            .await?;

        log::info!(
            "Payment intent {} completed with gateway payment {}",
            record.id,
            request.gateway_payment_id
        );

        Ok(VerificationOutcome {
            verified: true,
            local_intent_id: record.id,
            gateway_payment_id: Some(request.gateway_payment_id),
        })
    }
}
