use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewPaymentIntent, PaymentIntentRecord};

/// Persistence seam for payment intents and their linked commerce orders.
///
/// The Postgres implementation lives in
/// `db::repositories::PaymentRepository`; tests run against in-memory
/// implementations.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Insert a new intent with status `pending`. Called only after the
    /// gateway has acknowledged the order, so a gateway failure never leaves
    /// a local row behind.
    async fn insert_pending(&self, intent: NewPaymentIntent) -> Result<PaymentIntentRecord, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentIntentRecord>, AppError>;

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<PaymentIntentRecord>, AppError>;

    /// Mark the intent `completed`, recording the gateway payment id and the
    /// raw callback payload. When the intent is linked to a commerce order,
    /// the order advances to `payment_status = paid`, `status = processing`
    /// in the same transaction: either both rows change or neither does.
    async fn complete_payment(
        &self,
        id: Uuid,
        gateway_payment_id: &str,
        raw_response: serde_json::Value,
    ) -> Result<PaymentIntentRecord, AppError>;

    /// Mark the intent `failed` and retain the callback payload for audit.
    /// Idempotent; never downgrades a `completed` intent. The linked order
    /// is left untouched.
    async fn mark_failed(
        &self,
        id: Uuid,
        raw_response: Option<serde_json::Value>,
    ) -> Result<PaymentIntentRecord, AppError>;

    /// Intents still `pending` that were created before `older_than`,
    /// oldest first. Used by the reconciliation sweep.
    async fn find_stale_pending(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PaymentIntentRecord>, AppError>;
}
