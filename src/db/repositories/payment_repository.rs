use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::store::PaymentStore;
use crate::error::AppError;
use crate::models::{NewPaymentIntent, PaymentIntentRecord, PaymentStatus};

const RECORD_COLUMNS: &str = "id, order_id, gateway_order_id, gateway_payment_id, amount, currency, \
     status, payment_method, gateway_response, idempotency_key, created_at, updated_at";

/// Postgres-backed store over the `payments` and `orders` tables.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentStore for PaymentRepository {
    async fn insert_pending(&self, intent: NewPaymentIntent) -> Result<PaymentIntentRecord, AppError> {
        let query = format!(
            "INSERT INTO payments \
                 (id, order_id, gateway_order_id, amount, currency, status, \
                  payment_method, idempotency_key, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW()) \
             RETURNING {RECORD_COLUMNS}"
        );

        let record = sqlx::query_as::<_, PaymentIntentRecord>(&query)
            .bind(intent.id)
            .bind(intent.order_id)
            .bind(&intent.gateway_order_id)
            .bind(&intent.amount)
            .bind(&intent.currency)
            .bind(PaymentStatus::Pending.as_str())
            .bind(&intent.payment_method)
            .bind(&intent.idempotency_key)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to insert payment intent: {}", e)))?;

        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentIntentRecord>, AppError> {
        let query = format!("SELECT {RECORD_COLUMNS} FROM payments WHERE id = $1");

        let record = sqlx::query_as::<_, PaymentIntentRecord>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to load payment intent: {}", e)))?;

        Ok(record)
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<PaymentIntentRecord>, AppError> {
        let query = format!("SELECT {RECORD_COLUMNS} FROM payments WHERE idempotency_key = $1");

        let record = sqlx::query_as::<_, PaymentIntentRecord>(&query)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to look up idempotency key: {}", e)))?;

        Ok(record)
    }

    async fn complete_payment(
        &self,
        id: Uuid,
        gateway_payment_id: &str,
        raw_response: serde_json::Value,
    ) -> Result<PaymentIntentRecord, AppError> {
        let mut tx = self.pool.begin().await
            .map_err(|e| AppError::Persistence(format!("Failed to begin transaction: {}", e)))?;

        let query = format!(
            "UPDATE payments \
             SET status = $2, gateway_payment_id = $3, gateway_response = $4, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {RECORD_COLUMNS}"
        );

        let record = sqlx::query_as::<_, PaymentIntentRecord>(&query)
            .bind(id)
            .bind(PaymentStatus::Completed.as_str())
            .bind(gateway_payment_id)
            .bind(&raw_response)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to complete payment intent: {}", e)))?
            .ok_or_else(|| AppError::NotFound(format!("Payment intent {} not found", id)))?;

        // The order advance rides the same transaction as the payment
        // update: a completed payment with an unpaid order must never be
        // observable.
        if let Some(order_id) = record.order_id {
            sqlx::query(
                "UPDATE orders \
                 SET payment_status = 'paid', status = 'processing', updated_at = NOW() \
                 WHERE id = $1",
            )
            .bind(order_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to advance order {}: {}", order_id, e)))?;
        }

        tx.commit().await
            .map_err(|e| AppError::Persistence(format!("Failed to commit payment completion: {}", e)))?;

        Ok(record)
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        raw_response: Option<serde_json::Value>,
    ) -> Result<PaymentIntentRecord, AppError> {
        // `completed` is terminal; a late failure callback must not undo a
        // verified payment.
        let query = format!(
            "UPDATE payments \
             SET status = $2, gateway_response = COALESCE($3, gateway_response), updated_at = NOW() \
             WHERE id = $1 AND status <> $4 \
             RETURNING {RECORD_COLUMNS}"
        );

        let updated = sqlx::query_as::<_, PaymentIntentRecord>(&query)
            .bind(id)
            .bind(PaymentStatus::Failed.as_str())
            .bind(&raw_response)
            .bind(PaymentStatus::Completed.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to mark payment intent failed: {}", e)))?;

        match updated {
            Some(record) => Ok(record),
            None => {
                let existing = self.find_by_id(id).await?
                    .ok_or_else(|| AppError::NotFound(format!("Payment intent {} not found", id)))?;
                log::warn!(
                    "Ignoring failure marking for completed payment intent {}",
                    existing.id
                );
                Ok(existing)
            }
        }
    }

    async fn find_stale_pending(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PaymentIntentRecord>, AppError> {
        let query = format!(
            "SELECT {RECORD_COLUMNS} FROM payments \
             WHERE status = $1 AND created_at < $2 \
             ORDER BY created_at ASC \
             LIMIT $3"
        );

        let records = sqlx::query_as::<_, PaymentIntentRecord>(&query)
            .bind(PaymentStatus::Pending.as_str())
            .bind(older_than)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to load stale pending intents: {}", e)))?;

        Ok(records)
    }
}
