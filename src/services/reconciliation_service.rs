use crate::config::settings::ReconciliationConfig;
use crate::db::store::PaymentStore;
use crate::error::AppError;
use crate::services::gateway::{GatewayOrderStatus, PaymentGateway};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use log::{info, warn, error};

/// Resolves payment intents stuck in `pending` because their callback never
/// arrived. Runs as a periodic job, never in the request path.
#[derive(Clone)]
pub struct ReconciliationService {
    store: Arc<dyn PaymentStore>,
    gateway: Arc<dyn PaymentGateway>,
    config: ReconciliationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub generated_at: DateTime<Utc>,
    pub checked: usize,
    pub completed: usize,
    pub abandoned: usize,
    pub still_pending: usize,
}

impl ReconciliationService {
    pub fn new(
        store: Arc<dyn PaymentStore>,
        gateway: Arc<dyn PaymentGateway>,
        config: ReconciliationConfig,
    ) -> Self {
        Self { store, gateway, config }
    }

    /// One sweep over intents pending past the configured age.
    ///
    /// Orders the gateway reports paid are completed with the captured
    /// payment id; orders still unpaid past the abandonment threshold are
    /// marked failed. A gateway error leaves the intent for the next sweep.
    pub async fn reconcile_stuck_intents(&self) -> Result<ReconciliationReport, AppError> {
        let pending_cutoff = Utc::now() - Duration::minutes(self.config.pending_max_age_minutes);
        let abandon_cutoff = Utc::now() - Duration::minutes(self.config.abandon_after_minutes);

        let stale = self
            .store
            .find_stale_pending(pending_cutoff, self.config.batch_size)
            .await?;

        info!(
            "Reconciliation sweep: {} intent(s) pending since before {}",
            stale.len(),
            pending_cutoff
        );

        let mut completed = 0usize;
        let mut abandoned = 0usize;
        let mut still_pending = 0usize;
        let checked = stale.len();

        for intent in stale {
            match self.gateway.fetch_order_status(&intent.gateway_order_id).await {
                Ok(GatewayOrderStatus::Paid { payment_id: Some(payment_id) }) => {
                    let audit = serde_json::json!({
                        "source": "reconciliation",
                        "gateway_order_id": intent.gateway_order_id,
                        "gateway_payment_id": payment_id,
                        "gateway_status": "paid",
                    });
                    self.store.complete_payment(intent.id, &payment_id, audit).await?;
                    info!(
                        "Reconciled payment intent {} as completed (gateway payment {})",
                        intent.id, payment_id
                    );
                    completed += 1;
                }
                Ok(GatewayOrderStatus::Paid { payment_id: None }) => {
                    // Paid but no captured payment surfaced yet; retry on
                    // the next sweep rather than complete without an id.
                    warn!(
                        "Gateway reports order {} paid but no captured payment for intent {}",
                        intent.gateway_order_id, intent.id
                    );
                    still_pending += 1;
                }
                Ok(GatewayOrderStatus::Created) | Ok(GatewayOrderStatus::Attempted) => {
                    if intent.created_at < abandon_cutoff {
                        let audit = serde_json::json!({
                            "source": "reconciliation",
                            "gateway_order_id": intent.gateway_order_id,
                            "reason": "abandoned",
                        });
                        self.store.mark_failed(intent.id, Some(audit)).await?;
                        info!("Reconciled payment intent {} as abandoned", intent.id);
                        abandoned += 1;
                    } else {
                        still_pending += 1;
                    }
                }
                Err(e) => {
                    warn!(
                        "Reconciliation could not query gateway for intent {}: {}",
                        intent.id, e
                    );
                    still_pending += 1;
                }
            }
        }

        let report = ReconciliationReport {
            generated_at: Utc::now(),
            checked,
            completed,
            abandoned,
            still_pending,
        };

        if report.completed > 0 || report.abandoned > 0 {
            info!(
                "Reconciliation sweep finished: {} checked, {} completed, {} abandoned, {} still pending",
                report.checked, report.completed, report.abandoned, report.still_pending
            );
        }

        if report.still_pending == report.checked && report.checked > 0 {
            error!(
                "Reconciliation sweep made no progress on {} stuck intent(s)",
                report.checked
            );
        }

        Ok(report)
    }
}
