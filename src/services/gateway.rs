use async_trait::async_trait;

/// Errors from the payment gateway client.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The gateway could not be reached or answered with a non-success
    /// status. Nothing was persisted locally.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
    #[error("invalid gateway configuration: {0}")]
    Configuration(String),
}

/// An order as acknowledged by the gateway.
#[derive(Debug, Clone)]
pub struct GatewayOrder {
    pub id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub receipt: Option<String>,
}

/// Gateway-side view of an order, as reported by its authenticated API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOrderStatus {
    /// Order exists, no payment attempt yet.
    Created,
    /// A payment was attempted but has not settled.
    Attempted,
    /// The order is paid; `payment_id` is the settling payment when the
    /// gateway exposes one.
    Paid { payment_id: Option<String> },
}

/// Seam over the hosted payment gateway: order creation over its REST API
/// and callback signature verification against the shared secret.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create an order for `amount_minor` in the gateway's ledger. `receipt`
    /// is the caller's correlation reference.
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError>;

    /// Query the authoritative status of an order. Used by the
    /// reconciliation sweep, never by the request path.
    async fn fetch_order_status(&self, gateway_order_id: &str) -> Result<GatewayOrderStatus, GatewayError>;

    /// Check a callback signature against
    /// `HMAC-SHA256(secret, "{order_id}|{payment_id}")`. Must compare in
    /// constant time.
    fn verify_payment_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<bool, GatewayError>;

    /// Public key id handed to the browser checkout SDK.
    fn checkout_key_id(&self) -> &str;
}
