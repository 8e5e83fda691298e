pub mod gateway;
pub mod payment_service;
pub mod razorpay_service;
pub mod reconciliation_service;

// Re-export commonly used types
pub use gateway::{GatewayError, PaymentGateway};
pub use payment_service::PaymentService;
pub use razorpay_service::RazorpayClient;
pub use reconciliation_service::ReconciliationService;
